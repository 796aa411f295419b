use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::GatewayError;
use crate::exchanges::MarketDataGateway;
use crate::types::{Market, MarketSet, PairSymbol};

/// 内存中的固定报价网关，用于演示模式和测试
pub struct StaticGateway {
    id: String,
    display_name: String,
    prices: HashMap<PairSymbol, BigDecimal>,
    fail_markets: bool,
    failing_pairs: HashSet<PairSymbol>,
    calls: AtomicUsize,
}

impl StaticGateway {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            prices: HashMap::new(),
            fail_markets: false,
            failing_pairs: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    /// 添加一个报价；price 必须是合法的十进制数
    pub fn with_price(mut self, pair: &str, price: &str) -> Self {
        match BigDecimal::from_str(price) {
            Ok(value) => {
                self.prices.insert(pair.to_string(), value);
            }
            Err(e) => log::warn!("{}: 忽略无效的演示价格 {} = {}: {}", self.id, pair, price, e),
        }
        self
    }

    /// 加载市场时失败
    pub fn failing_markets(mut self) -> Self {
        self.fail_markets = true;
        self
    }

    /// 获取指定交易对行情时失败
    pub fn failing_ticker(mut self, pair: &str) -> Self {
        self.failing_pairs.insert(pair.to_string());
        self
    }

    /// 被调用的次数（加载市场 + 获取行情）
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataGateway for StaticGateway {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn load_markets(&self) -> Result<MarketSet, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_markets {
            return Err(GatewayError::api(&self.id, "markets unavailable"));
        }

        Ok(self
            .prices
            .keys()
            .chain(self.failing_pairs.iter())
            .map(|pair| Market {
                symbol: pair.clone(),
                native: pair.replace('/', ""),
            })
            .collect())
    }

    async fn fetch_last_price(&self, market: &Market) -> Result<BigDecimal, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_pairs.contains(&market.symbol) {
            return Err(GatewayError::malformed(&self.id, &market.symbol, "missing price"));
        }

        self.prices
            .get(&market.symbol)
            .cloned()
            .ok_or_else(|| GatewayError::malformed(&self.id, &market.symbol, "unknown market"))
    }
}

/// 演示模式使用的样例报价
pub fn demo_gateways() -> Vec<StaticGateway> {
    vec![
        StaticGateway::new("binance")
            .with_display_name("Binance")
            .with_price("BTC/USDT", "67012.45")
            .with_price("ETH/USDT", "3521.18")
            .with_price("CAKE/USDT", "2.481")
            .with_price("ATOM/USDT", "8.712")
            .with_price("SHIB/USDT", "0.00002451"),
        StaticGateway::new("kucoin")
            .with_display_name("KuCoin")
            .with_price("BTC/USDT", "67055.1")
            .with_price("ETH/USDT", "3519.92")
            .with_price("CAKE/USDT", "2.487")
            .with_price("PEPE/USDT", "0.00001203"),
        StaticGateway::new("kraken")
            .with_display_name("Kraken")
            .with_price("BTC/USDT", "66998.8")
            .with_price("ETH/USDT", "3522.4")
            .with_price("ATOM/USDT", "8.69"),
        StaticGateway::new("mexc")
            .with_display_name("MEXC")
            .with_price("BTC/USDT", "67030.02")
            .with_price("CAKE/USDT", "2.479")
            .with_price("SHIB/USDT", "0.00002449")
            .with_price("PEPE/USDT", "0.00001207"),
        StaticGateway::new("bybit")
            .with_display_name("Bybit")
            .with_price("BTC/USDT", "67021.7")
            .with_price("ETH/USDT", "3520.55")
            .with_price("ATOM/USDT", "8.705"),
    ]
}
