pub mod binance;
pub mod bybit;
pub mod fixture;
pub mod kraken;
pub mod kucoin;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{exchange_ids, Config, ExchangeConfig};
use crate::error::GatewayError;
use crate::types::{ExchangeId, Market, MarketSet};

pub use binance::BinanceGateway;
pub use bybit::BybitGateway;
pub use fixture::StaticGateway;
pub use kraken::KrakenGateway;
pub use kucoin::KucoinGateway;

/// 交易所行情网关
#[async_trait]
pub trait MarketDataGateway: Send + Sync {
    /// 交易所标识
    fn id(&self) -> &str;

    /// 表头显示名称
    fn display_name(&self) -> &str;

    /// 获取当前可交易的现货市场
    async fn load_markets(&self) -> Result<MarketSet, GatewayError>;

    /// 获取某个市场的最新成交价
    async fn fetch_last_price(&self, market: &Market) -> Result<BigDecimal, GatewayError>;
}

/// 启动时解析好的交易所网关表
#[derive(Default, Clone)]
pub struct GatewayRegistry {
    gateways: HashMap<ExchangeId, Arc<dyn MarketDataGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为配置中每个启用的交易所创建对应的网关，未知 id 直接报错
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.collector.timeout_seconds))
            .build()?;

        let mut registry = Self::new();
        for exchange in config.get_enabled_exchanges() {
            log::info!("正在初始化交易所网关: {}", exchange.id);
            let gateway = build_gateway(exchange, client.clone())?;
            registry.register(gateway);
        }

        Ok(registry)
    }

    pub fn register(&mut self, gateway: Arc<dyn MarketDataGateway>) {
        let id = gateway.id().to_string();
        self.gateways.insert(id, gateway);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn MarketDataGateway>> {
        self.gateways.get(id)
    }

    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}

fn build_gateway(
    exchange: &ExchangeConfig,
    client: Client,
) -> Result<Arc<dyn MarketDataGateway>, GatewayError> {
    let api_url = exchange.api_url.clone();
    let display_name = exchange.display_name.clone();

    let gateway: Arc<dyn MarketDataGateway> = match exchange.id.as_str() {
        exchange_ids::BINANCE => Arc::new(
            BinanceGateway::binance(client, api_url).with_display_name(display_name),
        ),
        exchange_ids::MEXC => Arc::new(
            BinanceGateway::mexc(client, api_url).with_display_name(display_name),
        ),
        exchange_ids::KUCOIN => {
            Arc::new(KucoinGateway::new(client, api_url).with_display_name(display_name))
        }
        exchange_ids::KRAKEN => {
            Arc::new(KrakenGateway::new(client, api_url).with_display_name(display_name))
        }
        exchange_ids::BYBIT => {
            Arc::new(BybitGateway::new(client, api_url).with_display_name(display_name))
        }
        other => return Err(GatewayError::UnsupportedExchange(other.to_string())),
    };

    Ok(gateway)
}

/// GET 请求并把响应体解析为 JSON
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    exchange: &str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, GatewayError> {
    log::debug!("{}: GET {} {:?}", exchange, url, query);

    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::Status {
            exchange: exchange.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| GatewayError::Decode {
        exchange: exchange.to_string(),
        source,
    })
}

/// 解析行情中的价格字段，必须是正数
pub(crate) fn parse_price(exchange: &str, pair: &str, raw: &str) -> Result<BigDecimal, GatewayError> {
    let price = BigDecimal::from_str(raw.trim()).map_err(|e| {
        GatewayError::malformed(exchange, pair, format!("invalid price {:?}: {}", raw, e))
    })?;

    if price.is_zero() || price < BigDecimal::zero() {
        return Err(GatewayError::malformed(
            exchange,
            pair,
            format!("non-positive price {}", raw),
        ));
    }

    Ok(price)
}

/// 去掉 api_url 末尾的斜杠
pub(crate) fn base_url(api_url: Option<String>, default: &str) -> String {
    api_url
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(
            parse_price("binance", "BTC/USDT", "50000.10").unwrap(),
            BigDecimal::from_str("50000.1").unwrap()
        );
        assert!(matches!(
            parse_price("binance", "BTC/USDT", "0"),
            Err(GatewayError::MalformedTicker { .. })
        ));
        assert!(parse_price("binance", "BTC/USDT", "-1").is_err());
        assert!(parse_price("binance", "BTC/USDT", "abc").is_err());
        assert!(parse_price("binance", "BTC/USDT", "").is_err());
    }

    #[test]
    fn test_registry_from_default_config() {
        let registry = GatewayRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("kucoin").unwrap().display_name(), "KuCoin");
        assert_eq!(registry.get("mexc").unwrap().display_name(), "MEXC");
        assert!(registry.get("okx").is_none());
    }

    #[test]
    fn test_registry_rejects_unknown_exchange() {
        let mut config = Config::default();
        config.exchanges.push(ExchangeConfig::new("okx"));
        let result = GatewayRegistry::from_config(&config);
        assert!(matches!(result, Err(GatewayError::UnsupportedExchange(id)) if id == "okx"));
    }

    #[test]
    fn test_registry_skips_disabled_exchange() {
        let mut config = Config::default();
        config.exchanges[0].enabled = false;
        config.exchanges[1].display_name = Some("Ku".to_string());
        let registry = GatewayRegistry::from_config(&config).unwrap();
        assert!(registry.get("binance").is_none());
        assert_eq!(registry.get("kucoin").unwrap().display_name(), "Ku");
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        assert_eq!(base_url(Some("http://127.0.0.1:1234/".to_string()), "x"), "http://127.0.0.1:1234");
        assert_eq!(base_url(None, "https://api.binance.com"), "https://api.binance.com");
    }
}
