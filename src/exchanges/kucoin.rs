use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Deserialize;

use crate::config::exchange_ids;
use crate::error::GatewayError;
use crate::exchanges::{base_url, get_json, parse_price, MarketDataGateway};
use crate::types::{Market, MarketSet};

const KUCOIN_BASE_URL: &str = "https://api.kucoin.com";
const KUCOIN_SUCCESS_CODE: &str = "200000";

pub struct KucoinGateway {
    display_name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct KucoinResponse<T> {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    #[serde(rename = "baseCurrency")]
    base_currency: String,
    #[serde(rename = "quoteCurrency")]
    quote_currency: String,
    #[serde(rename = "enableTrading", default)]
    enable_trading: bool,
}

#[derive(Debug, Deserialize)]
struct Level1 {
    #[serde(default)]
    price: Option<String>,
}

impl KucoinGateway {
    pub fn new(client: Client, api_url: Option<String>) -> Self {
        Self {
            display_name: "KuCoin".to_string(),
            base_url: base_url(api_url, KUCOIN_BASE_URL),
            client,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        if let Some(name) = display_name {
            self.display_name = name;
        }
        self
    }

    fn check<T>(response: KucoinResponse<T>) -> Result<Option<T>, GatewayError> {
        if response.code != KUCOIN_SUCCESS_CODE {
            let message = response.msg.unwrap_or_default();
            return Err(GatewayError::api(
                exchange_ids::KUCOIN,
                format!("code {}: {}", response.code, message),
            ));
        }
        Ok(response.data)
    }
}

#[async_trait]
impl MarketDataGateway for KucoinGateway {
    fn id(&self) -> &str {
        exchange_ids::KUCOIN
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn load_markets(&self) -> Result<MarketSet, GatewayError> {
        let url = format!("{}/api/v2/symbols", self.base_url);
        let response: KucoinResponse<Vec<SymbolInfo>> =
            get_json(&self.client, self.id(), &url, &[]).await?;

        let symbols = Self::check(response)?.unwrap_or_default();
        let markets: MarketSet = symbols
            .into_iter()
            .filter(|s| s.enable_trading)
            .map(|s| Market::new(&s.base_currency, &s.quote_currency, s.symbol))
            .collect();

        log::debug!("kucoin: 加载到 {} 个现货市场", markets.len());
        Ok(markets)
    }

    async fn fetch_last_price(&self, market: &Market) -> Result<BigDecimal, GatewayError> {
        let url = format!("{}/api/v1/market/orderbook/level1", self.base_url);
        let response: KucoinResponse<Level1> = get_json(
            &self.client,
            self.id(),
            &url,
            &[("symbol", market.native.as_str())],
        )
        .await?;

        // 未知交易对时 data 为 null
        let raw = Self::check(response)?
            .and_then(|level1| level1.price)
            .ok_or_else(|| GatewayError::malformed(self.id(), &market.symbol, "missing price"))?;
        parse_price(self.id(), &market.symbol, &raw)
    }
}
