use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Deserialize;

use crate::config::exchange_ids;
use crate::error::GatewayError;
use crate::exchanges::{base_url, get_json, parse_price, MarketDataGateway};
use crate::types::{Market, MarketSet};

const BYBIT_BASE_URL: &str = "https://api.bybit.com";
const SPOT_CATEGORY: &str = "spot";

pub struct BybitGateway {
    display_name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct BybitResponse<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    result: Option<ListResult<T>>,
}

#[derive(Debug, Deserialize)]
struct ListResult<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct InstrumentInfo {
    symbol: String,
    #[serde(rename = "baseCoin")]
    base_coin: String,
    #[serde(rename = "quoteCoin")]
    quote_coin: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ticker {
    symbol: String,
    #[serde(rename = "lastPrice", default)]
    last_price: Option<String>,
}

impl BybitGateway {
    pub fn new(client: Client, api_url: Option<String>) -> Self {
        Self {
            display_name: "Bybit".to_string(),
            base_url: base_url(api_url, BYBIT_BASE_URL),
            client,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        if let Some(name) = display_name {
            self.display_name = name;
        }
        self
    }

    fn check<T>(response: BybitResponse<T>) -> Result<Vec<T>, GatewayError> {
        if response.ret_code != 0 {
            return Err(GatewayError::api(
                exchange_ids::BYBIT,
                format!("retCode {}: {}", response.ret_code, response.ret_msg),
            ));
        }
        Ok(response.result.map(|result| result.list).unwrap_or_default())
    }
}

#[async_trait]
impl MarketDataGateway for BybitGateway {
    fn id(&self) -> &str {
        exchange_ids::BYBIT
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn load_markets(&self) -> Result<MarketSet, GatewayError> {
        let url = format!("{}/v5/market/instruments-info", self.base_url);
        let response: BybitResponse<InstrumentInfo> =
            get_json(&self.client, self.id(), &url, &[("category", SPOT_CATEGORY)]).await?;

        let markets: MarketSet = Self::check(response)?
            .into_iter()
            .filter(|i| i.status.as_deref().map_or(true, |status| status == "Trading"))
            .map(|i| Market::new(&i.base_coin, &i.quote_coin, i.symbol))
            .collect();

        log::debug!("bybit: 加载到 {} 个现货市场", markets.len());
        Ok(markets)
    }

    async fn fetch_last_price(&self, market: &Market) -> Result<BigDecimal, GatewayError> {
        let url = format!("{}/v5/market/tickers", self.base_url);
        let response: BybitResponse<Ticker> = get_json(
            &self.client,
            self.id(),
            &url,
            &[("category", SPOT_CATEGORY), ("symbol", market.native.as_str())],
        )
        .await?;

        let raw = Self::check(response)?
            .into_iter()
            .find(|ticker| ticker.symbol == market.native)
            .and_then(|ticker| ticker.last_price)
            .ok_or_else(|| GatewayError::malformed(self.id(), &market.symbol, "missing lastPrice"))?;
        parse_price(self.id(), &market.symbol, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_load_markets() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/instruments-info")
            .match_query(mockito::Matcher::UrlEncoded("category".into(), "spot".into()))
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[
                    {"symbol":"BTCUSDT","baseCoin":"BTC","quoteCoin":"USDT","status":"Trading"},
                    {"symbol":"SHIBUSDT","baseCoin":"SHIB","quoteCoin":"USDT","status":"Closed"}
                ]}}"#,
            )
            .create_async()
            .await;

        let gateway = BybitGateway::new(Client::new(), Some(server.url()));
        let markets = gateway.load_markets().await.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets.get("BTC/USDT").unwrap().native, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_fetch_last_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/tickers")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("category".into(), "spot".into()),
                mockito::Matcher::UrlEncoded("symbol".into(), "ATOMUSDT".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[{"symbol":"ATOMUSDT","lastPrice":"8.123","bid1Price":"8.12"}]}}"#,
            )
            .create_async()
            .await;

        let gateway = BybitGateway::new(Client::new(), Some(server.url()));
        let market = Market::new("ATOM", "USDT", "ATOMUSDT");
        let price = gateway.fetch_last_price(&market).await.unwrap();
        assert_eq!(price, BigDecimal::from_str("8.123").unwrap());
    }

    #[tokio::test]
    async fn test_empty_ticker_list_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v5/market/tickers")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"retCode":0,"retMsg":"OK","result":{"category":"spot","list":[]}}"#)
            .create_async()
            .await;

        let gateway = BybitGateway::new(Client::new(), Some(server.url()));
        let market = Market::new("ATOM", "USDT", "ATOMUSDT");
        assert!(matches!(
            gateway.fetch_last_price(&market).await,
            Err(GatewayError::MalformedTicker { .. })
        ));
    }
}
