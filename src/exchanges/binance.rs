use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Deserialize;

use crate::config::exchange_ids;
use crate::error::GatewayError;
use crate::exchanges::{base_url, get_json, parse_price, MarketDataGateway};
use crate::types::{Market, MarketSet};

const BINANCE_BASE_URL: &str = "https://api.binance.com";
const MEXC_BASE_URL: &str = "https://api.mexc.com";

/// Binance 返回 "TRADING"，MEXC 返回 "1" 或 "ENABLED"
const ACTIVE_STATUSES: [&str; 3] = ["TRADING", "ENABLED", "1"];

/// Binance 现货 v3 REST 接口，MEXC 使用同样的接口格式
pub struct BinanceGateway {
    id: &'static str,
    display_name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "baseAsset")]
    base_asset: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    #[serde(default)]
    price: Option<String>,
}

impl BinanceGateway {
    pub fn binance(client: Client, api_url: Option<String>) -> Self {
        Self {
            id: exchange_ids::BINANCE,
            display_name: "Binance".to_string(),
            base_url: base_url(api_url, BINANCE_BASE_URL),
            client,
        }
    }

    pub fn mexc(client: Client, api_url: Option<String>) -> Self {
        Self {
            id: exchange_ids::MEXC,
            display_name: "MEXC".to_string(),
            base_url: base_url(api_url, MEXC_BASE_URL),
            client,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        if let Some(name) = display_name {
            self.display_name = name;
        }
        self
    }

    fn is_active(status: &Option<String>) -> bool {
        match status {
            Some(status) => ACTIVE_STATUSES.contains(&status.as_str()),
            None => true,
        }
    }
}

#[async_trait]
impl MarketDataGateway for BinanceGateway {
    fn id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn load_markets(&self) -> Result<MarketSet, GatewayError> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let info: ExchangeInfo = get_json(&self.client, self.id, &url, &[]).await?;

        let markets: MarketSet = info
            .symbols
            .into_iter()
            .filter(|s| Self::is_active(&s.status))
            .map(|s| Market::new(&s.base_asset, &s.quote_asset, s.symbol))
            .collect();

        log::debug!("{}: 加载到 {} 个现货市场", self.id, markets.len());
        Ok(markets)
    }

    async fn fetch_last_price(&self, market: &Market) -> Result<BigDecimal, GatewayError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let ticker: TickerPrice =
            get_json(&self.client, self.id, &url, &[("symbol", market.native.as_str())]).await?;

        let raw = ticker
            .price
            .ok_or_else(|| GatewayError::malformed(self.id, &market.symbol, "missing price"))?;
        parse_price(self.id, &market.symbol, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_load_markets_filters_inactive_symbols() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/exchangeInfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"timezone":"UTC","symbols":[
                    {"symbol":"BTCUSDT","status":"TRADING","baseAsset":"BTC","quoteAsset":"USDT"},
                    {"symbol":"ETHUSDT","status":"TRADING","baseAsset":"ETH","quoteAsset":"USDT"},
                    {"symbol":"LUNAUSDT","status":"BREAK","baseAsset":"LUNA","quoteAsset":"USDT"}
                ]}"#,
            )
            .create_async()
            .await;

        let gateway = BinanceGateway::binance(Client::new(), Some(server.url()));
        let markets = gateway.load_markets().await.unwrap();

        assert_eq!(markets.len(), 2);
        assert_eq!(markets.get("BTC/USDT").unwrap().native, "BTCUSDT");
        assert!(!markets.contains("LUNA/USDT"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_mexc_numeric_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/exchangeInfo")
            .with_status(200)
            .with_body(
                r#"{"symbols":[
                    {"symbol":"PEPEUSDT","status":"1","baseAsset":"PEPE","quoteAsset":"USDT"},
                    {"symbol":"OLDUSDT","status":"2","baseAsset":"OLD","quoteAsset":"USDT"}
                ]}"#,
            )
            .create_async()
            .await;

        let gateway = BinanceGateway::mexc(Client::new(), Some(server.url()));
        assert_eq!(gateway.id(), "mexc");
        let markets = gateway.load_markets().await.unwrap();
        assert!(markets.contains("PEPE/USDT"));
        assert!(!markets.contains("OLD/USDT"));
    }

    #[tokio::test]
    async fn test_fetch_last_price() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/ticker/price")
            .match_query(mockito::Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(200)
            .with_body(r#"{"symbol":"BTCUSDT","price":"50000.01000000"}"#)
            .create_async()
            .await;

        let gateway = BinanceGateway::binance(Client::new(), Some(server.url()));
        let market = Market::new("BTC", "USDT", "BTCUSDT");
        let price = gateway.fetch_last_price(&market).await.unwrap();

        assert_eq!(price, BigDecimal::from_str("50000.01").unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_last_price_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/price")
            .match_query(mockito::Matcher::UrlEncoded("symbol".into(), "ETHUSDT".into()))
            .with_status(200)
            .with_body(r#"{"symbol":"ETHUSDT"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/ticker/price")
            .match_query(mockito::Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(418)
            .with_body("banned")
            .create_async()
            .await;

        let gateway = BinanceGateway::binance(Client::new(), Some(server.url()));

        let eth = Market::new("ETH", "USDT", "ETHUSDT");
        assert!(matches!(
            gateway.fetch_last_price(&eth).await,
            Err(GatewayError::MalformedTicker { .. })
        ));

        let btc = Market::new("BTC", "USDT", "BTCUSDT");
        assert!(matches!(
            gateway.fetch_last_price(&btc).await,
            Err(GatewayError::Status { status: 418, .. })
        ));
    }
}
