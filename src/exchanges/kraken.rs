use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::exchange_ids;
use crate::error::GatewayError;
use crate::exchanges::{base_url, get_json, parse_price, MarketDataGateway};
use crate::types::{Market, MarketSet};

const KRAKEN_BASE_URL: &str = "https://api.kraken.com";

/// Kraken 沿用的旧资产代码 -> 通用代码
const ASSET_ALIASES: [(&str, &str); 2] = [("XBT", "BTC"), ("XDG", "DOGE")];

pub struct KrakenGateway {
    display_name: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct KrakenResponse<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AssetPair {
    altname: String,
    /// 暗池交易对没有 wsname
    #[serde(default)]
    wsname: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerInfo {
    /// 最新成交 [价格, 数量]
    #[serde(default)]
    c: Vec<String>,
}

impl KrakenGateway {
    pub fn new(client: Client, api_url: Option<String>) -> Self {
        Self {
            display_name: "Kraken".to_string(),
            base_url: base_url(api_url, KRAKEN_BASE_URL),
            client,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        if let Some(name) = display_name {
            self.display_name = name;
        }
        self
    }

    fn normalize_asset(asset: &str) -> &str {
        ASSET_ALIASES
            .iter()
            .find(|(kraken, _)| *kraken == asset)
            .map(|(_, common)| *common)
            .unwrap_or(asset)
    }

    /// 返回市场以及 altname 是否就是去掉 `/` 的 wsname
    fn market_from_pair(pair: AssetPair) -> Option<(Market, bool)> {
        if let Some(status) = &pair.status {
            if status != "online" {
                return None;
            }
        }
        let wsname = pair.wsname?;
        let (base, quote) = wsname.split_once('/')?;
        let canonical = pair.altname == format!("{}{}", base, quote);
        let market = Market::new(
            Self::normalize_asset(base),
            Self::normalize_asset(quote),
            pair.altname,
        );
        Some((market, canonical))
    }

    /// 多个交易对映射到同一个统一符号时优先 canonical 的那个，否则保留按 key 排序的第一个
    fn build_market_set(pairs: HashMap<String, AssetPair>) -> MarketSet {
        let mut pairs: Vec<(String, AssetPair)> = pairs.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut markets = MarketSet::new();
        for (_, pair) in pairs {
            let (market, canonical) = match Self::market_from_pair(pair) {
                Some(entry) => entry,
                None => continue,
            };
            if markets.contains(&market.symbol) && !canonical {
                continue;
            }
            markets.insert(market);
        }
        markets
    }

    fn check<T>(response: KrakenResponse<T>) -> Result<T, GatewayError> {
        if !response.error.is_empty() {
            return Err(GatewayError::api(exchange_ids::KRAKEN, response.error.join(", ")));
        }
        response
            .result
            .ok_or_else(|| GatewayError::api(exchange_ids::KRAKEN, "missing result"))
    }
}

#[async_trait]
impl MarketDataGateway for KrakenGateway {
    fn id(&self) -> &str {
        exchange_ids::KRAKEN
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn load_markets(&self) -> Result<MarketSet, GatewayError> {
        let url = format!("{}/0/public/AssetPairs", self.base_url);
        let response: KrakenResponse<HashMap<String, AssetPair>> =
            get_json(&self.client, self.id(), &url, &[]).await?;

        let markets = Self::build_market_set(Self::check(response)?);

        log::debug!("kraken: 加载到 {} 个现货市场", markets.len());
        Ok(markets)
    }

    async fn fetch_last_price(&self, market: &Market) -> Result<BigDecimal, GatewayError> {
        let url = format!("{}/0/public/Ticker", self.base_url);
        let response: KrakenResponse<HashMap<String, TickerInfo>> = get_json(
            &self.client,
            self.id(),
            &url,
            &[("pair", market.native.as_str())],
        )
        .await?;

        // 结果的 key 可能是交易对的内部名称（如 XXBTZUSD），只请求了一个交易对，取第一个即可
        let raw = Self::check(response)?
            .into_values()
            .next()
            .and_then(|ticker| ticker.c.into_iter().next())
            .ok_or_else(|| GatewayError::malformed(self.id(), &market.symbol, "missing last trade"))?;
        parse_price(self.id(), &market.symbol, &raw)
    }
}
