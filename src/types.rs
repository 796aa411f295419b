use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::GatewayError;

/// 交易所标识，例如 "binance"
pub type ExchangeId = String;

/// 统一格式的交易对，例如 "BTC/USDT"
pub type PairSymbol = String;

/// 交易所上架的一个现货市场
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    /// 统一格式 BASE/QUOTE
    pub symbol: PairSymbol,
    /// 交易所原生符号，查询行情时使用
    pub native: String,
}

impl Market {
    pub fn new(base: &str, quote: &str, native: impl Into<String>) -> Self {
        Self {
            symbol: unified_symbol(base, quote),
            native: native.into(),
        }
    }
}

/// 生成统一格式的交易对符号
pub fn unified_symbol(base: &str, quote: &str) -> PairSymbol {
    format!("{}/{}", base.to_uppercase(), quote.to_uppercase())
}

/// 某个交易所当前可交易的市场集合
#[derive(Debug, Clone, Default)]
pub struct MarketSet {
    markets: HashMap<PairSymbol, Market>,
}

impl MarketSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, market: Market) {
        self.markets.insert(market.symbol.clone(), market);
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.markets.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

impl FromIterator<Market> for MarketSet {
    fn from_iter<I: IntoIterator<Item = Market>>(iter: I) -> Self {
        let mut set = MarketSet::new();
        for market in iter {
            set.insert(market);
        }
        set
    }
}

/// 单个交易所对某交易对的报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub exchange: ExchangeId,
    pub price: BigDecimal,
}

/// 一个交易对在各交易所的报价，按插入顺序保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub pair: PairSymbol,
    pub quotes: Vec<Quote>,
}

impl PriceRow {
    pub fn price_on(&self, exchange: &str) -> Option<&BigDecimal> {
        self.quotes
            .iter()
            .find(|quote| quote.exchange == exchange)
            .map(|quote| &quote.price)
    }
}

/// 交易对 -> 交易所 -> 最新价格
///
/// 交易对按首次插入的顺序迭代；同一交易对内的交易所也按插入顺序迭代，
/// 采集器按配置顺序遍历交易所，因此这里的顺序就是配置顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    rows: Vec<PriceRow>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录价格；同一交易所重复写入时覆盖旧价格
    pub fn insert(&mut self, pair: &str, exchange: &str, price: BigDecimal) {
        let row = match self.rows.iter().position(|row| row.pair == pair) {
            Some(index) => &mut self.rows[index],
            None => {
                self.rows.push(PriceRow {
                    pair: pair.to_string(),
                    quotes: Vec::new(),
                });
                let last = self.rows.len() - 1;
                &mut self.rows[last]
            }
        };

        match row.quotes.iter_mut().find(|quote| quote.exchange == exchange) {
            Some(quote) => quote.price = price,
            None => row.quotes.push(Quote {
                exchange: exchange.to_string(),
                price,
            }),
        }
    }

    pub fn row(&self, pair: &str) -> Option<&PriceRow> {
        self.rows.iter().find(|row| row.pair == pair)
    }

    pub fn price(&self, pair: &str, exchange: &str) -> Option<&BigDecimal> {
        self.row(pair).and_then(|row| row.price_on(exchange))
    }

    pub fn rows(&self) -> impl Iterator<Item = &PriceRow> {
        self.rows.iter()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.pair.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 报价总数
    pub fn quote_count(&self) -> usize {
        self.rows.iter().map(|row| row.quotes.len()).sum()
    }
}

/// 单个交易对的套利信号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiResult {
    pub best_buy_exchange: ExchangeId,
    pub best_sell_exchange: ExchangeId,
    pub roi_percent: f64,
}

/// 按价格表顺序排列的套利信号
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageReport {
    entries: Vec<(PairSymbol, RoiResult)>,
}

impl ArbitrageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pair: PairSymbol, result: RoiResult) {
        self.entries.push((pair, result));
    }

    pub fn get(&self, pair: &str) -> Option<&RoiResult> {
        self.entries
            .iter()
            .find(|(symbol, _)| symbol == pair)
            .map(|(_, result)| result)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PairSymbol, &RoiResult)> {
        self.entries.iter().map(|(pair, result)| (pair, result))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 采集失败发生的阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureStage {
    LoadMarkets,
    FetchTicker(PairSymbol),
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::LoadMarkets => write!(f, "loading markets"),
            FailureStage::FetchTicker(pair) => write!(f, "fetching {} ticker", pair),
        }
    }
}

/// 某个交易所在本轮采集中的失败记录
#[derive(Debug)]
pub struct ExchangeFailure {
    pub exchange: ExchangeId,
    pub stage: FailureStage,
    pub error: GatewayError,
}

impl std::fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed while {}: {}", self.exchange, self.stage, self.error)
    }
}

/// 一轮采集的结果：成功的价格和失败的交易所
#[derive(Debug, Default)]
pub struct CollectionReport {
    pub table: PriceTable,
    pub failures: Vec<ExchangeFailure>,
}

/// 一次完整扫描（采集 + 分析）的结果
#[derive(Debug)]
pub struct Snapshot {
    pub table: PriceTable,
    pub report: ArbitrageReport,
    pub failures: Vec<ExchangeFailure>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn price(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn test_price_table_keeps_insertion_order() {
        let mut table = PriceTable::new();
        table.insert("ETH/USDT", "kucoin", price("3001"));
        table.insert("BTC/USDT", "kucoin", price("50100"));
        table.insert("ETH/USDT", "kraken", price("2999"));

        let pairs: Vec<&str> = table.pairs().collect();
        assert_eq!(pairs, vec!["ETH/USDT", "BTC/USDT"]);

        let exchanges: Vec<&str> = table
            .row("ETH/USDT")
            .unwrap()
            .quotes
            .iter()
            .map(|quote| quote.exchange.as_str())
            .collect();
        assert_eq!(exchanges, vec!["kucoin", "kraken"]);
        assert_eq!(table.quote_count(), 3);
    }

    #[test]
    fn test_price_table_overwrites_same_exchange() {
        let mut table = PriceTable::new();
        table.insert("BTC/USDT", "binance", price("50000"));
        table.insert("BTC/USDT", "binance", price("50001"));

        assert_eq!(table.price("BTC/USDT", "binance"), Some(&price("50001")));
        assert_eq!(table.quote_count(), 1);
        assert_eq!(table.price("BTC/USDT", "kraken"), None);
        assert_eq!(table.price("ETH/USDT", "binance"), None);
    }

    #[test]
    fn test_market_set_lookup() {
        let markets: MarketSet = vec![
            Market::new("btc", "usdt", "BTCUSDT"),
            Market::new("ETH", "USDT", "ETHUSDT"),
        ]
        .into_iter()
        .collect();

        assert_eq!(markets.len(), 2);
        assert!(markets.contains("BTC/USDT"));
        assert!(!markets.contains("BTC/USDC"));
        assert_eq!(markets.get("ETH/USDT").unwrap().native, "ETHUSDT");
    }
}
