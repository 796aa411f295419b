//! 跨交易所套利分析
//!
//! 对每个交易对扫描一遍报价，记录最低价（最佳买入）和最高价（最佳卖出）
//! 所在的交易所，并计算价差百分比。价格相同时保留先出现的交易所，
//! 即配置中靠前的交易所。

use bigdecimal::BigDecimal;

use crate::types::{ArbitrageReport, PriceRow, PriceTable, RoiResult};
use crate::utils::calculate_percentage_difference;

/// 分析整张价格表，结果顺序与价格表一致
pub fn analyze(table: &PriceTable) -> ArbitrageReport {
    let mut report = ArbitrageReport::new();

    for row in table.rows() {
        match analyze_row(row) {
            Some(result) => report.push(row.pair.clone(), result),
            None => log::debug!("交易对 {} 没有任何报价，跳过", row.pair),
        }
    }

    report
}

/// 分析单个交易对；没有报价时返回 None
pub fn analyze_row(row: &PriceRow) -> Option<RoiResult> {
    let mut quotes = row.quotes.iter();
    let first = quotes.next()?;

    let mut best_buy: (&str, &BigDecimal) = (first.exchange.as_str(), &first.price);
    let mut best_sell: (&str, &BigDecimal) = (first.exchange.as_str(), &first.price);

    for quote in quotes {
        if quote.price < *best_buy.1 {
            best_buy = (quote.exchange.as_str(), &quote.price);
        }
        if quote.price > *best_sell.1 {
            best_sell = (quote.exchange.as_str(), &quote.price);
        }
    }

    Some(RoiResult {
        best_buy_exchange: best_buy.0.to_string(),
        best_sell_exchange: best_sell.0.to_string(),
        roi_percent: calculate_percentage_difference(best_buy.1, best_sell.1),
    })
}
