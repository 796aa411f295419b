use tabled::{builder::Builder, settings::Style};

use crate::monitor::ExchangeColumn;
use crate::types::Snapshot;
use crate::utils::{format_price, format_roi};

const BUY_MARK: &str = " ▲买";
const SELL_MARK: &str = " ▼卖";

/// 以终端表格形式渲染扫描结果
pub fn render_table(snapshot: &Snapshot, columns: &[ExchangeColumn]) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["交易对".to_string()];
    header.extend(columns.iter().map(|column| column.label.clone()));
    header.push("ROI".to_string());
    builder.push_record(header);

    for row in snapshot.table.rows() {
        let result = snapshot.report.get(&row.pair);
        let mut record = vec![row.pair.clone()];

        for column in columns {
            let mut cell = row
                .price_on(&column.id)
                .map(format_price)
                .unwrap_or_else(|| "-".to_string());
            if let Some(result) = result {
                if result.best_buy_exchange == column.id {
                    cell.push_str(BUY_MARK);
                } else if result.best_sell_exchange == column.id {
                    cell.push_str(SELL_MARK);
                }
            }
            record.push(cell);
        }

        record.push(
            result
                .map(|r| format_roi(r.roi_percent))
                .unwrap_or_else(|| "-".to_string()),
        );
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// 打印扫描结果和失败的交易所
pub fn print_snapshot(snapshot: &Snapshot, columns: &[ExchangeColumn]) {
    println!("\n🔍 跨交易所价差 ({})", snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("{}", render_table(snapshot, columns));

    if !snapshot.failures.is_empty() {
        println!("不可用的交易所:");
        for failure in &snapshot.failures {
            println!("  - {}", failure);
        }
    }
    println!();
}
