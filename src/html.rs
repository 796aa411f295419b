//! 把扫描结果渲染为独立的 HTML 页面

use std::fmt::Write;

use crate::monitor::ExchangeColumn;
use crate::types::Snapshot;
use crate::utils::{format_price, format_roi};

const PLACEHOLDER: &str = "-";

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Crypto Prices</title>
    <link rel="stylesheet" href="https://stackpath.bootstrapcdn.com/bootstrap/4.5.2/css/bootstrap.min.css">
    <style>
        .buy { background-color: #d4edda; }
        .sell { background-color: #f8d7da; }
    </style>
</head>
<body>
    <div class="container">
        <h1 class="my-4">Crypto Prices</h1>
"#;

const TAIL: &str = r#"    </div>
</body>
</html>
"#;

/// 转义 HTML 特殊字符
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 渲染价格表：每个交易对一行，每个交易所一列，最后一列为 ROI
pub fn render(snapshot: &Snapshot, columns: &[ExchangeColumn]) -> String {
    let mut html = String::new();
    // fmt::Write for String 不会返回错误
    write_document(&mut html, snapshot, columns).ok();
    html
}

fn write_document(html: &mut String, snapshot: &Snapshot, columns: &[ExchangeColumn]) -> std::fmt::Result {
    html.push_str(HEAD);
    write_table(html, snapshot, columns)?;
    write_footer(html, snapshot)?;
    html.push_str(TAIL);
    Ok(())
}

fn write_table(html: &mut String, snapshot: &Snapshot, columns: &[ExchangeColumn]) -> std::fmt::Result {
    writeln!(html, r#"        <table class="table table-bordered">"#)?;
    writeln!(html, "            <thead>")?;
    writeln!(html, "                <tr>")?;
    writeln!(html, "                    <th>Pair</th>")?;
    for column in columns {
        writeln!(html, "                    <th>{}</th>", escape_html(&column.label))?;
    }
    writeln!(html, "                    <th>ROI</th>")?;
    writeln!(html, "                </tr>")?;
    writeln!(html, "            </thead>")?;
    writeln!(html, "            <tbody>")?;

    for row in snapshot.table.rows() {
        let result = snapshot.report.get(&row.pair);
        write!(html, "                <tr><td>{}</td>", escape_html(&row.pair))?;

        for column in columns {
            let class = match result {
                Some(r) if r.best_buy_exchange == column.id => "buy",
                Some(r) if r.best_sell_exchange == column.id => "sell",
                _ => "",
            };
            let price = row
                .price_on(&column.id)
                .map(format_price)
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            write!(html, r#"<td class="{}">{}</td>"#, class, price)?;
        }

        let roi = result
            .map(|r| format_roi(r.roi_percent))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        writeln!(html, "<td>{}</td></tr>", roi)?;
    }

    writeln!(html, "            </tbody>")?;
    writeln!(html, "        </table>")?;
    Ok(())
}

fn write_footer(html: &mut String, snapshot: &Snapshot) -> std::fmt::Result {
    if !snapshot.failures.is_empty() {
        writeln!(html, r#"        <div class="alert alert-warning">"#)?;
        writeln!(html, "            <strong>Unavailable exchanges:</strong>")?;
        writeln!(html, "            <ul>")?;
        for failure in &snapshot.failures {
            writeln!(
                html,
                "                <li>{} (failed while {})</li>",
                escape_html(&failure.exchange),
                escape_html(&failure.stage.to_string())
            )?;
        }
        writeln!(html, "            </ul>")?;
        writeln!(html, "        </div>")?;
    }

    writeln!(
        html,
        r#"        <p class="text-muted">Updated at {}</p>"#,
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
