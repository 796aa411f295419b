//! CEX Spread Spy - 跨交易所现货价差监控
//!
//! 按顺序从多个中心化交易所获取固定交易对的最新成交价，计算每个交易对的
//! 最佳买入/卖出交易所和价差百分比，并通过 HTTP 以 HTML 表格展示。

pub mod analyzer;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod exchanges;
pub mod html;
pub mod logging;
pub mod monitor;
pub mod server;
pub mod table_display;
pub mod types;
pub mod utils;

// 重新导出常用类型
pub use analyzer::analyze;
pub use collector::{CollectorConfig, PriceCollector};
pub use config::{Config, FailurePolicy};
pub use error::{CollectError, GatewayError};
pub use exchanges::{GatewayRegistry, MarketDataGateway};
pub use monitor::{ArbitrageMonitor, ExchangeColumn};
pub use types::{ArbitrageReport, PriceTable, RoiResult, Snapshot};
