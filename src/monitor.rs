use anyhow::Result;
use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::analyzer;
use crate::collector::{CollectorConfig, PriceCollector};
use crate::config::Config;
use crate::error::CollectError;
use crate::exchanges::GatewayRegistry;
use crate::types::{ExchangeId, Snapshot};

/// 表格中的一列交易所
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeColumn {
    pub id: ExchangeId,
    pub label: String,
}

/// 采集 + 分析流水线，每次调用都重新获取数据
#[derive(Clone)]
pub struct ArbitrageMonitor {
    collector: PriceCollector,
    columns: Vec<ExchangeColumn>,
}

impl ArbitrageMonitor {
    pub fn new(collector: PriceCollector) -> Self {
        let columns = collector
            .config()
            .exchanges
            .iter()
            .map(|id| ExchangeColumn {
                id: id.clone(),
                label: collector
                    .registry()
                    .get(id)
                    .map(|gateway| gateway.display_name().to_string())
                    .unwrap_or_else(|| id.clone()),
            })
            .collect();

        Self { collector, columns }
    }

    /// 根据配置创建网关并组装监控器
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = GatewayRegistry::from_config(config)?;
        info!("已初始化 {} 个交易所网关", registry.len());
        Ok(Self::from_registry(config, registry))
    }

    pub fn from_registry(config: &Config, registry: GatewayRegistry) -> Self {
        let collector = PriceCollector::new(CollectorConfig::from(config), Arc::new(registry));
        Self::new(collector)
    }

    /// 按配置顺序排列的表头
    pub fn columns(&self) -> &[ExchangeColumn] {
        &self.columns
    }

    /// 扫描一次：采集价格并计算套利信号
    pub async fn scan(&self) -> Result<Snapshot, CollectError> {
        info!("开始扫描跨交易所价差...");

        let collection = self.collector.collect().await?;
        let report = analyzer::analyze(&collection.table);

        info!("扫描完成，{} 个交易对有报价", report.len());

        Ok(Snapshot {
            table: collection.table,
            report,
            failures: collection.failures,
            generated_at: Utc::now(),
        })
    }
}
