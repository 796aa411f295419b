use bigdecimal::BigDecimal;
use log::{error, info, warn};
use std::sync::Arc;

use crate::config::{Config, FailurePolicy};
use crate::error::{CollectError, GatewayError};
use crate::exchanges::GatewayRegistry;
use crate::types::{CollectionReport, ExchangeFailure, ExchangeId, FailureStage, PairSymbol};

/// 价格采集器的不可变配置
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub exchanges: Vec<ExchangeId>,
    pub pairs: Vec<PairSymbol>,
    pub failure_policy: FailurePolicy,
}

impl CollectorConfig {
    pub fn new(exchanges: Vec<ExchangeId>, pairs: Vec<PairSymbol>) -> Self {
        Self {
            exchanges,
            pairs,
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

impl From<&Config> for CollectorConfig {
    fn from(config: &Config) -> Self {
        Self {
            exchanges: config.exchange_ids(),
            pairs: config.pairs.clone(),
            failure_policy: config.collector.failure_policy,
        }
    }
}

/// 按顺序逐个查询交易所，构建 交易对 -> 交易所 -> 价格 表
#[derive(Clone)]
pub struct PriceCollector {
    config: CollectorConfig,
    registry: Arc<GatewayRegistry>,
}

impl PriceCollector {
    pub fn new(config: CollectorConfig, registry: Arc<GatewayRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &GatewayRegistry {
        &self.registry
    }

    /// 采集一轮价格
    ///
    /// 每个交易所的数据独立成败：失败的交易所不写入任何价格，记录到
    /// `failures`。`FailurePolicy::Abort` 下第一个失败直接返回错误。
    pub async fn collect(&self) -> Result<CollectionReport, CollectError> {
        let mut report = CollectionReport::default();

        for exchange in &self.config.exchanges {
            match self.collect_exchange(exchange).await {
                Ok(prices) => {
                    info!("{}: 获取到 {} 个交易对的价格", exchange, prices.len());
                    for (pair, price) in prices {
                        report.table.insert(&pair, exchange, price);
                    }
                }
                Err(failure) => {
                    error!("采集价格失败: {}", failure);
                    match self.config.failure_policy {
                        FailurePolicy::Abort => return Err(CollectError::Aborted(failure)),
                        FailurePolicy::Isolate => report.failures.push(failure),
                    }
                }
            }
        }

        info!(
            "本轮采集完成: {} 个交易对, {} 个报价, {} 个交易所失败",
            report.table.len(),
            report.table.quote_count(),
            report.failures.len()
        );

        Ok(report)
    }

    /// 获取单个交易所所有受支持交易对的价格
    async fn collect_exchange(
        &self,
        exchange: &str,
    ) -> Result<Vec<(PairSymbol, BigDecimal)>, ExchangeFailure> {
        let failure = |stage: FailureStage, error: GatewayError| ExchangeFailure {
            exchange: exchange.to_string(),
            stage,
            error,
        };

        let gateway = self.registry.get(exchange).ok_or_else(|| {
            failure(
                FailureStage::LoadMarkets,
                GatewayError::UnsupportedExchange(exchange.to_string()),
            )
        })?;

        let markets = gateway
            .load_markets()
            .await
            .map_err(|e| failure(FailureStage::LoadMarkets, e))?;
        info!("{}: 加载到 {} 个市场", exchange, markets.len());

        let mut prices = Vec::new();
        for pair in &self.config.pairs {
            let market = match markets.get(pair) {
                Some(market) => market,
                None => {
                    warn!("{}: 不支持交易对 {}，跳过", exchange, pair);
                    continue;
                }
            };

            let price = gateway
                .fetch_last_price(market)
                .await
                .map_err(|e| failure(FailureStage::FetchTicker(pair.clone()), e))?;
            log::debug!("{}: {} = {}", exchange, pair, price);
            prices.push((pair.clone(), price));
        }

        Ok(prices)
    }
}
