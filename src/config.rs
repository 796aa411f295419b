use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::types::{ExchangeId, PairSymbol};

// 交易所标识常量
pub mod exchange_ids {
    pub const BINANCE: &str = "binance";
    pub const KUCOIN: &str = "kucoin";
    pub const KRAKEN: &str = "kraken";
    pub const MEXC: &str = "mexc";
    pub const BYBIT: &str = "bybit";
}

/// 环境变量前缀，例如 SPREAD_SPY_SERVER__PORT=8080
pub const ENV_PREFIX: &str = "SPREAD_SPY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_exchanges")]
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<PairSymbol>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub collector: CollectorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    pub id: ExchangeId,
    /// 表头显示名称，缺省时使用网关自带的名称
    #[serde(default)]
    pub display_name: Option<String>,
    /// 覆盖 REST API 根地址
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorSettings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// 单个交易所失败时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// 丢弃该交易所的数据并继续采集其他交易所
    #[default]
    Isolate,
    /// 第一个失败即中止整轮采集
    Abort,
}

impl ExchangeConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            api_url: None,
            enabled: true,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchanges: default_exchanges(),
            pairs: default_pairs(),
            server: ServerConfig::default(),
            collector: CollectorSettings::default(),
        }
    }
}

fn default_exchanges() -> Vec<ExchangeConfig> {
    [
        exchange_ids::BINANCE,
        exchange_ids::KUCOIN,
        exchange_ids::KRAKEN,
        exchange_ids::MEXC,
        exchange_ids::BYBIT,
    ]
    .iter()
    .map(|id| ExchangeConfig::new(id))
    .collect()
}

fn default_pairs() -> Vec<PairSymbol> {
    ["BTC/USDT", "ETH/USDT", "CAKE/USDT", "ATOM/USDT", "SHIB/USDT", "PEPE/USDT"]
        .iter()
        .map(|pair| pair.to_string())
        .collect()
}

fn default_enabled() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Config {
    /// 加载配置：内置默认值 -> 可选配置文件 -> 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                bail!("配置文件不存在: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Config = builder
            .build()
            .context("读取配置失败")?
            .try_deserialize()
            .context("解析配置失败")?;

        config.normalize_pairs();
        config.validate()?;
        Ok(config)
    }

    /// 交易对统一为大写，与交易所市场的统一符号一致
    pub fn normalize_pairs(&mut self) {
        for pair in self.pairs.iter_mut() {
            *pair = pair.trim().to_uppercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let enabled = self.get_enabled_exchanges();
        if enabled.is_empty() {
            bail!("至少需要启用一个交易所");
        }

        let mut seen = HashSet::new();
        for exchange in &self.exchanges {
            if exchange.id.trim().is_empty() {
                bail!("交易所 id 不能为空");
            }
            if !seen.insert(exchange.id.as_str()) {
                bail!("重复的交易所 id: {}", exchange.id);
            }
            if let Some(api_url) = &exchange.api_url {
                url::Url::parse(api_url)
                    .map_err(|e| anyhow!("交易所 {} 的 api_url 无效 ({}): {}", exchange.id, api_url, e))?;
            }
        }

        if self.pairs.is_empty() {
            bail!("至少需要配置一个交易对");
        }
        for pair in &self.pairs {
            let valid = pair
                .split_once('/')
                .map(|(base, quote)| !base.is_empty() && !quote.is_empty() && !quote.contains('/'))
                .unwrap_or(false);
            if !valid {
                bail!("交易对格式应为 BASE/QUOTE: {}", pair);
            }
        }

        if self.collector.timeout_seconds == 0 {
            bail!("collector.timeout_seconds 必须大于 0");
        }

        Ok(())
    }

    pub fn get_enabled_exchanges(&self) -> Vec<&ExchangeConfig> {
        self.exchanges
            .iter()
            .filter(|config| config.enabled)
            .collect()
    }

    /// 按配置顺序排列的已启用交易所 id
    pub fn exchange_ids(&self) -> Vec<ExchangeId> {
        self.get_enabled_exchanges()
            .into_iter()
            .map(|config| config.id.clone())
            .collect()
    }
}
