use thiserror::Error;

use crate::types::ExchangeFailure;

/// 交易所行情网关的错误
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unsupported exchange: {0}")]
    UnsupportedExchange(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{exchange} returned HTTP {status}")]
    Status { exchange: String, status: u16 },

    #[error("{exchange} api error: {message}")]
    Api { exchange: String, message: String },

    #[error("{exchange} returned an undecodable payload: {source}")]
    Decode {
        exchange: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed ticker from {exchange} for {pair}: {reason}")]
    MalformedTicker {
        exchange: String,
        pair: String,
        reason: String,
    },
}

impl GatewayError {
    pub fn malformed(exchange: &str, pair: &str, reason: impl Into<String>) -> Self {
        GatewayError::MalformedTicker {
            exchange: exchange.to_string(),
            pair: pair.to_string(),
            reason: reason.into(),
        }
    }

    pub fn api(exchange: &str, message: impl Into<String>) -> Self {
        GatewayError::Api {
            exchange: exchange.to_string(),
            message: message.into(),
        }
    }
}

/// 一轮价格采集的错误
#[derive(Debug, Error)]
pub enum CollectError {
    /// 中止策略下第一个失败的交易所
    #[error("collection aborted: {0}")]
    Aborted(ExchangeFailure),
}
