pub mod http;
#[cfg(test)]
pub mod testing;

pub use http::*;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Backend endpoints the card talks to.
pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const CONFIG: &str = "/config";
    pub const ALERTS: &str = "/alerts";
    pub const START: &str = "/start";
    pub const STOP: &str = "/stop";
    pub const ORDER_BUY: &str = "/order/buy";
    pub const ORDER_SELL: &str = "/order/sell";
    pub const PAIR_CONFIG: &str = "/pair-config";

    pub fn logs(limit: usize) -> String {
        format!("/logs?limit={}", limit)
    }

    pub fn alerts(limit: usize) -> String {
        format!("{}?limit={}", ALERTS, limit)
    }

    pub fn history(pair: &str, limit: usize) -> String {
        format!("/market/history?pair={}&limit={}", pair, limit)
    }

    pub fn autotrade(flag: bool) -> String {
        format!("/autotrade?flag={}", flag)
    }
}

/// Request seam between the card and the trading bot backend.
///
/// Every call resolves to the decoded JSON body. A non-success status is a
/// [`CardError::Backend`](crate::error::CardError::Backend) carrying the raw body text.
/// No retries, no timeouts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value>;
    /// `None` sends an empty payload.
    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value>;
    async fn put(&self, path: &str, body: Value) -> Result<Value>;
    async fn delete(&self, path: &str) -> Result<Value>;
}

/// GET and decode into `T`.
pub async fn get_as<T: DeserializeOwned>(gateway: &dyn Gateway, path: &str) -> Result<T> {
    let value = gateway.get(path).await?;
    Ok(serde_json::from_value(value)?)
}
