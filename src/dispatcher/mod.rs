//! Operator actions turned into backend calls.
//!
//! Dispatch is two explicit steps. [`plan`] derives the request from the current view and the
//! operator's input without any I/O, then [`Dispatcher::execute`] sends it. Re-aggregating
//! afterwards is the widget's job, so both steps can be observed on their own.

pub mod forms;

pub use forms::*;

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregator::ViewState;
use crate::config::{CardConfig, ClearAlertsMethod};
use crate::error::{CardError, Result};
use crate::gateway::{get_as, paths, Gateway};
use crate::types::{PairConfig, PairConfigUpdate};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { autotrade: bool },
    Stop,
    /// `pair: None` or blank means the first configured pair.
    Buy { pair: Option<String>, amount: Option<String> },
    Sell { pair: Option<String>, package_id: Option<u64> },
    SaveConfig(ConfigForm),
    ClearAlerts,
    SetAutotrade { flag: bool },
    UpdatePairConfig(PairConfigUpdate),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::Stop => "stop",
            Command::Buy { .. } => "buy",
            Command::Sell { .. } => "sell",
            Command::SaveConfig(_) => "save-config",
            Command::ClearAlerts => "clear-alerts",
            Command::SetAutotrade { .. } => "autotrade",
            Command::UpdatePairConfig(_) => "pair-config",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A fully derived backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl Request {
    fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }
}

/// Derives the backend call for `command`.
///
/// Pairs come from the current snapshot and fall back to the configured pairs when there is
/// no snapshot (before the first refresh or after a failed one).
pub fn plan(view: &ViewState, config: &CardConfig, command: &Command) -> Result<Request> {
    let pairs = view.pairs().unwrap_or(&config.pairs);

    let request = match command {
        Command::Start { autotrade } => Request::post(
            paths::START,
            Some(json!({ "pairs": pairs, "autotrade": autotrade })),
        ),
        Command::Stop => Request::post(paths::STOP, None),
        Command::Buy { pair, amount } => {
            let pair = select_pair(pair.as_deref(), pairs)?;
            let amount = quote_amount(amount.as_deref(), config.strict_forms)?;
            Request::post(
                paths::ORDER_BUY,
                Some(json!({ "pair": pair, "quote_amount_usd": amount })),
            )
        }
        Command::Sell { pair, package_id } => {
            let pair = select_pair(pair.as_deref(), pairs)?;
            let mut body = json!({ "pair": pair });
            if let Some(id) = package_id {
                body["package_id"] = json!(id);
            }
            Request::post(paths::ORDER_SELL, Some(body))
        }
        Command::SaveConfig(form) => Request {
            method: Method::Put,
            path: paths::CONFIG.to_string(),
            body: Some(serde_json::to_value(form.parse(config.strict_forms)?)?),
        },
        Command::ClearAlerts => match config.clear_alerts_method {
            ClearAlertsMethod::Delete => Request {
                method: Method::Delete,
                path: paths::ALERTS.to_string(),
                body: None,
            },
            ClearAlertsMethod::Post => Request::post(paths::ALERTS, None),
        },
        Command::SetAutotrade { flag } => Request::post(paths::autotrade(*flag), None),
        Command::UpdatePairConfig(update) => Request {
            method: Method::Put,
            path: paths::PAIR_CONFIG.to_string(),
            body: Some(serde_json::to_value(update)?),
        },
    };

    Ok(request)
}

fn select_pair(selected: Option<&str>, pairs: &[String]) -> Result<String> {
    match selected.map(str::trim).filter(|p| !p.is_empty()) {
        Some(pair) => Ok(pair.to_uppercase()),
        None => pairs
            .first()
            .cloned()
            .ok_or_else(|| CardError::InvalidInput("no trading pair configured".to_string())),
    }
}

pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    config: CardConfig,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn Gateway>, config: CardConfig) -> Self {
        Self { gateway, config }
    }

    /// Plans and sends `command`. Errors propagate unchanged and are never retried.
    pub async fn execute(&self, view: &ViewState, command: &Command) -> Result<Value> {
        let request = plan(view, &self.config, command)?;
        info!("Dispatching {}: {} {}", command.name(), request.method, request.path);

        let result = self.send(request).await;
        if let Err(e) = &result {
            warn!("Command {} failed: {}", command.name(), e);
        }
        result
    }

    /// Per-pair trading permissions. A read, so nothing needs refreshing afterwards.
    pub async fn pair_configs(&self) -> Result<Vec<PairConfig>> {
        get_as(self.gateway.as_ref(), paths::PAIR_CONFIG).await
    }

    async fn send(&self, request: Request) -> Result<Value> {
        match request.method {
            Method::Post => self.gateway.post(&request.path, request.body).await,
            Method::Put => {
                self.gateway
                    .put(&request.path, request.body.unwrap_or(Value::Null))
                    .await
            }
            Method::Delete => self.gateway.delete(&request.path).await,
        }
    }
}
