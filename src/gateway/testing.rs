//! In-memory backend used by aggregator, widget and host tests.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use super::Gateway;
use crate::error::{CardError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

struct BackendData {
    running: bool,
    autotrade: bool,
    pairs: Vec<String>,
    config: Value,
    logs: Value,
    alerts: Vec<Value>,
    history: HashMap<String, Value>,
}

/// Behaves like the trading bot for the endpoints the card uses: it echoes saved config,
/// flips `running` on start/stop and clears alerts. Individual paths can be made to fail.
pub struct FakeBackend {
    data: Mutex<BackendData>,
    failing: Mutex<HashMap<String, (u16, String)>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let mut history = HashMap::new();
        history.insert(
            "BTCUSDC".to_string(),
            json!({ "pair": "BTCUSDC", "points": [
                { "ts": "2024-05-01T10:00:00", "price": 64000.0 },
                { "ts": "2024-05-01T10:01:00", "price": 64200.0 },
                { "ts": "2024-05-01T10:02:00", "price": 63900.0 }
            ]}),
        );
        history.insert(
            "ETHUSDC".to_string(),
            json!({ "pair": "ETHUSDC", "points": [
                { "ts": "2024-05-01T10:00:00", "price": 3100.0 },
                { "ts": "2024-05-01T10:01:00", "price": 3120.5 }
            ]}),
        );

        Self {
            data: Mutex::new(BackendData {
                running: true,
                autotrade: false,
                pairs: vec!["BTCUSDC".to_string(), "ETHUSDC".to_string()],
                config: json!({
                    "min_profit_pct": 5.0,
                    "hysteresis_pct": 1.0,
                    "buy_drawdown_pct": 3.0,
                    "min_trades_per_hour": 100,
                    "base_package_usd": 50.0,
                    "downtrend_multiplier": 2.0,
                    "buy_lookback": "day"
                }),
                logs: json!([
                    { "ts": "2024-05-01T10:02:00", "pair": "BTCUSDC", "level": "INFO",
                      "message": "PNL 12.50 USD (2.10%)", "pnl_usd": 12.5, "pnl_percent": 2.1 }
                ]),
                alerts: vec![json!({
                    "ts": "2024-05-01T10:02:00", "pair": "BTCUSDC", "type": "positive",
                    "pnl_usd": 12.5, "pnl_percent": 2.1
                })],
                history,
            }),
            failing: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every request whose path starts with `prefix` answers `status` with `body`.
    pub fn fail(&self, prefix: &str, status: u16, body: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(prefix.to_string(), (status, body.to_string()));
    }

    pub fn heal(&self, prefix: &str) {
        self.failing.lock().unwrap().remove(prefix);
    }

    pub fn set_history(&self, pair: &str, response: Value) {
        self.data.lock().unwrap().history.insert(pair.to_string(), response);
    }

    pub fn set_logs(&self, logs: Value) {
        self.data.lock().unwrap().logs = logs;
    }

    pub fn set_running(&self, running: bool) {
        self.data.lock().unwrap().running = running;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method != "GET").collect()
    }

    fn record(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body,
        });
        let failing = self.failing.lock().unwrap();
        match failing.iter().find(|(prefix, _)| path.starts_with(prefix.as_str())) {
            Some((_, (status, body))) => Err(CardError::backend(*status, body.clone())),
            None => Ok(()),
        }
    }

    fn query_param<'a>(path: &'a str, key: &str) -> Option<&'a str> {
        let query = path.split_once('?')?.1;
        query
            .split('&')
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for FakeBackend {
    async fn get(&self, path: &str) -> Result<Value> {
        self.record("GET", path, None)?;
        let data = self.data.lock().unwrap();
        let route = path.split('?').next().unwrap_or(path);
        match route {
            "/health" => Ok(json!({
                "status": "ok",
                "running": data.running,
                "autotrade": data.autotrade,
                "pairs": data.pairs,
            })),
            "/config" => Ok(data.config.clone()),
            "/logs" => Ok(data.logs.clone()),
            "/alerts" => Ok(Value::Array(data.alerts.clone())),
            "/market/history" => {
                let pair = Self::query_param(path, "pair").unwrap_or_default();
                Ok(data
                    .history
                    .get(pair)
                    .cloned()
                    .unwrap_or_else(|| json!({ "pair": pair, "points": [] })))
            }
            "/pair-config" => Ok(json!([
                { "pair": "BTCUSDC", "allowed": true, "risk_level": 3 },
                { "pair": "ETHUSDC", "allowed": false, "risk_level": 0 }
            ])),
            _ => Err(CardError::backend(404, "Not Found")),
        }
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        self.record("POST", path, body.clone())?;
        let mut data = self.data.lock().unwrap();
        let route = path.split('?').next().unwrap_or(path);
        match route {
            "/start" => {
                data.running = true;
                if let Some(body) = &body {
                    if let Some(flag) = body.get("autotrade").and_then(Value::as_bool) {
                        data.autotrade = flag;
                    }
                }
                Ok(json!({ "running": true, "autotrade": data.autotrade, "pairs": data.pairs }))
            }
            "/stop" => {
                data.running = false;
                Ok(json!({ "running": false }))
            }
            "/autotrade" => {
                data.autotrade = Self::query_param(path, "flag") == Some("true");
                Ok(json!({ "autotrade": data.autotrade }))
            }
            "/order/buy" | "/order/sell" => Ok(json!({ "status": "filled", "request": body })),
            "/alerts" => {
                data.alerts.clear();
                Ok(json!({ "status": "ok" }))
            }
            _ => Err(CardError::backend(404, "Not Found")),
        }
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.record("PUT", path, Some(body.clone()))?;
        let mut data = self.data.lock().unwrap();
        match path {
            "/config" => {
                let mut merged: Map<String, Value> =
                    data.config.as_object().cloned().unwrap_or_default();
                if let Some(update) = body.as_object() {
                    for (key, value) in update {
                        if !value.is_null() {
                            merged.insert(key.clone(), value.clone());
                        }
                    }
                }
                data.config = Value::Object(merged);
                Ok(data.config.clone())
            }
            "/pair-config" => Ok(body),
            _ => Err(CardError::backend(404, "Not Found")),
        }
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.record("DELETE", path, None)?;
        let mut data = self.data.lock().unwrap();
        match path {
            "/alerts" => {
                data.alerts.clear();
                Ok(json!({ "status": "ok" }))
            }
            _ => Err(CardError::backend(404, "Not Found")),
        }
    }
}
