use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub autotrade: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pairs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub pnl_usd: Option<f64>,
    #[serde(default)]
    pub pnl_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertEntry {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub pnl_usd: Option<f64>,
    #[serde(default)]
    pub pnl_percent: Option<f64>,
}

/// One sample of `GET /market/history`. Prices arrive as numbers or numeric strings;
/// anything unparsable becomes NaN and is skipped by the sparkline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(default = "nan", deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default)]
    pub ts: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub pair: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub points: Vec<PricePoint>,
}

/// Backends answer `/logs` either with a bare array or with an `{ "items": [...] }` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LogsResponse {
    List(Vec<LogEntry>),
    Envelope {
        #[serde(default, deserialize_with = "null_as_empty")]
        items: Vec<LogEntry>,
    },
}

impl LogsResponse {
    pub fn into_entries(self) -> Vec<LogEntry> {
        match self {
            LogsResponse::List(items) => items,
            LogsResponse::Envelope { items } => items,
        }
    }
}

/// Row of `GET /pair-config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    pub pair: String,
    #[serde(default)]
    pub allowed: Option<bool>,
    #[serde(default)]
    pub risk_level: Option<i64>,
}

/// Body of `PUT /pair-config`. Absent fields are left untouched by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairConfigUpdate {
    pub pair: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<i64>,
}

pub const MIN_RISK_LEVEL: i64 = 0;
pub const MAX_RISK_LEVEL: i64 = 10;

impl PairConfigUpdate {
    pub fn new(pair: impl Into<String>, allowed: Option<bool>, risk_level: Option<i64>) -> Self {
        let pair: String = pair.into();
        Self {
            pair: pair.trim().to_uppercase(),
            allowed,
            risk_level: risk_level.map(|r| r.clamp(MIN_RISK_LEVEL, MAX_RISK_LEVEL)),
        }
    }
}

fn nan() -> f64 {
    f64::NAN
}

fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
