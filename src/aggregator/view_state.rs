use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::types::{AlertEntry, Health, LogEntry, PricePoint, StrategyConfig};

/// What the card shows. Replaced wholesale after every refresh cycle, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewState {
    /// Mounted, no cycle completed yet.
    #[default]
    Empty,
    Ready(Snapshot),
    /// The cycle failed as a whole. Nothing from it, or from earlier cycles, is kept.
    Failed { error: String, at: DateTime<Utc> },
}

impl ViewState {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            ViewState::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn health(&self) -> Option<&Health> {
        self.snapshot().and_then(|s| s.health.as_ref())
    }

    pub fn config(&self) -> Option<&StrategyConfig> {
        self.snapshot().and_then(|s| s.config.as_ref())
    }

    /// Pairs the snapshot was fetched for, if there is one.
    pub fn pairs(&self) -> Option<&[String]> {
        self.snapshot().map(|s| s.pairs.as_slice())
    }
}

/// Merged result of one successful refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub health: Option<Health>,
    pub config: Option<StrategyConfig>,
    pub logs: Vec<LogEntry>,
    pub alerts: Vec<AlertEntry>,
    /// One series per chart slot, in `pairs` order.
    pub history: Vec<Vec<PricePoint>>,
    pub pairs: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    /// Only populated in per-resource mode.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_errors: Vec<ResourceError>,
}

impl Snapshot {
    pub fn series(&self, slot: usize) -> &[PricePoint] {
        self.history.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn prices(&self, slot: usize) -> Vec<f64> {
        self.series(slot).iter().map(|p| p.price).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Health,
    Config,
    Logs,
    Alerts,
    History(usize),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Health => write!(f, "health"),
            Resource::Config => write!(f, "config"),
            Resource::Logs => write!(f, "logs"),
            Resource::Alerts => write!(f, "alerts"),
            Resource::History(slot) => write!(f, "history[{}]", slot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceError {
    pub resource: Resource,
    pub message: String,
}
