use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CardError, Result};

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_BIND_PORT: u16 = 8099;
pub const DEFAULT_CONFIG_FILE: &str = "card.toml";
/// Only the first two pairs get a chart.
pub const CHART_SLOTS: usize = 2;

const ENV_PREFIX: &str = "CARD";

pub fn default_pairs() -> Vec<String> {
    vec!["BTCUSDC".to_string(), "ETHUSDC".to_string()]
}

/// How the card asks the backend to clear alerts. Backend versions differ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearAlertsMethod {
    #[default]
    Delete,
    Post,
}

/// What a refresh cycle does when one of its reads fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Any failed read turns the whole snapshot into an error.
    #[default]
    AllOrNothing,
    /// Keep what succeeded and record the failed resources on the snapshot.
    PerResource,
}

/// Card configuration, fixed at mount time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardConfig {
    pub backend_url: String,
    pub pairs: Vec<String>,
    pub refresh_interval_secs: u64,
    pub clear_alerts_method: ClearAlertsMethod,
    pub refresh_policy: RefreshPolicy,
    pub drop_stale_refreshes: bool,
    pub strict_forms: bool,
    pub bind_port: u16,
}

/// Shape of the layered sources before validation. Every field may be missing.
#[derive(Debug, Default, Deserialize)]
struct RawCardConfig {
    backend_url: Option<String>,
    pairs: Option<Vec<String>>,
    refresh_interval_secs: Option<u64>,
    clear_alerts_method: Option<ClearAlertsMethod>,
    refresh_policy: Option<RefreshPolicy>,
    drop_stale_refreshes: Option<bool>,
    strict_forms: Option<bool>,
    bind_port: Option<u16>,
}

/// Command line values that win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CardOverrides {
    pub backend_url: Option<String>,
    pub pairs: Option<Vec<String>>,
    pub bind_port: Option<u16>,
}

impl CardConfig {
    /// Builds a config with defaults for everything but the endpoint and pairs.
    pub fn new(backend_url: &str, pairs: Option<Vec<String>>) -> Result<Self> {
        Self::from_raw(RawCardConfig {
            backend_url: Some(backend_url.to_string()),
            pairs,
            ..RawCardConfig::default()
        })
    }

    /// Loads `path` (optional TOML file), then `CARD_*` environment variables, then `overrides`.
    pub fn load(path: &str, overrides: CardOverrides) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::new(path, ::config::FileFormat::Toml).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("pairs"),
            )
            .set_override_option("backend_url", overrides.backend_url)
            .and_then(|b| b.set_override_option("pairs", overrides.pairs))
            .and_then(|b| b.set_override_option("bind_port", overrides.bind_port.map(i64::from)))
            .and_then(|b| b.build())
            .map_err(|e| CardError::Configuration(e.to_string()))?;

        let raw: RawCardConfig = settings
            .try_deserialize()
            .map_err(|e| CardError::Configuration(e.to_string()))?;

        debug!("Loaded card configuration from {} and {}_* env", path, ENV_PREFIX);
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCardConfig) -> Result<Self> {
        let backend_url = raw
            .backend_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CardError::Configuration("Set backend_url in card config".to_string()))?;

        let config = Self {
            backend_url,
            pairs: raw
                .pairs
                .map(|pairs| {
                    pairs
                        .into_iter()
                        .map(|p| p.trim().to_uppercase())
                        .filter(|p| !p.is_empty())
                        .collect()
                })
                .unwrap_or_else(default_pairs),
            refresh_interval_secs: raw
                .refresh_interval_secs
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
            clear_alerts_method: raw.clear_alerts_method.unwrap_or_default(),
            refresh_policy: raw.refresh_policy.unwrap_or_default(),
            drop_stale_refreshes: raw.drop_stale_refreshes.unwrap_or(false),
            strict_forms: raw.strict_forms.unwrap_or(false),
            bind_port: raw.bind_port.unwrap_or(DEFAULT_BIND_PORT),
        };

        config.validate().map_err(|errors| CardError::Configuration(errors.join(", ")))?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match reqwest::Url::parse(&self.backend_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!("backend_url must be http(s), got {}", url.scheme())),
            Err(e) => errors.push(format!("backend_url is not a valid URL: {}", e)),
        }
        if self.pairs.len() < CHART_SLOTS {
            errors.push(format!(
                "pairs must list at least {} symbols, got {}",
                CHART_SLOTS,
                self.pairs.len()
            ));
        }
        // Pairs are sent unescaped in history query strings.
        for pair in &self.pairs {
            if !pair.chars().all(|c| c.is_ascii_alphanumeric()) {
                errors.push(format!("pair {:?} must be alphanumeric", pair));
            }
        }
        if self.refresh_interval_secs == 0 {
            errors.push("refresh_interval_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CardError::Configuration(e.to_string()))
    }
}
