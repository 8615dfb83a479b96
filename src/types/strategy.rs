use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MIN_PROFIT_PCT: f64 = 5.0;
pub const DEFAULT_HYSTERESIS_PCT: f64 = 1.0;
pub const DEFAULT_BUY_DRAWDOWN_PCT: f64 = 3.0;
pub const DEFAULT_MIN_TRADES_PER_HOUR: i64 = 100;
pub const DEFAULT_BASE_PACKAGE_USD: f64 = 50.0;
pub const DEFAULT_DOWNTREND_MULTIPLIER: f64 = 2.0;

/// Strategy parameters as exchanged with `GET /config` and `PUT /config`.
///
/// `None` is sent as JSON `null`, which the backend reads as "leave unchanged". This is also
/// the wire form of an unparsable numeric form field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub min_profit_pct: Option<f64>,
    pub hysteresis_pct: Option<f64>,
    pub buy_drawdown_pct: Option<f64>,
    pub min_trades_per_hour: Option<i64>,
    pub base_package_usd: Option<f64>,
    pub downtrend_multiplier: Option<f64>,
    pub buy_lookback: Option<String>,
}

/// Strategy parameters with every fallback applied, ready to fill form inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyValues {
    pub min_profit_pct: f64,
    pub hysteresis_pct: f64,
    pub buy_drawdown_pct: f64,
    pub min_trades_per_hour: i64,
    pub base_package_usd: f64,
    pub downtrend_multiplier: f64,
    pub buy_lookback: Lookback,
}

impl Default for StrategyValues {
    fn default() -> Self {
        StrategyConfig::default().with_fallbacks()
    }
}

impl StrategyConfig {
    pub fn with_fallbacks(&self) -> StrategyValues {
        fn finite_or(v: Option<f64>, fallback: f64) -> f64 {
            v.filter(|x| x.is_finite()).unwrap_or(fallback)
        }

        StrategyValues {
            min_profit_pct: finite_or(self.min_profit_pct, DEFAULT_MIN_PROFIT_PCT),
            hysteresis_pct: finite_or(self.hysteresis_pct, DEFAULT_HYSTERESIS_PCT),
            buy_drawdown_pct: finite_or(self.buy_drawdown_pct, DEFAULT_BUY_DRAWDOWN_PCT),
            min_trades_per_hour: self.min_trades_per_hour.unwrap_or(DEFAULT_MIN_TRADES_PER_HOUR),
            base_package_usd: finite_or(self.base_package_usd, DEFAULT_BASE_PACKAGE_USD),
            downtrend_multiplier: finite_or(self.downtrend_multiplier, DEFAULT_DOWNTREND_MULTIPLIER),
            buy_lookback: self
                .buy_lookback
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Window the backend uses to find the reference low before buying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lookback {
    #[default]
    Day,
    Week,
    Month,
}

impl Lookback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookback::Day => "day",
            Lookback::Week => "week",
            Lookback::Month => "month",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lookback::Day => "Day",
            Lookback::Week => "Week",
            Lookback::Month => "Month",
        }
    }

    pub fn all() -> [Lookback; 3] {
        [Lookback::Day, Lookback::Week, Lookback::Month]
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Lookback::Day),
            "week" => Ok(Lookback::Week),
            "month" => Ok(Lookback::Month),
            other => Err(format!("unknown lookback '{}', expected day, week or month", other)),
        }
    }
}
