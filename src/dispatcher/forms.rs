use serde::{Deserialize, Serialize};

use crate::error::{CardError, Result};
use crate::types::{Lookback, StrategyConfig, StrategyValues};

pub const DEFAULT_QUOTE_AMOUNT_USD: f64 = 50.0;

/// Raw strategy inputs as typed by the operator. Field names match the card's input names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigForm {
    pub min_profit: String,
    pub hysteresis: String,
    pub drawdown: String,
    pub min_trades: String,
    pub base_package: String,
    pub multiplier: String,
    pub lookback: String,
}

impl ConfigForm {
    /// Form prefilled the way the card renders it.
    pub fn from_values(values: &StrategyValues) -> Self {
        Self {
            min_profit: values.min_profit_pct.to_string(),
            hysteresis: values.hysteresis_pct.to_string(),
            drawdown: values.buy_drawdown_pct.to_string(),
            min_trades: values.min_trades_per_hour.to_string(),
            base_package: values.base_package_usd.to_string(),
            multiplier: values.downtrend_multiplier.to_string(),
            lookback: values.buy_lookback.as_str().to_string(),
        }
    }

    /// Coerces every field into the config payload.
    ///
    /// Lenient mode sends unparsable numbers as `null`. Strict mode rejects them.
    pub fn parse(&self, strict: bool) -> Result<StrategyConfig> {
        let float = |name: &str, raw: &str| -> Result<Option<f64>> {
            match parse_float(raw) {
                Some(v) => Ok(Some(v)),
                None if strict => Err(CardError::InvalidInput(format!(
                    "{} must be a number, got '{}'",
                    name, raw
                ))),
                None => Ok(None),
            }
        };

        let min_trades_per_hour = match parse_int(&self.min_trades) {
            Some(v) => Some(v),
            None if strict => {
                return Err(CardError::InvalidInput(format!(
                    "min_trades_per_hour must be an integer, got '{}'",
                    self.min_trades
                )))
            }
            None => None,
        };

        let lookback = self.lookback.trim();
        let buy_lookback = if strict {
            Some(lookback.parse::<Lookback>().map_err(CardError::InvalidInput)?.as_str().to_string())
        } else if lookback.is_empty() {
            None
        } else {
            Some(lookback.to_string())
        };

        Ok(StrategyConfig {
            min_profit_pct: float("min_profit_pct", &self.min_profit)?,
            hysteresis_pct: float("hysteresis_pct", &self.hysteresis)?,
            buy_drawdown_pct: float("buy_drawdown_pct", &self.drawdown)?,
            min_trades_per_hour,
            base_package_usd: float("base_package_usd", &self.base_package)?,
            downtrend_multiplier: float("downtrend_multiplier", &self.multiplier)?,
            buy_lookback,
        })
    }
}

/// Finite float or nothing.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer, truncating a decimal input (`"12.7"` is 12).
pub fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        parse_float(raw)
            .filter(|v| v.abs() < i64::MAX as f64)
            .map(|v| v.trunc() as i64)
    })
}

/// Buy amount: zero, blank or unparsable input falls back to the default package.
pub fn quote_amount(raw: Option<&str>, strict: bool) -> Result<f64> {
    let raw = raw.unwrap_or("").trim();
    match parse_float(raw) {
        Some(v) if v != 0.0 => {
            if strict && v < 0.0 {
                return Err(CardError::InvalidInput(format!(
                    "quote_amount_usd must be positive, got {}",
                    v
                )));
            }
            Ok(v)
        }
        None if strict && !raw.is_empty() => Err(CardError::InvalidInput(format!(
            "quote_amount_usd must be a number, got '{}'",
            raw
        ))),
        _ => Ok(DEFAULT_QUOTE_AMOUNT_USD),
    }
}
