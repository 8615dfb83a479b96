//! Deterministic projection of a [`ViewState`] into card markup.

pub mod bind;

pub use bind::*;

use askama::Template;
use chrono::{DateTime, NaiveDateTime};

use crate::aggregator::{Snapshot, ViewState};
use crate::config::{CardConfig, CHART_SLOTS};
use crate::dispatcher::ConfigForm;
use crate::error::Result;
use crate::sparkline::sparkline;
use crate::types::Lookback;

/// Grid rows the card asks the host for.
pub const CARD_SIZE: u32 = 8;

/// Transient additions to a projection: an action error and the operator's unsaved edits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlay<'a> {
    pub notice: Option<&'a str>,
    pub form: Option<&'a CardForm>,
}

#[derive(Debug, Clone, PartialEq)]
struct ChartView {
    pair: String,
    path: String,
    last: String,
}

#[derive(Debug, Clone, PartialEq)]
struct OptionView {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct RowView {
    time: String,
    pair: String,
    text: String,
    pnl: String,
    class: &'static str,
}

#[derive(Template)]
#[template(path = "card.html")]
struct CardTemplate<'a> {
    card_size: u32,
    status: &'static str,
    autotrade: bool,
    updated: String,
    notice: Option<&'a str>,
    error: Option<&'a str>,
    resource_errors: Vec<String>,
    charts: Vec<ChartView>,
    pairs: Vec<OptionView>,
    amount: String,
    form: ConfigForm,
    lookbacks: Vec<OptionView>,
    logs: Vec<RowView>,
    alerts: Vec<RowView>,
    trading: Vec<&'static Control>,
    orders: Vec<&'static Control>,
    config_controls: Vec<&'static Control>,
    alert_controls: Vec<&'static Control>,
}

pub fn project(view: &ViewState, config: &CardConfig) -> Result<String> {
    project_with(view, config, Overlay::default())
}

/// Same input, same markup. Nothing here reads the clock or any state besides the arguments.
pub fn project_with(view: &ViewState, config: &CardConfig, overlay: Overlay<'_>) -> Result<String> {
    let snapshot = view.snapshot();
    let pairs = view.pairs().unwrap_or(&config.pairs);
    let edits = overlay.form;

    let strategy = view.config().cloned().unwrap_or_default();
    let values = strategy.with_fallbacks();
    let form = match edits {
        Some(edits) => merge_edits(ConfigForm::from_values(&values), edits),
        None => ConfigForm::from_values(&values),
    };

    let selected_pair = edits
        .and_then(|e| e.pair.as_deref())
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .or_else(|| pairs.first().cloned())
        .unwrap_or_default();

    let selected_lookback: Lookback = form.lookback.parse().unwrap_or_default();

    let template = CardTemplate {
        card_size: CARD_SIZE,
        status: status_text(view),
        autotrade: match edits {
            Some(edits) => edits.autotrade(),
            None => view.health().map(|h| h.autotrade).unwrap_or(false),
        },
        updated: updated_text(view),
        notice: overlay.notice,
        error: view.error(),
        resource_errors: snapshot
            .map(|s| {
                s.resource_errors
                    .iter()
                    .map(|e| format!("{}: {}", e.resource, e.message))
                    .collect()
            })
            .unwrap_or_default(),
        charts: charts(snapshot, pairs),
        pairs: pairs
            .iter()
            .map(|p| OptionView {
                value: p.clone(),
                label: p.clone(),
                selected: *p == selected_pair,
            })
            .collect(),
        amount: edits
            .and_then(|e| e.amount.clone())
            .unwrap_or_else(|| values.base_package_usd.to_string()),
        form,
        lookbacks: Lookback::all()
            .iter()
            .map(|l| OptionView {
                value: l.as_str().to_string(),
                label: l.label().to_string(),
                selected: *l == selected_lookback,
            })
            .collect(),
        logs: snapshot.map(log_rows).unwrap_or_default(),
        alerts: snapshot.map(alert_rows).unwrap_or_default(),
        trading: controls_in(Section::Trading),
        orders: controls_in(Section::Orders),
        config_controls: controls_in(Section::Config),
        alert_controls: controls_in(Section::Alerts),
    };

    Ok(template.render()?)
}

/// `running`, `stopped`, or `-` before the first successful health read.
pub fn status_text(view: &ViewState) -> &'static str {
    match view.health() {
        Some(health) if health.running => "running",
        Some(_) => "stopped",
        None => "-",
    }
}

/// Plain text rendition of the card for the terminal.
pub fn summary(view: &ViewState, config: &CardConfig) -> String {
    let mut lines = vec![format!("status:    {}", status_text(view))];

    match view {
        ViewState::Empty => lines.push("no data yet".to_string()),
        ViewState::Failed { error, .. } => lines.push(format!("error:     {}", error)),
        ViewState::Ready(snapshot) => {
            if let Some(health) = &snapshot.health {
                lines.push(format!("autotrade: {}", health.autotrade));
            }
            for chart in charts(Some(snapshot), &snapshot.pairs) {
                lines.push(format!("{:<10} {}", chart.pair, chart.last));
            }
            let values = snapshot.config.clone().unwrap_or_default().with_fallbacks();
            lines.push(format!(
                "config:    min_profit {}% hysteresis {}% drawdown {}% min_trades {} package ${} multiplier {} lookback {}",
                values.min_profit_pct,
                values.hysteresis_pct,
                values.buy_drawdown_pct,
                values.min_trades_per_hour,
                values.base_package_usd,
                values.downtrend_multiplier,
                values.buy_lookback
            ));
            lines.push(format!(
                "logs:      {} entries, alerts: {}",
                snapshot.logs.len(),
                snapshot.alerts.len()
            ));
            for alert in alert_rows(snapshot) {
                lines.push(format!("  {} {} {} {}", alert.time, alert.pair, alert.text, alert.pnl));
            }
            for error in &snapshot.resource_errors {
                lines.push(format!("failed:    {}: {}", error.resource, error.message));
            }
        }
    }

    lines.push(format!("backend:   {}", config.backend_url));
    lines.join("\n")
}

fn merge_edits(mut form: ConfigForm, edits: &CardForm) -> ConfigForm {
    let overlay = |target: &mut String, edit: &Option<String>| {
        if let Some(value) = edit {
            *target = value.clone();
        }
    };
    overlay(&mut form.min_profit, &edits.min_profit);
    overlay(&mut form.hysteresis, &edits.hysteresis);
    overlay(&mut form.drawdown, &edits.drawdown);
    overlay(&mut form.min_trades, &edits.min_trades);
    overlay(&mut form.base_package, &edits.base_package);
    overlay(&mut form.multiplier, &edits.multiplier);
    overlay(&mut form.lookback, &edits.lookback);
    form
}

fn updated_text(view: &ViewState) -> String {
    match view {
        ViewState::Empty => "-".to_string(),
        ViewState::Ready(snapshot) => snapshot.fetched_at.format("%H:%M:%S UTC").to_string(),
        ViewState::Failed { at, .. } => at.format("%H:%M:%S UTC").to_string(),
    }
}

fn charts(snapshot: Option<&Snapshot>, pairs: &[String]) -> Vec<ChartView> {
    pairs
        .iter()
        .take(CHART_SLOTS)
        .enumerate()
        .map(|(slot, pair)| {
            let prices = snapshot.map(|s| s.prices(slot)).unwrap_or_default();
            ChartView {
                pair: pair.clone(),
                path: sparkline(&prices).path_data(),
                last: prices
                    .iter()
                    .rev()
                    .find(|p| p.is_finite())
                    .map(|p| format!("{:.2}", p))
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect()
}

fn log_rows(snapshot: &Snapshot) -> Vec<RowView> {
    snapshot
        .logs
        .iter()
        .map(|log| {
            let text = match (&log.level, &log.message) {
                (Some(level), Some(message)) => format!("[{}] {}", level, message),
                (None, Some(message)) => message.clone(),
                (Some(level), None) => format!("[{}]", level),
                (None, None) => String::new(),
            };
            RowView {
                time: short_time(log.ts.as_deref()),
                pair: log.pair.clone().unwrap_or_default(),
                text,
                pnl: format_pnl(log.pnl_usd, log.pnl_percent),
                class: pnl_class(log.pnl_usd.or(log.pnl_percent)),
            }
        })
        .collect()
}

fn alert_rows(snapshot: &Snapshot) -> Vec<RowView> {
    snapshot
        .alerts
        .iter()
        .map(|alert| RowView {
            time: short_time(alert.ts.as_deref()),
            pair: alert.pair.clone().unwrap_or_default(),
            text: alert.kind.clone().unwrap_or_default(),
            pnl: format_pnl(alert.pnl_usd, alert.pnl_percent),
            class: match alert.kind.as_deref() {
                Some("positive") => "positive",
                Some("negative") => "negative",
                _ => pnl_class(alert.pnl_usd.or(alert.pnl_percent)),
            },
        })
        .collect()
}

fn short_time(ts: Option<&str>) -> String {
    let Some(ts) = ts else {
        return String::new();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.format("%H:%M:%S").to_string();
    }
    match NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => dt.format("%H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}

fn format_pnl(usd: Option<f64>, percent: Option<f64>) -> String {
    match (usd, percent) {
        (Some(usd), Some(percent)) => format!("{:+.2} USD ({:+.2}%)", usd, percent),
        (Some(usd), None) => format!("{:+.2} USD", usd),
        (None, Some(percent)) => format!("{:+.2}%", percent),
        (None, None) => String::new(),
    }
}

fn pnl_class(value: Option<f64>) -> &'static str {
    match value {
        Some(v) if v > 0.0 => "positive",
        Some(v) if v < 0.0 => "negative",
        _ => "neutral",
    }
}
