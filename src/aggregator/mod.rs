//! Refresh cycle: six concurrent reads merged into one [`ViewState`].

pub mod view_state;

pub use view_state::*;

use chrono::Utc;
use futures::TryFutureExt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{CardConfig, RefreshPolicy, CHART_SLOTS};
use crate::error::{CardError, Result};
use crate::gateway::{get_as, paths, Gateway};
use crate::types::{
    AlertEntry, Health, HistoryResponse, LogEntry, LogsResponse, PricePoint, StrategyConfig,
};

pub const LOG_LIMIT: usize = 50;
pub const ALERT_LIMIT: usize = 50;
pub const HISTORY_LIMIT: usize = 100;

pub struct Aggregator {
    gateway: Arc<dyn Gateway>,
    pairs: Vec<String>,
    policy: RefreshPolicy,
}

impl Aggregator {
    pub fn new(gateway: Arc<dyn Gateway>, config: &CardConfig) -> Self {
        Self {
            gateway,
            pairs: config.pairs.clone(),
            policy: config.refresh_policy,
        }
    }

    /// Runs one refresh cycle. Never fails: a failed cycle is itself a [`ViewState`].
    pub async fn refresh(&self) -> ViewState {
        match self.policy {
            RefreshPolicy::AllOrNothing => self.refresh_all_or_nothing().await,
            RefreshPolicy::PerResource => self.refresh_per_resource().await,
        }
    }

    async fn refresh_all_or_nothing(&self) -> ViewState {
        let joined = futures::try_join!(
            self.fetch_health().map_err(tag(Resource::Health)),
            self.fetch_config().map_err(tag(Resource::Config)),
            self.fetch_logs().map_err(tag(Resource::Logs)),
            self.fetch_alerts().map_err(tag(Resource::Alerts)),
            self.fetch_history(0).map_err(tag(Resource::History(0))),
            self.fetch_history(1).map_err(tag(Resource::History(1))),
        );

        match joined {
            Ok((health, config, logs, alerts, first, second)) => {
                debug!(
                    "Refresh complete: running={}, {} logs, {} alerts, {}/{} history points",
                    health.running,
                    logs.len(),
                    alerts.len(),
                    first.len(),
                    second.len()
                );
                ViewState::Ready(Snapshot {
                    health: Some(health),
                    config: Some(config),
                    logs,
                    alerts,
                    history: vec![first, second],
                    pairs: self.pairs.clone(),
                    fetched_at: Utc::now(),
                    resource_errors: Vec::new(),
                })
            }
            Err((resource, e)) => {
                warn!("Refresh failed on {}: {}", resource, e);
                ViewState::Failed {
                    error: format!("{}: {}", resource, e),
                    at: Utc::now(),
                }
            }
        }
    }

    async fn refresh_per_resource(&self) -> ViewState {
        let (health, config, logs, alerts, first, second) = futures::join!(
            self.fetch_health(),
            self.fetch_config(),
            self.fetch_logs(),
            self.fetch_alerts(),
            self.fetch_history(0),
            self.fetch_history(1),
        );

        let mut errors = Vec::new();
        let mut keep = |resource: Resource, e: CardError| {
            warn!("Refresh of {} failed: {}", resource, e);
            errors.push(ResourceError {
                resource,
                message: e.to_string(),
            });
        };

        let health = health.map_err(|e| keep(Resource::Health, e)).ok();
        let config = config.map_err(|e| keep(Resource::Config, e)).ok();
        let logs = logs.map_err(|e| keep(Resource::Logs, e)).unwrap_or_default();
        let alerts = alerts.map_err(|e| keep(Resource::Alerts, e)).unwrap_or_default();
        let first = first.map_err(|e| keep(Resource::History(0), e)).unwrap_or_default();
        let second = second.map_err(|e| keep(Resource::History(1), e)).unwrap_or_default();

        ViewState::Ready(Snapshot {
            health,
            config,
            logs,
            alerts,
            history: vec![first, second],
            pairs: self.pairs.clone(),
            fetched_at: Utc::now(),
            resource_errors: errors,
        })
    }

    async fn fetch_health(&self) -> Result<Health> {
        get_as(self.gateway.as_ref(), paths::HEALTH).await
    }

    async fn fetch_config(&self) -> Result<StrategyConfig> {
        get_as(self.gateway.as_ref(), paths::CONFIG).await
    }

    async fn fetch_logs(&self) -> Result<Vec<LogEntry>> {
        let resp: LogsResponse = get_as(self.gateway.as_ref(), &paths::logs(LOG_LIMIT)).await?;
        let mut entries = resp.into_entries();
        entries.truncate(LOG_LIMIT);
        Ok(entries)
    }

    async fn fetch_alerts(&self) -> Result<Vec<AlertEntry>> {
        let mut alerts: Vec<AlertEntry> =
            get_as(self.gateway.as_ref(), &paths::alerts(ALERT_LIMIT)).await?;
        alerts.truncate(ALERT_LIMIT);
        Ok(alerts)
    }

    /// Series for chart `slot`. A slot without a configured pair is an empty series.
    async fn fetch_history(&self, slot: usize) -> Result<Vec<PricePoint>> {
        debug_assert!(slot < CHART_SLOTS);
        let Some(pair) = self.pairs.get(slot) else {
            return Ok(Vec::new());
        };
        let resp: HistoryResponse =
            get_as(self.gateway.as_ref(), &paths::history(pair, HISTORY_LIMIT)).await?;
        Ok(resp.points)
    }
}

fn tag(resource: Resource) -> impl FnOnce(CardError) -> (Resource, CardError) {
    move |e| (resource, e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::FakeBackend;
    use serde_json::json;

    fn aggregator(backend: &Arc<FakeBackend>, policy: RefreshPolicy) -> Aggregator {
        let mut config = CardConfig::new("http://bot.local", None).unwrap();
        config.refresh_policy = policy;
        Aggregator::new(backend.clone(), &config)
    }

    #[tokio::test]
    async fn test_refresh_merges_all_six_reads() {
        let backend = Arc::new(FakeBackend::new());
        let view = aggregator(&backend, RefreshPolicy::AllOrNothing).refresh().await;

        let snapshot = view.snapshot().expect("ready snapshot");
        assert!(snapshot.health.as_ref().unwrap().running);
        assert_eq!(snapshot.config.as_ref().unwrap().min_trades_per_hour, Some(100));
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.alerts.len(), 1);
        assert_eq!(snapshot.series(0).len(), 3);
        assert_eq!(snapshot.series(1).len(), 2);
        assert_eq!(snapshot.pairs, vec!["BTCUSDC", "ETHUSDC"]);

        let mut paths: Vec<String> = backend.calls().into_iter().map(|c| c.path).collect();
        paths.sort();
        assert_eq!(
            paths,
            vec![
                "/alerts?limit=50",
                "/config",
                "/health",
                "/logs?limit=50",
                "/market/history?pair=BTCUSDC&limit=100",
                "/market/history?pair=ETHUSDC&limit=100",
            ]
        );
    }

    #[tokio::test]
    async fn test_any_failed_read_fails_the_whole_cycle() {
        let backend = Arc::new(FakeBackend::new());
        let aggregator = aggregator(&backend, RefreshPolicy::AllOrNothing);
        assert!(aggregator.refresh().await.snapshot().is_some());

        backend.fail("/alerts", 500, "database is locked");
        let view = aggregator.refresh().await;

        assert!(view.snapshot().is_none());
        assert!(view.health().is_none());
        assert!(view.config().is_none());
        let error = view.error().unwrap();
        assert!(error.starts_with("alerts: "));
        assert!(error.contains("database is locked"));

        backend.heal("/alerts");
        backend.set_running(false);
        let view = aggregator.refresh().await;
        assert!(view.error().is_none());
        assert!(!view.health().unwrap().running);
    }

    #[tokio::test]
    async fn test_history_without_points_defaults_to_empty() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_history("ETHUSDC", json!({}));

        let view = aggregator(&backend, RefreshPolicy::AllOrNothing).refresh().await;
        let snapshot = view.snapshot().unwrap();
        assert_eq!(snapshot.series(0).len(), 3);
        assert!(snapshot.series(1).is_empty());
    }

    #[tokio::test]
    async fn test_pairs_order_maps_history_slots() {
        let backend = Arc::new(FakeBackend::new());
        let config = CardConfig::new(
            "http://bot.local",
            Some(vec!["ETHUSDC".to_string(), "BTCUSDC".to_string(), "SOLUSDC".to_string()]),
        )
        .unwrap();

        let view = Aggregator::new(backend.clone(), &config).refresh().await;
        let snapshot = view.snapshot().unwrap();
        assert_eq!(snapshot.prices(0), vec![3100.0, 3120.5]);
        assert_eq!(snapshot.series(1).len(), 3);
        assert_eq!(snapshot.history.len(), CHART_SLOTS);
        assert!(!backend.calls().iter().any(|c| c.path.contains("SOLUSDC")));
    }

    #[tokio::test]
    async fn test_logs_are_capped() {
        let backend = Arc::new(FakeBackend::new());
        let many: Vec<_> = (0..80)
            .map(|i| json!({ "ts": format!("t{}", i), "level": "INFO", "message": "tick" }))
            .collect();
        backend.set_logs(json!({ "items": many }));

        let view = aggregator(&backend, RefreshPolicy::AllOrNothing).refresh().await;
        assert_eq!(view.snapshot().unwrap().logs.len(), LOG_LIMIT);
    }

    #[tokio::test]
    async fn test_per_resource_policy_keeps_successful_reads() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail("/config", 503, "config store offline");

        let view = aggregator(&backend, RefreshPolicy::PerResource).refresh().await;
        let snapshot = view.snapshot().expect("partial snapshot");
        assert!(snapshot.config.is_none());
        assert!(snapshot.health.is_some());
        assert_eq!(snapshot.logs.len(), 1);
        assert_eq!(snapshot.resource_errors.len(), 1);
        assert_eq!(snapshot.resource_errors[0].resource, Resource::Config);
        assert!(snapshot.resource_errors[0].message.contains("config store offline"));
    }
}
