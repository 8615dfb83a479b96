//! The mounted card: owns the view state, the refresh timer and the command path.

pub mod store;

pub use store::*;

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, ViewState};
use crate::config::CardConfig;
use crate::dispatcher::{Command, Dispatcher};
use crate::error::{CardError, Result};
use crate::gateway::{Gateway, HttpGateway};
use crate::render::{self, Overlay, CARD_SIZE};
use crate::types::PairConfig;

pub struct Widget {
    config: CardConfig,
    aggregator: Aggregator,
    dispatcher: Dispatcher,
    store: StateStore,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Widget {
    /// Validates `config` and renders the empty card. No request is made until [`Widget::mount`].
    pub fn new(gateway: Arc<dyn Gateway>, config: CardConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|errors| CardError::Configuration(errors.join(", ")))?;

        let markup = render::project(&ViewState::Empty, &config)?;
        Ok(Self {
            aggregator: Aggregator::new(gateway.clone(), &config),
            dispatcher: Dispatcher::new(gateway, config.clone()),
            store: StateStore::new(markup, config.drop_stale_refreshes),
            config,
            timer: Mutex::new(None),
        })
    }

    /// Widget talking to the configured backend over HTTP.
    pub fn connect(config: CardConfig) -> Result<Self> {
        let gateway = HttpGateway::new(&config.backend_url);
        Self::new(Arc::new(gateway), config)
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn card_size(&self) -> u32 {
        CARD_SIZE
    }

    /// Starts the periodic refresh. The first tick fires immediately.
    /// Returns false if already mounted.
    pub fn mount(self: &Arc<Self>) -> bool {
        let mut timer = self.timer();
        if timer.is_some() {
            return false;
        }

        let period = Duration::from_secs(self.config.refresh_interval_secs);
        let widget = Arc::downgrade(self);
        *timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(widget) = widget.upgrade() else {
                    break;
                };
                if let Err(e) = widget.refresh().await {
                    warn!("Scheduled refresh failed: {}", e);
                }
            }
        }));

        info!(
            "Card mounted for {} (refresh every {}s)",
            self.config.backend_url, self.config.refresh_interval_secs
        );
        true
    }

    /// Cancels the refresh timer. Only the first call after a mount does anything.
    pub fn unmount(&self) -> bool {
        match self.timer().take() {
            Some(handle) => {
                handle.abort();
                info!("Card unmounted");
                true
            }
            None => false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.timer().is_some()
    }

    /// Runs one refresh cycle and installs its result.
    pub async fn refresh(&self) -> Result<Arc<ViewState>> {
        let seq = self.store.begin();
        let view = self.aggregator.refresh().await;
        let markup = render::project(&view, &self.config)?;

        if self.store.apply(seq, view, markup).await {
            debug!("Applied refresh #{}", seq);
        }
        Ok(self.store.view().await)
    }

    /// Sends `command` without refreshing afterwards.
    pub async fn execute(&self, command: &Command) -> Result<Value> {
        let view = self.store.view().await;
        self.dispatcher.execute(&view, command).await
    }

    /// Sends `command` and refreshes once it succeeded. A failed command leaves the view untouched.
    pub async fn dispatch(&self, command: &Command) -> Result<Value> {
        let response = self.execute(command).await?;
        self.refresh().await?;
        Ok(response)
    }

    pub async fn pair_configs(&self) -> Result<Vec<PairConfig>> {
        self.dispatcher.pair_configs().await
    }

    pub async fn view(&self) -> Arc<ViewState> {
        self.store.view().await
    }

    pub async fn markup(&self) -> Arc<String> {
        self.store.markup().await
    }

    pub async fn applied(&self) -> Applied {
        self.store.current().await
    }

    /// Current view projected with an overlay, without replacing the stored markup.
    pub async fn render_with(&self, overlay: Overlay<'_>) -> Result<String> {
        let view = self.store.view().await;
        render::project_with(&view, &self.config, overlay)
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Widget {
    fn drop(&mut self) {
        self.unmount();
    }
}
