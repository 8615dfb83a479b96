use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::aggregator::ViewState;

/// The applied view and its markup, always replaced together.
#[derive(Debug, Clone)]
pub struct Applied {
    /// Sequence number of the refresh that produced this view. 0 is the initial empty view.
    pub seq: u64,
    pub view: Arc<ViewState>,
    pub markup: Arc<String>,
}

/// Owner of the current [`ViewState`]. Replacement is whole-value only.
pub struct StateStore {
    next_seq: AtomicU64,
    current: RwLock<Applied>,
    drop_stale: bool,
}

impl StateStore {
    pub fn new(markup: String, drop_stale: bool) -> Self {
        Self {
            next_seq: AtomicU64::new(0),
            current: RwLock::new(Applied {
                seq: 0,
                view: Arc::new(ViewState::Empty),
                markup: Arc::new(markup),
            }),
            drop_stale,
        }
    }

    /// Takes the sequence number for a refresh about to fan out.
    pub fn begin(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Installs the result of refresh `seq`. Returns false if it was discarded as stale,
    /// which only happens when stale dropping is on and a newer refresh already landed.
    pub async fn apply(&self, seq: u64, view: ViewState, markup: String) -> bool {
        let mut current = self.current.write().await;
        if self.drop_stale && seq < current.seq {
            debug!("Dropping refresh #{} (#{} already applied)", seq, current.seq);
            return false;
        }
        *current = Applied {
            seq,
            view: Arc::new(view),
            markup: Arc::new(markup),
        };
        true
    }

    pub async fn current(&self) -> Applied {
        self.current.read().await.clone()
    }

    pub async fn view(&self) -> Arc<ViewState> {
        self.current.read().await.view.clone()
    }

    pub async fn markup(&self) -> Arc<String> {
        self.current.read().await.markup.clone()
    }
}
