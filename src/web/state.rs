use serde::Serialize;
use std::sync::Arc;

use crate::aggregator::ViewState;
use crate::widget::Widget;

/// Shared state of the card host.
#[derive(Clone)]
pub struct AppState {
    pub widget: Arc<Widget>,
}

impl AppState {
    pub fn new(widget: Arc<Widget>) -> Self {
        Self { widget }
    }
}

/// Body of `GET /state`.
#[derive(Debug, Serialize)]
pub struct StateResponse<'a> {
    pub seq: u64,
    pub card_size: u32,
    pub mounted: bool,
    pub view: &'a ViewState,
}
