use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use tracing::{error, warn};

use crate::error::CardError;
use crate::render::{CardForm, ControlAction, Overlay};
use super::{AppState, StateResponse};

pub async fn get_card(State(state): State<AppState>) -> impl IntoResponse {
    let markup = state.widget.markup().await;
    Html(markup.as_str().to_owned())
}

pub async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let applied = state.widget.applied().await;
    Json(StateResponse {
        seq: applied.seq,
        card_size: state.widget.card_size(),
        mounted: state.widget.is_mounted(),
        view: &applied.view,
    })
    .into_response()
}

/// Runs the control's action, then redirects back to the card. A failed action renders the
/// card in place with the error and the operator's submitted values.
pub async fn post_control(
    State(state): State<AppState>,
    action: ControlAction,
    Form(form): Form<CardForm>,
) -> Response {
    let result = match form.command(action) {
        Some(command) => state.widget.dispatch(&command).await.map(|_| ()),
        None => state.widget.refresh().await.map(|_| ()),
    };

    let err = match result {
        Ok(()) => return Redirect::to("/").into_response(),
        Err(e) => e,
    };

    warn!("Card action {:?} failed: {}", action, err);
    let notice = err.to_string();
    let overlay = Overlay {
        notice: Some(&notice),
        form: Some(&form),
    };
    match state.widget.render_with(overlay).await {
        Ok(markup) => (status_for(&err), Html(markup)).into_response(),
        Err(e) => {
            error!("Failed to render card: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn status_for(err: &CardError) -> StatusCode {
    match err {
        CardError::Network(_) | CardError::Backend { .. } | CardError::Decode(_) => {
            StatusCode::BAD_GATEWAY
        }
        CardError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CardError::Configuration(_) | CardError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
