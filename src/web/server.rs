use axum::{
    extract::State,
    routing::{get, post},
    Form, Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::render::{CardForm, CONTROLS};
use super::{api, AppState};

/// Card page, state JSON and one form route per bound control.
pub fn card_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(api::get_card))
        .route("/state", get(api::get_state));

    for control in CONTROLS.iter() {
        let action = control.action;
        router = router.route(
            &control.route(),
            post(move |state: State<AppState>, form: Form<CardForm>| {
                api::post_control(state, action, form)
            }),
        );
    }

    router.layer(cors).with_state(state)
}

pub async fn start_card_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = card_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Card server starting on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Card server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardConfig;
    use crate::gateway::testing::FakeBackend;
    use crate::widget::Widget;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(backend: &Arc<FakeBackend>) -> (Router, Arc<Widget>) {
        let config = CardConfig::new("http://bot.local", None).unwrap();
        let widget = Arc::new(Widget::new(backend.clone(), config).unwrap());
        (card_router(AppState::new(widget.clone())), widget)
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_get_card_serves_markup() {
        let backend = Arc::new(FakeBackend::new());
        let (app, widget) = app(&backend);
        widget.refresh().await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(">running<"));
        assert!(html.contains(r#"formaction="/card/savecfg""#));
    }

    #[tokio::test]
    async fn test_get_state_returns_view_json() {
        let backend = Arc::new(FakeBackend::new());
        let (app, widget) = app(&backend);
        widget.refresh().await.unwrap();

        let response = app
            .oneshot(Request::builder().uri("/state").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let state: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(state["seq"], 1);
        assert_eq!(state["card_size"], 8);
        assert_eq!(state["view"]["kind"], "ready");
        assert_eq!(state["view"]["health"]["running"], true);
    }

    #[tokio::test]
    async fn test_control_post_dispatches_and_redirects() {
        let backend = Arc::new(FakeBackend::new());
        let (app, widget) = app(&backend);
        widget.refresh().await.unwrap();

        let response = app.oneshot(form_post("/card/stop", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(widget.markup().await.contains(">stopped<"));
    }

    #[tokio::test]
    async fn test_buy_form_sends_selected_pair_and_default_amount() {
        let backend = Arc::new(FakeBackend::new());
        let (app, _widget) = app(&backend);

        let response = app
            .oneshot(form_post("/card/buy", "pair=ETHUSDC&amount="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let buy = backend.mutations().into_iter().next().unwrap();
        assert_eq!(buy.path, "/order/buy");
        assert_eq!(
            buy.body,
            Some(serde_json::json!({ "pair": "ETHUSDC", "quote_amount_usd": 50.0 }))
        );
    }

    #[tokio::test]
    async fn test_failed_action_renders_error_with_edits() {
        let backend = Arc::new(FakeBackend::new());
        let (app, widget) = app(&backend);
        widget.refresh().await.unwrap();
        backend.fail("/config", 422, "invalid downtrend_multiplier");

        let response = app
            .oneshot(form_post("/card/savecfg", "multiplier=-1&min_profit=4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let html = body_text(response).await;
        assert!(html.contains("invalid downtrend_multiplier"));
        assert!(html.contains(r#"name="multiplier" value="-1""#));
        assert_eq!(widget.applied().await.seq, 1);
    }

    #[tokio::test]
    async fn test_refresh_control() {
        let backend = Arc::new(FakeBackend::new());
        let (app, widget) = app(&backend);

        let response = app.oneshot(form_post("/card/refresh", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(widget.view().await.snapshot().is_some());
        assert!(backend.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_unbound_control_is_not_found() {
        let backend = Arc::new(FakeBackend::new());
        let (app, _widget) = app(&backend);

        let response = app.oneshot(form_post("/card/pause", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
