use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

mod webhook;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/github/webhook", post(webhook::webhook))
}

async fn healthz() -> &'static str {
    "OK"
}
