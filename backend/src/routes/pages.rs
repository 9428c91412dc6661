//! Page mount points
//!
//! The web client is rendered elsewhere; these handlers only give the
//! guarded page paths something to resolve to. The access guard middleware
//! decides redirects before any of them run.

use crate::state::AppState;
use axum::{response::Html, routing::get, Router};

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(page_stub))
        .route("/sign-up", get(page_stub))
        .route("/sign-in", get(page_stub))
        .route("/verify/:username", get(page_stub))
        .route("/dashboard", get(page_stub))
        .route("/dashboard/*section", get(page_stub))
}

async fn page_stub() -> Html<&'static str> {
    Html("<!doctype html><title>Whisperbox</title><div id=\"app\"></div>")
}
