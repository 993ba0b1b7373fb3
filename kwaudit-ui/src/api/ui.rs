//! HTML entry point

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::AppState;

const INDEX_HTML: &str = include_str!("../../ui/index.html");

/// GET /
pub async fn root_page() -> impl IntoResponse {
    let footer = format!(
        "kwaudit v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    Html(INDEX_HTML.replace("{{BUILD_INFO}}", &footer))
}

pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(root_page))
}
