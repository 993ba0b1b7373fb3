//! Saved keyword presets

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use kwaudit_common::db::{self, KeywordSet};
use serde::Deserialize;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SaveKeywordSet {
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// GET /api/keyword-sets
pub async fn list_sets(State(state): State<AppState>) -> ApiResult<Json<Vec<KeywordSet>>> {
    Ok(Json(db::list_keyword_sets(&state.db).await?))
}

/// GET /api/keyword-sets/:name
pub async fn get_set(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Json<KeywordSet>> {
    db::get_keyword_set(&state.db, &name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Keyword set '{}'", name)))
}

/// PUT /api/keyword-sets/:name
///
/// Saving under an existing name overwrites it
pub async fn save_set(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<SaveKeywordSet>,
) -> ApiResult<Json<KeywordSet>> {
    Ok(Json(db::save_keyword_set(&state.db, &name, &body.keywords).await?))
}

/// DELETE /api/keyword-sets/:name
pub async fn delete_set(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<StatusCode> {
    if db::delete_keyword_set(&state.db, &name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Keyword set '{}'", name)))
    }
}

pub fn keyword_set_routes() -> Router<AppState> {
    Router::new()
        .route("/api/keyword-sets", get(list_sets))
        .route(
            "/api/keyword-sets/:name",
            get(get_set).put(save_set).delete(delete_set),
        )
}
