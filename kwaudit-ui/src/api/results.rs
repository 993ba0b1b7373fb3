//! Result table: listing, view state, detail and CSV export

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use kwaudit_common::attribution::attribute;
use kwaudit_common::db;
use kwaudit_common::highlight::{keyword_segments, locate_all, LocatedEvidence, TextSegment};
use kwaudit_common::results::{ResultView, SortField};
use serde::Serialize;
use tracing::info;

use crate::workspace::ResultRow;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct KeywordSource {
    pub keyword: String,
    pub sections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultDetail<'a> {
    #[serde(flatten)]
    pub row: ResultRow<'a>,
    /// Where each matched keyword was found
    pub sources: Vec<KeywordSource>,
    /// Backend evidence spans resolved against `original_text`
    pub evidence: Vec<LocatedEvidence>,
    /// `original_text` split on matched keywords
    pub segments: Vec<TextSegment>,
}

async fn current_page(state: &AppState) -> Response {
    let workspace = state.workspace.read().await;
    Json(workspace.page()).into_response()
}

/// GET /api/results
pub async fn list_results(State(state): State<AppState>) -> Response {
    current_page(&state).await
}

/// DELETE /api/results
///
/// "New audit": drops results, view state and any pending CSV upload
pub async fn clear_results(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.workspace.write().await.clear();
    db::clear_result_ids(&state.db).await?;
    info!("Cleared audit results");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/results/:id
pub async fn get_result(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let workspace = state.workspace.read().await;
    let result = workspace
        .find(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Result {}", id)))?;

    let sources = result
        .keywords_matched
        .iter()
        .map(|keyword| KeywordSource {
            keyword: keyword.clone(),
            sections: attribute(result, keyword),
        })
        .collect();

    let detail = ResultDetail {
        row: ResultRow::new(result),
        sources,
        evidence: locate_all(&result.original_text, &result.highlighted_sections),
        segments: keyword_segments(&result.original_text, &result.keywords_matched),
    };
    Ok(Json(detail).into_response())
}

/// PUT /api/results/view
pub async fn set_view(State(state): State<AppState>, Json(view): Json<ResultView>) -> Response {
    state.workspace.write().await.set_view(view);
    current_page(&state).await
}

/// POST /api/results/sort/:field
pub async fn toggle_sort(State(state): State<AppState>, Path(field): Path<String>) -> ApiResult<Response> {
    let field = SortField::parse(&field)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort field: {}", field)))?;
    state.workspace.write().await.toggle_sort(field);
    Ok(current_page(&state).await)
}

/// GET /api/results/export
pub async fn export_results(State(state): State<AppState>) -> ApiResult<Response> {
    let export = state.workspace.read().await.export(&state.links)?;
    info!("Exported {} as {:?}", export.file_name, export.shape);

    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    )
        .into_response())
}

pub fn result_routes() -> Router<AppState> {
    Router::new()
        .route("/api/results", get(list_results).delete(clear_results))
        .route("/api/results/view", put(set_view))
        .route("/api/results/sort/:field", post(toggle_sort))
        .route("/api/results/export", get(export_results))
        .route("/api/results/:id", get(get_result))
}
