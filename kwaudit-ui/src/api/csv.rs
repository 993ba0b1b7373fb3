//! CSV upload preview
//!
//! The raw file is the request body. Parsed rows are kept in the workspace
//! until an audit with `csv: true` submits them.

use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use kwaudit_common::csv_rows::{check_file_name, parse_csv};
use serde::Deserialize;

use crate::workspace::CsvUpload;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub file_name: String,
}

/// POST /api/csv/preview?file_name=
pub async fn preview_csv(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
    body: Bytes,
) -> ApiResult<Json<CsvUpload>> {
    check_file_name(&query.file_name)?;
    let rows = parse_csv(&body, &query.file_name)?;

    let upload = CsvUpload::new(&query.file_name, rows);
    state.workspace.write().await.set_csv_upload(upload.clone());

    Ok(Json(upload))
}

pub fn csv_routes() -> Router<AppState> {
    Router::new().route("/api/csv/preview", post(preview_csv))
}
