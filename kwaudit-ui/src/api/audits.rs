//! Start an audit
//!
//! The batch runs without holding the workspace lock; results are installed
//! in one write once every source has been submitted.

use axum::{extract::State, routing::post, Json, Router};
use kwaudit_common::audit::{AuditRequest, AuditRunner, AuditSource, CourseSelection};
use kwaudit_common::db;
use kwaudit_common::results::ResultView;
use kwaudit_common::SearchType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

/// `POST /api/audits` body
#[derive(Debug, Default, Deserialize)]
pub struct AuditBody {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Pasted text
    #[serde(default)]
    pub text: Option<String>,
    /// Audit the rows of the last CSV preview
    #[serde(default)]
    pub csv: bool,
    #[serde(default)]
    pub courses: Vec<CourseSelection>,
    /// Program ids; every version of each is audited
    #[serde(default)]
    pub programs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub total: usize,
    pub failed: usize,
    pub search_type: SearchType,
    pub summary: String,
}

/// POST /api/audits
pub async fn start_audit(
    State(state): State<AppState>,
    Json(body): Json<AuditBody>,
) -> ApiResult<Json<AuditResponse>> {
    let mut sources = Vec::new();

    if let Some(text) = body.text {
        sources.push(AuditSource::Text(text));
    }

    if body.csv {
        let workspace = state.workspace.read().await;
        let upload = workspace
            .csv_upload()
            .ok_or_else(|| ApiError::BadRequest("No CSV file has been uploaded".to_string()))?;
        sources.extend(upload.rows.iter().cloned().map(AuditSource::CsvRow));
    }

    sources.extend(body.courses.into_iter().map(AuditSource::Course));
    sources.extend(body.programs.into_iter().map(AuditSource::Program));

    let request = AuditRequest {
        keywords: body.keywords,
        search_type: body.search_type,
        metadata: body.metadata,
        sources,
    };
    request.validate()?;

    let token = state.token().await?;
    let outcome = {
        let runner = AuditRunner::new(&state.client, token.as_deref(), &state.links);
        state.backend(runner.run(&request).await).await?
    };

    let total = outcome.results.len();
    let mut workspace = state.workspace.write().await;
    workspace.install(outcome.results, request.search_type);
    db::replace_result_ids(&state.db, &workspace.result_ids()).await?;
    info!("Installed {} result(s), {} failed", total, outcome.failed);

    Ok(Json(AuditResponse {
        total,
        failed: outcome.failed,
        search_type: request.search_type,
        summary: ResultView::summary(workspace.visible().len(), total),
    }))
}

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/api/audits", post(start_audit))
}
