//! AI rewrite suggestions, proxied to the analysis backend

use axum::{extract::State, routing::post, Json, Router};
use kwaudit_common::highlight::{keyword_segments, TextSegment};
use kwaudit_common::suggestions::{AlternateTextRequest, AlternativeSuggestion, FullTextRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ApiResult, AppState};

/// Fields shared by both suggestion requests
#[derive(Debug, Default, Deserialize)]
pub struct SuggestionContext {
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Custom prompt replacing the default
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlternateBody {
    pub sentence: String,
    #[serde(flatten)]
    pub context: SuggestionContext,
}

#[derive(Debug, Deserialize)]
pub struct FullTextBody {
    pub original_text: String,
    #[serde(flatten)]
    pub context: SuggestionContext,
}

#[derive(Debug, Serialize)]
pub struct AlternateResponse {
    pub alternative_suggestions: Vec<AlternativeSuggestion>,
}

#[derive(Debug, Serialize)]
pub struct FullTextResponse {
    pub alternatives: Vec<String>,
    /// Each alternative split on the request keywords, same order
    pub highlighted: Vec<Vec<TextSegment>>,
}

/// POST /api/suggestions/alternate
pub async fn alternate_text(
    State(state): State<AppState>,
    Json(body): Json<AlternateBody>,
) -> ApiResult<Json<AlternateResponse>> {
    let ctx = body.context;
    let request = AlternateTextRequest::new(
        &ctx.source_id,
        &ctx.content_type,
        &body.sentence,
        ctx.keywords,
        ctx.metadata,
        ctx.prompt.as_deref(),
    );

    let token = state.token().await?;
    let suggestions = state
        .backend(
            state
                .client
                .alternate_text_suggestions(token.as_deref(), &request)
                .await,
        )
        .await?;

    Ok(Json(AlternateResponse {
        alternative_suggestions: suggestions,
    }))
}

/// POST /api/suggestions/full-text
pub async fn full_text(
    State(state): State<AppState>,
    Json(body): Json<FullTextBody>,
) -> ApiResult<Json<FullTextResponse>> {
    let ctx = body.context;
    let keywords = ctx.keywords.clone();
    let request = FullTextRequest::new(
        &ctx.source_id,
        &ctx.content_type,
        &body.original_text,
        ctx.keywords,
        ctx.metadata,
        ctx.prompt.as_deref(),
    );

    let token = state.token().await?;
    let alternatives = state
        .backend(
            state
                .client
                .full_text_alternatives(token.as_deref(), &request)
                .await,
        )
        .await?;

    let highlighted = alternatives
        .iter()
        .map(|text| keyword_segments(text, &keywords))
        .collect();

    Ok(Json(FullTextResponse {
        alternatives,
        highlighted,
    }))
}

pub fn suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/api/suggestions/alternate", post(alternate_text))
        .route("/api/suggestions/full-text", post(full_text))
}
