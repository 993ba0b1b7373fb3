//! Course and program directory, proxied from the analysis backend

use axum::{extract::State, routing::get, Json, Router};
use kwaudit_common::client::{CourseSummary, ProgramSummary};

use crate::{ApiResult, AppState};

/// GET /api/courses
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<CourseSummary>>> {
    let token = state.token().await?;
    let courses = state
        .backend(state.client.list_courses(token.as_deref()).await)
        .await?;
    Ok(Json(courses))
}

/// GET /api/programs
pub async fn list_programs(State(state): State<AppState>) -> ApiResult<Json<Vec<ProgramSummary>>> {
    let token = state.token().await?;
    let programs = state
        .backend(state.client.list_programs(token.as_deref()).await)
        .await?;
    Ok(Json(programs))
}

pub fn directory_routes() -> Router<AppState> {
    Router::new()
        .route("/api/courses", get(list_courses))
        .route("/api/programs", get(list_programs))
}
