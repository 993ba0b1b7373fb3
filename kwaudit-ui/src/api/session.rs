//! Sign-in callback and session endpoints
//!
//! The backend's login flow ends by redirecting to `/auth/callback?token=`.
//! The token's claims are read once and stored; later backend calls send the
//! stored token.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use kwaudit_common::db;
use kwaudit_common::session::Session;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    pub login_url: String,
}

/// GET /auth/callback?token=
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Redirect> {
    if query.token.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing token".to_string()));
    }

    let session = Session::from_token(&query.token)
        .map_err(|e| ApiError::BadRequest(format!("Invalid login token: {}", e)))?;

    if session.is_expired() {
        return Err(ApiError::Unauthorized {
            message: "Login token already expired".to_string(),
            redirect: state.login_url(),
        });
    }

    db::save_session(&state.db, &session).await?;
    info!("Signed in as {} <{}>", session.name, session.email);

    Ok(Redirect::to("/"))
}

/// GET /api/session
pub async fn get_session(State(state): State<AppState>) -> ApiResult<Json<SessionResponse>> {
    let session = state.current_session().await?;

    Ok(Json(SessionResponse {
        authenticated: session.is_some(),
        session,
        login_url: state.login_url(),
    }))
}

/// POST /api/session/logout
pub async fn logout(State(state): State<AppState>) -> ApiResult<Json<SessionResponse>> {
    db::clear_session(&state.db).await?;
    info!("Signed out");

    Ok(Json(SessionResponse {
        authenticated: false,
        session: None,
        login_url: state.login_url(),
    }))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/callback", get(auth_callback))
        .route("/api/session", get(get_session))
        .route("/api/session/logout", post(logout))
}
