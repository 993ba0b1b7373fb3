//! kwaudit-ui library interface
//!
//! Local web service for running keyword audits: application state, router
//! construction and the JSON/CSV API. `main.rs` wires it to configuration
//! and a listener; integration tests drive the router directly.

pub mod api;
pub mod workspace;

pub use crate::api::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use kwaudit_common::client::AnalysisClient;
use kwaudit_common::config::AppConfig;
use kwaudit_common::db;
use kwaudit_common::export::LinkTemplates;
use kwaudit_common::session::{login_url, Session};
use kwaudit_common::Error;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use workspace::AuditWorkspace;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub client: AnalysisClient,
    /// Current batch and table view; written only after an audit finishes
    pub workspace: Arc<RwLock<AuditWorkspace>>,
    pub links: LinkTemplates,
    pub backend_url: String,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &AppConfig) -> kwaudit_common::Result<Self> {
        let client = AnalysisClient::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self {
            db,
            client,
            workspace: Arc::new(RwLock::new(AuditWorkspace::new())),
            links: LinkTemplates {
                program: config.program_link_template.clone(),
                course: config.course_link_template.clone(),
            },
            backend_url: config.backend_url.clone(),
            startup_time: kwaudit_common::time::now(),
        })
    }

    /// Reload persisted result IDs; their payloads did not survive the restart
    pub async fn restore(&self) -> kwaudit_common::Result<()> {
        let ids = db::load_result_ids(&self.db).await?;
        if !ids.is_empty() {
            warn!(
                "{} result(s) from the previous run are no longer available; run a new audit",
                ids.len()
            );
            *self.workspace.write().await = AuditWorkspace::with_stale_ids(ids);
        }
        Ok(())
    }

    pub fn login_url(&self) -> String {
        login_url(&self.backend_url)
    }

    /// Token for backend calls
    ///
    /// No session means anonymous calls. An expired session is forgotten
    /// (identity and current results) and reported as a re-login redirect.
    pub async fn token(&self) -> ApiResult<Option<String>> {
        match db::load_session(&self.db).await? {
            None => Ok(None),
            Some(session) if session.is_expired() => {
                Err(self.expire_session("Session expired").await)
            }
            Some(session) => Ok(Some(session.token)),
        }
    }

    /// Valid stored session, clearing an expired one
    pub async fn current_session(&self) -> ApiResult<Option<Session>> {
        match db::load_session(&self.db).await? {
            Some(session) if session.is_expired() => {
                self.forget(&format!("Session for {} expired", session.email))
                    .await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Pass backend results through, turning an authorization failure into a
    /// cleared identity plus redirect
    pub async fn backend<T>(&self, result: kwaudit_common::Result<T>) -> ApiResult<T> {
        match result {
            Err(Error::Unauthorized(msg)) => Err(self.expire_session(&msg).await),
            other => Ok(other?),
        }
    }

    async fn expire_session(&self, reason: &str) -> ApiError {
        if let Err(e) = self.forget(reason).await {
            warn!("Failed to clear session: {}", e);
        }
        ApiError::Unauthorized {
            message: reason.to_string(),
            redirect: self.login_url(),
        }
    }

    async fn forget(&self, reason: &str) -> kwaudit_common::Result<()> {
        info!("{}; clearing stored identity and results", reason);
        db::clear_session(&self.db).await?;
        db::clear_result_ids(&self.db).await?;
        self.workspace.write().await.clear();
        Ok(())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::ui_routes())
        .merge(api::health_routes())
        .merge(api::session_routes())
        .merge(api::directory_routes())
        .merge(api::csv_routes())
        .merge(api::audit_routes())
        .merge(api::result_routes())
        .merge(api::keyword_set_routes())
        .merge(api::suggestion_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
