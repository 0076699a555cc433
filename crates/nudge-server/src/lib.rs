//! Nudge Web Server
//!
//! Axum-based REST API for the Nudge behavioral spending guard. A dashboard
//! or a payment flow posts purchases here and gets back the flags and the
//! action to take before letting them through.
//!
//! Security features:
//! - Binds to localhost by default
//! - Restrictive CORS policy
//! - Input validation (pagination limits)
//! - Audit log entries for every state change
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use nudge_core::{Database, Guard, InterventionEngine, ProtectionState};

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Rules and validated config, read-only after startup
    pub guard: Guard,
    pub config: ServerConfig,
    /// Serializes read-modify-write changes to the protection switch
    protection_writes: Mutex<()>,
    pub interventions: Mutex<InterventionEngine>,
}

impl AppState {
    pub fn new(db: Database, guard: Guard, config: ServerConfig) -> anyhow::Result<Self> {
        // Fail at startup rather than on the first request if settings are unreadable
        db.load_protection()?;
        let interventions = InterventionEngine::new(guard.config().clone());
        Ok(Self {
            db,
            guard,
            config,
            protection_writes: Mutex::new(()),
            interventions: Mutex::new(interventions),
        })
    }

    /// Current protection switch
    ///
    /// Read from the database on every call, so a change made by the CLI
    /// against the same database applies to the next request.
    pub fn protection(&self) -> nudge_core::Result<ProtectionState> {
        self.db.load_protection()
    }

    /// Apply a change to the protection switch and persist it
    pub async fn update_protection<F>(
        &self,
        action: &str,
        change: F,
    ) -> nudge_core::Result<ProtectionState>
    where
        F: FnOnce(&mut ProtectionState),
    {
        let _guard = self.protection_writes.lock().await;
        let mut protection = self.db.load_protection()?;
        change(&mut protection);
        self.db.save_protection(&protection, action)?;
        Ok(protection)
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        // Status
        .route("/status", get(handlers::get_status))
        .route("/config", get(handlers::get_config))
        .route("/audit", get(handlers::list_audit_log))
        // Guard
        .route("/evaluate", post(handlers::evaluate))
        .route("/interventions", post(handlers::create_intervention))
        .route("/interventions/stats", get(handlers::intervention_stats))
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transactions),
        )
        .route("/transactions/:id", get(handlers::get_transaction))
        .route("/transactions/:id/correct", post(handlers::correct_transaction))
        // Confirmations
        .route("/pending", get(handlers::list_pending))
        .route("/pending/release", post(handlers::release_pending))
        .route("/pending/:id", get(handlers::get_pending))
        .route("/pending/:id/confirm", post(handlers::confirm_pending))
        .route("/pending/:id/cancel", post(handlers::cancel_pending))
        // Protection
        .route("/protection", get(handlers::get_protection))
        .route("/protection/enable", post(handlers::enable_protection))
        .route("/protection/disable", post(handlers::disable_protection))
        .route("/protection/bypass", post(handlers::bypass_protection))
        // Goals
        .route("/goals", get(handlers::list_goals).post(handlers::create_goal))
        .route(
            "/goals/:id",
            get(handlers::get_goal).delete(handlers::delete_goal),
        )
        .route("/goals/:id/progress", post(handlers::update_goal_progress))
        .route("/goals/:id/status", post(handlers::update_goal_status))
        // Alerts
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/:id/acknowledge", post(handlers::acknowledge_alert))
        // Reports
        .route("/reports/decendio", get(handlers::report_decendio))
        .route("/reports/summary", get(handlers::report_summary))
        .route("/reports/flags", get(handlers::report_flags));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    guard: Guard,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    // Finalize purchases whose delay ran out while the server was down
    match db.release_due(chrono::Utc::now()) {
        Ok(released) if !released.is_empty() => {
            info!(count = released.len(), "Released overdue confirmations on startup");
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to release overdue confirmations: {}", e),
    }

    let state = Arc::new(AppState::new(db, guard, config)?);
    if !state.protection()?.is_enabled() {
        warn!("⚠️  Protection is disabled - purchases will be flagged but never held");
    }

    let app = create_router(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<nudge_core::Error> for AppError {
    fn from(err: nudge_core::Error) -> Self {
        use nudge_core::Error;
        match err {
            Error::NotFound(what) => Self::not_found(&format!("Not found: {}", what)),
            Error::InvalidTransition { .. } => Self::conflict(&err.to_string()),
            Error::InvalidData(_) | Error::Import(_) | Error::Json(_) => {
                Self::bad_request(&err.to_string())
            }
            other => Self::from(anyhow::Error::from(other)),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
