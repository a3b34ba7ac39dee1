//! # rosterfit HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /roster` - Load a roster (path, link or inline workbook)
//! - `GET /roster` - Roster summary
//! - `GET /roster/weeks` - Roster weeks covered by a date range
//! - `GET /projects` - All project slots
//! - `PUT /projects/count` - Change the project count
//! - `PUT /projects/{index}` - Set a project's parameters
//! - `POST /projects/{index}/rank` - Rank candidates
//! - `POST /projects/{index}/allocate` - Commit picks to the ledger
//! - `GET /projects/{index}/compare/{name}` - One person against every requested role
//! - `GET /export` - Ranked candidates as CSV
//!
//! The server holds a single session in memory. Loading a different roster
//! replaces it.
//!
//! ## Configuration (Environment Variables)
//!
//! - `ROSTERFIT_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `ROSTERFIT_MAX_PROJECTS`: project count ceiling for new sessions (default: 3)

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `rosterfit::api::*`)
pub use handlers::{
    allocate_handler, compare_handler, configure_handler, export_handler, health_handler,
    load_roster_handler, projects_handler, rank_handler, resize_handler, roster_handler,
    weeks_handler,
};
pub use types::{
    AllocateRequest, AllocationResponse, ApiError, ConfigureResponse, ErrorResponse, ExportQuery,
    HealthResponse, LoadRosterRequest, LoadRosterResponse, ProjectsResponse, ResizeRequest,
    RosterSummary, SlotView, WeeksQuery, WeeksResponse,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post, put},
};
use rosterfit_core::{RosterFitError, RosterLoader, Session, SessionConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable listing allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "ROSTERFIT_CORS_ORIGINS";

/// Request body limit; inline workbooks can be large.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The current session, if a roster has been loaded.
    pub session: Arc<RwLock<Option<Session>>>,
    /// Sheet layout used for every load.
    pub loader: Arc<RosterLoader>,
    /// Limits applied to new sessions.
    pub config: SessionConfig,
}

impl AppState {
    /// State with no roster loaded yet.
    #[must_use]
    pub fn new(loader: RosterLoader, config: SessionConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            loader: Arc::new(loader),
            config,
        }
    }

    /// State over an existing session.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        let config = session.config();
        Self {
            session: Arc::new(RwLock::new(Some(session))),
            loader: Arc::new(RosterLoader::default()),
            config,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `ROSTERFIT_CORS_ORIGINS`:
/// - If "*": allows all origins
/// - If not set: localhost only
/// - Otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var(CORS_ORIGINS_ENV).ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins ({}=*)", CORS_ORIGINS_ENV);
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in {}, defaulting to localhost only",
                    CORS_ORIGINS_ENV
                );
                build_localhost_cors()
            } else {
                with_methods(CorsLayer::new().allow_origin(allowed_origins))
            }
        }
        None => {
            tracing::info!("CORS: {} not set, defaulting to localhost only", CORS_ORIGINS_ENV);
            build_localhost_cors()
        }
    }
}

fn with_methods(layer: CorsLayer) -> CorsLayer {
    layer
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    with_methods(CorsLayer::new().allow_origin(origins))
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/roster",
            get(handlers::roster_handler).post(handlers::load_roster_handler),
        )
        .route("/roster/weeks", get(handlers::weeks_handler))
        .route("/projects", get(handlers::projects_handler))
        .route("/projects/count", put(handlers::resize_handler))
        .route("/projects/{index}", put(handlers::configure_handler))
        .route("/projects/{index}/rank", post(handlers::rank_handler))
        .route("/projects/{index}/allocate", post(handlers::allocate_handler))
        .route(
            "/projects/{index}/compare/{name}",
            get(handlers::compare_handler),
        )
        .route("/export", get(handlers::export_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), RosterFitError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RosterFitError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("rosterfit HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RosterFitError::IoError(format!("Server error: {}", e)))
}

/// Resolve on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
