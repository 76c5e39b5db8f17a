//! hits-bot library interface
//!
//! Exposes the state, router and services for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod polling;
pub mod replies;
pub mod services;
pub mod telegram;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, BotError};

use axum::Router;
use chrono::{DateTime, Utc};
use hits_common::BotConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::Reconciler;
use crate::telegram::Transport;

/// State shared by the webhook handlers, the polling loop and every
/// update task
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<BotConfig>,
    pub transport: Arc<dyn Transport>,
    pub reconciler: Arc<Reconciler>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
    /// Last internal handler failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: BotConfig, transport: Arc<dyn Transport>) -> Self {
        let reconciler = Reconciler::new(db.clone(), transport.clone(), config.removal_policy);
        Self {
            db,
            config: Arc::new(config),
            transport,
            reconciler: Arc::new(reconciler),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build the HTTP router: webhook endpoint plus health check
pub fn build_router(state: AppState) -> Router {
    let webhook_path = state.config.webhook_path.clone();

    Router::new()
        .merge(api::webhook_routes(&webhook_path))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
