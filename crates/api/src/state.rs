use std::sync::Arc;

use tally_engine::WorkflowRuntime;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tally_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Workflow instance runtime.
    pub runtime: Arc<WorkflowRuntime>,
}
