//! JSON HTTP API over a garden.
//!
//! Every handler runs its garden work on the blocking pool. A mutex around
//! the service serializes requests within this process. Whole-graph analyses
//! are computed on first request and cached under `<garden>/api/`.

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use crate::GardenService;
use crate::graph::{Embedder, SemanticAnalyzer};

pub use error::{ApiError, ApiResult, ErrorResponse};

/// Shared state behind every route.
pub struct AppState {
    service: Mutex<GardenService>,
    analyzer: Mutex<SemanticAnalyzer<Arc<dyn Embedder>>>,
    similarity_threshold: f32,
}

impl AppState {
    pub fn new(
        service: GardenService,
        embedder: Arc<dyn Embedder>,
        similarity_threshold: f32,
    ) -> Self {
        Self {
            service: Mutex::new(service),
            analyzer: Mutex::new(SemanticAnalyzer::new(embedder)),
            similarity_threshold,
        }
    }

    fn service(&self) -> ApiResult<std::sync::MutexGuard<'_, GardenService>> {
        self.service
            .lock()
            .map_err(|_| ApiError::LockPoisoned("service"))
    }

    fn analyzer(
        &self,
    ) -> ApiResult<std::sync::MutexGuard<'_, SemanticAnalyzer<Arc<dyn Embedder>>>> {
        self.analyzer
            .lock()
            .map_err(|_| ApiError::LockPoisoned("semantic analyzer"))
    }
}

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/graph-analysis.json", get(handlers::graph_analysis))
        .route(
            "/api/semantic-connections.json",
            get(handlers::semantic_connections),
        )
        .route("/api/communities.json", get(handlers::communities))
        .route("/api/centrality.json", get(handlers::centrality))
        .route("/api/paths.json", get(handlers::paths))
        .route("/api/subgraph.json", get(handlers::subgraph))
        .route("/api/notes", get(handlers::search_notes))
        .route("/api/notes/:title", get(handlers::get_note))
        .route("/api/tags/:tag", get(handlers::notes_with_tag))
        .route("/api/summary", get(handlers::summary))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API until the process is stopped.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "garden API listening");

    axum::serve(listener, router(state))
        .await
        .context("API server stopped unexpectedly")
}
