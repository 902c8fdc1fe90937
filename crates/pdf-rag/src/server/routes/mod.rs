//! API routes for the RAG server

pub mod chat;
pub mod documents;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::catalog::CatalogResponse;
use crate::server::state::AppState;

/// Build all routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .route("/config", get(catalog))
        .route(
            "/upload",
            post(upload::upload_pdf).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/chat", post(chat::chat))
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", delete(documents::delete_document))
}

/// GET / - service banner
async fn root() -> Json<Value> {
    Json(json!({
        "message": "RAG API is running",
        "name": "pdf-rag",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let manager = state.manager();
    Json(json!({
        "status": "healthy",
        "documents": manager.resident_count(),
        "loaded_models": manager.embeddings().loaded_models(),
    }))
}

/// GET /ready
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /config - providers and models clients can pick from
async fn catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse::build())
}
