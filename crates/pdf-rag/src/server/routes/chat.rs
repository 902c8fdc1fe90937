//! Question answering endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /chat - answer a question about an uploaded document
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let start = Instant::now();
    tracing::info!("Chat on {}: \"{}\"", request.document_id, request.query);

    let response = state.manager().chat(&request).await?;

    tracing::info!(
        "Answered with {}/{} from {} sources in {:?}",
        response.provider,
        response.model_used,
        response.sources.len(),
        start.elapsed()
    );
    Ok(Json(response))
}
