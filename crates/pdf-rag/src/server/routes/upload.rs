//! PDF upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// POST /upload - multipart `file` + `embedding_model`
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut embedding_model = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::config(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| Error::config(format!("Failed to read file: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            "embedding_model" => {
                embedding_model = field
                    .text()
                    .await
                    .map_err(|e| Error::config(format!("Failed to read embedding_model: {}", e)))?;
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let (filename, data) = file.ok_or_else(|| Error::config("Missing 'file' field"))?;

    let document = state
        .manager()
        .upload(&filename, &data, &embedding_model)
        .await?;

    Ok(Json(UploadResponse {
        document_id: document.id.to_string(),
        filename: document.filename.clone(),
        num_chunks: document.num_chunks(),
        embedding_model: document.embedding_model.clone(),
        message: "Document uploaded and indexed successfully".to_string(),
    }))
}
