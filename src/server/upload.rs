//! `POST /upload_document/`

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::pipeline::UploadedDocument;

pub const UPLOAD_SUCCESS_MESSAGE: &str = "Document processed successfully";

/// Case-insensitive `.pdf` extension check on the client file name.
pub fn is_pdf_file_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

struct UploadFields {
    file_name: String,
    bytes: Bytes,
    original_name: String,
}

async fn read_fields(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut original_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
                file = Some((file_name, bytes));
            }
            Some("original_name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
                original_name = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::bad_request("Missing required field: file"))?;
    let original_name = original_name
        .ok_or_else(|| ApiError::bad_request("Missing required field: original_name"))?;

    Ok(UploadFields {
        file_name,
        bytes,
        original_name,
    })
}

pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
    let fields = read_fields(multipart).await?;

    if !is_pdf_file_name(&fields.file_name) {
        return Err(ApiError::bad_request("Only PDF files are allowed."));
    }

    crate::log_event!(
        "upload",
        "received",
        "'{}' as '{}' ({} bytes)",
        fields.file_name,
        fields.original_name,
        fields.bytes.len()
    );

    let document = UploadedDocument {
        bytes: fields.bytes,
        file_name: fields.file_name,
        title: fields.original_name,
    };

    match state.pipeline.process(document, &state.pipeline_options).await {
        Ok(details) => Ok(Json(json!({
            "message": UPLOAD_SUCCESS_MESSAGE,
            "details": details,
        }))),
        Err(e) => {
            tracing::error!(target: "upload", "Error processing document: {e}");
            Err(ApiError::Internal(format!("Failed to process document: {e}")))
        }
    }
}
