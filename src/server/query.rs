//! `POST /query_document/`

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use super::AppState;
use super::error::ApiError;
use super::form::QueryForm;
use crate::rag::QueryAnswer;

pub async fn query_document(
    State(state): State<Arc<AppState>>,
    form: QueryForm,
) -> Result<Json<QueryAnswer>, ApiError> {
    if form.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty."));
    }
    if form.file_title.trim().is_empty() {
        return Err(ApiError::bad_request("Document title cannot be empty."));
    }

    match state.queries.answer(&form.query, &form.file_title).await {
        Ok(answer) => {
            crate::debug_event!(
                "query",
                "answered",
                "'{}' with {} chunks",
                form.file_title,
                answer.chunks.len()
            );
            Ok(Json(answer))
        }
        Err(e) => {
            tracing::error!(target: "query", "Error during query processing: {e}");
            Err(ApiError::Internal(format!("Failed to process query: {e}")))
        }
    }
}
