//! Query input extraction.
//!
//! `POST /query_document/` takes `query` and `file_title` as URL-encoded form
//! fields, multipart fields, or a JSON object. Missing fields are empty.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::Deserialize;

use super::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub file_title: String,
}

impl<S> FromRequest<S> for QueryForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") {
            let Json(form) = Json::<QueryForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
            Ok(form)
        } else if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Form(form) = Form::<QueryForm>::from_request(req, state)
                .await
                .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
            Ok(form)
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<QueryForm, ApiError> {
    let mut form = QueryForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        let target = match name.as_deref() {
            Some("query") => &mut form.query,
            Some("file_title") => &mut form.file_title,
            _ => continue,
        };
        *target = field
            .text()
            .await
            .map_err(|e| ApiError::rejection(e.status(), e.body_text()))?;
    }

    Ok(form)
}
