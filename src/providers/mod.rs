//! Network clients for the managed collaborators.
//!
//! - [`GeminiClient`]: embeddings, answer generation and model listing
//! - [`SupabaseClient`]: row insertion and the `hybrid_search` RPC
//! - [`GcsObjectStore`]: upload of original files
//!
//! All clients share one pooled `reqwest::Client`. Non-2xx responses become
//! [`RouterError::Upstream`]; nothing is retried.

pub mod gcs;
pub mod gemini;
pub mod supabase;

pub use gcs::GcsObjectStore;
pub use gemini::{GeminiClient, ModelInfo};
pub use supabase::SupabaseClient;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::ProvidersConfig;
use crate::error::{RouterError, RouterResult};

/// Shared HTTP client with the configured request timeout.
pub fn http_client(config: &ProvidersConfig) -> RouterResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| RouterError::http("client", e))
}

/// Send a request and fail on any non-2xx status.
pub(crate) async fn send(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> RouterResult<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| RouterError::http(service, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RouterError::Upstream {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Send a request and decode a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> RouterResult<T> {
    let response = send(service, request).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| RouterError::http(service, e))?;
    serde_json::from_slice(&bytes).map_err(|e| RouterError::decode(service, e.to_string()))
}
