//! Supabase PostgREST client: row inserts and the hybrid search RPC.

use async_trait::async_trait;
use serde_json::Value;

use super::send_json;
use crate::config::StorageConfig;
use crate::error::{RouterError, RouterResult};
use crate::pipeline::RowStore;
use crate::rag::{HybridQuery, HybridSearch, SearchHit};

const SERVICE: &str = "supabase";

/// Stored procedure implementing rank fusion over full-text and vector matches.
pub const HYBRID_SEARCH_RPC: &str = "hybrid_search";

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    url: String,
    key: String,
}

impl SupabaseClient {
    pub fn new(http: reqwest::Client, config: &StorageConfig) -> Self {
        Self {
            http,
            url: config.supabase_url.trim_end_matches('/').to_string(),
            key: config.supabase_key.clone(),
        }
    }

    fn rest_url(&self, path: &str) -> RouterResult<String> {
        if self.url.is_empty() {
            return Err(RouterError::Config(
                "storage.supabase_url is not configured".to_string(),
            ));
        }
        Ok(format!("{}/rest/v1/{path}", self.url))
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

#[async_trait]
impl HybridSearch for SupabaseClient {
    async fn search(&self, query: &HybridQuery) -> RouterResult<Vec<SearchHit>> {
        let url = self.rest_url(&format!("rpc/{HYBRID_SEARCH_RPC}"))?;

        // The RPC answers `null` when the function returns no set
        let hits: Option<Vec<SearchHit>> = send_json(SERVICE, self.post(url).json(query)).await?;
        let hits = hits.unwrap_or_default();
        crate::debug_event!("supabase", "rpc", "{HYBRID_SEARCH_RPC} returned {} rows", hits.len());
        Ok(hits)
    }
}

#[async_trait]
impl RowStore for SupabaseClient {
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> RouterResult<Vec<Value>> {
        let url = self.rest_url(table)?;
        let request = self
            .post(url)
            .header("Prefer", "return=representation")
            .json(rows);

        let stored: Option<Vec<Value>> = send_json(SERVICE, request).await?;
        Ok(stored.unwrap_or_default())
    }
}
