//! Query-side retrieval-augmented generation.
//!
//! This module provides:
//! - The collaborator traits for embedding, hybrid search and generation
//! - Prompt assembly from search hits
//! - The [`QueryService`] that chains embed → search → generate

pub mod prompt;
pub mod query;

pub use prompt::{SYSTEM_PROMPT, format_prompt_with_context};
pub use query::{NO_RESULTS_ANSWER, QueryAnswer, QueryService};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RouterResult;

const TEXT_COLUMN: &str = "extractedText";

/// One chunk record returned by the hybrid search RPC.
///
/// Only `extractedText` is interpreted. The record is otherwise kept as-is,
/// null columns included, so it can be handed back to clients unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHit {
    pub fields: Map<String, Value>,
}

impl SearchHit {
    /// Hit with only chunk text.
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(TEXT_COLUMN.to_string(), Value::String(text.into()));
        Self { fields }
    }

    /// Chunk text; empty when the column is missing or not a string.
    pub fn text(&self) -> &str {
        self.fields
            .get(TEXT_COLUMN)
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

/// Parameters of one hybrid search call, serialized as the RPC body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridQuery {
    pub query_text: String,
    pub query_embedding: Vec<f32>,
    pub match_count: u32,
    pub full_text_weight: f32,
    pub semantic_weight: f32,
    pub rrf_k: u32,
    pub file_title: String,
}

/// Text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> RouterResult<Vec<f32>>;

    /// Embed document chunks. Output order matches input order.
    async fn embed_documents(&self, texts: &[String]) -> RouterResult<Vec<Vec<f32>>>;
}

/// Full-text + vector search over stored chunks, scoped to one document title.
#[async_trait]
pub trait HybridSearch: Send + Sync {
    async fn search(&self, query: &HybridQuery) -> RouterResult<Vec<SearchHit>>;
}

/// Answer generation from a system instruction and a user prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> RouterResult<String>;
}
