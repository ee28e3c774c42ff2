//! Embed → search → generate chain for one question.

use std::sync::Arc;

use serde::Serialize;

use super::prompt::format_prompt_with_context;
use super::{Embedder, Generator, HybridQuery, HybridSearch, SYSTEM_PROMPT, SearchHit};
use crate::config::SearchConfig;
use crate::error::RouterResult;

/// Answer returned when the search finds nothing for the title.
pub const NO_RESULTS_ANSWER: &str = "Could not find relevant information in the specified document.";

/// Generated answer plus the raw hits it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub chunks: Vec<SearchHit>,
}

/// Stateless query orchestration over the three collaborators.
#[derive(Clone)]
pub struct QueryService {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn HybridSearch>,
    generator: Arc<dyn Generator>,
    params: SearchConfig,
}

impl QueryService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn HybridSearch>,
        generator: Arc<dyn Generator>,
        params: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            search,
            generator,
            params,
        }
    }

    pub fn params(&self) -> &SearchConfig {
        &self.params
    }

    /// Answer `query` from the chunks of the document titled `file_title`.
    ///
    /// Generation is skipped when the search returns no hits.
    pub async fn answer(&self, query: &str, file_title: &str) -> RouterResult<QueryAnswer> {
        let query_embedding = self.embedder.embed_query(query).await?;
        crate::debug_event!("query", "embedded", "{} dimensions", query_embedding.len());

        let request = HybridQuery {
            query_text: query.to_string(),
            query_embedding,
            match_count: self.params.match_count,
            full_text_weight: self.params.full_text_weight,
            semantic_weight: self.params.semantic_weight,
            rrf_k: self.params.rrf_k,
            file_title: file_title.to_string(),
        };
        let hits = self.search.search(&request).await?;
        crate::debug_event!("query", "searched", "{} hits for '{file_title}'", hits.len());

        if hits.is_empty() {
            return Ok(QueryAnswer {
                answer: NO_RESULTS_ANSWER.to_string(),
                chunks: Vec::new(),
            });
        }

        let prompt = format_prompt_with_context(&hits, query);
        let answer = self.generator.generate(SYSTEM_PROMPT, &prompt).await?;

        Ok(QueryAnswer {
            answer,
            chunks: hits,
        })
    }
}
