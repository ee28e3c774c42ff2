//! Google Generative Language API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::send_json;
use crate::config::Settings;
use crate::error::{RouterError, RouterResult};
use crate::rag::{Embedder, Generator};

const SERVICE: &str = "gemini";

/// Normalise a model id to the `models/<id>` form the API expects.
pub fn model_path(model: &str) -> String {
    let model = model.trim().trim_start_matches('/');
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn from_settings(http: reqwest::Client, settings: &Settings) -> Self {
        let generation = &settings.generation;
        Self {
            http,
            base_url: generation.base_url.trim_end_matches('/').to_string(),
            api_key: generation.api_key.clone(),
            embedding_model: model_path(&settings.pipeline.embedding_model),
            generation_model: model_path(&generation.model),
            temperature: generation.temperature,
            max_output_tokens: generation.max_output_tokens,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{model}:{method}", self.base_url)
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.http.post(url).query(&[("key", &self.api_key)])
    }

    fn embed_request<'a>(&'a self, text: &'a str, task_type: &'static str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: &self.embedding_model,
            content: Content::user_text(text),
            task_type,
        }
    }

    /// Models supporting `method` (e.g. `generateContent`), following page tokens.
    pub async fn list_models(&self, method: &str) -> RouterResult<Vec<ModelInfo>> {
        let url = format!("{}/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("key", self.api_key.as_str()), ("pageSize", "100")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListModelsResponse = send_json(SERVICE, request).await?;
            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == method)),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(models)
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed_query(&self, text: &str) -> RouterResult<Vec<f32>> {
        let url = self.endpoint(&self.embedding_model, "embedContent");
        let body = self.embed_request(text, "RETRIEVAL_QUERY");

        let response: EmbedContentResponse = send_json(SERVICE, self.post(url).json(&body)).await?;
        Ok(response.embedding.values)
    }

    async fn embed_documents(&self, texts: &[String]) -> RouterResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint(&self.embedding_model, "batchEmbedContents");
        let body = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|t| self.embed_request(t, "RETRIEVAL_DOCUMENT"))
                .collect(),
        };

        let response: BatchEmbedResponse = send_json(SERVICE, self.post(url).json(&body)).await?;
        if response.embeddings.len() != texts.len() {
            return Err(RouterError::decode(
                SERVICE,
                format!(
                    "{} embeddings returned for {} inputs",
                    response.embeddings.len(),
                    texts.len()
                ),
            ));
        }
        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> RouterResult<String> {
        let url = self.endpoint(&self.generation_model, "generateContent");
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system_prompt }],
            },
            contents: vec![Content::user_text(user_prompt)],
            generation_config: GenerationParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response: GenerateContentResponse =
            send_json(SERVICE, self.post(url).json(&body)).await?;
        response.into_text()
    }
}

// Wire types

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn user_text(text: &'a str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationParams,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> RouterResult<String> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = block_reason.map_or_else(
                || "no candidates returned".to_string(),
                |r| format!("prompt blocked: {r}"),
            );
            return Err(RouterError::decode(SERVICE, reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(RouterError::decode(
                SERVICE,
                format!("candidate has no text (finish reason: {reason})"),
            ));
        }
        Ok(text)
    }
}

/// A model entry from the `models` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}
