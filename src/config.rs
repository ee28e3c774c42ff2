//! Configuration module for the RAG router.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.ragrouter/settings.toml`)
//! - Flat environment variables kept for existing deployments
//! - Prefixed environment variable overrides
//!
//! # Environment Variables
//!
//! Prefixed variables start with `RAG_` and use double underscores to
//! separate nested levels:
//! - `RAG_SEARCH__MATCH_COUNT=5` sets `search.match_count`
//! - `RAG_SERVER__BIND=127.0.0.1:9000` sets `server.bind`
//!
//! The flat names listed in [`LEGACY_ENV`] (`SUPABASE_URL`, `GEMINI_API_KEY`,
//! `CHUNK_SIZE`, ...) are also honoured. Prefixed variables win over flat ones.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{RouterError, RouterResult};

/// Directory holding the settings file, searched upward from the working directory.
pub const CONFIG_DIR: &str = ".ragrouter";

/// Flat environment variable names and the settings path each one sets.
pub const LEGACY_ENV: &[(&str, &str)] = &[
    ("SUPABASE_URL", "storage.supabase_url"),
    ("SUPABASE_KEY", "storage.supabase_key"),
    ("SUPABASE_TABLE", "storage.table"),
    ("SUPABASE_CHUNKS_TABLE", "storage.chunks_table"),
    ("GCP_BUCKET", "object_store.bucket"),
    ("GCP_DESTINATION_FOLDER", "object_store.destination_folder"),
    ("GCP_ACCESS_TOKEN", "object_store.access_token"),
    ("GOOGLE_APPLICATION_CREDENTIALS_JSON", "object_store.credentials_json"),
    ("CHUNK_SIZE", "pipeline.chunk_size"),
    ("CHUNK_OVERLAP", "pipeline.chunk_overlap"),
    ("EMBEDDING_MODEL", "pipeline.embedding_model"),
    ("GENERATION_MODEL", "generation.model"),
    ("GEMINI_API_KEY", "generation.api_key"),
    ("MATCH_COUNT", "search.match_count"),
    ("FULL_TEXT_WEIGHT", "search.full_text_weight"),
    ("SEMANTIC_WEIGHT", "search.semantic_weight"),
    ("RRF_K", "search.rrf_k"),
    ("CORS_ORIGINS", "server.cors_origins"),
];

const REDACTED: &str = "********";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Search database (rows and hybrid search RPC)
    #[serde(default)]
    pub storage: StorageConfig,

    /// Object store for the original uploaded files
    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    /// Document processing settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Generative model settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Hybrid search parameters
    #[serde(default)]
    pub search: SearchConfig,

    /// Shared HTTP client settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Logging levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Origins allowed to make cross-origin requests
    #[serde(
        default = "default_cors_origins",
        deserialize_with = "string_or_list"
    )]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Base URL of the Supabase project
    #[serde(default)]
    pub supabase_url: String,

    /// Service key used for both `apikey` and bearer auth
    #[serde(default)]
    pub supabase_key: String,

    /// Table receiving one metadata row per uploaded file
    #[serde(default = "default_files_table")]
    pub table: String,

    /// Table receiving the chunk rows with embeddings
    #[serde(default = "default_chunks_table")]
    pub chunks_table: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ObjectStoreConfig {
    /// Bucket receiving uploaded PDFs
    #[serde(default)]
    pub bucket: String,

    /// Folder inside the bucket
    #[serde(default = "default_destination_folder")]
    pub destination_folder: String,

    /// Fixed OAuth access token; when set, no tokens are minted
    #[serde(default)]
    pub access_token: String,

    /// Service-account key JSON used to mint access tokens. When empty,
    /// application default credentials are used.
    #[serde(default, deserialize_with = "string_or_json")]
    pub credentials_json: String,

    /// Storage API base URL
    #[serde(default = "default_object_store_base_url")]
    pub base_url: String,
}

/// Chunking strategy for extracted document text.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Fixed character windows over whitespace-flattened text.
    #[default]
    Window,
    /// Paragraph boundaries with merge/split size constraints.
    Paragraph,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default)]
    pub strategy: ChunkingStrategy,

    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default)]
    pub chunk_overlap: usize,

    /// Paragraphs shorter than this are merged (paragraph strategy only)
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Model used for chunk and query embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Texts per batch embedding request
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    /// Model used to generate answers
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// API key for the generative language API
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    /// Number of chunks returned by hybrid search
    #[serde(default = "default_match_count")]
    pub match_count: u32,

    #[serde(default = "default_weight")]
    pub full_text_weight: f32,

    #[serde(default = "default_weight")]
    pub semantic_weight: f32,

    /// Reciprocal rank fusion smoothing constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    /// Per-request timeout for all outbound calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `http = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_bind() -> String { "0.0.0.0:8000".to_string() }
fn default_cors_origins() -> Vec<String> {
    vec!["https://uncoverlearning-deploy.vercel.app".to_string()]
}
fn default_max_upload_bytes() -> usize { 50 * 1024 * 1024 }
fn default_files_table() -> String { "files".to_string() }
fn default_chunks_table() -> String { "chunks".to_string() }
fn default_destination_folder() -> String { "uploaded_docs".to_string() }
fn default_object_store_base_url() -> String { "https://storage.googleapis.com".to_string() }
fn default_chunk_size() -> usize { 1000 }
fn default_min_chunk_chars() -> usize { 200 }
fn default_embedding_model() -> String { "models/text-embedding-004".to_string() }
fn default_embedding_batch_size() -> usize { 100 }
fn default_generation_model() -> String { "models/gemini-1.5-pro-latest".to_string() }
fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_temperature() -> f32 { 0.7 }
fn default_max_output_tokens() -> u32 { 1024 }
fn default_match_count() -> u32 { 10 }
fn default_weight() -> f32 { 1.0 }
fn default_rrf_k() -> u32 { 50 }
fn default_request_timeout_secs() -> u64 { 120 }
fn default_log_level() -> String { "info".to_string() }

/// Accept either a sequence of strings or one comma-separated string.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let values = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => s.split(',').map(str::to_string).collect(),
        OneOrMany::Many(v) => v,
    };
    Ok(values
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Accept a JSON document either as text or already parsed into a map.
fn string_or_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            object_store: ObjectStoreConfig::default(),
            pipeline: PipelineConfig::default(),
            generation: GenerationConfig::default(),
            search: SearchConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_key: String::new(),
            table: default_files_table(),
            chunks_table: default_chunks_table(),
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            destination_folder: default_destination_folder(),
            access_token: String::new(),
            credentials_json: String::new(),
            base_url: default_object_store_base_url(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::default(),
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            min_chunk_chars: default_min_chunk_chars(),
            embedding_model: default_embedding_model(),
            embedding_batch_size: default_embedding_batch_size(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            api_key: String::new(),
            base_url: default_generation_base_url(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_count: default_match_count(),
            full_text_weight: default_weight(),
            semantic_weight: default_weight(),
            rrf_k: default_rrf_k(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

fn legacy_path(key: &str) -> Option<&'static str> {
    LEGACY_ENV
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, path)| *path)
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));
        Self::load_from(config_path)
    }

    /// Load configuration using a specific settings file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Flat names such as SUPABASE_URL map onto their nested path
            .merge(Env::raw().filter_map(|key| legacy_path(key.as_str()).map(Into::into)))
            // RAG_ prefix; double underscore (__) separates nested levels
            .merge(Env::prefixed("RAG_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.ragrouter/settings.toml` from the current directory upward
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join("settings.toml"))
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> RouterResult<()> {
        let pipeline = &self.pipeline;
        if pipeline.chunk_size == 0 {
            return Err(RouterError::Config("pipeline.chunk_size must be positive".into()));
        }
        if pipeline.chunk_overlap >= pipeline.chunk_size {
            return Err(RouterError::Config(format!(
                "pipeline.chunk_overlap ({}) must be smaller than pipeline.chunk_size ({})",
                pipeline.chunk_overlap, pipeline.chunk_size
            )));
        }
        if pipeline.embedding_batch_size == 0 {
            return Err(RouterError::Config(
                "pipeline.embedding_batch_size must be positive".into(),
            ));
        }
        if self.search.match_count == 0 {
            return Err(RouterError::Config("search.match_count must be positive".into()));
        }
        Ok(())
    }

    /// Names of credentials that are still empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.storage.supabase_url.is_empty() {
            missing.push("storage.supabase_url");
        }
        if self.storage.supabase_key.is_empty() {
            missing.push("storage.supabase_key");
        }
        if self.generation.api_key.is_empty() {
            missing.push("generation.api_key");
        }
        if self.object_store.bucket.is_empty() {
            missing.push("object_store.bucket");
        }
        missing
    }

    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        fn redact(value: &mut String) {
            if !value.is_empty() {
                *value = REDACTED.to_string();
            }
        }

        let mut copy = self.clone();
        redact(&mut copy.storage.supabase_key);
        redact(&mut copy.object_store.access_token);
        redact(&mut copy.object_store.credentials_json);
        redact(&mut copy.generation.api_key);
        copy
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
