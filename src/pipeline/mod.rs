//! Document processing for uploads.
//!
//! This module provides:
//! - The [`DocumentPipeline`] seam the upload handler calls
//! - PDF text extraction and chunking strategies
//! - The default [`IngestPipeline`]: extract → chunk → embed → store

pub mod chunker;
pub mod extract;
pub mod ingest;

pub use chunker::{ChunkingOptions, Chunker, ParagraphChunker, RawChunk, WindowChunker, chunker_for};
pub use extract::{PdfTextExtractor, TextExtractor};
pub use ingest::{IngestPipeline, IngestReport};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::config::Settings;
use crate::error::RouterResult;

/// An uploaded file, fully read into memory.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Complete file contents.
    pub bytes: Bytes,
    /// File name as sent by the client (e.g. `doc1.pdf`).
    pub file_name: String,
    /// Title the document is stored and queried under.
    pub title: String,
}

/// Per-call configuration handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Table receiving the file metadata row.
    pub files_table: String,
    /// Table receiving chunk rows.
    pub chunks_table: String,
    /// Object-store folder for the original file.
    pub destination_folder: String,
    pub chunking: ChunkingOptions,
    pub embedding_batch_size: usize,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            files_table: settings.storage.table.clone(),
            chunks_table: settings.storage.chunks_table.clone(),
            destination_folder: settings.object_store.destination_folder.clone(),
            chunking: ChunkingOptions::from(&settings.pipeline),
            embedding_batch_size: settings.pipeline.embedding_batch_size,
        }
    }
}

/// Turns an uploaded document into searchable chunks.
///
/// The returned JSON is passed back to the client unchanged.
#[async_trait]
pub trait DocumentPipeline: Send + Sync {
    async fn process(
        &self,
        document: UploadedDocument,
        options: &PipelineOptions,
    ) -> RouterResult<Value>;
}

/// Destination for the original uploaded bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` at `path` and return a URL clients can download it from.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> RouterResult<String>;
}

/// Row insertion into the search database.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert `rows` into `table` and return the stored representation.
    async fn insert_rows(&self, table: &str, rows: &[Value]) -> RouterResult<Vec<Value>>;
}
