//! Default upload pipeline: extract → chunk → embed → store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

use super::chunker::chunker_for;
use super::{DocumentPipeline, ObjectStore, PipelineOptions, RowStore, TextExtractor, UploadedDocument};
use crate::error::{RouterError, RouterResult};
use crate::rag::Embedder;

/// Result of a successful ingest, returned to the client as `details`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub file_url: String,
    pub file_id: String,
    pub total_chunks: usize,
}

/// Pipeline wired to the text extractor, embedder, object store and database.
pub struct IngestPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    objects: Arc<dyn ObjectStore>,
    rows: Arc<dyn RowStore>,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        objects: Arc<dyn ObjectStore>,
        rows: Arc<dyn RowStore>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            objects,
            rows,
        }
    }

    async fn extract_text(&self, document: &UploadedDocument) -> RouterResult<String> {
        let extractor = Arc::clone(&self.extractor);
        let bytes = document.bytes.clone();

        tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(|e| RouterError::Pdf(format!("extraction task failed: {e}")))?
    }

    async fn embed_all(&self, texts: &[String], batch_size: usize) -> RouterResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            embeddings.extend(self.embedder.embed_documents(batch).await?);
        }

        if embeddings.len() != texts.len() {
            return Err(RouterError::decode(
                "embedder",
                format!("{} embeddings for {} chunks", embeddings.len(), texts.len()),
            ));
        }
        Ok(embeddings)
    }

    /// Insert the file metadata row; the database's id wins if it returns one.
    async fn insert_file_metadata(
        &self,
        table: &str,
        title: &str,
        link: &str,
    ) -> RouterResult<String> {
        let generated_id = uuid::Uuid::new_v4().simple().to_string();
        let row = json!({
            "id": generated_id,
            "title": title,
            "link": link,
            "license": "unknown",
            "in_database": true,
        });

        let stored = self.rows.insert_rows(table, &[row]).await?;
        let Some(first) = stored.first() else {
            return Err(RouterError::decode(
                "supabase",
                format!("no row returned after inserting file metadata into '{table}'"),
            ));
        };

        Ok(match first.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => generated_id,
        })
    }
}

#[async_trait]
impl DocumentPipeline for IngestPipeline {
    async fn process(
        &self,
        document: UploadedDocument,
        options: &PipelineOptions,
    ) -> RouterResult<Value> {
        let text = self.extract_text(&document).await?;
        if text.trim().is_empty() {
            return Err(RouterError::NoText(document.file_name));
        }
        crate::debug_event!("pipeline", "extracted", "{} characters", text.chars().count());

        let chunks = chunker_for(options.chunking.strategy).chunk(&text, &options.chunking);
        if chunks.is_empty() {
            return Err(RouterError::NoText(document.file_name));
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        crate::debug_event!("pipeline", "chunked", "{} chunks", texts.len());

        let embeddings = self.embed_all(&texts, options.embedding_batch_size).await?;

        let object_path = format!(
            "{}/{}",
            options.destination_folder.trim_end_matches('/'),
            document.file_name
        );
        let file_url = self
            .objects
            .put(&object_path, document.bytes.clone(), "application/pdf")
            .await?;
        crate::debug_event!("pipeline", "stored object", "{object_path}");

        let file_id = self
            .insert_file_metadata(&options.files_table, &document.title, &file_url)
            .await?;

        let rows: Vec<Value> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                json!({
                    "id": format!("{file_id}-{}", chunk.position),
                    "fileId": file_id,
                    "position": chunk.position,
                    "originalName": document.title,
                    "extractedText": chunk.content,
                    "downloadUrl": file_url,
                    "embedding": embedding,
                })
            })
            .collect();
        self.rows.insert_rows(&options.chunks_table, &rows).await?;

        crate::log_event!(
            "pipeline",
            "ingested",
            "'{}' as {file_id} ({} chunks)",
            document.title,
            rows.len()
        );

        let report = IngestReport {
            file_url,
            file_id,
            total_chunks: rows.len(),
        };
        Ok(serde_json::to_value(report)?)
    }
}
