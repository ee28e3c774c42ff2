pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod providers;
pub mod rag;
pub mod server;

pub use config::Settings;
pub use error::{RouterError, RouterResult};
pub use pipeline::{DocumentPipeline, IngestPipeline, PipelineOptions, UploadedDocument};
pub use rag::{Embedder, Generator, HybridQuery, HybridSearch, QueryAnswer, QueryService, SearchHit};
pub use server::{AppState, router, serve};
