//! HTTP front end.
//!
//! Routes (also mounted under `/api`):
//! - `GET /` liveness message
//! - `GET /health` plain `OK`
//! - `POST /upload_document/` multipart PDF upload
//! - `POST /query_document/` question over one document

pub mod error;
pub mod form;
pub mod query;
pub mod upload;

pub use error::ApiError;
pub use form::QueryForm;

use std::any::Any;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::error::RouterResult;
use crate::pipeline::{DocumentPipeline, IngestPipeline, PdfTextExtractor, PipelineOptions};
use crate::providers::{self, GcsObjectStore, GeminiClient, SupabaseClient};
use crate::rag::{Embedder, Generator, HybridSearch, QueryService};

pub const ROOT_MESSAGE: &str = "RAG Pipeline Wrapper API is running.";

/// Immutable state shared by all requests.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pipeline: Arc<dyn DocumentPipeline>,
    pub pipeline_options: PipelineOptions,
    pub queries: QueryService,
}

impl AppState {
    /// Wire explicit collaborators.
    pub fn new(
        settings: Settings,
        pipeline: Arc<dyn DocumentPipeline>,
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn HybridSearch>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let pipeline_options = PipelineOptions::from_settings(&settings);
        let queries = QueryService::new(embedder, search, generator, settings.search.clone());
        Self {
            settings: Arc::new(settings),
            pipeline,
            pipeline_options,
            queries,
        }
    }

    /// Wire the managed-service clients described by `settings`.
    pub fn from_settings(settings: Settings) -> RouterResult<Self> {
        let http = providers::http_client(&settings.providers)?;

        let gemini = Arc::new(GeminiClient::from_settings(http.clone(), &settings));
        let supabase = Arc::new(SupabaseClient::new(http.clone(), &settings.storage));
        let objects = Arc::new(GcsObjectStore::new(http, &settings.object_store));

        let pipeline = Arc::new(IngestPipeline::new(
            Arc::new(PdfTextExtractor),
            gemini.clone(),
            objects,
            supabase.clone(),
        ));

        Ok(Self::new(settings, pipeline, gemini.clone(), supabase, gemini))
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": ROOT_MESSAGE }))
}

async fn health_check() -> &'static str {
    "OK"
}

/// CORS for an explicit origin list, mirroring requested methods and headers.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let origin = origin.trim().trim_end_matches('/');
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(target: "http", "skipping invalid CORS origin '{origin}': {e}");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(target: "http", "handler panicked: {message}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal server error" })),
    )
        .into_response()
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/upload_document/", post(upload::upload_document))
        .route("/upload_document", post(upload::upload_document))
        .route("/query_document/", post(query::query_document))
        .route("/query_document", post(query::query_document));

    let server = &state.settings.server;
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&server.cors_origins))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(middleware)
        .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(settings: Settings, bind: String) -> RouterResult<()> {
    settings.validate()?;
    for key in settings.missing_credentials() {
        tracing::warn!(target: "http", "{key} is not set; calls needing it will fail");
    }

    let state = Arc::new(AppState::from_settings(settings)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    crate::log_event!("http", "listening", "http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    crate::log_event!("http", "stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "http", "failed to listen for ctrl+c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(target: "http", "failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    crate::log_event!("http", "shutdown signal received");
}
