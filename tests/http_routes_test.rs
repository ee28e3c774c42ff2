//! End-to-end tests of the HTTP routes against in-memory collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use ragrouter::rag::{NO_RESULTS_ANSWER, SYSTEM_PROMPT, format_prompt_with_context};
use ragrouter::server::ROOT_MESSAGE;
use ragrouter::{
    AppState, DocumentPipeline, Embedder, Generator, HybridQuery, HybridSearch, PipelineOptions,
    RouterError, RouterResult, SearchHit, Settings, UploadedDocument, router,
};

const BOUNDARY: &str = "ragrouter-test-boundary";
const ALLOWED_ORIGIN: &str = "https://uncoverlearning-deploy.vercel.app";

#[derive(Default)]
struct RecordingPipeline {
    calls: Mutex<Vec<UploadedDocument>>,
    fail: AtomicBool,
}

#[async_trait]
impl DocumentPipeline for RecordingPipeline {
    async fn process(
        &self,
        document: UploadedDocument,
        _options: &PipelineOptions,
    ) -> RouterResult<Value> {
        let title = document.title.clone();
        self.calls.lock().unwrap().push(document);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RouterError::NoText(title));
        }
        Ok(json!({ "file_id": "f1", "total_chunks": 3 }))
    }
}

#[derive(Default)]
struct CountingEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed_query(&self, _text: &str) -> RouterResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0.1, 0.2, 0.3])
    }

    async fn embed_documents(&self, texts: &[String]) -> RouterResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.0; 3]).collect())
    }
}

#[derive(Default)]
struct ScriptedSearch {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<HybridQuery>>,
    fail_once: AtomicBool,
}

#[async_trait]
impl HybridSearch for ScriptedSearch {
    async fn search(&self, query: &HybridQuery) -> RouterResult<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_once.swap(false, Ordering::SeqCst) {
            return Err(RouterError::Upstream {
                service: "supabase",
                status: 503,
                body: "database unavailable".to_string(),
            });
        }
        Ok(self.hits.clone())
    }
}

#[derive(Default)]
struct CannedGenerator {
    prompts: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Generator for CannedGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> RouterResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));
        Ok("Mitochondria produce ATP.".to_string())
    }
}

struct Harness {
    pipeline: Arc<RecordingPipeline>,
    embedder: Arc<CountingEmbedder>,
    search: Arc<ScriptedSearch>,
    generator: Arc<CannedGenerator>,
    app: axum::Router,
}

fn harness_with(settings: Settings, search: ScriptedSearch) -> Harness {
    let pipeline = Arc::new(RecordingPipeline::default());
    let embedder = Arc::new(CountingEmbedder::default());
    let search = Arc::new(search);
    let generator = Arc::new(CannedGenerator::default());

    let state = AppState::new(
        settings,
        pipeline.clone(),
        embedder.clone(),
        search.clone(),
        generator.clone(),
    );

    Harness {
        pipeline,
        embedder,
        search,
        generator,
        app: router(Arc::new(state)),
    }
}

fn harness(hits: Vec<SearchHit>) -> Harness {
    harness_with(
        Settings::default(),
        ScriptedSearch {
            hits,
            ..Default::default()
        },
    )
}

fn multipart_body(file: Option<(&str, &[u8])>, original_name: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(name) = original_name {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"original_name\"\r\n\r\n{name}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(path: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn query_request(path: &str, query: &str, file_title: &str) -> Request<Body> {
    let body = serde_urlencoded::to_string([("query", query), ("file_title", file_title)]).unwrap();
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_and_health() {
    let h = harness(Vec::new());

    let response = send(&h.app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "message": ROOT_MESSAGE }));

    let response = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_upload_rejects_non_pdf_without_calling_pipeline() {
    let h = harness(Vec::new());
    let body = multipart_body(Some(("notes.txt", b"plain text".as_slice())), Some("notes"));

    let response = send(&h.app, upload_request("/upload_document/", body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "detail": "Only PDF files are allowed." })
    );
    assert!(h.pipeline.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_passes_full_bytes_and_title_once() {
    let h = harness(Vec::new());
    let pdf: Vec<u8> = b"%PDF-1.4\n"
        .iter()
        .copied()
        .chain((0..4096u32).map(|i| (i % 251) as u8))
        .collect();
    let body = multipart_body(Some(("doc1.pdf", pdf.as_slice())), Some("doc1"));

    let response = send(&h.app, upload_request("/upload_document/", body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "message": "Document processed successfully",
            "details": { "file_id": "f1", "total_chunks": 3 }
        })
    );

    let calls = h.pipeline.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].file_name, "doc1.pdf");
    assert_eq!(calls[0].title, "doc1");
    assert_eq!(&calls[0].bytes[..], &pdf[..]);
}

#[tokio::test]
async fn test_upload_accepts_uppercase_extension() {
    let h = harness(Vec::new());
    let body = multipart_body(Some(("SCAN.PDF", b"%PDF-1.7".as_slice())), Some("scan"));

    let response = send(&h.app, upload_request("/upload_document", body)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.pipeline.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_missing_original_name_is_client_error() {
    let h = harness(Vec::new());
    let body = multipart_body(Some(("doc1.pdf", b"%PDF-1.4".as_slice())), None);

    let response = send(&h.app, upload_request("/upload_document/", body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = json_body(response).await;
    assert_eq!(detail["detail"], "Missing required field: original_name");
    assert!(h.pipeline.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_missing_file_is_client_error() {
    let h = harness(Vec::new());
    let body = multipart_body(None, Some("doc1"));

    let response = send(&h.app, upload_request("/upload_document/", body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "detail": "Missing required field: file" })
    );
    assert!(h.pipeline.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_over_body_limit_is_payload_too_large() {
    let mut settings = Settings::default();
    settings.server.max_upload_bytes = 64;
    let h = harness_with(settings, ScriptedSearch::default());
    let body = multipart_body(Some(("a.pdf", vec![b'a'; 1000].as_slice())), Some("a"));

    let response = send(&h.app, upload_request("/upload_document/", body)).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert!(body["detail"].is_string(), "{body}");
    assert!(h.pipeline.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_pipeline_failure_is_server_error() {
    let h = harness(Vec::new());
    h.pipeline.fail.store(true, Ordering::SeqCst);
    let body = multipart_body(Some(("blank.pdf", b"%PDF-1.4".as_slice())), Some("blank"));

    let response = send(&h.app, upload_request("/upload_document/", body)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = json_body(response).await;
    let detail = detail["detail"].as_str().unwrap();
    assert!(detail.starts_with("Failed to process document: "), "{detail}");
}

#[tokio::test]
async fn test_query_rejects_empty_fields() {
    let h = harness(vec![SearchHit::from_text("unused")]);

    let response = send(&h.app, query_request("/query_document/", "", "doc1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "detail": "Query cannot be empty." })
    );

    let response = send(&h.app, query_request("/query_document/", "What is ATP?", "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({ "detail": "Document title cannot be empty." })
    );

    let response = send(&h.app, query_request("/query_document/", "   ", "doc1")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 0);
    assert!(h.search.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_query_without_hits_skips_generation() {
    let h = harness(Vec::new());

    let response = send(&h.app, query_request("/query_document/", "What is ATP?", "doc1")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "answer": NO_RESULTS_ANSWER, "chunks": [] })
    );
    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.search.queries.lock().unwrap().len(), 1);
    assert!(h.generator.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_query_with_hits_generates_once_and_returns_raw_chunks() {
    let raw_hits = vec![
        json!({
            "id": "f1-0",
            "fileId": "f1",
            "originalName": "doc1",
            "extractedText": "Mitochondria are the powerhouse of the cell."
        }),
        json!({
            "id": "f1-4",
            "fileId": "f1",
            "originalName": "doc1",
            "extractedText": "ATP synthase sits in the inner membrane.",
            "pageNumber": null
        }),
    ];
    let hits: Vec<SearchHit> = raw_hits
        .iter()
        .map(|v| serde_json::from_value(v.clone()).unwrap())
        .collect();

    let mut settings = Settings::default();
    settings.search.match_count = 5;
    settings.search.full_text_weight = 0.5;
    settings.search.semantic_weight = 2.0;
    settings.search.rrf_k = 60;
    let h = harness_with(
        settings,
        ScriptedSearch {
            hits,
            ..Default::default()
        },
    );

    let response = send(&h.app, query_request("/query_document/", "What is ATP?", "doc1")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["answer"], "Mitochondria produce ATP.");
    assert_eq!(body["chunks"], Value::Array(raw_hits.clone()));

    assert_eq!(h.embedder.calls.load(Ordering::SeqCst), 1);

    let queries = h.search.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    let q = &queries[0];
    assert_eq!(q.query_text, "What is ATP?");
    assert_eq!(q.file_title, "doc1");
    assert_eq!(q.query_embedding, vec![0.1, 0.2, 0.3]);
    assert_eq!(q.match_count, 5);
    assert_eq!(q.full_text_weight, 0.5);
    assert_eq!(q.semantic_weight, 2.0);
    assert_eq!(q.rrf_k, 60);

    let prompts = h.generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    let (system_prompt, user_prompt) = &prompts[0];
    assert_eq!(system_prompt, SYSTEM_PROMPT);
    let expected_hits: Vec<SearchHit> = serde_json::from_value(Value::Array(raw_hits)).unwrap();
    assert_eq!(
        user_prompt,
        &format_prompt_with_context(&expected_hits, "What is ATP?")
    );
    assert!(user_prompt.contains("Document 2:\nATP synthase sits in the inner membrane.\n"));
}

#[tokio::test]
async fn test_query_accepts_multipart_body() {
    let h = harness(Vec::new());
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\nWhat is ATP?\r\n\
         --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file_title\"\r\n\r\ndoc1\r\n\
         --{BOUNDARY}--\r\n"
    );

    let response = send(&h.app, upload_request("/query_document/", body.into_bytes())).await;

    assert_eq!(response.status(), StatusCode::OK);
    let queries = h.search.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].query_text, "What is ATP?");
    assert_eq!(queries[0].file_title, "doc1");
}

#[tokio::test]
async fn test_query_accepts_json_body() {
    let h = harness(Vec::new());
    let request = Request::builder()
        .method("POST")
        .uri("/query_document/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "query": "What is ATP?", "file_title": "doc1" }).to_string(),
        ))
        .unwrap();

    let response = send(&h.app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.search.queries.lock().unwrap()[0].file_title, "doc1");
}

#[tokio::test]
async fn test_downstream_failure_does_not_poison_later_requests() {
    let h = harness_with(
        Settings::default(),
        ScriptedSearch {
            hits: Vec::new(),
            fail_once: AtomicBool::new(true),
            ..Default::default()
        },
    );

    let response = send(&h.app, query_request("/query_document/", "What is ATP?", "doc1")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Failed to process query: "), "{detail}");
    assert!(detail.contains("database unavailable"), "{detail}");

    let response = send(&h.app, query_request("/query_document/", "What is ATP?", "doc1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["answer"], NO_RESULTS_ANSWER);
}

#[tokio::test]
async fn test_routes_are_mounted_under_api_prefix() {
    let h = harness(Vec::new());

    let response = send(&h.app, Request::get("/api").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["message"], ROOT_MESSAGE);

    let response = send(&h.app, query_request("/api/query_document/", "What is ATP?", "doc1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = multipart_body(Some(("doc1.pdf", b"%PDF-1.4".as_slice())), Some("doc1"));
    let response = send(&h.app, upload_request("/api/upload_document/", body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.pipeline.calls.lock().unwrap().len(), 1);
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/query_document/")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let h = harness(Vec::new());

    let response = send(&h.app, preflight(ALLOWED_ORIGIN)).await;

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).is_some());
}

#[tokio::test]
async fn test_cors_preflight_for_other_origin() {
    let h = harness(Vec::new());

    let response = send(&h.app, preflight("https://evil.example.com")).await;

    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_cors_origins_come_from_settings() {
    let mut settings = Settings::default();
    settings.server.cors_origins = vec!["http://localhost:3000".to_string()];
    let h = harness_with(settings, ScriptedSearch::default());

    let response = send(&h.app, preflight("http://localhost:3000")).await;
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:3000"
    );

    let response = send(&h.app, preflight(ALLOWED_ORIGIN)).await;
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_serve_reports_bind_failure() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap().to_string();

    let err = ragrouter::serve(Settings::default(), addr).await.unwrap_err();

    assert!(matches!(err, RouterError::Io(_)), "{err}");
}
