//! HTTP Server for the Targetron API.
//!
//! Each POST runs exactly one transform on the uploaded CSV.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                  |
//! |--------|-------------------|----------------------------------------------|
//! | GET    | `/health`         | Health check                                 |
//! | GET    | `/api/layouts`    | Contact layouts known to the registry        |
//! | POST   | `/api/expand`     | Upload CSV, one row per contact              |
//! | POST   | `/api/explode`    | Upload CSV, one row per delimited piece      |
//! | GET    | `/api/logs`       | SSE stream for real-time logs                |
//!
//! POST bodies are multipart: `file` (required), `prefix`, and `layout`
//! (expand) or `delimiter` (explode). `?download=true` answers with the CSV
//! attachment instead of the JSON job.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, JobResponse};
use crate::cache::LayoutRegistry;
use crate::error::{PipelineError, RegistryError, ServerError, ServerResult};
use crate::transform::pipeline::{run_bytes, TransformKind, TransformOptions};

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Targetron server running on http://localhost:{}", port);
    println!("   POST /api/expand  - Expand contact groups");
    println!("   POST /api/explode - Explode delimited cells");
    println!("   GET  /api/layouts - Contact layouts");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// All routes with a permissive CORS layer.
pub fn router() -> Router {
    router_with_limit(MAX_UPLOAD_BYTES)
}

/// Same as [`router`] with a custom upload size limit on the POST routes.
pub fn router_with_limit(max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/layouts", get(list_layouts))
        .route("/api/expand", post(expand_csv).layer(DefaultBodyLimit::max(max_upload_bytes)))
        .route("/api/explode", post(explode_csv).layer(DefaultBodyLimit::max(max_upload_bytes)))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Pipeline(e) if is_client_error(e) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &self {
            ServerError::Pipeline(e) => e.to_string(),
            other => other.to_string(),
        };
        (status, Json(error_response(&message))).into_response()
    }
}

/// Bad uploads and unknown layout ids are the caller's fault.
fn is_client_error(error: &PipelineError) -> bool {
    error.is_input_error() || matches!(error, PipelineError::Registry(RegistryError::NotFound(_)))
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "targetron",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "expand": "POST /api/expand",
            "explode": "POST /api/explode",
            "layouts": "GET /api/layouts",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// Layouts known to the registry, built-ins first.
async fn list_layouts() -> ServerResult<Json<Value>> {
    let body = tokio::task::spawn_blocking(|| layouts_json(&LayoutRegistry::new()))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(body))
}

fn layouts_json(registry: &LayoutRegistry) -> Value {
    let layouts: Vec<Value> = registry
        .list()
        .into_iter()
        .map(|stored| {
            json!({
                "id": stored.id,
                "name": stored.name,
                "description": stored.layout.description,
                "builtin": stored.builtin,
                "useCount": stored.use_count,
                "groups": stored.layout.groups.len(),
                "columns": stored.layout.referenced_columns(),
            })
        })
        .collect();
    json!({ "layouts": layouts })
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // Lagged receivers just miss entries.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[derive(Debug, Default, Deserialize)]
struct JobQuery {
    #[serde(default)]
    download: bool,
}

/// Fields of an upload form.
#[derive(Debug, Default)]
struct Upload {
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
    layout: Option<String>,
    prefix: Option<String>,
    delimiter: Option<String>,
}

async fn expand_csv(Query(query): Query<JobQuery>, multipart: Multipart) -> ServerResult<Response> {
    run_job(TransformKind::Expand, query, multipart).await
}

async fn explode_csv(Query(query): Query<JobQuery>, multipart: Multipart) -> ServerResult<Response> {
    run_job(TransformKind::Explode, query, multipart).await
}

async fn run_job(kind: TransformKind, query: JobQuery, multipart: Multipart) -> ServerResult<Response> {
    let upload = read_upload(multipart).await?;
    let options = job_options(kind, &upload)?;
    let bytes = upload
        .bytes
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;

    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW {} JOB: {} ({} bytes)",
        kind.as_str().to_uppercase(),
        upload.file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    );
    println!("{}\n", "=".repeat(70));

    let result = tokio::task::spawn_blocking(move || run_bytes(&bytes, kind, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(|e| {
            log_error(format!("Transform failed: {}", e));
            ServerError::from(e)
        })?;

    println!("\n{}", "=".repeat(70));
    println!("📊 SUMMARY");
    println!("{}", "=".repeat(70));
    println!("   Input rows:   {}", result.stats.input_rows);
    println!("   Output rows:  {}", result.stats.output_rows);
    if let Some(ref id) = result.layout_id {
        println!("   Layout:       {}", id);
    }
    println!("{}\n", "=".repeat(70));

    let response = JobResponse::try_from(result).map_err(|e| ServerError::Internal(e.to_string()))?;

    if query.download {
        let disposition = format!("attachment; filename=\"{}\"", response.file_name);
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            response.csv,
        )
            .into_response());
    }

    Ok(Json(response).into_response())
}

async fn read_upload(mut multipart: Multipart) -> ServerResult<Upload> {
    let mut upload = Upload::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload.bytes = Some(bytes.to_vec());
            }
            "layout" | "prefix" | "delimiter" => {
                let text = field.text().await.map_err(multipart_error)?;
                let slot = match name.as_str() {
                    "layout" => &mut upload.layout,
                    "prefix" => &mut upload.prefix,
                    _ => &mut upload.delimiter,
                };
                *slot = Some(text);
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Over-limit bodies surface as multipart errors with a 413 status.
fn multipart_error(e: MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::TooLarge(e.body_text())
    } else {
        ServerError::BadRequest(format!("Multipart error: {}", e.body_text()))
    }
}

fn job_options(kind: TransformKind, upload: &Upload) -> ServerResult<TransformOptions> {
    let mut options = TransformOptions::default();

    if let Some(prefix) = upload.prefix.as_deref().filter(|p| !p.trim().is_empty()) {
        options.file_prefix = prefix.to_string();
    }
    if kind == TransformKind::Expand {
        options.layout_id = upload.layout.clone().filter(|l| !l.trim().is_empty());
    }
    if let Some(ref delimiter) = upload.delimiter {
        options.split_on = parse_delimiter(delimiter).map_err(ServerError::BadRequest)?;
    }

    Ok(options)
}

/// A single delimiter character; `tab` and `\t` name the tab character.
pub fn parse_delimiter(value: &str) -> Result<char, String> {
    match value {
        "tab" | "TAB" | "\\t" => return Ok('\t'),
        _ => {}
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("Delimiter must be a single character, got '{}'", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsvError;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(","), Ok(','));
        assert_eq!(parse_delimiter(";"), Ok(';'));
        assert_eq!(parse_delimiter("tab"), Ok('\t'));
        assert_eq!(parse_delimiter("\\t"), Ok('\t'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(",;").is_err());
    }

    #[test]
    fn test_job_options() {
        let upload = Upload {
            layout: Some("numbered".into()),
            prefix: Some("leads".into()),
            delimiter: Some(";".into()),
            ..Upload::default()
        };

        let expand = job_options(TransformKind::Expand, &upload).unwrap();
        assert_eq!(expand.layout_id.as_deref(), Some("numbered"));
        assert_eq!(expand.file_prefix, "leads");

        let explode = job_options(TransformKind::Explode, &upload).unwrap();
        assert!(explode.layout_id.is_none());
        assert_eq!(explode.split_on, ';');
    }

    #[test]
    fn test_blank_fields_keep_defaults() {
        let upload = Upload {
            layout: Some(" ".into()),
            prefix: Some("".into()),
            ..Upload::default()
        };
        let options = job_options(TransformKind::Expand, &upload).unwrap();
        assert!(options.layout_id.is_none());
        assert_eq!(options.file_prefix, "targetron");
    }

    #[test]
    fn test_layouts_json_lists_builtins_first() {
        let dir = tempfile::tempdir().unwrap();
        let body = layouts_json(&LayoutRegistry::with_dir(dir.path()));

        let layouts = body["layouts"].as_array().unwrap();
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[0]["builtin"], true);
        assert!(layouts.iter().any(|l| l["id"] == "targetron"));
    }

    async fn post_explode(addr: SocketAddr, csv: &str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let boundary = "targetron-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"leads.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = boundary,
            csv = csv
        );
        let request = format!(
            "POST /api/explode?download=true HTTP/1.1\r\nHost: localhost\r\n\
             Content-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            boundary,
            body.len(),
            body
        );

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => response.extend_from_slice(&buf[..n]),
            }
        }
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn test_upload_limit_on_post_routes() {
        LOG_BROADCASTER.set_quiet(true);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router_with_limit(1024)).await;
        });

        let small = post_explode(addr, "id,tags\n1,\"a,b\"\n").await;
        assert!(small.starts_with("HTTP/1.1 200"), "{}", small);
        assert!(small.contains("targetron_exploded.csv"));
        assert!(small.contains("1,a\n1,b"));

        let large = format!("id,tags\n{}", "1,x\n".repeat(500));
        let rejected = post_explode(addr, &large).await;
        assert!(rejected.starts_with("HTTP/1.1 413"), "{}", rejected);
    }

    #[test]
    fn test_default_limit_above_axum_default() {
        assert!(MAX_UPLOAD_BYTES > 2 * 1024 * 1024);
    }

    #[test]
    fn test_error_status() {
        let bad_csv = ServerError::Pipeline(CsvError::EmptyFile.into());
        assert_eq!(bad_csv.into_response().status(), StatusCode::BAD_REQUEST);

        let unknown_layout = ServerError::Pipeline(RegistryError::NotFound("x".into()).into());
        assert_eq!(unknown_layout.into_response().status(), StatusCode::BAD_REQUEST);

        let too_large = ServerError::TooLarge("length limit exceeded".into());
        assert_eq!(too_large.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);

        let internal = ServerError::Internal("boom".into());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
