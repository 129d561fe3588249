//! HTTP server for the sheetdiff API.
//!
//! Provides REST endpoints for CSV upload, comparison runs and report
//! download. The upload store is passed in as explicit state; handlers own
//! no global mutable data.
//!
//! # API Endpoints
//!
//! | Method | Path                       | Description                        |
//! |--------|----------------------------|------------------------------------|
//! | GET    | `/health`                  | Health check                       |
//! | POST   | `/api/upload`              | Upload CSV files                   |
//! | POST   | `/api/process`             | Run a comparison over uploads      |
//! | GET    | `/api/download/{filename}` | Download a generated XLSX report   |
//! | GET    | `/api/logs`                | SSE stream for real-time logs      |

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{error_response, ProcessRequest, ProcessResponse, UploadResponse};
use crate::compare::{run_comparison, CompareOptions, SourceFile};
use crate::error::{FileIssue, ServerError};
use crate::report::xlsx::{report_filename, write_report};
use crate::report::RunStatus;
use crate::storage::UploadStore;

/// Start the HTTP server.
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(UploadStore::from_env()?);

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/process", post(process_files))
        .route("/api/download/{filename}", get(download_report))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Sheetdiff server running on http://localhost:{}", port);
    println!("   POST /api/upload              - Upload CSV files");
    println!("   POST /api/process             - Run a comparison");
    println!("   GET  /api/download/<file>     - Download XLSX report");
    println!("   GET  /api/logs                - SSE log stream");
    println!("   GET  /health                  - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "sheetdiff",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "process": "POST /api/process",
            "download": "GET /api/download/{filename}",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload one or more CSV files.
async fn upload_csv(
    State(store): State<Arc<UploadStore>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), (StatusCode, Json<Value>)> {
    let mut uploaded_files = Vec::new();
    let mut errors = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(error_response(&format!("Multipart error: {}", e))),
        )
    })? {
        if field.name().unwrap_or("") != "files" {
            continue;
        }
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(error_response(&format!("Read error: {}", e))),
            )
        })?;

        if !filename.to_lowercase().ends_with(".csv") {
            errors.push(FileIssue {
                file: filename,
                message: "Invalid file type. Only CSV files are allowed".into(),
            });
            continue;
        }

        match store.save_upload(&filename, &bytes) {
            Ok(stored) => uploaded_files.push(stored),
            Err(err) => errors.push(FileIssue {
                file: filename,
                message: err.to_string(),
            }),
        }
    }

    if uploaded_files.is_empty() && errors.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(error_response("No files provided")),
        ));
    }

    let (code, status) = match (uploaded_files.is_empty(), errors.is_empty()) {
        (false, true) => (StatusCode::OK, "success"),
        (false, false) => (StatusCode::MULTI_STATUS, "partial_success"),
        (true, _) => (StatusCode::BAD_REQUEST, "failed"),
    };

    Ok((
        code,
        Json(UploadResponse {
            status: status.to_string(),
            uploaded_files,
            errors,
        }),
    ))
}

/// Run the comparison pipeline over previously uploaded files.
async fn process_files(
    State(store): State<Arc<UploadStore>>,
    Json(request): Json<ProcessRequest>,
) -> Result<(StatusCode, Json<ProcessResponse>), (StatusCode, Json<Value>)> {
    if request.file_names.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(error_response("'fileNames' must not be empty")),
        ));
    }
    if request.operation_column.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(error_response("'operationColumn' must not be empty")),
        ));
    }
    if !request.threshold_value.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(error_response("'thresholdValue' must be a finite number")),
        ));
    }

    let mut sources = Vec::new();
    let mut missing = Vec::new();
    for name in &request.file_names {
        match store.read_upload(name) {
            Ok(bytes) => sources.push(SourceFile {
                name: name.clone(),
                bytes,
            }),
            Err(_) => missing.push(FileIssue {
                file: name.clone(),
                message: "File not found in upload storage".into(),
            }),
        }
    }

    let options = CompareOptions {
        operation_column: request.operation_column.clone(),
        threshold: request.threshold_value,
    };
    let mut report = run_comparison(&sources, &options);
    report.summary.files = request.file_names.clone();
    report.record_file_errors(missing);

    let excel_report_filename = if report.comparisons.is_empty() {
        None
    } else {
        let filename = report_filename("comparison_report");
        match write_report(&report, &store.report_path(&filename)) {
            Ok(()) => Some(filename),
            Err(err) => {
                super::logs::log_error(format!("Failed to write XLSX report: {}", err));
                None
            }
        }
    };

    // Source files are consumed by the run, success or not.
    store.remove_uploads(&request.file_names);

    let code = if report.status == RunStatus::Failed {
        StatusCode::UNPROCESSABLE_ENTITY
    } else if !report.errors.is_empty() {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };

    Ok((
        code,
        Json(ProcessResponse::from_report(&report, excel_report_filename)),
    ))
}

/// Download a generated XLSX report.
async fn download_report(
    State(store): State<Arc<UploadStore>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    match store.read_report(&filename) {
        Ok(bytes) => {
            let headers = [
                (
                    header::CONTENT_TYPE,
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                        .to_string(),
                ),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ];
            Ok((headers, bytes))
        }
        Err(ServerError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(error_response("File not found in processed directory")),
        )),
        Err(err) => Err((StatusCode::BAD_REQUEST, Json(error_response(&err.to_string())))),
    }
}
