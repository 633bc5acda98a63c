use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::flash;
use super::page::render_index;
use super::state::ServerState;
use super::upload::{allowed_file, read_file_field, save};
use crate::pipeline::DetectionResult;
use crate::settings::Settings;

const NO_FILE_MESSAGE: &str = "No file selected";
const NOT_ALLOWED_MESSAGE: &str = "File type not allowed (png, jpg, jpeg, bmp, pdf)";

pub async fn run_server(settings: Settings) -> Result<()> {
    for dir in [&settings.uploads_dir, &settings.results_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }
    let pipeline = settings.build_pipeline()?;
    info!(
        "ocr engine: {}, label font: {} ({})",
        pipeline.engine().name(),
        pipeline.style().font.family(),
        pipeline.style().font.source()
    );
    let state = Arc::new(ServerState {
        pipeline: Arc::new(pipeline),
        uploads_dir: settings.uploads_dir.clone(),
        results_dir: settings.results_dir.clone(),
    });
    let app = router(state, settings.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(&settings.addr)
        .await
        .with_context(|| "failed to bind server address")?;
    info!("listening on http://{}", settings.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<ServerState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index).post(upload))
        .route("/results/:filename", get(result_file))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn index(headers: HeaderMap) -> Response {
    let message = flash::read(&headers);
    let page = render_page(message.as_deref(), None);
    if message.is_some() {
        (AppendHeaders([(SET_COOKIE, flash::clear_cookie())]), page).into_response()
    } else {
        page
    }
}

async fn upload(State(state): State<Arc<ServerState>>, mut multipart: Multipart) -> Response {
    let upload = match read_file_field(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return redirect_with_flash(NO_FILE_MESSAGE),
        Err(err) => {
            warn!("upload rejected: {:#}", err);
            return redirect_with_flash(&format!("Error during processing: {:#}", err));
        }
    };
    if upload.filename.is_empty() {
        return redirect_with_flash(NO_FILE_MESSAGE);
    }
    if !allowed_file(&upload.filename) {
        info!("upload rejected: {}", upload.filename);
        return redirect_with_flash(NOT_ALLOWED_MESSAGE);
    }

    let upload_path = match save(&upload, &state.uploads_dir).await {
        Ok(path) => path,
        Err(err) => return processing_failed(err),
    };
    info!(
        "received {} ({} bytes)",
        upload.filename,
        upload.bytes.len()
    );

    let pipeline = state.pipeline.clone();
    let results_dir = state.results_dir.clone();
    let outcome =
        tokio::task::spawn_blocking(move || pipeline.process(&upload_path, &results_dir)).await;
    match outcome {
        Ok(Ok(results)) => render_page(None, Some(&results)),
        Ok(Err(err)) => processing_failed(err),
        Err(err) => processing_failed(anyhow::anyhow!("server task failed: {}", err)),
    }
}

async fn result_file(
    State(state): State<Arc<ServerState>>,
    UrlPath(filename): UrlPath<String>,
) -> Response {
    if !is_plain_file_name(&filename) {
        return StatusCode::NOT_FOUND.into_response();
    }
    let path = state.results_dir.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(CONTENT_TYPE, content_type_for(&filename))], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn render_page(flash_message: Option<&str>, results: Option<&[DetectionResult]>) -> Response {
    match render_index(flash_message, results) {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            error!("{:#}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

fn processing_failed(err: anyhow::Error) -> Response {
    error!("processing failed: {:#}", err);
    redirect_with_flash(&format!("Error during processing: {:#}", err))
}

fn redirect_with_flash(message: &str) -> Response {
    (
        AppendHeaders([(SET_COOKIE, flash::set_cookie(message))]),
        Redirect::to("/"),
    )
        .into_response()
}

/// A single normal path component: no separators, no `.`/`..`.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
