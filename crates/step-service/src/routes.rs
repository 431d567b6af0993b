//! HTTP surface: decodes requests, runs the matching pipeline on the
//! blocking pool and encodes the outcome.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Request, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::Span;

use script_engine::GearParams;

use crate::error::ServiceError;
use crate::pipeline::Pipeline;
use crate::state::AppState;

pub const GENERATED_FILE_NAME: &str = "generated_model.step";
pub const MODIFIED_FILE_NAME: &str = "modified_model.step";
pub const GEAR_FILE_NAME: &str = "generated_gear.step";

const FILE_FIELD: &str = "step_file";
const SCRIPT_FIELD: &str = "script";
const DEFAULT_UPLOAD_NAME: &str = "uploaded.step";

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(liveness))
        .route("/generate", post(generate))
        .route("/modify", post(modify))
        .route("/analyze", post(analyze))
        .route("/generate_gear", post(generate_gear))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

fn request_span(request: &Request) -> Span {
    tracing::info_span!(
        "request",
        id = %uuid::Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    )
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn liveness() -> &'static str {
    "step-forge service is running"
}

async fn generate(State(state): State<AppState>, body: Bytes) -> Result<Response, ServiceError> {
    let script = script_from_json(&body)?;
    let bytes = run_blocking(&state, move |p| p.generate(&script)).await?;
    Ok(step_attachment(GENERATED_FILE_NAME, bytes))
}

async fn modify(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServiceError> {
    let form = read_form(form).await?;
    let (_, upload) = form
        .file
        .ok_or_else(|| ServiceError::missing("no `step_file` file in the request"))?;
    let script = form
        .script
        .ok_or_else(|| ServiceError::missing("no `script` field in the form"))?;

    let bytes = run_blocking(&state, move |p| p.modify(&upload, &script)).await?;
    Ok(step_attachment(MODIFIED_FILE_NAME, bytes))
}

async fn analyze(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServiceError> {
    let form = read_form(form).await?;
    let (file_name, upload) = form
        .file
        .ok_or_else(|| ServiceError::missing("no `step_file` file in the request"))?;

    let report = run_blocking(&state, move |p| p.analyze(&upload, &file_name)).await?;
    Ok(Json(report).into_response())
}

async fn generate_gear(State(state): State<AppState>, body: Bytes) -> Result<Response, ServiceError> {
    let params: GearParams = if body.iter().all(u8::is_ascii_whitespace) {
        GearParams::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::invalid(format!("invalid gear parameters: {e}")))?
    };
    let bytes = run_blocking(&state, move |p| p.generate_gear(&params)).await?;
    Ok(step_attachment(GEAR_FILE_NAME, bytes))
}

// ── Helper Functions ─────────────────────────────────────────────────────

/// Run a pipeline flow on the blocking pool inside the request span.
async fn run_blocking<T, F>(state: &AppState, job: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&Pipeline) -> Result<T, ServiceError> + Send + 'static,
{
    let pipeline = Arc::clone(&state.pipeline);
    let span = Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(|| job(&pipeline)))
        .await
        .map_err(|e| ServiceError::Internal {
            reason: format!("pipeline task failed: {e}"),
        })?
}

fn script_from_json(body: &[u8]) -> Result<String, ServiceError> {
    let missing = || ServiceError::missing("a JSON body with a `script` key is required");
    let value: Value = serde_json::from_slice(body).map_err(|_| missing())?;
    match value.get(SCRIPT_FIELD) {
        Some(Value::String(script)) => Ok(script.clone()),
        Some(_) => Err(ServiceError::invalid("`script` must be a string")),
        None => Err(missing()),
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    /// Client-side file name and contents.
    file: Option<(String, Vec<u8>)>,
    script: Option<String>,
}

async fn read_form(form: Result<Multipart, MultipartRejection>) -> Result<UploadForm, ServiceError> {
    let mut multipart = form.map_err(|e| ServiceError::missing(format!("a multipart form is required: {e}")))?;
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ServiceError::invalid(format!("malformed multipart body: {e}"))
    };

    let mut upload = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(DEFAULT_UPLOAD_NAME)
                    .to_owned();
                let bytes = field.bytes().await.map_err(malformed)?;
                upload.file = Some((file_name, bytes.to_vec()));
            }
            Some(SCRIPT_FIELD) => {
                upload.script = Some(field.text().await.map_err(malformed)?);
            }
            _ => {}
        }
    }
    Ok(upload)
}

fn step_attachment(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
