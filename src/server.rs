//! HTTP API over the publishing pipeline.
//!
//! | Route | Body | Publishes with |
//! |-------|------|----------------|
//! | `GET /` | none | health check |
//! | `POST /publish/text` | JSON `{content, title, token?}` | [`Publisher::publish_text`] |
//! | `POST /publish/file` | multipart `file`, `title?`, `token?` | [`Publisher::publish`] |
//!
//! Successful publishes answer `{"url": ..., "status": "success"}`. Errors
//! answer `{"detail": ...}`: input problems (validation, unsupported or
//! unsafe files, failed image uploads) are 400, everything else is 500.
//!
//! The pipeline is blocking, so every publish runs on tokio's blocking pool.
//! Uploaded files are staged in a temp file named after the upload's
//! extension and removed when the request ends, successful or not.
//!
//! [`Publisher::publish_text`]: crate::publish::Publisher::publish_text
//! [`Publisher::publish`]: crate::publish::Publisher::publish

use crate::config::TelepressConfig;
use crate::publish::{self, ConfiguredPublisher, MAX_FILE_SIZE, PublishError, SetupError};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// What the HTTP handlers publish through.
pub trait PublishBackend: Send + Sync + 'static {
    fn publish_text(&self, content: &str, title: &str, token: Option<&str>)
    -> Result<String, ApiError>;

    /// Publish a staged upload. `path` keeps the uploaded file's extension.
    fn publish_file(&self, path: &Path, title: &str, token: Option<&str>)
    -> Result<String, ApiError>;
}

/// Builds a fresh publisher from the loaded config for every request.
pub struct ConfigBackend {
    config: TelepressConfig,
}

impl ConfigBackend {
    pub fn new(config: TelepressConfig) -> Self {
        Self { config }
    }
}

impl PublishBackend for ConfigBackend {
    fn publish_text(
        &self,
        content: &str,
        title: &str,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        let publisher = ConfiguredPublisher::from_config(&self.config, token, false, true)?;
        Ok(publisher.publish_text(content, title)?)
    }

    fn publish_file(&self, path: &Path, title: &str, token: Option<&str>) -> Result<String, ApiError> {
        let with_images = publish::uses_images(path);
        let publisher = ConfiguredPublisher::from_config(&self.config, token, with_images, true)?;
        Ok(publisher.publish(path, Some(title))?)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Publish(e) => match e {
                PublishError::Validation(_)
                | PublishError::NotFound(_)
                | PublishError::Conversion(_)
                | PublishError::Upload(_)
                | PublishError::Security(_) => StatusCode::BAD_REQUEST,
                PublishError::Session(_) | PublishError::Io(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Setup(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "publish request failed");
        } else {
            tracing::info!(error = %self, "publish request rejected");
        }
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct TextPublishRequest {
    pub content: String,
    pub title: String,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub url: String,
    pub status: &'static str,
}

impl PublishResponse {
    fn success(url: String) -> Json<Self> {
        Json(Self {
            url,
            status: "success",
        })
    }
}

#[derive(Clone)]
struct ServeState {
    backend: Arc<dyn PublishBackend>,
}

pub fn router(backend: Arc<dyn PublishBackend>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/publish/text", post(publish_text))
        .route("/publish/file", post(publish_file))
        .layer(DefaultBodyLimit::max(body_limit()))
        .with_state(ServeState { backend })
}

fn body_limit() -> usize {
    usize::try_from(MAX_FILE_SIZE).unwrap_or(usize::MAX)
}

/// Run the API on `addr` until Ctrl-C.
pub fn serve(addr: SocketAddr, backend: Arc<dyn PublishBackend>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");
        axum::serve(listener, router(backend))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down");
            })
            .await
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "telepress",
    })
}

async fn publish_text(
    State(state): State<ServeState>,
    Json(request): Json<TextPublishRequest>,
) -> Result<Json<PublishResponse>, ApiError> {
    let backend = state.backend.clone();
    let url = run_blocking(move || {
        backend.publish_text(&request.content, &request.title, non_empty(&request.token))
    })
    .await?;
    Ok(PublishResponse::success(url))
}

async fn publish_file(
    State(state): State<ServeState>,
    mut multipart: Multipart,
) -> Result<Json<PublishResponse>, ApiError> {
    let mut upload: Option<(TempPath, String)> = None;
    let mut title: Option<String> = None;
    let mut token: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let staged = stage_upload(&file_name, &mut field).await?;
                upload = Some((staged, file_name));
            }
            Some("title") => title = Some(field.text().await.map_err(bad_request)?),
            Some("token") => token = Some(field.text().await.map_err(bad_request)?),
            _ => {}
        }
    }

    let Some((staged, file_name)) = upload else {
        return Err(ApiError::BadRequest("Missing 'file' field".to_string()));
    };
    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or(file_name);

    let backend = state.backend.clone();
    let url = run_blocking(move || {
        let result = backend.publish_file(&staged, &title, non_empty(&token));
        drop(staged);
        result
    })
    .await?;
    Ok(PublishResponse::success(url))
}

/// Stream a multipart file field into a temp file with the same extension.
async fn stage_upload(file_name: &str, field: &mut Field<'_>) -> Result<TempPath, ApiError> {
    let suffix = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix("telepress-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(internal)?
        .into_temp_path();

    let mut out = tokio::fs::File::create(&staged).await.map_err(internal)?;
    while let Some(chunk) = field.chunk().await.map_err(bad_request)? {
        out.write_all(&chunk).await.map_err(internal)?;
    }
    out.flush().await.map_err(internal)?;
    Ok(staged)
}

async fn run_blocking<F>(job: F) -> Result<String, ApiError>
where
    F: FnOnce() -> Result<String, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(internal)?
}

fn non_empty(token: &Option<String>) -> Option<&str> {
    token.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

fn bad_request(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(e.to_string())
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(e.to_string())
}
