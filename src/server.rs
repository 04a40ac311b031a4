//! Web front end: an upload form, the conversion endpoint and a one-time
//! download of the narrated MP3.
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /` | upload form |
//! | `POST /convert` | multipart field `file` holding one `.docx`; renders the rewritten text and a download link |
//! | `GET /download/{id}` | the run's `final.mp3` as an attachment; the run's scratch space is removed afterwards |
//! | `GET /health` | liveness probe |
//!
//! Each upload runs in its own [`Workspace`]. Successful workspaces are kept
//! in a small registry keyed by run id until their audio is downloaded; when
//! the registry is full the oldest run is dropped (and its directory removed).

use crate::config::NarrationConfig;
use crate::convert::{narrate, resolve_completer};
use crate::error::Docx2SpeechError;
use crate::output::{AUDIO_CONTENT_TYPE, AUDIO_FILE_NAME};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::speech;
use crate::workspace::Workspace;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Completed runs kept waiting for their download.
const MAX_PENDING_DOWNLOADS: usize = 16;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: NarrationConfig,
    pending: Mutex<VecDeque<Workspace>>,
}

impl AppState {
    /// Build the state, resolving the completion provider and speech engine
    /// once so every request shares them.
    pub fn new(mut config: NarrationConfig) -> Result<Self, Docx2SpeechError> {
        config.completer = Some(resolve_completer(&config)?);
        config.speech_engine = Some(speech::engine_for(&config)?);
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pending: Mutex::new(VecDeque::new()),
            }),
        })
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.inner.config
    }

    fn retain(&self, workspace: Workspace) {
        let evicted = {
            let mut pending = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            pending.push_back(workspace);
            if pending.len() > MAX_PENDING_DOWNLOADS {
                pending.pop_front()
            } else {
                None
            }
        };
        if let Some(old) = evicted {
            debug!("Evicting undownloaded run {}", old.id());
        }
    }

    fn take(&self, id: Uuid) -> Option<Workspace> {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let pos = pending.iter().position(|ws| ws.id() == id)?;
        pending.remove(pos)
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(upload_form))
        .route("/convert", post(convert_upload))
        .route("/download/{id}", get(download))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the web front end on `addr` until Ctrl+C or SIGTERM.
pub async fn serve(config: NarrationConfig, addr: SocketAddr) -> Result<(), Docx2SpeechError> {
    let app = router(AppState::new(config)?);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Docx2SpeechError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!("docx2speech listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Docx2SpeechError::Internal(format!("server error: {e}")))?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn upload_form() -> Html<String> {
    Html(page(
        "Upload a Word document (.docx). Its text is rewritten for listening \
         (formulas, tables and images become spoken descriptions) and read aloud.",
        "",
    ))
}

async fn convert_upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let doc = match read_upload(&mut multipart).await {
        Ok(doc) => doc,
        Err(message) => return error_page(StatusCode::BAD_REQUEST, &message),
    };

    let workspace = match Workspace::create(&state.config().scratch_root).await {
        Ok(ws) => ws,
        Err(e) => return error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    match narrate(&doc, &workspace, state.config()).await {
        Ok(output) => {
            let id = workspace.id();
            state.retain(workspace);
            let body = format!(
                "<h2>Rewritten text</h2>\n<pre>{}</pre>\n<p><a href=\"/download/{id}\" download=\"{AUDIO_FILE_NAME}\">Download {AUDIO_FILE_NAME}</a></p>",
                html_escape::encode_text(&output.narration_text),
            );
            Html(page("Conversion complete.", &body)).into_response()
        }
        Err(e) => error_page(status_for(&e), &e.to_string()),
    }
}

async fn download(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(workspace) = Uuid::parse_str(&id).ok().and_then(|id| state.take(id)) else {
        return (StatusCode::NOT_FOUND, "Unknown or already downloaded").into_response();
    };

    // `workspace` is dropped (and its directory removed) once the bytes are read.
    match tokio::fs::read(workspace.audio_path()).await {
        Ok(bytes) => {
            info!("Serving {} bytes for run {}", bytes.len(), id);
            (
                [
                    (header::CONTENT_TYPE, AUDIO_CONTENT_TYPE.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{AUDIO_FILE_NAME}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            warn!("Audio for run {} vanished: {}", id, e);
            (StatusCode::NOT_FOUND, "Audio file is no longer available").into_response()
        }
    }
}

/// Pull the `file` field out of the form.
async fn read_upload(multipart: &mut Multipart) -> Result<SourceDocument, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read upload: {e}"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.docx").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read file data: {e}"))?;
        debug!("Received '{}' ({} bytes)", file_name, data.len());
        if data.is_empty() {
            return Err("The uploaded file is empty.".to_string());
        }
        return Ok(SourceDocument::new(file_name, data.to_vec()));
    }
    Err("No file was uploaded (expected a form field named 'file').".to_string())
}

fn status_for(err: &Docx2SpeechError) -> StatusCode {
    match err {
        Docx2SpeechError::Parse { .. }
        | Docx2SpeechError::NothingToConvert
        | Docx2SpeechError::NotADocx { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Docx2SpeechError::Upstream { .. } | Docx2SpeechError::Synthesis { .. } => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let body = format!(
        "<p class=\"error\">{}</p>",
        html_escape::encode_text(message)
    );
    (status, Html(page("The document could not be converted.", &body))).into_response()
}

fn page(lead: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>docx2speech</title></head>
<body>
<h1>Word document to speech</h1>
<p>{lead}</p>
<form action="/convert" method="post" enctype="multipart/form-data">
  <input type="file" name="file" accept=".docx" required>
  <button type="submit">Convert</button>
</form>
{body}
</body>
</html>
"#,
        lead = html_escape::encode_text(lead),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        assert_eq!(
            status_for(&Docx2SpeechError::NothingToConvert),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&Docx2SpeechError::Upstream {
                message: "x".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Docx2SpeechError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn page_escapes_lead() {
        let html = page("<script>", "");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("name=\"file\""));
    }
}
