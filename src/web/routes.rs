use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::console::Console;

use super::actions::ActionSender;
use super::types::{content_type_for, parse_timestamp, CommandRequest, LogResponse};

/// Everything a request handler needs, shared by all connections.
pub struct BridgeState {
    pub console: Arc<Console>,
    pub actions: ActionSender,
    pub assets_dir: PathBuf,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

type HttpResponse = Response<Full<Bytes>>;

fn build(status: StatusCode, content_type: &str, body: Bytes) -> HttpResponse {
    let length = body.len();
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Ok(value) = content_type.parse::<HeaderValue>() {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}

fn text(status: StatusCode, message: &str) -> HttpResponse {
    build(status, "text/plain; charset=utf-8", Bytes::from(message.to_string()))
}

fn empty(status: StatusCode) -> HttpResponse {
    build(status, "text/plain; charset=utf-8", Bytes::new())
}

const FILE_NOT_FOUND: &str = "File not found.";

/// 404 whose status line reads `404 File not found.`
fn not_found() -> HttpResponse {
    let mut response = text(StatusCode::NOT_FOUND, FILE_NOT_FOUND);
    response
        .extensions_mut()
        .insert(ReasonPhrase::from_static(FILE_NOT_FOUND.as_bytes()));
    response
}

/// Serve a file from under the assets root.
async fn serve_static_file(assets_dir: &Path, path: &str) -> HttpResponse {
    // Validate path to prevent directory traversal
    if path.contains("..") || path.contains('\0') || path.contains('\\') {
        warn!("Blocked potential path traversal attempt: {}", path);
        return text(StatusCode::FORBIDDEN, "Forbidden");
    }

    let file_path = assets_dir.join(path.trim_start_matches('/'));

    let canonical_root = match assets_dir.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            warn!("Assets directory {} unavailable: {}", assets_dir.display(), e);
            return not_found();
        }
    };

    let canonical_file = match file_path.canonicalize() {
        Ok(file) => file,
        Err(_) => return not_found(),
    };

    // Symlinks may still point outside the root.
    if !canonical_file.starts_with(&canonical_root) {
        warn!("Blocked path traversal attempt: {} -> {}", path, canonical_file.display());
        return text(StatusCode::FORBIDDEN, "Forbidden");
    }

    if !canonical_file.is_file() {
        return not_found();
    }

    match fs::read(&canonical_file).await {
        Ok(contents) => {
            build(StatusCode::OK, content_type_for(&canonical_file), Bytes::from(contents))
        }
        Err(e) => {
            warn!("Error loading file {}: {}", canonical_file.display(), e);
            not_found()
        }
    }
}

/// `GET /log`: entries newer than the optional `timeStamp` parameter.
fn handle_logs(query: Option<&str>, console: &Console) -> HttpResponse {
    let since = query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == "timeStamp")
                .and_then(|(_, value)| parse_timestamp(&value))
        })
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    let response = LogResponse { logs: console.logs_since(since) };
    match serde_json::to_vec(&response) {
        Ok(body) => build(StatusCode::OK, "application/json", Bytes::from(body)),
        Err(e) => {
            warn!("Failed to encode logs: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode logs")
        }
    }
}

/// `POST /command`: decode the body and queue the command for the host loop.
async fn handle_command(req: Request<hyper::body::Incoming>, state: &BridgeState) -> HttpResponse {
    let body = Limited::new(req.into_body(), state.max_body_bytes);
    let bytes = match tokio::time::timeout(state.request_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return text(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        Ok(Err(e)) => {
            debug!("Failed to read command body: {}", e);
            return text(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
        Err(_) => return text(StatusCode::REQUEST_TIMEOUT, "Timed out reading request body"),
    };

    let request = match CommandRequest::from_slice(&bytes) {
        Ok(request) => request,
        Err(err) => {
            debug!("{}", err);
            return text(StatusCode::BAD_REQUEST, &err.to_string());
        }
    };

    let line = request.command;
    let queued = state.actions.enqueue(move |console: &Console| {
        console.execute_command(&line);
    });

    if queued {
        empty(StatusCode::ACCEPTED)
    } else {
        text(StatusCode::SERVICE_UNAVAILABLE, "Console is shutting down")
    }
}

/// Route a request from the inspector page.
pub async fn handle_http_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<BridgeState>,
) -> Result<HttpResponse, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("HTTP request: {} {}", method, path);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => serve_static_file(&state.assets_dir, "index.html").await,
        (&Method::GET, "/log") => handle_logs(req.uri().query(), &state.console),
        (&Method::POST, "/command") => handle_command(req, &state).await,
        (&Method::GET, _) => serve_static_file(&state.assets_dir, &path).await,
        _ => empty(StatusCode::METHOD_NOT_ALLOWED),
    };
    Ok(response)
}
