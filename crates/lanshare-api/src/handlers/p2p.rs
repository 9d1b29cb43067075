//! /p2p handlers: the protocol other peers call.
//!
//! Download checks run in a fixed order: unknown id (404), vanished backing
//! file (unshare, then 410), wrong password (403). A request for a missing
//! file never learns whether it was password protected.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio_util::io::ReaderStream;

use lanshare_core::wire::{DownloadRequest, HelloResponse, RemoteFile};

use super::ApiState;
use crate::error::ApiError;

/// Read size when streaming a shared file.
const SEND_CHUNK_SIZE: usize = 8 * 1024;

// ── /p2p/hello ────────────────────────────────────────────────────────────────

pub async fn handle_hello(State(state): State<ApiState>) -> Json<HelloResponse> {
    let me = state.identity.get();
    Json(HelloResponse {
        message: format!("Hello from {}!", me.username),
        username: me.username,
        server_port: me.advertised_port,
    })
}

// ── /p2p/list_files ───────────────────────────────────────────────────────────

pub async fn handle_list_files(State(state): State<ApiState>) -> Json<Vec<RemoteFile>> {
    Json(state.files.list_for_remote())
}

// ── /p2p/download_file/{id} ───────────────────────────────────────────────────

pub async fn handle_download_file(
    State(state): State<ApiState>,
    Path(file_id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    // A missing or unparseable body is an attempt with no password.
    let request: DownloadRequest = serde_json::from_slice(&body).unwrap_or_default();
    let attempt = request.password.unwrap_or_default();

    let file = state.files.resolve(&file_id).ok_or(ApiError::UnknownFile)?;

    let still_there = tokio::fs::metadata(&file.local_path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !still_there {
        tracing::warn!(file_id = %file_id, path = %file.local_path.display(), "shared file vanished, unsharing");
        state.files.unshare(&file_id);
        return Err(ApiError::FileGone);
    }

    if file.password_hash.is_some() && !state.files.verify_password(&file_id, &attempt) {
        tracing::info!(file_id = %file_id, "download refused: incorrect password");
        return Err(ApiError::Forbidden);
    }

    let handle = match tokio::fs::File::open(&file.local_path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            state.files.unshare(&file_id);
            return Err(ApiError::FileGone);
        }
        Err(e) => {
            tracing::error!(file_id = %file_id, error = %e, "failed to open shared file");
            return Err(ApiError::Internal("Could not send file".to_string()));
        }
    };
    let size = handle
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Could not send file: {e}")))?
        .len();

    let mime = mime_guess::from_path(&file.name).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(mime.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(CONTENT_DISPOSITION, attachment_disposition(&file.name));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(size));

    tracing::info!(file_id = %file_id, name = %file.name, size, "serving file to peer");

    let stream = ReaderStream::with_capacity(handle, SEND_CHUNK_SIZE);
    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

/// `attachment; filename="..."; filename*=UTF-8''...` with an ASCII fallback.
fn attachment_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(name, NON_ALPHANUMERIC);
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
