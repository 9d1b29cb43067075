//! /api/peers/{address}/{port}/...: browse and download from a remote peer
//! through this node.

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;

use lanshare_core::wire::{DownloadRequest, RemoteFile};

use super::{parse_port, ApiState};
use crate::error::ApiError;

// ── /api/peers/{address}/{port}/files ─────────────────────────────────────────

pub async fn handle_relay_list_files(
    State(state): State<ApiState>,
    Path((address, port)): Path<(String, String)>,
) -> Result<Json<Vec<RemoteFile>>, ApiError> {
    let port = parse_port(&port)?;
    let files = state.relay.get_peer_files(&address, port).await?;
    Ok(Json(files))
}

// ── /api/peers/{address}/{port}/download/{id} ─────────────────────────────────

pub async fn handle_relay_download(
    State(state): State<ApiState>,
    Path((address, port, file_id)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let port = parse_port(&port)?;
    let request: DownloadRequest = serde_json::from_slice(&body).unwrap_or_default();

    let download = state
        .relay
        .download_from_peer(&address, port, &file_id, request.password.as_deref())
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&download.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if let Some(v) = download
        .content_disposition
        .as_deref()
        .and_then(|d| HeaderValue::from_str(d).ok())
    {
        headers.insert(CONTENT_DISPOSITION, v);
    }
    if let Some(len) = download.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok((download.status, headers, Body::from_stream(download.body)).into_response())
}
