//! /api/shared_files handlers: what this node offers to peers.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use lanshare_core::wire::RemoteFile;

use super::ApiState;
use crate::error::ApiError;

/// Longest file name kept after sanitizing, in characters.
const MAX_NAME_CHARS: usize = 200;

// ── /api/shared_files (GET) ───────────────────────────────────────────────────

pub async fn handle_list_shared(State(state): State<ApiState>) -> Json<Vec<RemoteFile>> {
    Json(state.files.list_for_remote())
}

// ── /api/shared_files (POST) ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShareResponse {
    pub message: String,
    pub file_id: String,
    pub name: String,
}

/// Accept a multipart upload (`file`, optional `password`), save it under
/// the uploads directory, and share it.
pub async fn handle_share_upload(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<ShareResponse>, ApiError> {
    tokio::fs::create_dir_all(&state.uploads_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot create uploads dir: {e}")))?;

    let mut saved: Option<(PathBuf, String)> = None;
    let mut password = String::new();

    let read = async {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let field_name = field.name().unwrap_or("").to_string();
            match field_name.as_str() {
                "password" => {
                    password = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                }
                "file" => {
                    let original = field.file_name().unwrap_or("").to_string();
                    if original.is_empty() {
                        return Err(ApiError::BadRequest("No file selected".to_string()));
                    }
                    let name = sanitize_filename(&original);
                    let path = state
                        .uploads_dir
                        .join(format!("{}_{}", hex::encode(rand::random::<[u8; 8]>()), name));
                    // Record the path before writing so a failed write is cleaned up.
                    if let Some((previous, _)) = saved.replace((path.clone(), name)) {
                        let _ = tokio::fs::remove_file(previous).await;
                    }
                    let bytes = save_field(&mut field, &path).await?;
                    tracing::debug!(path = %path.display(), bytes, "upload saved");
                }
                _ => {}
            }
        }
        Ok::<(), ApiError>(())
    };

    if let Err(e) = read.await {
        if let Some((path, _)) = &saved {
            let _ = tokio::fs::remove_file(path).await;
        }
        return Err(e);
    }

    let (path, name) = saved.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    match state.files.share_as(&path, &name, Some(&password)) {
        Ok(file_id) => Ok(Json(ShareResponse {
            message: "File added successfully".to_string(),
            file_id,
            name,
        })),
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(ApiError::BadRequest(e.to_string()))
        }
    }
}

/// Stream one multipart field to disk. Returns the number of bytes written.
async fn save_field(field: &mut Field<'_>, path: &Path) -> Result<u64, ApiError> {
    let io_err = |e: std::io::Error| ApiError::Internal(format!("cannot save upload: {e}"));
    let mut out = tokio::fs::File::create(path).await.map_err(io_err)?;
    let mut written = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        out.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }
    out.flush().await.map_err(io_err)?;
    Ok(written)
}

/// Sanitize a filename: keep only the final path component, drop leading
/// dots, and replace anything outside `[A-Za-z0-9._-]` and space.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let trimmed = base.trim_start_matches('.').trim();

    let clean: String = trimmed
        .chars()
        .take(MAX_NAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if clean.is_empty() {
        "upload".to_string()
    } else {
        clean
    }
}

// ── /api/shared_files/{id} (DELETE) ───────────────────────────────────────────

#[derive(Serialize)]
pub struct UnshareResponse {
    pub message: String,
}

pub async fn handle_unshare(
    State(state): State<ApiState>,
    UrlPath(file_id): UrlPath<String>,
) -> Result<Json<UnshareResponse>, ApiError> {
    if state.files.unshare(&file_id) {
        Ok(Json(UnshareResponse {
            message: "File unshared successfully".to_string(),
        }))
    } else {
        Err(ApiError::NotFound(
            "File not found or could not be unshared".to_string(),
        ))
    }
}
