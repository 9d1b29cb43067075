//! /api/identity handlers: read and change the name this node announces.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use lanshare_services::identity::detect_local_ip;
use lanshare_services::IdentityError;

use super::ApiState;
use crate::error::ApiError;

// ── /api/identity (GET) ───────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct IdentityResponse {
    pub username: String,
    pub server_port: u16,
    pub local_ip: Option<String>,
}

pub async fn handle_get_identity(State(state): State<ApiState>) -> Json<IdentityResponse> {
    let me = state.identity.get();
    Json(IdentityResponse {
        username: me.username,
        server_port: me.advertised_port,
        local_ip: me.local_ip.map(|ip| ip.to_string()),
    })
}

// ── /api/identity (POST) ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SetIdentityRequest {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize)]
pub struct SetIdentityResponse {
    pub message: String,
    pub username: String,
}

pub async fn handle_set_identity(
    State(state): State<ApiState>,
    body: Result<Json<SetIdentityRequest>, JsonRejection>,
) -> Result<Json<SetIdentityResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let raw = req.username.unwrap_or_default();
    // Interface listing blocks.
    let local_ip = tokio::task::spawn_blocking(detect_local_ip)
        .await
        .map_err(|e| ApiError::Internal(format!("local address lookup failed: {e}")))?;
    let updated = state.identity.set_username(&raw, local_ip).map_err(|e| match e {
        IdentityError::EmptyUsername => ApiError::BadRequest("Username is required".to_string()),
        other => ApiError::BadRequest(other.to_string()),
    })?;

    Ok(Json(SetIdentityResponse {
        message: "Username updated".to_string(),
        username: updated.username,
    }))
}
