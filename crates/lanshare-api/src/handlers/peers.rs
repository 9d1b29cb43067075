//! /api/peers handler: the peers discovery currently knows about.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::ApiState;

#[derive(Serialize)]
pub struct PeerInfo {
    pub address: String,
    pub port: u16,
    pub username: String,
    /// Unix seconds.
    pub last_seen: f64,
}

pub async fn handle_peers(State(state): State<ApiState>) -> Json<Vec<PeerInfo>> {
    let mut peers = state.peers.list();
    peers.sort_by(|a, b| (a.addr, a.port).cmp(&(b.addr, b.port)));

    Json(
        peers
            .into_iter()
            .map(|p| PeerInfo {
                address: p.addr.to_string(),
                port: p.port,
                last_seen: p.last_seen_unix(),
                username: p.username,
            })
            .collect(),
    )
}
