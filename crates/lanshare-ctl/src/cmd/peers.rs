//! Peer listing.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct PeerInfo {
    address: String,
    port: u16,
    username: String,
    last_seen: f64,
}

pub async fn cmd_peers(port: u16) -> Result<()> {
    let peers: Vec<PeerInfo> = get_json(&format!("{}/peers", base_url(port))).await?;

    if peers.is_empty() {
        println!("No peers discovered yet.");
        return Ok(());
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    println!("═══════════════════════════════════════");
    println!("  Discovered Peers ({})", peers.len());
    println!("═══════════════════════════════════════");

    for p in &peers {
        println!("  ┌─ {}", p.username);
        println!("  │  address   : {}:{}", p.address, p.port);
        println!("  └─ last seen : {:.0}s ago", (now - p.last_seen).max(0.0));
    }

    Ok(())
}
