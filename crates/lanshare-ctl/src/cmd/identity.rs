//! Identity commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, get_json, post_json_body};

#[derive(Deserialize)]
struct IdentityResponse {
    username: String,
    server_port: u16,
    local_ip: Option<String>,
}

#[derive(Serialize)]
struct SetIdentityRequest<'a> {
    username: &'a str,
}

#[derive(Deserialize)]
struct SetIdentityResponse {
    message: String,
    username: String,
}

pub async fn cmd_identity(port: u16) -> Result<()> {
    let resp: IdentityResponse = get_json(&format!("{}/identity", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  LanShare Node");
    println!("═══════════════════════════════════════");
    println!("  Username    : {}", resp.username);
    println!("  Server port : {}", resp.server_port);
    println!(
        "  Local IP    : {}",
        resp.local_ip.as_deref().unwrap_or("(unknown)")
    );

    Ok(())
}

pub async fn cmd_identity_set(port: u16, username: &str) -> Result<()> {
    let resp: SetIdentityResponse = post_json_body(
        &format!("{}/identity", base_url(port)),
        &SetIdentityRequest { username },
    )
    .await?;
    println!("{}: {}", resp.message, resp.username);
    Ok(())
}
