//! Shared-file commands: local shares, remote listings, downloads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::http::{api_url, base_url, delete_json, get_json, post_for_stream, read_json};

#[derive(Deserialize)]
struct RemoteFile {
    id: String,
    name: String,
    size: u64,
    has_password: bool,
}

#[derive(Deserialize)]
struct ShareResponse {
    message: String,
    file_id: String,
    name: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct DownloadRequest<'a> {
    password: &'a str,
}

fn print_file_table(title: &str, files: &[RemoteFile]) {
    println!("═══════════════════════════════════════");
    println!("  {} ({})", title, files.len());
    println!("═══════════════════════════════════════");
    for f in files {
        let lock = if f.has_password { " [password]" } else { "" };
        println!("  ┌─ {}{}", f.name, lock);
        println!("  │  id   : {}", f.id);
        println!("  └─ size : {} bytes", f.size);
    }
}

pub async fn cmd_files(port: u16) -> Result<()> {
    let files: Vec<RemoteFile> = get_json(&format!("{}/shared_files", base_url(port))).await?;
    if files.is_empty() {
        println!("Not sharing any files.");
        return Ok(());
    }
    print_file_table("Shared Files", &files);
    Ok(())
}

pub async fn cmd_share(port: u16, path: &str, password: Option<&str>) -> Result<()> {
    use reqwest::multipart;

    let file_data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read file: {}", path))?;

    let filename = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();

    let mut form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(file_data).file_name(filename),
    );
    if let Some(pw) = password {
        form = form.text("password", pw.to_string());
    }

    let resp = reqwest::Client::new()
        .post(format!("{}/shared_files", base_url(port)))
        .multipart(form)
        .send()
        .await
        .context("failed to upload file to daemon")?;
    let resp: ShareResponse = read_json(resp).await?;

    println!("{}:", resp.message);
    println!("  Name : {}", resp.name);
    println!("  Id   : {}", resp.file_id);

    Ok(())
}

pub async fn cmd_unshare(port: u16, file_id: &str) -> Result<()> {
    let url = api_url(port, &["shared_files", file_id])?;
    let resp: MessageResponse = delete_json(url.as_str()).await?;
    println!("{}", resp.message);
    Ok(())
}

pub async fn cmd_remote(port: u16, address: &str, peer_port: u16) -> Result<()> {
    let peer_port = peer_port.to_string();
    let url = api_url(port, &["peers", address, &peer_port, "files"])?;
    let files: Vec<RemoteFile> = get_json(url.as_str()).await?;
    if files.is_empty() {
        println!("Peer {}:{} is not sharing any files.", address, peer_port);
        return Ok(());
    }
    print_file_table(&format!("Files on {}:{}", address, peer_port), &files);
    Ok(())
}

pub async fn cmd_download(
    port: u16,
    address: &str,
    peer_port: u16,
    file_id: &str,
    password: Option<&str>,
    out: Option<&str>,
) -> Result<()> {
    let url = api_url(port, &["peers", address, &peer_port.to_string(), "download", file_id])?;
    let mut resp = post_for_stream(
        url.as_str(),
        &DownloadRequest {
            password: password.unwrap_or_default(),
        },
    )
    .await?;

    let target: PathBuf = match out {
        Some(p) => PathBuf::from(p),
        None => resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename)
            .unwrap_or_else(|| file_id.to_string())
            .into(),
    };

    let mut out_file = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("failed to create {}", target.display()))?;
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await.context("download interrupted")? {
        out_file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out_file.flush().await?;

    println!("Saved {} bytes to {}", written, target.display());
    Ok(())
}

/// Extract a safe local filename from a Content-Disposition header,
/// preferring the RFC 5987 `filename*` form.
fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in header.split(';').map(str::trim) {
        if let Some(v) = param.strip_prefix("filename*=") {
            if let Some(encoded) = v.strip_prefix("UTF-8''").or_else(|| v.strip_prefix("utf-8''")) {
                extended = percent_decode_str(encoded)
                    .decode_utf8()
                    .ok()
                    .map(|s| s.into_owned());
            }
        } else if let Some(v) = param.strip_prefix("filename=") {
            plain = Some(v.trim_matches('"').to_string());
        }
    }
    let name = extended.or(plain)?;
    // Never let a peer choose a directory.
    let base = name.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}
