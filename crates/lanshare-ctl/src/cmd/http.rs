//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

/// Build a local API URL from raw path segments, escaping each one.
pub fn api_url(port: u16, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&base_url(port)).context("invalid daemon URL")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("daemon URL cannot take a path"))?
        .extend(segments);
    Ok(url)
}

fn connect_error(url: &str) -> String {
    format!("failed to connect to lanshared at {} (is it running?)", url)
}

/// Decode a successful response, or turn the `{ "error": ... }` body of a
/// failed one into an error.
pub async fn read_json<R: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<R> {
    let resp = check_status(resp).await?;
    resp.json::<R>().await.context("failed to parse response")
}

/// Pass a successful response through; fail with the server's message otherwise.
pub async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => bail!("{} ({})", body.error, status),
        Err(_) if text.is_empty() => bail!("request failed: {}", status),
        Err(_) => bail!("request failed: {}: {}", status, text.trim()),
    }
}

pub async fn get_json<R: for<'de> Deserialize<'de>>(url: &str) -> Result<R> {
    let resp = reqwest::get(url).await.with_context(|| connect_error(url))?;
    read_json(resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    read_json(resp).await
}

pub async fn delete_json<R: for<'de> Deserialize<'de>>(url: &str) -> Result<R> {
    let resp = reqwest::Client::new()
        .delete(url)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    read_json(resp).await
}

/// POST a JSON body and return the raw response for streaming.
pub async fn post_for_stream<T: Serialize>(url: &str, body: &T) -> Result<reqwest::Response> {
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    check_status(resp).await
}
