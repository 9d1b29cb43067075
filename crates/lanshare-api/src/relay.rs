//! Relay client. Calls a remote peer's protocol server on behalf of the
//! local UI.
//!
//! Listings are small and fully decoded. Downloads are streamed: the body is
//! forwarded in chunks of at most [`RELAY_CHUNK_SIZE`] bytes and never held
//! in memory as a whole. Error bodies from the peer are small, so those are
//! read fully and relayed with the peer's status.

use std::net::IpAddr;
use std::time::Duration;

use axum::http::StatusCode;
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Url;

use lanshare_core::config::RelayConfig;
use lanshare_core::wire::{DownloadRequest, ErrorBody, RemoteFile};

/// Largest chunk handed to the local client while relaying a download.
pub const RELAY_CHUNK_SIZE: usize = 8 * 1024;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid peer address: {0}")]
    BadAddress(String),
    #[error("Peer {0} timed out.")]
    Timeout(String),
    #[error("Could not connect to peer {0} or peer returned an error.")]
    Unreachable(String),
    #[error("Could not connect to peer {0} for download.")]
    DownloadUnreachable(String),
    /// The peer answered with an error; relayed with its status.
    #[error("{message}")]
    Peer { status: u16, message: String },
    #[error("An unexpected error occurred while contacting the peer: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadAddress(_) => StatusCode::BAD_REQUEST,
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Unreachable(_) | RelayError::DownloadUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::Peer { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a transport failure: timeouts are 504, everything else 502.
    fn from_transport(e: reqwest::Error, peer: &str) -> Self {
        if e.is_timeout() {
            RelayError::Timeout(peer.to_string())
        } else {
            tracing::warn!(peer, error = %e, "peer request failed");
            RelayError::Unreachable(peer.to_string())
        }
    }

    /// Reword a connection failure for the download path.
    fn during_download(self) -> Self {
        match self {
            RelayError::Unreachable(peer) => RelayError::DownloadUnreachable(peer),
            other => other,
        }
    }
}

/// A download the peer accepted, ready to be streamed to the local client.
pub struct RelayedDownload {
    pub status: StatusCode,
    /// Peer's content type, or `application/octet-stream` if it sent none.
    pub content_type: String,
    pub content_disposition: Option<String>,
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, reqwest::Error>>,
}

#[derive(Clone)]
pub struct RelayClient {
    list_client: reqwest::Client,
    download_client: reqwest::Client,
}

impl RelayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(
            Duration::from_secs(config.list_timeout_secs),
            Duration::from_secs(config.download_connect_timeout_secs),
            Duration::from_secs(config.download_read_timeout_secs),
        )
    }

    pub fn with_timeouts(
        list_timeout: Duration,
        download_connect_timeout: Duration,
        download_read_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let list_client = reqwest::Client::builder()
            .connect_timeout(list_timeout)
            .timeout(list_timeout)
            .no_proxy()
            .build()?;
        let download_client = reqwest::Client::builder()
            .connect_timeout(download_connect_timeout)
            .read_timeout(download_read_timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            list_client,
            download_client,
        })
    }

    /// Fetch a peer's shared file list.
    pub async fn get_peer_files(&self, addr: &str, port: u16) -> Result<Vec<RemoteFile>, RelayError> {
        let peer = format!("{addr}:{port}");
        let url = peer_url(addr, port, &["p2p", "list_files"])?;
        tracing::info!(peer = %peer, "relaying file list request");

        let resp = self
            .list_client
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::from_transport(e, &peer))?;

        let status = resp.status();
        if !status.is_success() {
            if is_json(resp.headers()) {
                if let Ok(body) = resp.json::<ErrorBody>().await {
                    return Err(RelayError::Peer {
                        status: status.as_u16(),
                        message: body.error,
                    });
                }
            }
            tracing::warn!(peer = %peer, status = status.as_u16(), "peer returned non-JSON error");
            return Err(RelayError::Unreachable(peer));
        }

        resp.json::<Vec<RemoteFile>>()
            .await
            .map_err(|e| RelayError::from_transport(e, &peer))
    }

    /// Ask a peer for a file and return its body as a stream.
    pub async fn download_from_peer(
        &self,
        addr: &str,
        port: u16,
        file_id: &str,
        password: Option<&str>,
    ) -> Result<RelayedDownload, RelayError> {
        let peer = format!("{addr}:{port}");
        let url = peer_url(addr, port, &["p2p", "download_file", file_id])?;
        tracing::info!(peer = %peer, file_id, "relaying download request");

        let request = DownloadRequest {
            password: Some(password.unwrap_or_default().to_string()),
        };
        let resp = self
            .download_client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::from_transport(e, &peer).during_download())?;

        let status = resp.status();
        if !status.is_success() || is_json(resp.headers()) {
            return Err(read_peer_error(resp, &peer).await);
        }

        let headers = resp.headers();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(OCTET_STREAM)
            .to_string();
        let content_disposition = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());

        let body = resp
            .bytes_stream()
            .map(|res| {
                let items: Vec<Result<Bytes, reqwest::Error>> = match res {
                    Ok(bytes) => bounded_chunks(bytes, RELAY_CHUNK_SIZE)
                        .into_iter()
                        .map(Ok)
                        .collect(),
                    Err(e) => {
                        tracing::warn!(error = %e, "relayed download interrupted");
                        vec![Err(e)]
                    }
                };
                stream::iter(items)
            })
            .flatten()
            .boxed();

        Ok(RelayedDownload {
            status,
            content_type,
            content_disposition,
            content_length,
            body,
        })
    }
}

/// Read a small error response and turn it into a relayed error.
async fn read_peer_error(resp: reqwest::Response, peer: &str) -> RelayError {
    let status = resp.status();
    let text = match resp.text().await {
        Ok(t) => t,
        Err(e) => return RelayError::from_transport(e, peer).during_download(),
    };
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if status.is_success() => "Peer error during download".to_string(),
        Err(_) => format!("Peer {peer} returned error: {}", status.as_u16()),
    };
    tracing::info!(peer, status = status.as_u16(), message = %message, "peer refused download");
    RelayError::Peer {
        status: status.as_u16(),
        message,
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Build `http://addr:port/seg/seg...`, escaping each segment.
fn peer_url(addr: &str, port: u16, segments: &[&str]) -> Result<Url, RelayError> {
    let host = match addr.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        Ok(IpAddr::V4(v4)) => v4.to_string(),
        Err(_) if is_hostname(addr) => addr.to_string(),
        Err(_) => return Err(RelayError::BadAddress(addr.to_string())),
    };
    let mut url = Url::parse(&format!("http://{host}:{port}/"))
        .map_err(|_| RelayError::BadAddress(addr.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| RelayError::Internal(format!("cannot build URL for {addr}")))?
        .clear()
        .extend(segments);
    Ok(url)
}

fn is_hostname(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 253
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

fn bounded_chunks(mut bytes: Bytes, max: usize) -> Vec<Bytes> {
    let mut out = Vec::with_capacity(bytes.len() / max + 1);
    while bytes.len() > max {
        out.push(bytes.split_to(max));
    }
    if !bytes.is_empty() {
        out.push(bytes);
    }
    out
}
