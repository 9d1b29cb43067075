//! LanShare integration test harness.
//!
//! Each test starts one or more in-process nodes: the full HTTP router on
//! 127.0.0.1 with an ephemeral port, a private scratch directory, and its own
//! registries. Nodes talk to each other over real loopback TCP, so the relay
//! tests exercise the same client code a LAN deployment does.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use lanshare_api::{ApiState, RelayClient};
use lanshare_services::{FileRegistry, Identity, IdentityHandle, PeerRegistry};

mod local_api;
mod protocol;
mod relay;

// ── Harness ───────────────────────────────────────────────────────────────────

/// The two fixture files most protocol tests share.
pub const FILE1_NAME: &str = "testfile1.txt";
pub const FILE1_BODY: &str = "This is test file 1.\n";
pub const FILE2_NAME: &str = "testfile2.txt";
pub const FILE2_BODY: &str = "This is test file 2, password protected.";
pub const FILE2_PASSWORD: &str = "secure";

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// A scratch directory removed on drop.
pub struct Scratch(PathBuf);

impl Scratch {
    pub fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "lanshare-it-{}-{}-{}",
            tag,
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).expect("create scratch dir");
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, content).expect("write scratch file");
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// One running node.
pub struct Node {
    pub port: u16,
    pub state: ApiState,
    pub scratch: Scratch,
    shutdown: broadcast::Sender<()>,
}

impl Node {
    pub async fn start(username: &str) -> Result<Node> {
        let scratch = Scratch::new(username);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .context("bind test listener")?;
        let port = listener.local_addr()?.port();

        let state = ApiState {
            identity: IdentityHandle::new(Identity {
                username: username.to_string(),
                advertised_port: port,
                local_ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            }),
            peers: PeerRegistry::new(),
            files: FileRegistry::new(),
            relay: RelayClient::with_timeouts(
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_secs(10),
            )?,
            uploads_dir: scratch.path().join("uploads"),
        };

        let (shutdown, rx) = broadcast::channel(1);
        tokio::spawn(lanshare_api::serve(listener, state.clone(), rx));

        Ok(Node {
            port,
            state,
            scratch,
            shutdown,
        })
    }

    /// A node sharing the two fixture files. Returns their ids.
    pub async fn with_fixtures(username: &str) -> Result<(Node, String, String)> {
        let node = Node::start(username).await?;
        let id1 = node.share(FILE1_NAME, FILE1_BODY, None)?;
        let id2 = node.share(FILE2_NAME, FILE2_BODY, Some(FILE2_PASSWORD))?;
        Ok((node, id1, id2))
    }

    /// Write a file into the node's scratch dir and share it.
    pub fn share(&self, name: &str, content: impl AsRef<[u8]>, password: Option<&str>) -> Result<String> {
        let path = self.scratch.write(name, content);
        Ok(self.state.files.share(&path, password)?)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build test client")
}

/// Deterministic non-repeating payload for transfer tests.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Read a JSON error body and return its `error` field.
pub async fn error_message(resp: reqwest::Response) -> String {
    let body: serde_json::Value = resp.json().await.expect("error body should be JSON");
    body["error"]
        .as_str()
        .expect("error body should carry an `error` string")
        .to_string()
}
