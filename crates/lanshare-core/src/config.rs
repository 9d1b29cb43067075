//! Configuration system for LanShare.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $LANSHARE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/lanshare/config.toml
//!   3. ~/.config/lanshare/config.toml

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::wire::{DEFAULT_MULTICAST_ADDR, DEFAULT_MULTICAST_PORT, DEFAULT_SERVER_PORT};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanshareConfig {
    pub identity: IdentityConfig,
    pub discovery: DiscoveryConfig,
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Name announced to peers. Can be changed at runtime via /api/identity.
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub multicast_addr: Ipv4Addr,
    pub multicast_port: u16,
    pub broadcast_interval_secs: u64,
    /// A peer not heard from for longer than this is evicted.
    pub peer_timeout_secs: u64,
    /// Receive buffer for discovery datagrams. Outgoing announcements larger
    /// than this are not sent.
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: Ipv4Addr,
    /// Preferred HTTP port. If taken, the next `port_search_range` ports are tried.
    pub port: u16,
    pub port_search_range: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Total timeout for relayed file listings.
    pub list_timeout_secs: u64,
    pub download_connect_timeout_secs: u64,
    /// Read timeout while waiting on a relayed download.
    pub download_read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where files uploaded through the local API are saved before sharing.
    pub uploads_dir: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            username: std::env::var("USER").unwrap_or_else(|_| "P2PUser".to_string()),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            multicast_addr: DEFAULT_MULTICAST_ADDR,
            multicast_port: DEFAULT_MULTICAST_PORT,
            broadcast_interval_secs: 5,
            peer_timeout_secs: 15,
            buffer_size: 1024,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: Ipv4Addr::UNSPECIFIED,
            port: DEFAULT_SERVER_PORT,
            port_search_range: 100,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            list_timeout_secs: 5,
            download_connect_timeout_secs: 5,
            download_read_timeout_secs: 300,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: data_dir().join("uploads"),
        }
    }
}

impl DiscoveryConfig {
    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_secs(self.broadcast_interval_secs.max(1))
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs.max(1))
    }

    /// Reaper cadence: half the peer timeout, so a dead peer lingers at most
    /// 1.5× the timeout.
    pub fn reap_interval(&self) -> Duration {
        self.peer_timeout() / 2
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("lanshare")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("lanshare")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl LanshareConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&Self::file_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file, falling back to defaults when it does not exist.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("LANSHARE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&LanshareConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply LANSHARE_* overrides. `lookup` is `std::env::var` in production.
    /// Values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LANSHARE_IDENTITY__USERNAME") {
            self.identity.username = v;
        }
        if let Some(v) = lookup("LANSHARE_DISCOVERY__MULTICAST_ADDR") {
            if let Ok(addr) = v.parse() {
                self.discovery.multicast_addr = addr;
            }
        }
        if let Some(v) = lookup("LANSHARE_DISCOVERY__MULTICAST_PORT") {
            if let Ok(p) = v.parse() {
                self.discovery.multicast_port = p;
            }
        }
        if let Some(v) = lookup("LANSHARE_DISCOVERY__BROADCAST_INTERVAL_SECS") {
            if let Ok(s) = v.parse() {
                self.discovery.broadcast_interval_secs = s;
            }
        }
        if let Some(v) = lookup("LANSHARE_DISCOVERY__PEER_TIMEOUT_SECS") {
            if let Ok(s) = v.parse() {
                self.discovery.peer_timeout_secs = s;
            }
        }
        if let Some(v) = lookup("LANSHARE_SERVER__PORT") {
            if let Ok(p) = v.parse() {
                self.server.port = p;
            }
        }
        if let Some(v) = lookup("LANSHARE_STORAGE__UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(v);
        }
    }
}
