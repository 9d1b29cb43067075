//! HTTP handlers for the peer protocol under /p2p and the local API under /api.

pub mod identity;
pub mod p2p;
pub mod peers;
pub mod relay;
pub mod shared_files;

use std::path::PathBuf;

use lanshare_services::{FileRegistry, IdentityHandle, PeerRegistry};

use crate::error::ApiError;
use crate::relay::RelayClient;

/// Everything a request handler can touch. One per node.
#[derive(Clone)]
pub struct ApiState {
    pub identity: IdentityHandle,
    pub peers: PeerRegistry,
    pub files: FileRegistry,
    pub relay: RelayClient,
    /// Directory where files uploaded through /api/shared_files are saved.
    pub uploads_dir: PathBuf,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Parse a port taken from a URL path segment.
fn parse_port(raw: &str) -> Result<u16, ApiError> {
    match raw.parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(ApiError::BadRequest(format!("invalid port: {raw}"))),
    }
}

// Re-export handler functions for use in router setup.
pub use identity::{handle_get_identity, handle_set_identity};
pub use p2p::{handle_download_file, handle_hello, handle_list_files};
pub use peers::handle_peers;
pub use relay::{handle_relay_download, handle_relay_list_files};
pub use shared_files::{handle_list_shared, handle_share_upload, handle_unshare};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_accepts_valid_and_rejects_rest() {
        assert_eq!(parse_port("19001").unwrap(), 19001);
        assert!(parse_port("0").is_err());
        assert!(parse_port("70000").is_err());
        assert!(parse_port("abc").is_err());
    }
}
