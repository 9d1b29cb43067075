//! lanshare-services — the shared state of a LanShare node: the peer
//! registry, the file registry, and the node's own identity.

pub mod identity;
pub mod peer;
pub mod shared_files;

pub use identity::{Identity, IdentityError, IdentityHandle};
pub use peer::{PeerEntry, PeerKey, PeerRegistry};
pub use shared_files::{FileRegistry, ResolvedFile, ShareError, SharedFile};
