//! lanshare-core — configuration, wire types, and hashing helpers.
//! All other LanShare crates depend on this one.

pub mod config;
pub mod crypto;
pub mod wire;

pub use wire::{DiscoveryMessage, RemoteFile};
