//! CLI command modules.

pub mod files;
pub mod http;
pub mod identity;
pub mod peers;
