//! File registry: the files this node offers to peers.
//!
//! Entries are keyed by a path-derived id (see `lanshare_core::crypto::file_id`),
//! so sharing the same path twice replaces the earlier entry. The local path
//! and password hash stay inside this module's callers on this machine; the
//! only view that goes over the wire is [`FileRegistry::list_for_remote`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use lanshare_core::crypto;
use lanshare_core::wire::RemoteFile;

/// A locally shared file.
#[derive(Debug, Clone)]
pub struct SharedFile {
    pub id: String,
    /// Display name sent to peers and used in Content-Disposition.
    pub name: String,
    pub local_path: PathBuf,
    pub size: u64,
    pub password_hash: Option<String>,
}

impl SharedFile {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// What the peer protocol server needs to serve a download.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub local_path: PathBuf,
    pub name: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("cannot read {}: {1}", .0.display())]
    Io(PathBuf, io::Error),
}

/// The file registry, shared between the local API and the peer protocol.
#[derive(Clone, Default)]
pub struct FileRegistry {
    files: Arc<DashMap<String, SharedFile>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share a regular file under its own file name.
    pub fn share(&self, local_path: &Path, password: Option<&str>) -> Result<String, ShareError> {
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| local_path.to_string_lossy().into_owned());
        self.share_as(local_path, &name, password)
    }

    /// Share a regular file under an explicit display name.
    ///
    /// An empty password counts as no password. Directories are rejected.
    pub fn share_as(
        &self,
        local_path: &Path,
        name: &str,
        password: Option<&str>,
    ) -> Result<String, ShareError> {
        let meta = std::fs::metadata(local_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ShareError::NotFound(local_path.to_path_buf()),
            _ => ShareError::Io(local_path.to_path_buf(), e),
        })?;
        if !meta.is_file() {
            return Err(ShareError::NotAFile(local_path.to_path_buf()));
        }

        let canonical =
            std::fs::canonicalize(local_path).unwrap_or_else(|_| local_path.to_path_buf());
        let id = crypto::file_id(&canonical);
        let password_hash = password
            .filter(|p| !p.is_empty())
            .map(crypto::hash_password);

        let replaced = self
            .files
            .insert(
                id.clone(),
                SharedFile {
                    id: id.clone(),
                    name: name.to_string(),
                    local_path: canonical,
                    size: meta.len(),
                    password_hash,
                },
            )
            .is_some();

        tracing::info!(id = %id, name, size = meta.len(), replaced, "sharing file");
        Ok(id)
    }

    /// Stop sharing. Returns false if the id was not shared.
    pub fn unshare(&self, id: &str) -> bool {
        match self.files.remove(id) {
            Some((_, file)) => {
                tracing::info!(id, name = %file.name, "stopped sharing file");
                true
            }
            None => false,
        }
    }

    /// Metadata safe to send to peers, ordered by name.
    pub fn list_for_remote(&self) -> Vec<RemoteFile> {
        let mut files: Vec<RemoteFile> = self
            .files
            .iter()
            .map(|e| {
                let f = e.value();
                RemoteFile {
                    id: f.id.clone(),
                    name: f.name.clone(),
                    size: f.size,
                    has_password: f.has_password(),
                }
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        files
    }

    pub fn resolve(&self, id: &str) -> Option<ResolvedFile> {
        self.files.get(id).map(|e| {
            let f = e.value();
            ResolvedFile {
                local_path: f.local_path.clone(),
                name: f.name.clone(),
                password_hash: f.password_hash.clone(),
            }
        })
    }

    /// True if the file has no password or `attempt` matches it.
    /// False for unknown ids.
    pub fn verify_password(&self, id: &str, attempt: &str) -> bool {
        match self.files.get(id) {
            Some(e) => match &e.value().password_hash {
                Some(stored) => crypto::verify_password(stored, attempt),
                None => true,
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
