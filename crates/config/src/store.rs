//! Config stores.
//!
//! Resolution takes a fresh [`ConfigStore::snapshot`] on every call, so a
//! store may change between calls without any caller coordination.
//! Snapshots are immutable `Arc`s and safe to read from many tasks.

use crate::GatewayDocument;
use anyhow::Result;
use parking_lot::RwLock;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

/// Read-only source of the gateway document.
pub trait ConfigStore: Send + Sync {
    /// The current document.
    fn snapshot(&self) -> Arc<GatewayDocument>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for Arc<T> {
    fn snapshot(&self) -> Arc<GatewayDocument> {
        (**self).snapshot()
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for &T {
    fn snapshot(&self) -> Arc<GatewayDocument> {
        (**self).snapshot()
    }
}

/// In-memory store whose document can be swapped at runtime.
///
/// Clones share the same document.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Arc<GatewayDocument>>>,
}

impl MemoryStore {
    /// Create a store holding `document`. The document is not validated.
    pub fn new(document: GatewayDocument) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(document))),
        }
    }

    /// Replace the whole document.
    pub fn replace(&self, document: GatewayDocument) {
        *self.inner.write() = Arc::new(document);
    }

    /// Apply an edit to a copy of the current document and publish it.
    pub fn update(&self, edit: impl FnOnce(&mut GatewayDocument)) {
        let mut guard = self.inner.write();
        let mut document = GatewayDocument::clone(&guard);
        edit(&mut document);
        *guard = Arc::new(document);
    }
}

impl ConfigStore for MemoryStore {
    fn snapshot(&self) -> Arc<GatewayDocument> {
        self.inner.read().clone()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

/// File-backed store that reloads the document when the file changes.
///
/// The initial load must parse and validate. Later reloads that fail are
/// logged and the last good document keeps being served. Readers of an
/// unchanged file share a read lock; only a changed stamp takes the write
/// lock.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<FileState>,
}

#[derive(Debug)]
struct FileState {
    stamp: Option<Stamp>,
    document: Arc<GatewayDocument>,
}

/// Modification time and length, used to detect edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl Stamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

impl FileStore {
    /// Load and validate the document at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stamp = Stamp::of(&path);
        let document = GatewayDocument::load(&path)?;
        document.validate()?;
        tracing::debug!("loaded gateway config from {}", path.display());
        Ok(Self {
            path,
            state: RwLock::new(FileState {
                stamp,
                document: Arc::new(document),
            }),
        })
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the file now, regardless of its stamp.
    pub fn reload(&self) -> Result<()> {
        let stamp = Stamp::of(&self.path);
        let document = GatewayDocument::load(&self.path)?;
        document.validate()?;
        let mut state = self.state.write();
        state.stamp = stamp;
        state.document = Arc::new(document);
        Ok(())
    }
}

impl ConfigStore for FileStore {
    fn snapshot(&self) -> Arc<GatewayDocument> {
        let stamp = Stamp::of(&self.path);
        {
            let state = self.state.read();
            if stamp == state.stamp {
                return state.document.clone();
            }
        }

        let mut state = self.state.write();
        // Another reader may have reloaded while we waited.
        if stamp == state.stamp {
            return state.document.clone();
        }

        // Record the stamp even on failure so a broken file is reported once.
        state.stamp = stamp;
        match GatewayDocument::load(&self.path).and_then(|doc| doc.validate().map(|()| doc)) {
            Ok(document) => {
                tracing::debug!("reloaded gateway config from {}", self.path.display());
                state.document = Arc::new(document);
            }
            Err(e) => {
                tracing::warn!(
                    "keeping previous gateway config, reload of {} failed: {e:#}",
                    self.path.display()
                );
            }
        }
        state.document.clone()
    }
}
