//! Backing stores for cache documents
//!
//! A store holds one serialized document per namespace. It knows nothing
//! about the document's structure; parsing and validation happen in
//! `MemoCache`.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Directory used by `FileStore::default`
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// Persistence for namespace documents
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a namespace's document, `None` if it was never written
    async fn load(&self, namespace: &str) -> Result<Option<String>>;

    /// Replace a namespace's document
    async fn save(&self, namespace: &str, document: &str) -> Result<()>;

    /// Where the namespace lives, for log messages
    fn location(&self, namespace: &str) -> String;
}

/// Stores each namespace as `<dir>/<namespace>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{}.json", namespace))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn load(&self, namespace: &str) -> Result<Option<String>> {
        let path = self.path_for(namespace);
        match tokio::fs::read_to_string(&path).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache file yet");
                Ok(None)
            }
            Err(e) => Err(CacheError::io(path, e)),
        }
    }

    async fn save(&self, namespace: &str, document: &str) -> Result<()> {
        let dir = self.dir.clone();
        let path = self.path_for(namespace);
        let document = document.to_string();
        tokio::task::spawn_blocking(move || replace_file(&dir, &path, &document))
            .await
            .map_err(|e| CacheError::io(&self.dir, std::io::Error::new(ErrorKind::Other, e)))?
    }

    fn location(&self, namespace: &str) -> String {
        self.path_for(namespace).display().to_string()
    }
}

/// Write `document` to a fresh file in `dir` and rename it over `path`.
/// Readers see either the old document or the new one, never a mix.
fn replace_file(dir: &Path, path: &Path, document: &str) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| CacheError::io(dir, e))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
    file.write_all(document.as_bytes())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| CacheError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| CacheError::io(path, e.error))?;
    Ok(())
}

/// In-memory store, used by tests and cache-less runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<FxHashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a namespace with a raw document
    pub fn with_document(self, namespace: &str, document: &str) -> Self {
        self.documents
            .lock()
            .insert(namespace.to_string(), document.to_string());
        self
    }

    /// Current raw document of a namespace
    pub fn document(&self, namespace: &str) -> Option<String> {
        self.documents.lock().get(namespace).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self, namespace: &str) -> Result<Option<String>> {
        Ok(self.document(namespace))
    }

    async fn save(&self, namespace: &str, document: &str) -> Result<()> {
        self.documents
            .lock()
            .insert(namespace.to_string(), document.to_string());
        Ok(())
    }

    fn location(&self, namespace: &str) -> String {
        format!("memory:{}", namespace)
    }
}
