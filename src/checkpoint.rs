//! File-backed checkpoint store: keyed JSON blobs.
//!
//! Tags map to `<dir>/<tag>.json`. The storage directory is created lazily on
//! first save; initialization is idempotent (`create_dir_all`), so concurrent
//! saves racing before the directory exists both succeed.
//!
//! Read semantics: an absent checkpoint is silent and yields the default
//! value; a read or parse failure is logged at `warn` and also yields the
//! default. Neither is surfaced to the caller.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Errors surfaced when writing a checkpoint.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Filesystem failure while creating the directory or writing the blob.
    #[error("failed to write checkpoint: {0}")]
    Io(#[from] io::Error),
    /// The data could not be serialized to JSON.
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Keyed JSON blob store on the local filesystem.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`. The directory is not created until the
    /// first [`save`](Self::save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage directory for this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `data` under `tag` as pretty-printed JSON.
    pub async fn save<T: Serialize>(&self, tag: &str, data: &T) -> Result<(), CheckpointError> {
        // Idempotent; tolerates concurrent callers racing to initialize.
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(self.dir.join(format!("{tag}.json")), bytes).await?;
        Ok(())
    }

    /// Load the checkpoint stored under `tag_or_path`.
    ///
    /// Accepts either a tag known to this store or an explicit path to a
    /// JSON file. Returns `T::default()` if the file is absent; a read or
    /// parse failure is logged and likewise treated as empty.
    pub async fn load<T>(&self, tag_or_path: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let path = self.resolve(tag_or_path);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read checkpoint");
                return T::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "malformed checkpoint; treating as empty"
                );
                T::default()
            }
        }
    }

    /// Tags currently stored, sorted. Empty if the directory does not exist
    /// yet.
    pub async fn list(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut tags = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tags.push(stem.to_string());
                }
            }
        }
        tags.sort();
        tags
    }

    /// A `.json` suffix or any path separator means the argument is a literal
    /// path; otherwise it is a tag in this store's directory.
    fn resolve(&self, tag_or_path: &str) -> PathBuf {
        let candidate = Path::new(tag_or_path);
        let is_path = tag_or_path.ends_with(".json")
            || candidate.components().count() > 1
            || matches!(candidate.components().next(), Some(Component::RootDir));
        if is_path {
            candidate.to_path_buf()
        } else {
            self.dir.join(format!("{tag_or_path}.json"))
        }
    }
}
