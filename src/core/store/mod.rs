//! Object-store integration for backup artifacts
//!
//! A thin capability over one pre-selected bucket. Objects are keyed by
//! file basename and carry a single metadata field, `backup_time`, an
//! ISO-8601 UTC timestamp. `S3Store` is the production implementation;
//! `MemoryStore` backs the test suite. "No bucket configured" is modeled
//! by the lifecycle manager holding no store at all.

pub mod error;
pub mod memory;
pub mod s3;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use s3::S3Store;

use std::path::Path;

/// Metadata of one stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub backup_time: Option<String>,
}

/// Blocking access to the backup bucket. Transport failures propagate;
/// absent keys are reported, not raised.
pub trait ObjectStore: Send + Sync {
    /// Upload `local_path` under its basename with the given
    /// `backup_time` metadata.
    fn put(&self, local_path: &Path, backup_time: &str) -> StoreResult<()>;

    /// Metadata for `key` without fetching the body; `None` if absent.
    fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>>;

    /// Download `key` to `local_path`; `false` if the key is absent.
    fn get(&self, key: &str, local_path: &Path) -> StoreResult<bool>;
}

pub(crate) fn object_key(local_path: &Path) -> StoreResult<String> {
    local_path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| StoreError::InvalidKey(local_path.display().to_string()))
}
