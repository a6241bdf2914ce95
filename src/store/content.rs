//! Content-Addressed Object Store
//!
//! Every ingested file payload lives exactly once under
//! `objects/<hh>/<hash>` where `hh` is the first two hex chars of its
//! SHA-256. Writes go through a temp file and an atomic rename, so `put`
//! is idempotent and safe under concurrent ingests. Objects are never
//! overwritten or mutated.
//!
//! The store also owns the project fingerprint: a deterministic hash over
//! the `(relative_path, content_hash)` multiset that gates re-analysis.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::{FolioError, Result};

pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// SHA-256 of raw bytes as lowercase hex.
    pub fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Store a payload, returning its content hash. Storing the same bytes
    /// twice is a no-op.
    pub fn put(&self, bytes: &[u8]) -> Result<String> {
        let hash = Self::hash_bytes(bytes);
        let path = self.object_path(&hash);

        if path.exists() {
            return Ok(hash);
        }

        let parent = path
            .parent()
            .ok_or_else(|| FolioError::Storage("object path has no parent".to_string()))?;
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        // A concurrent put of the same hash may win the rename; both sides
        // wrote identical bytes, so either outcome is correct.
        match tmp.persist(&path) {
            Ok(_) => {}
            Err(e) if path.exists() => {
                debug!("object {} already persisted concurrently: {}", hash, e.error);
            }
            Err(e) => return Err(e.error.into()),
        }

        Ok(hash)
    }

    /// Fetch a payload by hash.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.object_path(hash);
        if !path.exists() {
            return Err(FolioError::NotFound(format!("content object {}", hash)));
        }
        Ok(fs::read(path)?)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.object_path(hash).exists()
    }

    /// Rebuild a project tree on disk from its file entries. Used to give
    /// git and the analysers a real directory to work against.
    pub fn materialize(&self, entries: &[(String, String)], dest: &Path) -> Result<()> {
        for (rel_path, hash) in entries {
            let target = dest.join(rel_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let bytes = self.get(hash)?;
            fs::write(&target, bytes)?;
        }
        Ok(())
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        let prefix = &hash[..2.min(hash.len())];
        self.root.join(prefix).join(hash)
    }
}

/// Deterministic fingerprint over a project's `(relative_path, content_hash)`
/// multiset. Pairs are sorted lexicographically by path; fields are
/// NUL-separated so path/hash boundaries cannot collide.
///
/// Encoding: lowercase hex, 64 characters.
pub fn fingerprint_entries(entries: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let mut hasher = Sha256::new();
    for (path, hash) in sorted {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(hash.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
