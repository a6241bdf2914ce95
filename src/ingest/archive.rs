//! Archive Reading
//!
//! Validates an uploaded ZIP, enforces the uncompressed size cap, and
//! streams every accepted entry into the content store. Entry paths are
//! normalised first: backslashes become slashes, leading slashes are
//! stripped, and any path containing `.` / `..` segments is rejected.
//!
//! Ignore patterns drop files from ingest entirely. `.git/**` entries are
//! exempt from ignore matching: history must survive into the store so the
//! git analyser can rebuild it, even though those files are never counted
//! or analysed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::store::ContentStore;
use crate::types::{FolioError, MimeCategory, Result};

/// One accepted archive entry, already persisted to the content store.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    /// Normalised path relative to the archive root.
    pub rel_path: String,
    pub content_hash: String,
    pub size: u64,
    pub mime: MimeCategory,
    /// Modification time recorded in the archive, when present. Feeds the
    /// project date range for projects without git history.
    pub modified: Option<DateTime<Utc>>,
}

/// Result of reading one archive.
#[derive(Debug, Default)]
pub struct ArchiveListing {
    pub files: Vec<ArchiveFile>,
    pub total_uncompressed: u64,
    /// Non-fatal per-entry problems (unreadable entries, rejected paths).
    pub diagnostics: Vec<String>,
}

/// Matches a relative path against the active ignore list. Patterns with
/// glob metacharacters match the whole path; plain patterns match any
/// single path segment (the common "node_modules" case).
pub struct IgnoreMatcher {
    segments: Vec<String>,
    globs: Vec<glob::Pattern>,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Self {
        let mut segments = Vec::new();
        let mut globs = Vec::new();
        for pattern in patterns {
            if pattern.contains(['*', '?', '[']) {
                match glob::Pattern::new(pattern) {
                    Ok(p) => globs.push(p),
                    Err(e) => warn!("Skipping invalid ignore glob '{}': {}", pattern, e),
                }
            } else {
                segments.push(pattern.to_lowercase());
            }
        }
        Self { segments, globs }
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if rel_path == ".git" || rel_path.starts_with(".git/") || rel_path.contains("/.git/") {
            return false;
        }
        if self
            .globs
            .iter()
            .any(|p| p.matches(rel_path))
        {
            return true;
        }
        rel_path
            .split('/')
            .any(|segment| self.segments.contains(&segment.to_lowercase()))
    }
}

fn zip_datetime_to_utc(dt: zip::DateTime) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(
        dt.year() as i32,
        dt.month() as u32,
        dt.day() as u32,
        dt.hour() as u32,
        dt.minute() as u32,
        dt.second() as u32,
    )
    .single()
}

/// Normalise a raw archive entry name. Returns `None` for directory
/// entries, empty names, and traversal attempts.
pub fn normalize_entry_path(raw: &str) -> Option<String> {
    let slashed = raw.replace('\\', "/");
    let trimmed = slashed.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }
    let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    if parts.iter().any(|p| *p == "." || *p == "..") {
        return None;
    }
    Some(parts.join("/"))
}

pub struct ArchiveReader<'a> {
    store: &'a ContentStore,
    max_uncompressed: u64,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(store: &'a ContentStore, max_uncompressed: u64) -> Self {
        Self {
            store,
            max_uncompressed,
        }
    }

    /// Read and ingest one archive. `InvalidArchive` and `ArchiveTooLarge`
    /// are fatal; per-entry problems are collected as diagnostics.
    pub fn read(&self, archive_path: &Path, ignore: &IgnoreMatcher) -> Result<ArchiveListing> {
        if archive_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| !e.eq_ignore_ascii_case("zip"))
            .unwrap_or(true)
        {
            return Err(FolioError::InvalidArchive(format!(
                "expected a .zip file, got {}",
                archive_path.display()
            )));
        }

        let file = File::open(archive_path).map_err(|e| {
            FolioError::InvalidArchive(format!("{}: {}", archive_path.display(), e))
        })?;
        let mut archive = ZipArchive::new(file)?;

        // Size cap first, before any bytes are stored.
        let mut total: u64 = 0;
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            total = total.saturating_add(entry.size());
        }
        if total > self.max_uncompressed {
            return Err(FolioError::ArchiveTooLarge {
                size: total,
                limit: self.max_uncompressed,
            });
        }

        let mut listing = ArchiveListing {
            total_uncompressed: total,
            ..Default::default()
        };

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let Some(rel_path) = normalize_entry_path(entry.name()) else {
                if !entry.is_dir() {
                    listing
                        .diagnostics
                        .push(format!("rejected entry path: {}", entry.name()));
                }
                continue;
            };

            if ignore.matches(&rel_path) {
                continue;
            }

            let mut bytes = Vec::with_capacity(entry.size() as usize);
            if let Err(e) = entry.read_to_end(&mut bytes) {
                // Per-path failure: skip, log, continue.
                warn!("Skipping unreadable entry {}: {}", rel_path, e);
                listing
                    .diagnostics
                    .push(format!("unreadable entry {}: {}", rel_path, e));
                continue;
            }

            let modified = entry.last_modified().and_then(zip_datetime_to_utc);
            let content_hash = self.store.put(&bytes)?;
            listing.files.push(ArchiveFile {
                mime: MimeCategory::from_path(&rel_path),
                size: bytes.len() as u64,
                modified,
                rel_path,
                content_hash,
            });
        }

        debug!(
            "Read archive {}: {} files, {} bytes uncompressed",
            archive_path.display(),
            listing.files.len(),
            listing.total_uncompressed
        );
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.as_file_mut());
            for (name, bytes) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(bytes).unwrap();
            }
            writer.finish().unwrap();
        }
        file
    }

    fn store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("objects")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(
            normalize_entry_path("demo/main.py"),
            Some("demo/main.py".to_string())
        );
        assert_eq!(
            normalize_entry_path("/abs/path.py"),
            Some("abs/path.py".to_string())
        );
        assert_eq!(
            normalize_entry_path("win\\style\\a.py"),
            Some("win/style/a.py".to_string())
        );
        assert_eq!(normalize_entry_path("demo/"), None);
        assert_eq!(normalize_entry_path("../escape.py"), None);
        assert_eq!(normalize_entry_path("a/./b.py"), None);
    }

    #[test]
    fn test_ignore_matcher_segments_and_globs() {
        let matcher = IgnoreMatcher::new(&[
            "node_modules".to_string(),
            "*.log".to_string(),
        ]);
        assert!(matcher.matches("app/node_modules/pkg/index.js"));
        assert!(matcher.matches("debug.log"));
        assert!(!matcher.matches("src/main.py"));
        // .git is always exempt
        assert!(!matcher.matches("demo/.git/HEAD"));
    }

    #[test]
    fn test_read_valid_archive() {
        let (_dir, store) = store();
        let zip = build_zip(&[
            ("demo/main.py", b"print('hi')"),
            ("demo/README.md", b"# demo"),
        ]);
        let reader = ArchiveReader::new(&store, 10 * 1024 * 1024);
        let listing = reader
            .read(zip.path(), &IgnoreMatcher::new(&[]))
            .unwrap();
        assert_eq!(listing.files.len(), 2);
        assert!(store.contains(&listing.files[0].content_hash));
    }

    #[test]
    fn test_invalid_archive_rejected() {
        let (_dir, store) = store();
        let mut file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        file.write_all(b"this is not a zip").unwrap();
        let reader = ArchiveReader::new(&store, 1024);
        let err = reader
            .read(file.path(), &IgnoreMatcher::new(&[]))
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArchive(_)));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        let (_dir, store) = store();
        let file = tempfile::Builder::new().suffix(".tar").tempfile().unwrap();
        let reader = ArchiveReader::new(&store, 1024);
        let err = reader
            .read(file.path(), &IgnoreMatcher::new(&[]))
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidArchive(_)));
    }

    #[test]
    fn test_size_cap_enforced() {
        let (_dir, store) = store();
        let big = vec![0u8; 4096];
        let zip = build_zip(&[("big.bin", big.as_slice())]);
        let reader = ArchiveReader::new(&store, 1024);
        let err = reader
            .read(zip.path(), &IgnoreMatcher::new(&[]))
            .unwrap_err();
        assert!(matches!(err, FolioError::ArchiveTooLarge { .. }));
    }

    #[test]
    fn test_ignored_files_not_ingested() {
        let (_dir, store) = store();
        let zip = build_zip(&[
            ("demo/main.py", b"code"),
            ("demo/node_modules/x/index.js", b"dep"),
        ]);
        let reader = ArchiveReader::new(&store, 1024 * 1024);
        let listing = reader
            .read(
                zip.path(),
                &IgnoreMatcher::new(&["node_modules".to_string()]),
            )
            .unwrap();
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].rel_path, "demo/main.py");
    }
}
