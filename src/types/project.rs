//! Core domain records: uploads, projects, file entries, content objects.
//!
//! All records are plain serde-able data. Ownership rules:
//! - `Upload` is immutable once created.
//! - `Project` rows are written only through the repository.
//! - `ContentObject` payloads are immutable and shared by many `FileEntry`
//!   rows; a `FileEntry` exclusively owns its `(project, relative_path)`
//!   slot and borrows the content by hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// Immutable record of one archive ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: i64,
    /// Original filename of the uploaded archive.
    pub filename: String,
    pub size_bytes: u64,
    /// Relative path of the content root inside the archive ("" = archive root).
    pub content_root: String,
    pub created_at: DateTime<Utc>,
}

/// A discovered logical unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    /// Relative path under the workspace root.
    pub rel_path: String,
    /// A framework is only ever present together with a language.
    pub language: Option<String>,
    pub framework: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_collaborative: bool,
    pub role: Role,
    /// User contribution percentage, 0-100.
    pub contribution_pct: f64,
    pub role_justification: Option<String>,
    /// Monotone rank from the scorer, 1 = most important.
    pub importance_rank: Option<i64>,
    pub importance_score: Option<f64>,
    pub showcase: bool,
    pub thumbnail: Option<String>,
    pub file_count: u64,
    pub has_git: bool,
    /// Fingerprint of the file set at the last completed analysis.
    pub last_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The (Project x Upload) edge recording upload lineage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSource {
    pub project_id: i64,
    pub upload_id: i64,
    /// Files added or modified by this upload for this project.
    pub artifact_count: u64,
}

/// Coarse content classification, assigned from the file extension at
/// ingest time. Media and binary payloads get no deeper analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeCategory {
    Code,
    Doc,
    Design,
    Media,
    Other,
}

impl MimeCategory {
    /// Classify a relative path by extension.
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "rs" | "py" | "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "java" | "c" | "cc"
            | "cpp" | "cxx" | "h" | "hpp" | "cs" | "go" | "rb" | "php" | "kt" | "swift"
            | "scala" | "sh" | "bash" | "sql" | "html" | "css" | "scss" | "vue" | "svelte" => {
                Self::Code
            }
            "md" | "mdx" | "rst" | "txt" | "adoc" | "pdf" | "docx" | "pptx" => Self::Doc,
            "fig" | "sketch" | "xd" | "psd" | "ai" => Self::Design,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico" | "mp4" | "mov" | "wav"
            | "mp3" | "ogg" => Self::Media,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Doc => "doc",
            Self::Design => "design",
            Self::Media => "media",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for MimeCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            "doc" => Ok(Self::Doc),
            "design" => Ok(Self::Design),
            "media" => Ok(Self::Media),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown mime category: {}", s)),
        }
    }
}

/// Metadata row for an immutable content-addressed payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentObject {
    /// SHA-256 of the raw bytes, lowercase hex, 64 chars.
    pub hash: String,
    pub size: u64,
    pub mime: MimeCategory,
}

/// `(project, relative_path) -> content_hash`. The project's current file
/// set after all merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub project_id: i64,
    pub rel_path: String,
    pub content_hash: String,
}

/// Candidate project descriptor emitted by discovery, before any database
/// rows exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateProject {
    /// Derived from the directory basename.
    pub name: String,
    /// Relative path of the project root inside the archive ("" = root).
    pub rel_path: String,
    pub file_count: u64,
    pub has_git: bool,
}

/// A file inside a candidate or stored project: archive-relative path plus
/// content identity. The working unit of the merge engine and the analysers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path relative to the project root.
    pub rel_path: String,
    pub content_hash: String,
    pub size: u64,
}

/// Downstream artefact row (portfolio item, bullet set, ...) keyed by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub kind: String,
    pub project_id: i64,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
