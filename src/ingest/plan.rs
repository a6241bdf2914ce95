//! Ingest plan: the pure description of what one archive does to the
//! database. Computed by the merge engine, applied atomically by the
//! repository so a failed archive leaves no partial rows behind.

use chrono::{DateTime, Utc};

use crate::types::MimeCategory;

/// One file carried by the archive for a given project. The payload bytes
/// are already in the content store by the time a plan exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    /// Path relative to the project root.
    pub rel_path: String,
    pub content_hash: String,
    pub size: u64,
    pub mime: MimeCategory,
    /// Archive-recorded modification time, if any.
    pub modified: Option<DateTime<Utc>>,
}

/// Where a candidate's files should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectTarget {
    /// Create a fresh project row.
    New { name: String, rel_path: String },
    /// Append to an existing project (validated mapping).
    Existing { project_id: i64 },
}

#[derive(Debug, Clone)]
pub struct ProjectPlan {
    pub target: ProjectTarget,
    pub files: Vec<FilePayload>,
    pub has_git: bool,
}

/// Everything one archive ingest will write, in one transaction.
#[derive(Debug, Clone)]
pub struct IngestPlan {
    pub filename: String,
    pub size_bytes: u64,
    pub content_root: String,
    pub projects: Vec<ProjectPlan>,
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub upload_id: i64,
    /// `(project_id, name)` for projects created by this ingest.
    pub created: Vec<(i64, String)>,
    /// `(project_id, added_or_modified)` for appended projects.
    pub appended: Vec<(i64, u64)>,
}

impl IngestReport {
    pub fn project_ids(&self) -> Vec<i64> {
        self.created
            .iter()
            .map(|(id, _)| *id)
            .chain(self.appended.iter().map(|(id, _)| *id))
            .collect()
    }
}
