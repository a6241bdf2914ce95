//! Incremental Merge Engine
//!
//! Turns one archive plus an optional `candidate name -> project id`
//! mapping into an [`IngestPlan`]. Plan computation is pure; the
//! repository applies the plan in a single transaction. Together that
//! gives the invariant the ingest boundary promises: a failed archive
//! leaves nothing behind, and replaying uploads in order is a no-op.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::store::{ContentStore, Repository};
use crate::types::{CandidateProject, FolioError, Result};

use super::archive::{ArchiveListing, ArchiveReader, IgnoreMatcher};
use super::discovery::{candidate_files, discover_projects};
use super::plan::{FilePayload, IngestPlan, IngestReport, ProjectPlan, ProjectTarget};

pub struct IngestEngine<'a> {
    store: &'a ContentStore,
    repository: &'a dyn Repository,
    max_archive_bytes: u64,
}

impl<'a> IngestEngine<'a> {
    pub fn new(
        store: &'a ContentStore,
        repository: &'a dyn Repository,
        max_archive_bytes: u64,
    ) -> Self {
        Self {
            store,
            repository,
            max_archive_bytes,
        }
    }

    /// Ingest one archive end to end: read + discover + plan + apply.
    pub fn ingest(
        &self,
        archive_path: &Path,
        mapping: &HashMap<String, i64>,
        ignore_patterns: &[String],
    ) -> Result<IngestReport> {
        let ignore = IgnoreMatcher::new(ignore_patterns);
        let reader = ArchiveReader::new(self.store, self.max_archive_bytes);
        let listing = reader.read(archive_path, &ignore)?;

        let fallback_name = archive_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");
        let candidates = discover_projects(&listing.files, fallback_name);

        let plan = self.plan(archive_path, &listing, &candidates, mapping)?;
        let report = self.repository.apply_ingest(&plan)?;

        info!(
            "Ingested {}: {} project(s) created, {} appended",
            plan.filename,
            report.created.len(),
            report.appended.len()
        );
        Ok(report)
    }

    /// Compute the plan (reads projects, writes nothing). Mapping rules:
    /// - a candidate named in `mapping` appends to that project;
    /// - two candidates sharing a mapped name is `AmbiguousMapping`;
    /// - an unmapped candidate whose `(name, rel_path)` matches an
    ///   existing project appends to it, which makes re-ingesting the
    ///   same archive a no-op;
    /// - everything else becomes a new project.
    pub fn plan(
        &self,
        archive_path: &Path,
        listing: &ArchiveListing,
        candidates: &[CandidateProject],
        mapping: &HashMap<String, i64>,
    ) -> Result<IngestPlan> {
        // A mapped name must resolve to exactly one candidate.
        for name in mapping.keys() {
            let hits = candidates.iter().filter(|c| &c.name == name).count();
            if hits == 0 {
                return Err(FolioError::AmbiguousMapping {
                    candidate: name.clone(),
                    reason: "no discovered project by that name".to_string(),
                });
            }
            if hits > 1 {
                return Err(FolioError::AmbiguousMapping {
                    candidate: name.clone(),
                    reason: format!("{} discovered projects share that name", hits),
                });
            }
        }

        let mut projects = Vec::new();
        for candidate in candidates {
            let files: Vec<FilePayload> = candidate_files(&listing.files, candidate)
                .into_iter()
                .map(|(file, rel)| FilePayload {
                    rel_path: rel,
                    content_hash: file.content_hash.clone(),
                    size: file.size,
                    mime: file.mime,
                    modified: file.modified,
                })
                .collect();

            let target = match mapping.get(&candidate.name) {
                Some(project_id) => ProjectTarget::Existing {
                    project_id: *project_id,
                },
                None => {
                    let existing = self.repository.find_projects_by_name(&candidate.name)?;
                    match existing.iter().find(|p| p.rel_path == candidate.rel_path) {
                        Some(project) => ProjectTarget::Existing {
                            project_id: project.id,
                        },
                        None => ProjectTarget::New {
                            name: candidate.name.clone(),
                            rel_path: candidate.rel_path.clone(),
                        },
                    }
                }
            };

            projects.push(ProjectPlan {
                target,
                files,
                has_git: candidate.has_git,
            });
        }

        Ok(IngestPlan {
            filename: archive_path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("upload.zip")
                .to_string(),
            size_bytes: std::fs::metadata(archive_path).map(|m| m.len()).unwrap_or(0),
            content_root: String::new(),
            projects,
        })
    }
}
