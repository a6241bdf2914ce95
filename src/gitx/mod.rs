//! Git Capability
//!
//! The pipeline is indifferent to how history is obtained: it consumes the
//! [`GitLog`] trait. The shipped implementation shells out to `git log`
//! with a deadline; a project whose `.git` directory is present but
//! unusable is treated as having no history at all (the failure is
//! reported as a diagnostic, never as a project failure).

pub mod metrics;
pub mod role;

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::types::{FolioError, Result};

pub use metrics::{GitMetrics, compute_metrics};
pub use role::{RoleOutcome, classify_role};

/// One commit, as the core sees it.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub is_merge: bool,
}

/// Pluggable history source.
#[async_trait]
pub trait GitLog: Send + Sync {
    /// Full commit log for the repository at `root`, newest first.
    /// `Err(FolioError::Git)` means "history unavailable"; callers degrade
    /// to the non-git path.
    async fn log(&self, root: &Path) -> Result<Vec<CommitRecord>>;
}

/// Shells out to the `git` binary.
pub struct SubprocessGit {
    deadline: Duration,
}

impl SubprocessGit {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }
}

impl Default for SubprocessGit {
    fn default() -> Self {
        Self::new(Duration::from_secs(
            crate::constants::deadlines::GIT_LOG_SECS,
        ))
    }
}

// Field separator unlikely to appear in names or subjects.
const FIELD_SEP: char = '\u{1f}';

#[async_trait]
impl GitLog for SubprocessGit {
    async fn log(&self, root: &Path) -> Result<Vec<CommitRecord>> {
        if !root.join(".git").exists() {
            return Err(FolioError::Git("no version control metadata".to_string()));
        }

        let format = format!("%H{s}%an{s}%ae{s}%aI{s}%P{s}%s", s = FIELD_SEP);
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(root)
            .arg("log")
            .arg("--all")
            .arg(format!("--pretty=format:{}", format))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| FolioError::Git(format!("failed to spawn git: {}", e)))?;

        let output = timeout(self.deadline, child.wait_with_output())
            .await
            .map_err(|_| FolioError::timeout("git log", self.deadline))?
            .map_err(|e| FolioError::Git(format!("git log failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("git log failed at {}: {}", root.display(), stderr.trim());
            return Err(FolioError::Git(format!(
                "git log exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let commits = parse_log_output(&stdout);
        debug!("Parsed {} commits at {}", commits.len(), root.display());
        Ok(commits)
    }
}

fn parse_log_output(output: &str) -> Vec<CommitRecord> {
    let mut commits = Vec::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split(FIELD_SEP).collect();
        if fields.len() < 6 {
            continue;
        }
        let Ok(timestamp) = DateTime::parse_from_rfc3339(fields[3]) else {
            continue;
        };
        commits.push(CommitRecord {
            sha: fields[0].to_string(),
            author_name: fields[1].to_string(),
            author_email: fields[2].to_string(),
            timestamp: timestamp.with_timezone(&Utc),
            is_merge: fields[4].split_whitespace().count() > 1,
            subject: fields[5..].join(&FIELD_SEP.to_string()),
        });
    }
    commits
}

/// Bot identities excluded from authorship counts.
pub fn is_bot_author(name: &str) -> bool {
    let lowered = name.to_lowercase();
    lowered.ends_with("[bot]") || lowered == "github" || lowered.contains("dependabot")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sha: &str, name: &str, email: &str, ts: &str, parents: &str, subject: &str) -> String {
        [sha, name, email, ts, parents, subject].join(&FIELD_SEP.to_string())
    }

    #[test]
    fn test_parse_log_output() {
        let output = [
            line(
                "abc123",
                "Jane Doe",
                "jane@example.com",
                "2025-06-01T12:00:00+00:00",
                "parent1",
                "feat: add ingest",
            ),
            line(
                "def456",
                "Sam Roe",
                "sam@example.com",
                "2025-06-02T09:30:00+02:00",
                "parent1 parent2",
                "Merge pull request #4",
            ),
        ]
        .join("\n");

        let commits = parse_log_output(&output);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].author_name, "Jane Doe");
        assert!(!commits[0].is_merge);
        assert!(commits[1].is_merge);
        assert_eq!(commits[1].subject, "Merge pull request #4");
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let commits = parse_log_output("garbage line\n\n");
        assert!(commits.is_empty());
    }

    #[test]
    fn test_bot_detection() {
        assert!(is_bot_author("dependabot[bot]"));
        assert!(is_bot_author("github-classroom[bot]"));
        assert!(is_bot_author("GitHub"));
        assert!(!is_bot_author("Jane Doe"));
    }

    #[tokio::test]
    async fn test_missing_git_dir_is_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let git = SubprocessGit::default();
        let err = git.log(dir.path()).await.unwrap_err();
        assert!(matches!(err, FolioError::Git(_)));
    }
}
