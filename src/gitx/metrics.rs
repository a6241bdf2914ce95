//! Authorship metrics extracted from a commit log.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::IdentityConfig;
use crate::types::GitSummary;

use super::{CommitRecord, is_bot_author};

/// Full authorship picture for one repository.
#[derive(Debug, Clone, Default)]
pub struct GitMetrics {
    pub commit_count: u64,
    /// Per-author commit counts, bots excluded. Keyed by author name.
    pub authors: HashMap<String, u64>,
    /// Author names that matched the configured user identity.
    pub user_authors: HashSet<String>,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    pub user_commits: u64,
    /// Ratio of commits whose subject carries a conventional-commit prefix.
    pub conventional_ratio: f64,
    pub merge_commit_count: u64,
}

impl GitMetrics {
    pub fn author_count(&self) -> u64 {
        self.authors.len() as u64
    }

    /// Two or more distinct human authors.
    pub fn is_collaborative(&self) -> bool {
        self.authors.len() >= 2
    }

    pub fn contribution_pct(&self) -> f64 {
        if self.commit_count == 0 {
            0.0
        } else {
            self.user_commits as f64 / self.commit_count as f64 * 100.0
        }
    }

    /// Commit counts of every author who is not the user. This pool does
    /// not move when the user's own commit count changes, which is what
    /// keeps role classification monotone in user commits.
    pub fn peer_counts(&self) -> Vec<u64> {
        self.authors
            .iter()
            .filter(|(name, _)| !self.user_authors.contains(*name))
            .map(|(_, count)| *count)
            .collect()
    }

    pub fn duration_days(&self) -> u64 {
        match (self.first_commit, self.last_commit) {
            (Some(first), Some(last)) => (last - first).num_days().max(0) as u64,
            _ => 0,
        }
    }

    pub fn to_summary(&self) -> GitSummary {
        GitSummary {
            commit_count: self.commit_count,
            author_count: self.author_count(),
            first_commit: self.first_commit,
            last_commit: self.last_commit,
            user_commits: self.user_commits,
        }
    }
}

const CONVENTIONAL_PREFIXES: &[&str] = &[
    "feat", "fix", "chore", "docs", "refactor", "test", "style", "perf", "build", "ci",
];

/// Fold a commit log into authorship metrics. The current user is matched
/// by the configured identity (name or email, case-insensitive).
pub fn compute_metrics(commits: &[CommitRecord], identity: &IdentityConfig) -> GitMetrics {
    let mut metrics = GitMetrics::default();

    let mut conventional = 0u64;
    for commit in commits {
        metrics.commit_count += 1;

        if !is_bot_author(&commit.author_name) {
            *metrics
                .authors
                .entry(commit.author_name.clone())
                .or_default() += 1;
        }

        if identity.matches(&commit.author_name, &commit.author_email) {
            metrics.user_commits += 1;
            metrics.user_authors.insert(commit.author_name.clone());
        }

        if commit.is_merge {
            metrics.merge_commit_count += 1;
        }

        if has_conventional_prefix(&commit.subject) {
            conventional += 1;
        }

        metrics.first_commit = Some(match metrics.first_commit {
            Some(first) if first <= commit.timestamp => first,
            _ => commit.timestamp,
        });
        metrics.last_commit = Some(match metrics.last_commit {
            Some(last) if last >= commit.timestamp => last,
            _ => commit.timestamp,
        });
    }

    if metrics.commit_count > 0 {
        metrics.conventional_ratio = conventional as f64 / metrics.commit_count as f64;
    }

    metrics
}

fn has_conventional_prefix(subject: &str) -> bool {
    let Some(head) = subject.split(':').next() else {
        return false;
    };
    if head.len() == subject.len() {
        return false;
    }
    // Strip an optional scope: "feat(ingest)" -> "feat".
    let bare = head.split('(').next().unwrap_or(head).trim_end_matches('!');
    CONVENTIONAL_PREFIXES.contains(&bare)
}
