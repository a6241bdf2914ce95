//! Consent record: the user's latest policy for external services.
//!
//! Absence of a record means deny. The most recent record wins; the gate in
//! `crate::ai::gate` is the only reader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Whether outbound LLM calls are permitted at all.
    pub allow_llm: bool,
    /// Model identifiers the user has approved. Empty = any configured model.
    pub allowed_models: BTreeSet<String>,
    /// Glob patterns excluded from ingest and analysis.
    pub ignore_patterns: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl ConsentRecord {
    /// A deny-everything record, used when no consent has ever been stored.
    pub fn deny() -> Self {
        Self {
            allow_llm: false,
            allowed_models: BTreeSet::new(),
            ignore_patterns: default_ignore_patterns(),
            recorded_at: Utc::now(),
        }
    }

    /// True when the configured model may be used under this record.
    pub fn permits_model(&self, model: &str) -> bool {
        self.allow_llm && (self.allowed_models.is_empty() || self.allowed_models.contains(model))
    }
}

/// Directory names excluded from ingest by default.
///
/// `.git` is deliberately absent: version-control metadata is stored (the
/// git analyser rebuilds history from it) but excluded from file counts and
/// code analysis separately.
pub fn default_ignore_patterns() -> Vec<String> {
    [
        // Dependencies
        "node_modules",
        "vendor",
        "bower_components",
        // Python environments and caches
        "venv",
        ".venv",
        "env",
        "virtualenv",
        "__pycache__",
        ".pytest_cache",
        ".mypy_cache",
        ".ruff_cache",
        ".tox",
        // IDEs
        ".idea",
        ".vscode",
        ".vs",
        // Build outputs
        "build",
        "dist",
        "out",
        "target",
        ".next",
        ".nuxt",
        ".gradle",
        // Caches and coverage
        ".cache",
        "coverage",
        ".nyc_output",
        // OS noise
        ".DS_Store",
        "Thumbs.db",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
