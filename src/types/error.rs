//! Unified Error Type System
//!
//! One error enum for the whole pipeline. Variants map 1:1 onto the error
//! kinds surfaced at the API boundary (invalid archive, ambiguous mapping,
//! lock contention, ...) plus auto-converted system errors.
//!
//! Per-path problems (unreadable file, permission denied) are deliberately
//! NOT variants here: they are collected into the project's diagnostics bag
//! and never abort an ingest or an analysis.

use std::time::Duration;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FolioError>;

#[derive(Debug, Error)]
pub enum FolioError {
    // -------------------------------------------------------------------------
    // System errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    // -------------------------------------------------------------------------
    // Ingest errors
    // -------------------------------------------------------------------------
    /// The uploaded file is not a well-formed ZIP archive. Fatal for the
    /// whole upload; the ingest transaction is rolled back.
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Archive exceeds the maximum uncompressed size ({size} > {limit} bytes)")]
    ArchiveTooLarge { size: u64, limit: u64 },

    /// A project mapping matched more than one candidate (HTTP 409 at the
    /// API boundary).
    #[error("Ambiguous project mapping for '{candidate}': {reason}")]
    AmbiguousMapping { candidate: String, reason: String },

    // -------------------------------------------------------------------------
    // Pipeline errors
    // -------------------------------------------------------------------------
    /// Per-project advisory lock contention (HTTP 409 at the API boundary).
    #[error("Project {project_id} is already being processed")]
    Conflict { project_id: i64 },

    /// A language analyser failed wholesale. The pipeline degrades to the
    /// generic path; this error never aborts a batch.
    #[error("Analyser for {language} failed: {reason}")]
    AnalyserFailed { language: String, reason: String },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // Domain errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller requested the LLM path but the consent gate refused.
    /// Surfaced to users as "degraded to local", never as a failure.
    #[error("Consent denied for external LLM calls")]
    ConsentDenied,

    /// The LLM returned something that could not be coerced into the
    /// requested shape. Internal; triggers the local fallback.
    #[error("Malformed LLM response: {0}")]
    MalformedLlmResponse(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl FolioError {
    /// Build a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// True when this error should degrade the current project but let the
    /// rest of the batch continue.
    pub fn is_per_project(&self) -> bool {
        matches!(
            self,
            Self::AnalyserFailed { .. } | Self::Timeout { .. } | Self::Git(_)
        )
    }
}

impl From<zip::result::ZipError> for FolioError {
    fn from(err: zip::result::ZipError) -> Self {
        FolioError::InvalidArchive(err.to_string())
    }
}
