//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/zipfolio/) and project (.zipfolio/) level
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{deadlines, ingest, scoring};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Where the object store and database live
    pub storage: StorageConfig,

    /// Archive ingest limits
    pub ingest: IngestConfig,

    /// Analysis pipeline settings
    pub analysis: AnalysisConfig,

    /// Importance score weights (repository-persisted weights win)
    pub scoring: ScoreWeights,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Git identity of the current user, for role detection
    pub identity: IdentityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            storage: StorageConfig::default(),
            ingest: IngestConfig::default(),
            analysis: AnalysisConfig::default(),
            scoring: ScoreWeights::default(),
            llm: LlmConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `FolioError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if self.ingest.max_archive_bytes == 0 {
            return Err(crate::types::FolioError::Config(
                "ingest.max_archive_bytes must be greater than 0".to_string(),
            ));
        }

        if self.analysis.worker_pool == 0 {
            return Err(crate::types::FolioError::Config(
                "analysis.worker_pool must be at least 1".to_string(),
            ));
        }

        self.scoring.validate()?;

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::FolioError::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(crate::types::FolioError::Config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for the content-addressed object store.
    pub objects_dir: PathBuf,

    /// SQLite database file.
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            objects_dir: PathBuf::from(".zipfolio/objects"),
            database_path: PathBuf::from(".zipfolio/zipfolio.db"),
        }
    }
}

// =============================================================================
// Ingest Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum total uncompressed size of one archive.
    pub max_archive_bytes: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_archive_bytes: ingest::DEFAULT_MAX_ARCHIVE_BYTES,
        }
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Bounded worker pool size for batch analysis. 1 = sequential.
    pub worker_pool: usize,

    /// Per-file size cap before sampling kicks in.
    pub max_file_bytes: u64,

    /// Deadline for one git subprocess invocation.
    pub git_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            worker_pool: 1,
            max_file_bytes: crate::constants::analysis::MAX_FILE_BYTES,
            git_timeout_secs: deadlines::GIT_LOG_SECS,
        }
    }
}

// =============================================================================
// Score Weights
// =============================================================================

/// Four non-negative weights. They need not sum to 1; the scorer
/// normalises internally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub contribution: f64,
    pub diversity: f64,
    pub duration: f64,
    pub file_count: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let [contribution, diversity, duration, file_count] = scoring::DEFAULT_WEIGHTS;
        Self {
            contribution,
            diversity,
            duration,
            file_count,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> crate::types::Result<()> {
        let all = [
            self.contribution,
            self.diversity,
            self.duration,
            self.file_count,
        ];
        if all.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(crate::types::FolioError::Config(
                "score weights must be non-negative finite numbers".to_string(),
            ));
        }
        if all.iter().sum::<f64>() <= 0.0 {
            return Err(crate::types::FolioError::Config(
                "at least one score weight must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Weights scaled to sum to 1.
    pub fn normalised(&self) -> Self {
        let sum = self.contribution + self.diversity + self.duration + self.file_count;
        Self {
            contribution: self.contribution / sum,
            diversity: self.diversity / sum,
            duration: self.duration / sum,
            file_count: self.file_count / sum,
        }
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

/// Note: the API key is never serialized back out and is redacted in debug
/// output by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider kind: currently "openai" (any OpenAI-compatible endpoint).
    pub provider: String,

    pub model: String,

    pub timeout_secs: u64,

    /// 0.0 = deterministic; kept low so ai-mode bullets are stable-ish.
    pub temperature: f32,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// TOML cannot represent a bare None; omit the key instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: deadlines::LLM_REQUEST_SECS,
            temperature: 0.2,
            api_key: None,
            api_base: None,
            max_tokens: 1024,
        }
    }
}

impl LlmConfig {
    /// True when enough is configured to attempt a call at all.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || std::env::var("ZIPFOLIO_LLM_API_KEY").is_ok()
    }
}

// =============================================================================
// Identity Configuration
// =============================================================================

/// Author names/emails identifying "the current user" in git history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub names: Vec<String>,
    pub emails: Vec<String>,
}

impl IdentityConfig {
    /// Case-insensitive match against a commit author.
    pub fn matches(&self, author_name: &str, author_email: &str) -> bool {
        let name = author_name.trim().to_lowercase();
        let email = author_email.trim().to_lowercase();
        self.names.iter().any(|n| n.trim().to_lowercase() == name)
            || self.emails.iter().any(|e| e.trim().to_lowercase() == email)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.emails.is_empty()
    }
}
