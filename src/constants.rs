//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Ingest constants
pub mod ingest {
    /// Maximum uncompressed archive size (bytes) unless overridden by config.
    pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

    /// Streaming chunk size when hashing archive entries.
    pub const STREAM_CHUNK_SIZE: usize = 1024 * 1024;

    /// Manifest filenames that mark a directory as a project root.
    pub const MANIFEST_FILES: &[&str] = &[
        "pyproject.toml",
        "requirements.txt",
        "setup.py",
        "package.json",
        "Cargo.toml",
        "go.mod",
        "pom.xml",
        "build.gradle",
        "build.gradle.kts",
        "CMakeLists.txt",
        "Makefile",
        "composer.json",
        "Gemfile",
    ];
}

/// Code analysis constants
pub mod analysis {
    /// Files larger than this are sampled: only the first
    /// `SAMPLE_HEAD_BYTES` are scanned.
    pub const MAX_FILE_BYTES: u64 = 1_048_576;

    /// How much of an oversized file is analysed.
    pub const SAMPLE_HEAD_BYTES: usize = 256 * 1024;

    /// Language weight floor below which detection reports no language.
    pub const DETECTION_WEIGHT_FLOOR: f64 = 3.0;

    /// Commits with a conventional-commit prefix at or above this ratio
    /// count as evidence of the practice.
    pub const CONVENTIONAL_COMMIT_RATIO: f64 = 0.3;

    /// Fraction of doc-classified files that counts as documentation
    /// discipline.
    pub const DOC_DENSITY_THRESHOLD: f64 = 0.1;
}

/// Scoring constants
pub mod scoring {
    /// Default score weights: contribution / diversity / duration / file count.
    pub const DEFAULT_WEIGHTS: [f64; 4] = [0.35, 0.25, 0.20, 0.20];

    /// Score scale upper bound.
    pub const SCORE_SCALE: f64 = 100.0;
}

/// Bullet generation constants
pub mod bullets {
    /// Default maximum bullets per project.
    pub const DEFAULT_MAX_BULLETS: usize = 6;

    /// Minimum bullets a language-specific local generator emits.
    pub const MIN_LOCAL_BULLETS: usize = 3;

    /// Maximum characters per AI bullet, enforced on the response.
    pub const MAX_BULLET_CHARS: usize = 220;
}

/// Subprocess and network deadlines
pub mod deadlines {
    /// Timeout for a single `git log` invocation (seconds).
    pub const GIT_LOG_SECS: u64 = 30;

    /// Default timeout for one LLM completion (seconds).
    pub const LLM_REQUEST_SECS: u64 = 120;

    /// File IO deadline inside the pipeline (seconds).
    pub const FILE_IO_SECS: u64 = 30;
}
