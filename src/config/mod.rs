//! Layered configuration: defaults, global file, project file, environment.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AnalysisConfig, Config, IdentityConfig, IngestConfig, LlmConfig, ScoreWeights, StorageConfig,
};
