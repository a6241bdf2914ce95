//! Consent & Capability Gate
//!
//! Sole authority on outbound LLM calls. Every component that might reach
//! the network consults this gate; there is no back door. The gate reads
//! the latest consent record fresh from the repository on construction:
//! one gate per pipeline invocation, no in-process singleton.

use tracing::debug;

use crate::store::Repository;
use crate::types::{ConsentRecord, Result};

pub struct ConsentGate {
    record: ConsentRecord,
    provider_configured: bool,
}

impl ConsentGate {
    /// Load the latest consent record. Absence of a record means deny.
    pub fn load(repository: &dyn Repository, provider_configured: bool) -> Result<Self> {
        let record = match repository.latest_consent()? {
            Some(record) => record,
            None => {
                debug!("No consent record found; denying external calls");
                ConsentRecord::deny()
            }
        };
        Ok(Self {
            record,
            provider_configured,
        })
    }

    pub fn from_record(record: ConsentRecord, provider_configured: bool) -> Self {
        Self {
            record,
            provider_configured,
        }
    }

    /// May the pipeline make outbound LLM calls at all?
    pub fn can_use_llm(&self) -> bool {
        self.record.allow_llm && self.provider_configured
    }

    /// Is this specific model permitted?
    pub fn permits_model(&self, model: &str) -> bool {
        self.provider_configured && self.record.permits_model(model)
    }

    /// Active ignore globs for ingest and analysis.
    pub fn ignore_patterns(&self) -> &[String] {
        &self.record.ignore_patterns
    }
}
