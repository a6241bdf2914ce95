//! LLM Provider Abstraction
//!
//! The core sees one capability: `complete(prompt, schema_hint, deadline)
//! -> String`. Vendor wire protocols stay inside provider
//! implementations; retry and fallback policy stays with the callers
//! (bullet generation falls back to local, skill augmentation discards).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::types::Result;

/// Shared provider handle for concurrent pipeline stages.
pub type SharedProvider = Arc<dyn LlmProvider>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// One completion. `schema_hint` describes the expected response shape
    /// and is embedded into the prompt by providers that have no native
    /// structured-output support. Exceeding `deadline` is an error.
    async fn complete(&self, prompt: &str, schema_hint: &str, deadline: Duration)
    -> Result<String>;

    /// Provider name for logs and diagnostics.
    fn name(&self) -> &str;
}

#[cfg(test)]
pub mod testing {
    //! Scriptable provider for tests: canned responses, failure injection,
    //! and a call counter for consent-gate assertions.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::FolioError;

    #[derive(Default)]
    pub struct ScriptedProvider {
        pub response: Option<String>,
        pub calls: AtomicUsize,
        pub fail_with_timeout: bool,
    }

    impl ScriptedProvider {
        pub fn returning(response: &str) -> Self {
            Self {
                response: Some(response.to_string()),
                ..Default::default()
            }
        }

        pub fn timing_out() -> Self {
            Self {
                fail_with_timeout: true,
                ..Default::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            _prompt: &str,
            _schema_hint: &str,
            deadline: Duration,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_with_timeout {
                return Err(FolioError::timeout("llm completion", deadline));
            }
            self.response
                .clone()
                .ok_or_else(|| FolioError::Llm("no scripted response".to_string()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
