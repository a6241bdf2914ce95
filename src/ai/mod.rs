//! LLM capability: provider abstraction, consent gate, response parsing.

pub mod gate;
pub mod json;
pub mod openai;
pub mod provider;
pub mod timeout;

pub use gate::ConsentGate;
pub use json::{extract_json_value, extract_string_array};
pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, SharedProvider};
pub use timeout::with_timeout;
