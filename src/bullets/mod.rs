//! Résumé Bullet Generation
//!
//! Strict fallback chain:
//! 1. AI path, only when the caller wants it AND a provider is available.
//!    The response must be a well-formed, non-empty JSON array whose
//!    entries pass the bullet invariants.
//! 2. Language-specific local generator.
//! 3. Generic local generator (inside `generate_local`).
//!
//! Errors never escape: an LLM timeout or malformed response simply means
//! the caller gets local bullets. Local output is deterministic.

pub mod local;
pub mod prompt;

use std::time::Duration;

use tracing::{debug, info};

use crate::ai::json::extract_string_array;
use crate::ai::provider::LlmProvider;
use crate::constants::bullets::MAX_BULLET_CHARS;
use crate::types::{BulletSource, ProjectAnalysis};

pub use local::generate_local;
pub use prompt::build_bullet_prompt;

/// Verbs a bullet may open with. AI bullets failing this check are
/// dropped; if none survive, the whole AI result is rejected.
const STRONG_VERBS: &[&str] = &[
    "Built", "Led", "Designed", "Implemented", "Developed", "Engineered", "Created",
    "Architected", "Automated", "Delivered", "Optimized", "Optimised", "Refactored",
    "Integrated", "Migrated", "Maintained", "Deployed", "Established", "Owned", "Shipped",
    "Reduced", "Improved", "Streamlined", "Modernised", "Modernized", "Co-led", "Contributed",
    "Applied", "Adopted", "Leveraged", "Structured", "Selected", "Enforced", "Practised",
    "Practiced", "Authored", "Orchestrated", "Accelerated", "Used",
];

/// Generate résumé bullets for one analysed project.
pub async fn generate(
    analysis: &ProjectAnalysis,
    max_bullets: usize,
    use_ai: bool,
    ai_available: bool,
    provider: Option<&dyn LlmProvider>,
    deadline: Duration,
) -> (Vec<String>, BulletSource) {
    if use_ai && ai_available
        && let Some(provider) = provider
    {
        match try_ai(analysis, max_bullets, provider, deadline).await {
            Ok(bullets) if !bullets.is_empty() => {
                info!("Generated {} bullets via {}", bullets.len(), provider.name());
                return (bullets, BulletSource::Ai);
            }
            Ok(_) => debug!("AI returned no usable bullets; falling back to local"),
            Err(e) => debug!("AI bullet generation failed ({}); falling back to local", e),
        }
    }

    (generate_local(analysis, max_bullets), BulletSource::Local)
}

async fn try_ai(
    analysis: &ProjectAnalysis,
    max_bullets: usize,
    provider: &dyn LlmProvider,
    deadline: Duration,
) -> crate::types::Result<Vec<String>> {
    let prompt = build_bullet_prompt(analysis, max_bullets);
    let response = provider
        .complete(&prompt, "[\"bullet\", \"bullet\"]", deadline)
        .await?;

    let bullets = extract_string_array(&response)?;
    Ok(sanitize(bullets, max_bullets))
}

/// Enforce the bullet invariants on AI output: cap, length limit, strong
/// opening verb, no TODO/FIXME markers.
fn sanitize(bullets: Vec<String>, max_bullets: usize) -> Vec<String> {
    bullets
        .into_iter()
        .filter(|b| b.len() <= MAX_BULLET_CHARS)
        .filter(|b| !b.contains("TODO") && !b.contains("FIXME"))
        .filter(|b| {
            b.split_whitespace()
                .next()
                .is_some_and(|first| STRONG_VERBS.contains(&first))
        })
        .take(max_bullets)
        .collect()
}
