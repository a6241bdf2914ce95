//! Prompt construction for AI bullet generation.
//!
//! The prompt embeds a pruned form of the analysis (stack, skills,
//! metrics, role) and demands a bare JSON array of strings. The response
//! parser tolerates surrounding prose anyway.

use crate::constants::bullets::MAX_BULLET_CHARS;
use crate::types::ProjectAnalysis;

pub fn build_bullet_prompt(analysis: &ProjectAnalysis, max_bullets: usize) -> String {
    let mut context = Vec::new();

    if let Some(language) = &analysis.language {
        context.push(format!("Language: {}", language));
    }
    if let Some(framework) = &analysis.framework {
        context.push(format!("Framework: {}", framework));
    }
    if !analysis.tools.is_empty() {
        context.push(format!("Tools: {}", analysis.tools.join(", ")));
    }
    if !analysis.practices.is_empty() {
        context.push(format!("Practices: {}", analysis.practices.join(", ")));
    }

    let metrics = &analysis.code_metrics;
    context.push(format!(
        "Metrics: {} files, {} LOC, {} functions, {} classes, {} tests",
        metrics.file_count,
        metrics.loc,
        metrics.function_count,
        metrics.class_count,
        metrics.test_count
    ));

    context.push(format!(
        "Role: {} ({:.0}% of commits{})",
        analysis.role,
        analysis.contribution_pct,
        if analysis.is_collaborative {
            ", collaborative project"
        } else {
            ""
        }
    ));

    if !analysis.language_specific.is_null() {
        context.push(format!(
            "Language analysis: {}",
            serde_json::to_string(&analysis.language_specific).unwrap_or_default()
        ));
    }

    format!(
        "You are an expert resume writer. Write concise, ATS-friendly resume \
         bullets for the software project described below.\n\n{}\n\n\
         Rules:\n\
         - Return a JSON array of at most {} strings and nothing else.\n\
         - One sentence per bullet, at most {} characters.\n\
         - Start every bullet with a strong action verb (Built, Led, \
         Designed, Implemented, ...).\n\
         - Active voice, no first-person pronouns.\n\
         - Mention only the technologies listed above; never invent tools \
         or metrics.",
        context.join("\n"),
        max_bullets,
        MAX_BULLET_CHARS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_analysis() {
        let mut analysis = ProjectAnalysis::empty("demo");
        analysis.language = Some("Java".to_string());
        analysis.framework = Some("Spring Boot".to_string());
        analysis.tools = vec!["Maven".to_string()];
        let prompt = build_bullet_prompt(&analysis, 5);
        assert!(prompt.contains("Language: Java"));
        assert!(prompt.contains("Spring Boot"));
        assert!(prompt.contains("Maven"));
        assert!(prompt.contains("at most 5"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_prompt_omits_absent_fields() {
        let analysis = ProjectAnalysis::empty("demo");
        let prompt = build_bullet_prompt(&analysis, 3);
        assert!(!prompt.contains("Framework:"));
        assert!(!prompt.contains("Tools:"));
    }
}
