//! Local Bullet Generators
//!
//! Deterministic, template-driven résumé bullets, used when the LLM path
//! is unavailable or fails. One generator per supported language, plus a
//! generic one for everything else. Two calls with the same analysis
//! produce byte-identical output.

use serde_json::Value;

use crate::constants::bullets::MIN_LOCAL_BULLETS;
use crate::types::{ProjectAnalysis, Role};

/// Dispatch to the language-specific generator, falling back to the
/// generic one. Always returns between `MIN_LOCAL_BULLETS` and
/// `max_bullets` bullets (fewer only if even the generic pool runs dry).
pub fn generate_local(analysis: &ProjectAnalysis, max_bullets: usize) -> Vec<String> {
    let features = analysis.language.as_deref().and_then(|language| {
        analysis.language_specific.get(language).or_else(|| {
            // JS and TS share one analyser; the report may carry the
            // sibling label when a project mixes both.
            match language {
                "JavaScript" => analysis.language_specific.get("TypeScript"),
                "TypeScript" => analysis.language_specific.get("JavaScript"),
                _ => None,
            }
        })
    });

    let mut bullets = match (analysis.language.as_deref(), features) {
        (Some("Python"), Some(features)) => python_bullets(analysis, features),
        (Some("JavaScript") | Some("TypeScript"), Some(features)) => {
            js_ts_bullets(analysis, features)
        }
        (Some("Java"), Some(features)) => java_bullets(analysis, features),
        (Some("C/C++"), Some(features)) => c_cpp_bullets(analysis, features),
        _ => Vec::new(),
    };

    // Top up with generic bullets until the floor is met.
    if bullets.len() < MIN_LOCAL_BULLETS {
        for bullet in generic_bullets(analysis) {
            if bullets.len() >= MIN_LOCAL_BULLETS {
                break;
            }
            if !bullets.contains(&bullet) {
                bullets.push(bullet);
            }
        }
    }

    if let Some(testing) = testing_bullet(analysis)
        && !bullets.contains(&testing)
    {
        bullets.push(testing);
    }

    bullets.truncate(max_bullets);
    bullets
}

// =============================================================================
// Language-specific generators
// =============================================================================

fn python_bullets(analysis: &ProjectAnalysis, features: &Value) -> Vec<String> {
    let mut bullets = Vec::new();
    let metrics = &analysis.code_metrics;

    let stack = tech_stack_phrase(analysis);
    bullets.push(format!(
        "Developed a {} application spanning {} files and {} lines of code",
        stack, metrics.file_count, metrics.loc
    ));

    let density = features["type_hint_density"].as_f64().unwrap_or(0.0);
    if density >= 0.5 {
        bullets.push(format!(
            "Enforced static type coverage across {:.0}% of function signatures to catch defects before runtime",
            density * 100.0
        ));
    }

    let async_count = features["async_function_count"].as_u64().unwrap_or(0);
    if async_count > 0 {
        bullets.push(format!(
            "Engineered {} asynchronous coroutines to handle concurrent I/O without blocking",
            async_count
        ));
    }

    if let Some(web) = features["framework_hints"]["web"]
        .as_array()
        .and_then(|w| w.first())
        .and_then(|w| w.as_str())
    {
        bullets.push(format!(
            "Built REST endpoints on {} with request validation and structured error handling",
            capitalize(web)
        ));
    }
    if features["framework_hints"]["orm"].as_array().is_some() {
        bullets.push(
            "Designed relational schemas and ORM models backing the application's persistence layer"
                .to_string(),
        );
    }
    if features["framework_hints"]["ml"].as_array().is_some() {
        bullets.push(
            "Implemented data-processing pipelines on the scientific Python stack".to_string(),
        );
    }

    bullets.extend(shared_bullets(analysis));
    bullets
}

fn js_ts_bullets(analysis: &ProjectAnalysis, features: &Value) -> Vec<String> {
    let mut bullets = Vec::new();
    let metrics = &analysis.code_metrics;
    let uses_ts = features["uses_typescript"].as_bool().unwrap_or(false);

    let frontend = features["frontend_framework"].as_str().unwrap_or("none");
    if frontend != "none" {
        bullets.push(format!(
            "Built a responsive {} front end in {} across {} source files",
            capitalize(frontend),
            if uses_ts { "TypeScript" } else { "JavaScript" },
            metrics.file_count
        ));
    } else {
        bullets.push(format!(
            "Developed a {} codebase of {} files and {} lines",
            if uses_ts { "TypeScript" } else { "JavaScript" },
            metrics.file_count,
            metrics.loc
        ));
    }

    if uses_ts {
        bullets.push(
            "Adopted strict TypeScript typing to keep refactors safe and interfaces explicit"
                .to_string(),
        );
    }

    if features["uses_async_await"].as_bool().unwrap_or(false) {
        bullets.push(
            "Leveraged async/await throughout to coordinate concurrent network operations"
                .to_string(),
        );
    }

    if features["runtime_hint"].as_str() == Some("node") {
        bullets.push(format!(
            "Architected a Node.js backend with modular routing{}",
            analysis
                .framework
                .as_deref()
                .map(|f| format!(" on {}", f))
                .unwrap_or_default()
        ));
    }

    let test_framework = features["test_framework"].as_str().unwrap_or("none");
    if test_framework != "none" {
        bullets.push(format!(
            "Automated regression coverage with {}",
            capitalize(test_framework)
        ));
    }

    bullets.extend(shared_bullets(analysis));
    bullets
}

fn java_bullets(analysis: &ProjectAnalysis, features: &Value) -> Vec<String> {
    let mut bullets = Vec::new();
    let metrics = &analysis.code_metrics;

    bullets.push(format!(
        "Engineered a {} application of {} classes and {} methods across {} files",
        tech_stack_phrase(analysis),
        metrics.class_count,
        metrics.function_count,
        metrics.file_count
    ));

    let oop_score = features["oop_score"].as_f64().unwrap_or(0.0);
    if oop_score >= 7.5 {
        bullets.push(
            "Applied all four object-oriented principles with interface-driven abstractions"
                .to_string(),
        );
    } else if oop_score >= 5.0 {
        bullets.push(
            "Structured the domain model around encapsulated classes and inheritance".to_string(),
        );
    }

    if let Some(patterns) = features["design_patterns"].as_array()
        && !patterns.is_empty()
    {
        let names: Vec<&str> = patterns.iter().filter_map(|p| p.as_str()).take(3).collect();
        bullets.push(format!(
            "Implemented the {} pattern{} to keep components replaceable and testable",
            names.join(", "),
            if names.len() > 1 { "s" } else { "" }
        ));
    }

    if let Some(annotations) = features["annotations"].as_array()
        && !annotations.is_empty()
    {
        bullets.push(
            "Used annotation-driven configuration to wire framework behaviour declaratively"
                .to_string(),
        );
    }

    bullets.extend(shared_bullets(analysis));
    bullets
}

fn c_cpp_bullets(analysis: &ProjectAnalysis, features: &Value) -> Vec<String> {
    let mut bullets = Vec::new();
    let metrics = &analysis.code_metrics;

    if features["has_main"].as_bool().unwrap_or(false) {
        bullets.push(format!(
            "Built a C/C++ application with {} lines of code across {} files",
            metrics.loc, metrics.file_count
        ));
    } else {
        bullets.push(format!(
            "Developed a C/C++ library exposing {} functions across {} files",
            metrics.function_count, metrics.file_count
        ));
    }

    if features["modern_cpp"]["adopted"].as_bool().unwrap_or(false) {
        bullets.push(
            "Modernised the codebase with smart pointers, lambdas and range-based iteration"
                .to_string(),
        );
    }
    if features["manual_memory_management"].as_bool().unwrap_or(false) {
        bullets.push(
            "Implemented careful manual memory management with paired allocation and cleanup"
                .to_string(),
        );
    }

    if let Some(structures) = features["data_structures"].as_array()
        && !structures.is_empty()
    {
        let names: Vec<&str> = structures.iter().filter_map(|s| s.as_str()).take(3).collect();
        bullets.push(format!(
            "Selected purpose-fit data structures ({}) for predictable performance",
            names.join(", ")
        ));
    }

    if let Some(tags) = features["complexity_tags"].as_array()
        && !tags.is_empty()
    {
        let names: Vec<&str> = tags.iter().filter_map(|t| t.as_str()).take(2).collect();
        bullets.push(format!(
            "Applied algorithmic techniques including {}",
            names.join(" and ")
        ));
    }

    bullets.extend(shared_bullets(analysis));
    bullets
}

// =============================================================================
// Generic generator & shared fragments
// =============================================================================

/// Bullets derivable from any analysis, language known or not.
pub fn generic_bullets(analysis: &ProjectAnalysis) -> Vec<String> {
    let mut bullets = Vec::new();
    let metrics = &analysis.code_metrics;

    bullets.push(format!(
        "Created a {} project comprising {} files",
        tech_stack_phrase(analysis),
        metrics.file_count.max(1)
    ));

    if !analysis.tools.is_empty() {
        let tools: Vec<&str> = analysis.tools.iter().map(|t| t.as_str()).take(4).collect();
        bullets.push(format!(
            "Integrated a toolchain spanning {}",
            join_natural(&tools)
        ));
    }

    if !analysis.practices.is_empty() {
        let practices: Vec<&str> = analysis
            .practices
            .iter()
            .map(|p| p.as_str())
            .take(3)
            .collect();
        bullets.push(format!(
            "Practised {} throughout the project lifecycle",
            join_natural(&practices)
        ));
    }

    bullets.extend(shared_bullets(analysis));
    bullets
}

/// Role and collaboration bullets shared by every generator.
fn shared_bullets(analysis: &ProjectAnalysis) -> Vec<String> {
    let mut bullets = Vec::new();

    match analysis.role {
        Role::SoloDeveloper => bullets.push(
            "Owned the full development lifecycle end to end as sole developer".to_string(),
        ),
        Role::LeadDeveloper => bullets.push(format!(
            "Led development with {:.0}% of all commits in a collaborative team",
            analysis.contribution_pct
        )),
        Role::CoLead => bullets.push(format!(
            "Co-led the project, contributing {:.0}% of commits alongside a peer maintainer",
            analysis.contribution_pct
        )),
        Role::Contributor => bullets.push(format!(
            "Contributed {:.0}% of commits within a multi-developer team",
            analysis.contribution_pct
        )),
        Role::MinorContributor | Role::Unknown => {}
    }

    bullets
}

/// Standardized testing bullet, appended whenever test evidence exists.
pub fn testing_bullet(analysis: &ProjectAnalysis) -> Option<String> {
    let unit = analysis
        .language
        .as_deref()
        .and_then(|l| analysis.language_specific.get(l))
        .and_then(|f| f.get("test_count_unit"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let integration = analysis
        .language
        .as_deref()
        .and_then(|l| analysis.language_specific.get(l))
        .and_then(|f| f.get("test_count_integration"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let total = analysis.code_metrics.test_count;

    let summary = if unit > 0 && integration > 0 {
        format!("Implemented {} unit and {} integration tests", unit, integration)
    } else if unit > 0 {
        format!("Implemented {} unit tests", unit)
    } else if integration > 0 {
        format!("Implemented {} integration tests", integration)
    } else if total > 0 {
        format!("Implemented {} automated tests", total)
    } else {
        return None;
    };

    Some(format!(
        "{} to guard critical workflows against regressions",
        summary
    ))
}

fn tech_stack_phrase(analysis: &ProjectAnalysis) -> String {
    match (&analysis.language, &analysis.framework) {
        (Some(language), Some(framework)) => format!("{}/{}", language, framework),
        (Some(language), None) => language.clone(),
        _ => "multi-language".to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn join_natural(items: &[&str]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].to_string(),
        2 => format!("{} and {}", items[0], items[1]),
        _ => format!(
            "{}, and {}",
            items[..items.len() - 1].join(", "),
            items[items.len() - 1]
        ),
    }
}
