//! Analysis records: analyser outputs, git metrics, and the canonical
//! aggregated `ProjectAnalysis` handed to every downstream consumer.
//!
//! Field names on `ProjectAnalysis`, `CodeMetrics`, `GitSummary` and
//! `ScoreBreakdown` are a wire contract, serialized verbatim into cached
//! analysis payloads and generated items. Do not rename.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// Output of one language-specific analyser run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageReport {
    pub language: String,
    pub file_count: u64,
    pub total_loc: u64,
    pub comment_loc: u64,
    pub function_count: u64,
    pub class_count: u64,
    pub test_count_unit: u64,
    pub test_count_integration: u64,
    /// Language-specific structured bag (type-hint density, framework
    /// hints, pattern hits, ...). Shape varies per language.
    pub features: serde_json::Value,
    pub summary_text: String,
    /// Files that failed to parse; reported in `summary_text`, never fatal.
    pub parse_errors: u64,
}

/// Aggregated cross-language code metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub file_count: u64,
    pub loc: u64,
    pub function_count: u64,
    pub class_count: u64,
    pub test_count: u64,
}

/// Git history metrics for one project. `None` everywhere when the project
/// has no (usable) version control metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitSummary {
    pub commit_count: u64,
    pub author_count: u64,
    pub first_commit: Option<DateTime<Utc>>,
    pub last_commit: Option<DateTime<Utc>>,
    pub user_commits: u64,
}

/// The four weighted components of the importance score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub contribution: f64,
    pub diversity: f64,
    pub duration: f64,
    pub file_count: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.contribution + self.diversity + self.duration + self.file_count
    }
}

/// Where the résumé bullets came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletSource {
    Ai,
    Local,
}

impl BulletSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Local => "local",
        }
    }
}

/// Canonical aggregated analysis for one project.
///
/// Assembled by the pipeline, consumed by the bullet generator and the
/// persistence layer. Transient: never stored as-is, but its serialized
/// form is the analysis cache payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub project_path: String,
    pub language: Option<String>,
    pub framework: Option<String>,
    pub tools: Vec<String>,
    pub practices: Vec<String>,
    pub code_metrics: CodeMetrics,
    /// Per-language feature bags, keyed by language name.
    pub language_specific: serde_json::Value,
    pub git: Option<GitSummary>,
    pub contribution_pct: f64,
    pub role: Role,
    pub role_justification: Option<String>,
    pub is_collaborative: bool,
    pub score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub resume_bullets: Vec<String>,
    pub resume_bullet_source: BulletSource,
    /// Non-fatal problems hit during analysis (permission skips, parse
    /// error counts, degraded analysers, damaged git metadata).
    #[serde(default)]
    pub diagnostics: Vec<String>,
}

impl ProjectAnalysis {
    /// Empty record for a project before any stage has run.
    pub fn empty(project_path: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            language: None,
            framework: None,
            tools: Vec::new(),
            practices: Vec::new(),
            code_metrics: CodeMetrics::default(),
            language_specific: serde_json::Value::Null,
            git: None,
            contribution_pct: 0.0,
            role: Role::Unknown,
            role_justification: None,
            is_collaborative: false,
            score: 0.0,
            score_breakdown: ScoreBreakdown::default(),
            resume_bullets: Vec::new(),
            resume_bullet_source: BulletSource::Local,
            diagnostics: Vec::new(),
        }
    }

    pub fn diagnose(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let analysis = ProjectAnalysis::empty("demo");
        let json = serde_json::to_value(&analysis).unwrap();
        for field in [
            "project_path",
            "language",
            "framework",
            "tools",
            "practices",
            "code_metrics",
            "language_specific",
            "git",
            "contribution_pct",
            "role",
            "role_justification",
            "is_collaborative",
            "score",
            "score_breakdown",
            "resume_bullets",
            "resume_bullet_source",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["resume_bullet_source"], "local");
    }

    #[test]
    fn test_score_breakdown_total() {
        let breakdown = ScoreBreakdown {
            contribution: 35.0,
            diversity: 25.0,
            duration: 20.0,
            file_count: 20.0,
        };
        assert!((breakdown.total() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_analysis_round_trip() {
        let mut analysis = ProjectAnalysis::empty("demo");
        analysis.language = Some("Python".to_string());
        analysis.resume_bullets = vec!["Built a thing".to_string()];
        let json = serde_json::to_string(&analysis).unwrap();
        let back: ProjectAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.language.as_deref(), Some("Python"));
        assert_eq!(back.resume_bullets.len(), 1);
    }
}
