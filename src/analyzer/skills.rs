//! Skill Extraction
//!
//! Offline baseline: curated tables matched against file names, paths,
//! manifests and imports, plus evidence from the commit log (conventional
//! commits, merge-commit code review) and documentation density.
//!
//! Optional augmentation sends a redacted file-tree summary to the LLM and
//! merges whatever validates; any failure discards the augmentation
//! silently and the baseline stands.

use std::collections::BTreeSet;

use tracing::debug;

use crate::ai::json::extract_json_value;
use crate::ai::provider::LlmProvider;
use crate::constants::analysis::{CONVENTIONAL_COMMIT_RATIO, DOC_DENSITY_THRESHOLD};
use crate::gitx::CommitRecord;
use crate::gitx::metrics::GitMetrics;
use crate::types::{FileRecord, MimeCategory, SkillSet};

// =============================================================================
// Curated detection tables
// =============================================================================

/// Exact file names (case-insensitive) -> tool.
const TOOL_FILE_NAMES: &[(&str, &str)] = &[
    ("dockerfile", "Docker"),
    (".dockerignore", "Docker"),
    ("docker-compose.yml", "Docker"),
    ("docker-compose.yaml", "Docker"),
    ("package.json", "npm"),
    ("package-lock.json", "npm"),
    ("yarn.lock", "Yarn"),
    ("pnpm-lock.yaml", "pnpm"),
    ("poetry.lock", "Poetry"),
    ("uv.lock", "uv"),
    ("requirements.txt", "pip"),
    ("cargo.toml", "Cargo"),
    ("cargo.lock", "Cargo"),
    ("go.mod", "Go Modules"),
    ("pom.xml", "Maven"),
    ("build.gradle", "Gradle"),
    ("build.gradle.kts", "Gradle"),
    ("makefile", "Make"),
    ("cmakelists.txt", "CMake"),
    ("pytest.ini", "PyTest"),
    ("jest.config.js", "Jest"),
    ("jest.config.ts", "Jest"),
    ("vitest.config.ts", "Vitest"),
    ("cypress.config.js", "Cypress"),
    ("cypress.config.ts", "Cypress"),
    ("ruff.toml", "Ruff"),
    (".eslintrc", "ESLint"),
    (".eslintrc.js", "ESLint"),
    (".eslintrc.json", "ESLint"),
    (".prettierrc", "Prettier"),
    ("prettier.config.js", "Prettier"),
    ("mypy.ini", "mypy"),
    (".pre-commit-config.yaml", "pre-commit"),
    ("jenkinsfile", "Jenkins"),
    (".travis.yml", "Travis CI"),
    ("schema.prisma", "Prisma"),
    ("alembic.ini", "Alembic"),
    ("tauri.conf.json", "Tauri"),
    ("next.config.js", "Next.js"),
    ("vite.config.js", "Vite"),
    ("vite.config.ts", "Vite"),
    ("webpack.config.js", "Webpack"),
    ("serverless.yml", "Serverless Framework"),
    ("vercel.json", "Vercel"),
    ("netlify.toml", "Netlify"),
];

/// Path substrings -> tool.
const TOOL_PATH_PATTERNS: &[(&str, &str)] = &[
    (".github/workflows/", "GitHub Actions"),
    (".gitlab-ci", "GitLab CI"),
    (".circleci/", "CircleCI"),
];

/// File extensions -> tool.
const TOOL_EXTENSIONS: &[(&str, &str)] = &[
    (".sql", "SQL"),
    (".tf", "Terraform"),
    (".proto", "gRPC"),
    (".graphql", "GraphQL"),
];

/// Import / dependency substrings (matched in manifests and source) -> tool.
const IMPORT_RULES: &[(&str, &str)] = &[
    ("import pandas", "Pandas"),
    ("import numpy", "NumPy"),
    ("import torch", "PyTorch"),
    ("import tensorflow", "TensorFlow"),
    ("import sqlalchemy", "SQLAlchemy"),
    ("from sqlalchemy", "SQLAlchemy"),
    ("import redis", "Redis"),
    ("import boto3", "AWS SDK"),
    ("from fastapi", "FastAPI"),
    ("import requests", "Requests"),
    ("from react", "React"),
    ("require('express')", "Express"),
    ("require(\"express\")", "Express"),
    ("from 'express'", "Express"),
    ("from \"express\"", "Express"),
];

/// Exact file names -> practice.
const PRACTICE_FILE_NAMES: &[(&str, &str)] = &[
    (".flake8", "Code Quality Enforcement"),
    ("ruff.toml", "Code Quality Enforcement"),
    (".eslintrc", "Code Quality Enforcement"),
    (".eslintrc.js", "Code Quality Enforcement"),
    (".eslintrc.json", "Code Quality Enforcement"),
    (".prettierrc", "Code Quality Enforcement"),
    ("mypy.ini", "Type Safety"),
    ("tsconfig.json", "Type Safety"),
    ("requirements.txt", "Environment Management"),
    ("poetry.lock", "Environment Management"),
    (".nvmrc", "Environment Management"),
    (".tool-versions", "Environment Management"),
    ("openapi.yaml", "API Design"),
    ("swagger.json", "API Design"),
    (".gitignore", "Version Control (Git)"),
    (".gitattributes", "Version Control (Git)"),
    ("dockerfile", "Containerization"),
    ("docker-compose.yml", "Containerization"),
    ("docker-compose.yaml", "Containerization"),
    ("contributing.md", "Team Collaboration"),
    ("code_of_conduct.md", "Team Collaboration"),
    (".pre-commit-config.yaml", "Git Hooks"),
];

/// Path components -> practice.
const PRACTICE_PATH_PATTERNS: &[(&str, &str)] = &[
    ("tests/", "Automated Testing"),
    ("test/", "Automated Testing"),
    ("__tests__/", "Automated Testing"),
    (".github/workflows/", "CI/CD"),
    (".gitlab-ci", "CI/CD"),
    ("docs/", "Documentation Discipline"),
    ("migrations/", "Database Migrations"),
    ("terraform/", "Infrastructure as Code"),
    ("k8s/", "Kubernetes"),
    ("kubernetes/", "Kubernetes"),
];

// =============================================================================
// Baseline extraction
// =============================================================================

/// Inputs for one extraction run. `read` resolves a relative path to file
/// contents; it is consulted for manifests and a bounded sample of source
/// files.
pub struct SkillContext<'a> {
    pub files: &'a [FileRecord],
    pub read: &'a dyn Fn(&str) -> Option<String>,
    pub metrics: Option<&'a GitMetrics>,
    pub commits: Option<&'a [CommitRecord]>,
}

/// Source files scanned for import evidence, at most.
const IMPORT_SCAN_LIMIT: usize = 64;

pub fn extract_skills(ctx: &SkillContext<'_>) -> SkillSet {
    let mut skills = SkillSet::default();

    for file in ctx.files {
        let lowered = file.rel_path.to_lowercase();
        let name = lowered.rsplit('/').next().unwrap_or(&lowered);

        for (pattern, tool) in TOOL_FILE_NAMES {
            if name == *pattern {
                skills.tools.insert(tool.to_string());
            }
        }
        for (pattern, tool) in TOOL_PATH_PATTERNS {
            if lowered.contains(pattern) {
                skills.tools.insert(tool.to_string());
            }
        }
        for (ext, tool) in TOOL_EXTENSIONS {
            if name.ends_with(ext) {
                skills.tools.insert(tool.to_string());
            }
        }

        for (pattern, practice) in PRACTICE_FILE_NAMES {
            if name == *pattern {
                skills.practices.insert(practice.to_string());
            }
        }
        for (pattern, practice) in PRACTICE_PATH_PATTERNS {
            if lowered.contains(pattern) {
                skills.practices.insert(practice.to_string());
            }
        }
        if name.starts_with("readme") {
            skills
                .practices
                .insert("Documentation Discipline".to_string());
        }
    }

    scan_imports(ctx, &mut skills);
    commit_evidence(ctx, &mut skills);
    doc_density(ctx.files, &mut skills);

    skills
}

fn scan_imports(ctx: &SkillContext<'_>, skills: &mut SkillSet) {
    let mut scanned = 0usize;
    for file in ctx.files {
        if scanned >= IMPORT_SCAN_LIMIT {
            break;
        }
        if MimeCategory::from_path(&file.rel_path) != MimeCategory::Code {
            continue;
        }
        let Some(content) = (ctx.read)(&file.rel_path) else {
            continue;
        };
        scanned += 1;
        for (needle, tool) in IMPORT_RULES {
            if content.contains(needle) {
                skills.tools.insert(tool.to_string());
            }
        }
    }
}

fn commit_evidence(ctx: &SkillContext<'_>, skills: &mut SkillSet) {
    let Some(metrics) = ctx.metrics else {
        return;
    };

    if metrics.conventional_ratio >= CONVENTIONAL_COMMIT_RATIO {
        skills
            .practices
            .insert("Conventional Commits".to_string());
    }

    // Merge commits mentioning pull/merge requests indicate review flow.
    if let Some(commits) = ctx.commits {
        let reviewed = commits.iter().any(|c| {
            c.is_merge
                && (c.subject.to_lowercase().contains("pull request")
                    || c.subject.to_lowercase().contains("merge request"))
        });
        if reviewed {
            skills.practices.insert("Code Review".to_string());
        }
    }

    if metrics.commit_count > 0 {
        skills
            .practices
            .insert("Version Control (Git)".to_string());
    }
}

fn doc_density(files: &[FileRecord], skills: &mut SkillSet) {
    if files.is_empty() {
        return;
    }
    let docs = files
        .iter()
        .filter(|f| MimeCategory::from_path(&f.rel_path) == MimeCategory::Doc)
        .count();
    if docs as f64 / files.len() as f64 >= DOC_DENSITY_THRESHOLD {
        skills
            .practices
            .insert("Documentation Discipline".to_string());
    }
}

// =============================================================================
// LLM augmentation
// =============================================================================

/// Maximum tree entries included in the redacted prompt.
const TREE_SUMMARY_LIMIT: usize = 200;

/// Ask the LLM for additional skills. Returns the baseline merged with any
/// validated augmentation; on any failure the baseline is returned as-is.
pub async fn augment_skills(
    baseline: SkillSet,
    ctx: &SkillContext<'_>,
    provider: &dyn LlmProvider,
    deadline: std::time::Duration,
) -> SkillSet {
    let prompt = build_augmentation_prompt(ctx.files, &baseline);

    let response = match provider
        .complete(&prompt, "{\"tools\": [], \"practices\": []}", deadline)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            debug!("Skill augmentation skipped: {}", e);
            return baseline;
        }
    };

    let Ok(value) = extract_json_value(&response) else {
        debug!("Skill augmentation returned malformed JSON; keeping baseline");
        return baseline;
    };

    let mut merged = baseline;
    merged.tools.extend(string_list(&value, "tools"));
    merged.practices.extend(string_list(&value, "practices"));
    merged
}

fn build_augmentation_prompt(files: &[FileRecord], baseline: &SkillSet) -> String {
    let mut tree: Vec<&str> = files
        .iter()
        .take(TREE_SUMMARY_LIMIT)
        .map(|f| f.rel_path.as_str())
        .collect();
    tree.sort_unstable();

    format!(
        "You are auditing a software project's file tree to identify developer \
         tools and engineering practices.\n\
         Known tools: {}\nKnown practices: {}\n\nFile tree:\n{}\n\n\
         Return ONLY a JSON object of the form \
         {{\"tools\": [\"...\"], \"practices\": [\"...\"]}} naming additional \
         tools and practices clearly evidenced by the tree. Do not repeat \
         known entries. Do not invent anything not supported by the tree.",
        baseline
            .tools
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        baseline
            .practices
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        tree.join("\n"),
    )
}

fn string_list(value: &serde_json::Value, key: &str) -> BTreeSet<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .filter(|s| !s.trim().is_empty() && s.len() <= 64)
                .map(|s| s.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> FileRecord {
        FileRecord {
            rel_path: path.to_string(),
            content_hash: String::new(),
            size: 10,
        }
    }

    fn no_read(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_tools_from_file_names() {
        let files = vec![
            record("Dockerfile"),
            record("pyproject.toml"),
            record("uv.lock"),
            record(".github/workflows/ci.yml"),
        ];
        let read = no_read;
        let ctx = SkillContext {
            files: &files,
            read: &read,
            metrics: None,
            commits: None,
        };
        let skills = extract_skills(&ctx);
        assert!(skills.tools.contains("Docker"));
        assert!(skills.tools.contains("uv"));
        assert!(skills.tools.contains("GitHub Actions"));
        assert!(skills.practices.contains("CI/CD"));
    }

    #[test]
    fn test_practices_from_paths() {
        let files = vec![
            record("tests/test_app.py"),
            record("docs/guide.md"),
            record(".gitignore"),
        ];
        let read = no_read;
        let ctx = SkillContext {
            files: &files,
            read: &read,
            metrics: None,
            commits: None,
        };
        let skills = extract_skills(&ctx);
        assert!(skills.practices.contains("Automated Testing"));
        assert!(skills.practices.contains("Documentation Discipline"));
        assert!(skills.practices.contains("Version Control (Git)"));
    }

    #[test]
    fn test_imports_scanned_from_source() {
        let files = vec![record("analysis.py")];
        let read = |path: &str| {
            (path == "analysis.py").then(|| "import pandas as pd\nimport numpy".to_string())
        };
        let ctx = SkillContext {
            files: &files,
            read: &read,
            metrics: None,
            commits: None,
        };
        let skills = extract_skills(&ctx);
        assert!(skills.tools.contains("Pandas"));
        assert!(skills.tools.contains("NumPy"));
    }

    #[test]
    fn test_conventional_commit_practice() {
        let metrics = GitMetrics {
            commit_count: 10,
            conventional_ratio: 0.5,
            ..Default::default()
        };
        let files = vec![record("main.py")];
        let read = no_read;
        let ctx = SkillContext {
            files: &files,
            read: &read,
            metrics: Some(&metrics),
            commits: None,
        };
        let skills = extract_skills(&ctx);
        assert!(skills.practices.contains("Conventional Commits"));
    }

    #[test]
    fn test_string_list_filters_junk() {
        let value = serde_json::json!({
            "tools": ["Docker", "", "  ", 42, "x".repeat(100)],
        });
        let list = string_list(&value, "tools");
        assert_eq!(list.len(), 1);
        assert!(list.contains("Docker"));
    }
}
