//! JavaScript / TypeScript analyser. One variant serves both detector
//! languages; the grammar is chosen per file extension.
//!
//! Feature bag: module system (ESM vs CJS), TypeScript adoption flag,
//! front-end framework hint, Node-vs-browser hint, async/await usage,
//! test-framework hint.

use serde_json::json;

use crate::analyzer::tests_metrics::count_tests;
use crate::types::{LanguageReport, Result};

use super::{LanguageAnalyzer, SourceFile, count_loc, extension_of, parse_tree, visit_nodes};

pub struct JsTsAnalyzer;

impl LanguageAnalyzer for JsTsAnalyzer {
    fn language(&self) -> &'static str {
        "JavaScript/TypeScript"
    }

    fn serves(&self, language: &str) -> bool {
        matches!(
            language,
            "JavaScript" | "TypeScript" | "JavaScript/TypeScript"
        )
    }

    fn matches(&self, rel_path: &str) -> bool {
        matches!(
            extension_of(rel_path).as_str(),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx"
        )
    }

    fn analyse(&self, files: &[SourceFile]) -> Result<LanguageReport> {
        let js_language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();
        let ts_language: tree_sitter::Language =
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        let tsx_language: tree_sitter::Language = tree_sitter_typescript::LANGUAGE_TSX.into();

        let mut ts_files = 0u64;
        let mut esm_signals = 0u64;
        let mut cjs_signals = 0u64;
        let mut async_functions = 0u64;
        let mut await_uses = 0u64;
        let mut all_imports = String::new();

        let mut report = LanguageReport {
            file_count: files.len() as u64,
            ..Default::default()
        };

        for file in files {
            let (loc, comments) = count_loc(&file.content, &["//"]);
            report.total_loc += loc;
            report.comment_loc += comments;

            let ext = extension_of(&file.rel_path);
            let is_ts = matches!(ext.as_str(), "ts" | "tsx");
            if is_ts {
                ts_files += 1;
            }

            for line in file.content.lines() {
                let trimmed = line.trim_start();
                if trimmed.starts_with("import ") || trimmed.starts_with("export ") {
                    esm_signals += 1;
                }
                if trimmed.contains("require(") {
                    cjs_signals += 1;
                }
                if trimmed.starts_with("import ") || trimmed.contains("require(") {
                    all_imports.push_str(trimmed);
                    all_imports.push('\n');
                }
                if trimmed.contains("async ") || trimmed.starts_with("async(") {
                    async_functions += 1;
                }
                await_uses += trimmed.matches("await ").count() as u64;
            }

            let grammar = match ext.as_str() {
                "ts" => &ts_language,
                "tsx" => &tsx_language,
                _ => &js_language,
            };
            let Some(tree) = parse_tree(grammar, &file.content) else {
                report.parse_errors += 1;
                continue;
            };
            if tree.root_node().has_error() {
                report.parse_errors += 1;
            }

            visit_nodes(&tree, |node| match node.kind() {
                "function_declaration" | "function_expression" | "function"
                | "arrow_function" | "method_definition" | "generator_function"
                | "generator_function_declaration" => {
                    report.function_count += 1;
                }
                "class_declaration" => {
                    report.class_count += 1;
                }
                _ => {}
            });
        }

        let tests = count_tests(
            if ts_files > 0 { "TypeScript" } else { "JavaScript" },
            files,
        );
        report.test_count_unit = tests.unit;
        report.test_count_integration = tests.integration;

        let uses_typescript = ts_files > 0;
        report.language = if uses_typescript {
            "TypeScript".to_string()
        } else {
            "JavaScript".to_string()
        };

        let module_system = if esm_signals >= cjs_signals && esm_signals > 0 {
            "esm"
        } else if cjs_signals > 0 {
            "cjs"
        } else {
            "unknown"
        };

        let frontend = frontend_hint(&all_imports);
        let runtime = runtime_hint(&all_imports, files);
        let test_framework = test_framework_hint(&all_imports, files);

        report.features = json!({
            "module_system": module_system,
            "uses_typescript": uses_typescript,
            "frontend_framework": frontend,
            "runtime_hint": runtime,
            "uses_async_await": async_functions > 0 && await_uses > 0,
            "async_function_count": async_functions,
            "test_framework": test_framework,
        });

        report.summary_text = format!(
            "{}: {} files, {} LOC, {} functions, {} classes ({} modules, frontend: {}){}",
            report.language,
            report.file_count,
            report.total_loc,
            report.function_count,
            report.class_count,
            module_system,
            frontend,
            if report.parse_errors > 0 {
                format!("; {} files failed to parse", report.parse_errors)
            } else {
                String::new()
            }
        );

        Ok(report)
    }
}

fn frontend_hint(imports: &str) -> &'static str {
    if imports.contains("react") {
        "react"
    } else if imports.contains("vue") {
        "vue"
    } else if imports.contains("svelte") {
        "svelte"
    } else if imports.contains("@angular") {
        "angular"
    } else {
        "none"
    }
}

fn runtime_hint(imports: &str, files: &[SourceFile]) -> &'static str {
    let node_signals = ["'fs'", "\"fs\"", "'path'", "\"path\"", "'http'", "\"http\"", "node:"]
        .iter()
        .any(|s| imports.contains(s));
    let browser_signals = files.iter().any(|f| {
        f.content.contains("document.") || f.content.contains("window.")
    });
    match (node_signals, browser_signals) {
        (true, false) => "node",
        (false, true) => "browser",
        (true, true) => "mixed",
        (false, false) => "unknown",
    }
}

fn test_framework_hint(imports: &str, files: &[SourceFile]) -> &'static str {
    let names = files
        .iter()
        .map(|f| f.rel_path.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");
    if imports.contains("vitest") || names.contains("vitest.config") {
        "vitest"
    } else if imports.contains("@jest") || imports.contains("'jest'") || names.contains("jest.config")
    {
        "jest"
    } else if imports.contains("mocha") {
        "mocha"
    } else if imports.contains("cypress") || names.contains("cypress") {
        "cypress"
    } else {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> SourceFile {
        SourceFile {
            rel_path: path.to_string(),
            content: content.to_string(),
            sampled: false,
        }
    }

    #[test]
    fn test_react_typescript_project() {
        let files = vec![file(
            "src/App.tsx",
            r#"
import React from 'react';

export function App(): JSX.Element {
    const handler = async () => {
        const data = await fetch('/api');
        return data;
    };
    return null;
}

export class Store {
    value = 1;
}
"#,
        )];
        let report = JsTsAnalyzer.analyse(&files).unwrap();
        assert_eq!(report.language, "TypeScript");
        assert!(report.function_count >= 2);
        assert_eq!(report.class_count, 1);
        assert_eq!(report.features["module_system"], "esm");
        assert_eq!(report.features["frontend_framework"], "react");
        assert_eq!(report.features["uses_typescript"], true);
        assert_eq!(report.features["uses_async_await"], true);
    }

    #[test]
    fn test_commonjs_node_project() {
        let files = vec![file(
            "server.js",
            r#"
const fs = require('fs');
const express = require('express');

function start() {
    return express();
}
module.exports = { start };
"#,
        )];
        let report = JsTsAnalyzer.analyse(&files).unwrap();
        assert_eq!(report.language, "JavaScript");
        assert_eq!(report.features["module_system"], "cjs");
        assert_eq!(report.features["runtime_hint"], "node");
        assert_eq!(report.features["frontend_framework"], "none");
    }

    #[test]
    fn test_serves_both_languages() {
        assert!(JsTsAnalyzer.serves("JavaScript"));
        assert!(JsTsAnalyzer.serves("TypeScript"));
        assert!(!JsTsAnalyzer.serves("Python"));
    }

    #[test]
    fn test_file_matching() {
        assert!(JsTsAnalyzer.matches("src/app.tsx"));
        assert!(JsTsAnalyzer.matches("index.mjs"));
        assert!(!JsTsAnalyzer.matches("main.py"));
    }
}
