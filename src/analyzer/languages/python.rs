//! Python analyser: structural counts via tree-sitter, idiom flags via
//! line scanning. Feature bag: type-hint density, async function count,
//! framework hints from imports, decorator usage summary.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::json;

use crate::analyzer::tests_metrics::count_tests;
use crate::types::{LanguageReport, Result};

use super::{LanguageAnalyzer, SourceFile, count_loc, node_text, parse_tree, visit_nodes};

const WEB_FRAMEWORKS: &[&str] = &["flask", "django", "fastapi", "streamlit", "aiohttp", "tornado"];
const ORM_STACKS: &[&str] = &["sqlalchemy", "peewee", "tortoise", "sqlmodel"];
const ML_STACKS: &[&str] = &[
    "torch",
    "tensorflow",
    "keras",
    "sklearn",
    "numpy",
    "pandas",
    "scipy",
];

pub struct PythonAnalyzer;

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> &'static str {
        "Python"
    }

    fn matches(&self, rel_path: &str) -> bool {
        rel_path.ends_with(".py") || rel_path.ends_with(".pyi")
    }

    fn analyse(&self, files: &[SourceFile]) -> Result<LanguageReport> {
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();

        let mut report = LanguageReport {
            language: "Python".to_string(),
            file_count: files.len() as u64,
            ..Default::default()
        };

        let mut annotated_functions = 0u64;
        let mut async_functions = 0u64;
        let mut decorators: HashMap<String, u64> = HashMap::new();
        let mut imports: BTreeSet<String> = BTreeSet::new();

        for file in files {
            let (loc, comments) = count_loc(&file.content, &["#"]);
            report.total_loc += loc;
            report.comment_loc += comments;

            collect_imports(&file.content, &mut imports);
            async_functions += file
                .content
                .lines()
                .filter(|l| l.trim_start().starts_with("async def "))
                .count() as u64;

            let Some(tree) = parse_tree(&language, &file.content) else {
                report.parse_errors += 1;
                continue;
            };
            if tree.root_node().has_error() {
                report.parse_errors += 1;
            }

            visit_nodes(&tree, |node| match node.kind() {
                "function_definition" => {
                    report.function_count += 1;
                    if is_annotated(node) {
                        annotated_functions += 1;
                    }
                }
                "class_definition" => {
                    report.class_count += 1;
                }
                "decorator" => {
                    let text = node_text(node, &file.content);
                    let name = text
                        .trim_start_matches('@')
                        .split(['(', '.'])
                        .next()
                        .unwrap_or("")
                        .trim()
                        .to_string();
                    if !name.is_empty() {
                        *decorators.entry(name).or_default() += 1;
                    }
                }
                _ => {}
            });
        }

        let tests = count_tests("Python", files);
        report.test_count_unit = tests.unit;
        report.test_count_integration = tests.integration;

        let type_hint_density = if report.function_count > 0 {
            annotated_functions as f64 / report.function_count as f64
        } else {
            0.0
        };

        let hints = framework_hints(&imports);
        let decorator_summary = super::top_entries(&decorators, 5);

        report.features = json!({
            "type_hint_density": (type_hint_density * 100.0).round() / 100.0,
            "async_function_count": async_functions,
            "framework_hints": hints,
            "decorators": decorator_summary,
        });

        report.summary_text = format!(
            "Python: {} files, {} LOC, {} functions ({:.0}% type-hinted), {} classes, {} tests{}",
            report.file_count,
            report.total_loc,
            report.function_count,
            type_hint_density * 100.0,
            report.class_count,
            tests.total(),
            if report.parse_errors > 0 {
                format!("; {} files failed to parse", report.parse_errors)
            } else {
                String::new()
            }
        );

        Ok(report)
    }
}

fn is_annotated(function: tree_sitter::Node) -> bool {
    if function.child_by_field_name("return_type").is_some() {
        return true;
    }
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return false;
    };
    let mut cursor = parameters.walk();
    let mut found = false;
    if cursor.goto_first_child() {
        loop {
            let kind = cursor.node().kind();
            if kind == "typed_parameter" || kind == "typed_default_parameter" {
                found = true;
                break;
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    found
}

fn collect_imports(content: &str, imports: &mut BTreeSet<String>) {
    for line in content.lines() {
        let trimmed = line.trim_start();
        let module = if let Some(rest) = trimmed.strip_prefix("import ") {
            rest.split([' ', ',', '.']).next()
        } else if let Some(rest) = trimmed.strip_prefix("from ") {
            rest.split([' ', '.']).next()
        } else {
            None
        };
        if let Some(module) = module
            && !module.is_empty()
        {
            imports.insert(module.to_lowercase());
        }
    }
}

fn framework_hints(imports: &BTreeSet<String>) -> BTreeMap<&'static str, Vec<String>> {
    let mut hints: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    let buckets: [(&str, &[&str]); 3] = [
        ("web", WEB_FRAMEWORKS),
        ("orm", ORM_STACKS),
        ("ml", ML_STACKS),
    ];
    for (bucket, names) in buckets {
        let found: Vec<String> = names
            .iter()
            .filter(|name| imports.contains(**name))
            .map(|name| name.to_string())
            .collect();
        if !found.is_empty() {
            hints.insert(bucket, found);
        }
    }
    hints
}
