//! C / C++ analyser. Structure from tree-sitter (C grammar for `.c`/`.h`,
//! C++ grammar for the rest), idioms from line scanning.
//!
//! Feature bag: modern-C++ adoption (smart pointers, range-for,
//! templates, lambdas), design-pattern hits, data-structure families,
//! algorithmic-complexity tags from an idiom catalogue.

use std::collections::BTreeSet;

use serde_json::json;

use crate::analyzer::tests_metrics::count_tests;
use crate::types::{LanguageReport, Result};

use super::{LanguageAnalyzer, SourceFile, count_loc, extension_of, node_text, parse_tree, visit_nodes};

/// `std::` container -> family.
const DATA_STRUCTURES: &[(&str, &str)] = &[
    ("std::vector", "dynamic array"),
    ("std::array", "static array"),
    ("std::map", "ordered map"),
    ("std::unordered_map", "hash map"),
    ("std::set", "ordered set"),
    ("std::unordered_set", "hash set"),
    ("std::list", "linked list"),
    ("std::deque", "deque"),
    ("std::queue", "queue"),
    ("std::priority_queue", "heap"),
    ("std::stack", "stack"),
];

/// Idiom -> complexity tag.
const COMPLEXITY_IDIOMS: &[(&str, &str)] = &[
    ("std::sort", "O(n log n) sorting"),
    ("qsort(", "O(n log n) sorting"),
    ("std::binary_search", "binary search"),
    ("std::lower_bound", "binary search"),
    ("bsearch(", "binary search"),
    ("memo", "memoization"),
    ("dp[", "dynamic programming"),
];

const PATTERN_SUFFIXES: &[(&str, &str)] = &[
    ("Factory", "Factory"),
    ("Builder", "Builder"),
    ("Singleton", "Singleton"),
    ("Observer", "Observer"),
    ("Strategy", "Strategy"),
    ("Visitor", "Visitor"),
];

pub struct CCppAnalyzer;

impl LanguageAnalyzer for CCppAnalyzer {
    fn language(&self) -> &'static str {
        "C/C++"
    }

    fn matches(&self, rel_path: &str) -> bool {
        matches!(
            extension_of(rel_path).as_str(),
            "c" | "cc" | "cpp" | "cxx" | "h" | "hpp" | "hh"
        )
    }

    fn analyse(&self, files: &[SourceFile]) -> Result<LanguageReport> {
        let c_language: tree_sitter::Language = tree_sitter_c::LANGUAGE.into();
        let cpp_language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();

        let mut report = LanguageReport {
            language: "C/C++".to_string(),
            file_count: files.len() as u64,
            ..Default::default()
        };

        let mut struct_count = 0u64;
        let mut template_count = 0u64;
        let mut lambda_count = 0u64;
        let mut range_for_count = 0u64;
        let mut smart_pointers = false;
        let mut manual_memory = false;
        let mut recursion_hint = false;
        let mut has_main = false;
        let mut data_structures: BTreeSet<&'static str> = BTreeSet::new();
        let mut complexity_tags: BTreeSet<&'static str> = BTreeSet::new();
        let mut patterns: BTreeSet<&'static str> = BTreeSet::new();

        for file in files {
            let (loc, comments) = count_loc(&file.content, &["//"]);
            report.total_loc += loc;
            report.comment_loc += comments;

            for (needle, family) in DATA_STRUCTURES {
                if file.content.contains(needle) {
                    data_structures.insert(family);
                }
            }
            for (needle, tag) in COMPLEXITY_IDIOMS {
                if file.content.contains(needle) {
                    complexity_tags.insert(tag);
                }
            }
            if file.content.contains("unique_ptr")
                || file.content.contains("shared_ptr")
                || file.content.contains("make_unique")
                || file.content.contains("make_shared")
            {
                smart_pointers = true;
            }
            if file.content.contains("malloc(")
                || file.content.contains("free(")
                || file.content.contains("new ") && file.content.contains("delete ")
            {
                manual_memory = true;
            }
            if file.content.contains("int main(") || file.content.contains("int main (") {
                has_main = true;
            }

            let ext = extension_of(&file.rel_path);
            let is_c = matches!(ext.as_str(), "c" | "h");
            let grammar = if is_c { &c_language } else { &cpp_language };

            let Some(tree) = parse_tree(grammar, &file.content) else {
                report.parse_errors += 1;
                continue;
            };
            if tree.root_node().has_error() {
                report.parse_errors += 1;
            }

            visit_nodes(&tree, |node| match node.kind() {
                "function_definition" => {
                    report.function_count += 1;
                    // Self-call inside the body marks recursion.
                    if let Some(declarator) = node.child_by_field_name("declarator") {
                        let text = node_text(declarator, &file.content);
                        if let Some(name) = text.split('(').next() {
                            let name = name.trim();
                            if !name.is_empty()
                                && node_text(node, &file.content)
                                    .matches(&format!("{}(", name))
                                    .count()
                                    > 1
                            {
                                recursion_hint = true;
                            }
                        }
                    }
                }
                "struct_specifier" => {
                    struct_count += 1;
                }
                "class_specifier" => {
                    report.class_count += 1;
                    if let Some(name) = node.child_by_field_name("name") {
                        let name = node_text(name, &file.content);
                        for (suffix, pattern) in PATTERN_SUFFIXES {
                            if name.ends_with(suffix) && name.len() > suffix.len() {
                                patterns.insert(pattern);
                            }
                        }
                    }
                }
                "template_declaration" => {
                    template_count += 1;
                }
                "lambda_expression" => {
                    lambda_count += 1;
                }
                "for_range_loop" => {
                    range_for_count += 1;
                }
                _ => {}
            });
        }

        if recursion_hint {
            complexity_tags.insert("recursion");
        }

        let tests = count_tests("C/C++", files);
        report.test_count_unit = tests.unit;
        report.test_count_integration = tests.integration;

        let modern_cpp = smart_pointers || range_for_count > 0 || lambda_count > 0;

        report.features = json!({
            "modern_cpp": {
                "smart_pointers": smart_pointers,
                "range_based_for": range_for_count,
                "templates": template_count,
                "lambdas": lambda_count,
                "adopted": modern_cpp,
            },
            "manual_memory_management": manual_memory,
            "has_main": has_main,
            "struct_count": struct_count,
            "design_patterns": patterns.iter().collect::<Vec<_>>(),
            "data_structures": data_structures.iter().collect::<Vec<_>>(),
            "complexity_tags": complexity_tags.iter().collect::<Vec<_>>(),
        });

        report.summary_text = format!(
            "C/C++: {} files, {} LOC, {} functions, {} classes, {} structs{}{}",
            report.file_count,
            report.total_loc,
            report.function_count,
            report.class_count,
            struct_count,
            if modern_cpp { ", modern C++ features" } else { "" },
            if report.parse_errors > 0 {
                format!("; {} files failed to parse", report.parse_errors)
            } else {
                String::new()
            }
        );

        Ok(report)
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
    fn test_modern_cpp_detection() {
        let files = vec![file(
            "src/engine.cpp",
            r#"
#include <memory>
#include <vector>
#include <algorithm>

template <typename T>
class WidgetFactory {
public:
    std::unique_ptr<T> create() { return std::make_unique<T>(); }
};

int process(std::vector<int>& values) {
    std::sort(values.begin(), values.end());
    int total = 0;
    for (const auto& v : values) {
        total += v;
    }
    auto doubler = [](int x) { return x * 2; };
    return doubler(total);
}
"#,
        )];
        let report = CCppAnalyzer.analyse(&files).unwrap();
        let modern = &report.features["modern_cpp"];
        assert_eq!(modern["smart_pointers"], true);
        assert_eq!(modern["adopted"], true);
        assert!(modern["templates"].as_u64().unwrap() >= 1);
        assert!(modern["lambdas"].as_u64().unwrap() >= 1);
        assert!(modern["range_based_for"].as_u64().unwrap() >= 1);

        let structures = report.features["data_structures"].as_array().unwrap();
        assert!(structures.iter().any(|s| s == "dynamic array"));
        let tags = report.features["complexity_tags"].as_array().unwrap();
        assert!(tags.iter().any(|t| t == "O(n log n) sorting"));
        let patterns = report.features["design_patterns"].as_array().unwrap();
        assert!(patterns.iter().any(|p| p == "Factory"));
    }

    #[test]
    fn test_plain_c_program() {
        let files = vec![file(
            "src/main.c",
            r#"
#include <stdlib.h>

struct node {
    int value;
    struct node *next;
};

int main(void) {
    struct node *head = malloc(sizeof(struct node));
    free(head);
    return 0;
}
"#,
        )];
        let report = CCppAnalyzer.analyse(&files).unwrap();
        assert_eq!(report.features["has_main"], true);
        assert_eq!(report.features["manual_memory_management"], true);
        assert_eq!(report.features["modern_cpp"]["adopted"], false);
        assert!(report.features["struct_count"].as_u64().unwrap() >= 1);
        assert_eq!(report.class_count, 0);
    }

    #[test]
    fn test_recursion_tag() {
        let files = vec![file(
            "src/fib.c",
            "int fib(int n) {\n    if (n < 2) return n;\n    return fib(n - 1) + fib(n - 2);\n}\n",
        )];
        let report = CCppAnalyzer.analyse(&files).unwrap();
        let tags = report.features["complexity_tags"].as_array().unwrap();
        assert!(tags.iter().any(|t| t == "recursion"));
    }
}
