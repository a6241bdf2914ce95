//! Java analyser: single-pass tree walk for structure and OOP principles,
//! name-based matching against a fixed design-pattern catalogue.
//!
//! Feature bag: OOP score (0-10), design-pattern hits, annotation summary.

use std::collections::HashMap;

use serde_json::json;

use crate::analyzer::tests_metrics::count_tests;
use crate::types::{LanguageReport, Result};

use super::{LanguageAnalyzer, SourceFile, count_loc, node_text, parse_tree, visit_nodes};

/// Fixed catalogue: class-name suffix -> pattern name.
const PATTERN_SUFFIXES: &[(&str, &str)] = &[
    ("Factory", "Factory"),
    ("Builder", "Builder"),
    ("Singleton", "Singleton"),
    ("Observer", "Observer"),
    ("Listener", "Observer"),
    ("Strategy", "Strategy"),
    ("Adapter", "Adapter"),
    ("Decorator", "Decorator"),
    ("Visitor", "Visitor"),
    ("Proxy", "Proxy"),
];

#[derive(Default)]
struct OopSignals {
    encapsulation: bool,
    inheritance: bool,
    polymorphism: bool,
    abstraction: bool,
}

impl OopSignals {
    /// 0-10: each principle contributes 2.5.
    fn score(&self) -> f64 {
        [
            self.encapsulation,
            self.inheritance,
            self.polymorphism,
            self.abstraction,
        ]
        .iter()
        .filter(|signal| **signal)
        .count() as f64
            * 2.5
    }
}

pub struct JavaAnalyzer;

impl LanguageAnalyzer for JavaAnalyzer {
    fn language(&self) -> &'static str {
        "Java"
    }

    fn matches(&self, rel_path: &str) -> bool {
        rel_path.ends_with(".java")
    }

    fn analyse(&self, files: &[SourceFile]) -> Result<LanguageReport> {
        let language: tree_sitter::Language = tree_sitter_java::LANGUAGE.into();

        let mut report = LanguageReport {
            language: "Java".to_string(),
            file_count: files.len() as u64,
            ..Default::default()
        };

        let mut oop = OopSignals::default();
        let mut annotations: HashMap<String, u64> = HashMap::new();
        let mut patterns: std::collections::BTreeSet<&'static str> = Default::default();
        let mut interface_count = 0u64;

        for file in files {
            let (loc, comments) = count_loc(&file.content, &["//"]);
            report.total_loc += loc;
            report.comment_loc += comments;

            let Some(tree) = parse_tree(&language, &file.content) else {
                report.parse_errors += 1;
                continue;
            };
            if tree.root_node().has_error() {
                report.parse_errors += 1;
            }

            visit_nodes(&tree, |node| match node.kind() {
                "class_declaration" => {
                    report.class_count += 1;
                    if node.child_by_field_name("superclass").is_some() {
                        oop.inheritance = true;
                    }
                    if node.child_by_field_name("interfaces").is_some() {
                        oop.polymorphism = true;
                    }
                    if let Some(name) = node.child_by_field_name("name") {
                        let name = node_text(name, &file.content);
                        for (suffix, pattern) in PATTERN_SUFFIXES {
                            if name.ends_with(suffix) && name.len() > suffix.len() {
                                patterns.insert(pattern);
                            }
                        }
                    }
                }
                "method_declaration" => {
                    report.function_count += 1;
                }
                "interface_declaration" => {
                    interface_count += 1;
                    oop.abstraction = true;
                }
                "field_declaration" => {
                    // private fields indicate encapsulation
                    if node_text(node, &file.content).trim_start().starts_with("private") {
                        oop.encapsulation = true;
                    }
                }
                "marker_annotation" | "annotation" => {
                    let text = node_text(node, &file.content);
                    let name = text
                        .trim_start_matches('@')
                        .split(['(', ' '])
                        .next()
                        .unwrap_or("")
                        .to_string();
                    if !name.is_empty() {
                        if name == "Override" {
                            oop.polymorphism = true;
                        }
                        *annotations.entry(name).or_default() += 1;
                    }
                }
                _ => {}
            });

            if file.content.contains("abstract class") {
                oop.abstraction = true;
            }
        }

        let tests = count_tests("Java", files);
        report.test_count_unit = tests.unit;
        report.test_count_integration = tests.integration;

        let oop_score = oop.score();
        let pattern_hits: Vec<&str> = patterns.into_iter().collect();
        let annotation_summary = super::top_entries(&annotations, 5);

        report.features = json!({
            "oop_score": oop_score,
            "design_patterns": pattern_hits,
            "annotations": annotation_summary,
            "interface_count": interface_count,
            "oop_principles": {
                "encapsulation": oop.encapsulation,
                "inheritance": oop.inheritance,
                "polymorphism": oop.polymorphism,
                "abstraction": oop.abstraction,
            },
        });

        report.summary_text = format!(
            "Java: {} files, {} LOC, {} classes, {} methods, OOP score {:.1}/10{}{}",
            report.file_count,
            report.total_loc,
            report.class_count,
            report.function_count,
            oop_score,
            if pattern_hits.is_empty() {
                String::new()
            } else {
                format!(", patterns: {}", pattern_hits.join(", "))
            },
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
    fn test_oop_principles_detected() {
        let files = vec![file(
            "src/main/java/Shape.java",
            r#"
public interface Drawable {
    void draw();
}

public abstract class Shape implements Drawable {
    private int edges;

    public abstract double area();
}

public class Circle extends Shape {
    @Override
    public double area() { return 3.14; }

    @Override
    public void draw() {}
}
"#,
        )];
        let report = JavaAnalyzer.analyse(&files).unwrap();
        let principles = &report.features["oop_principles"];
        assert_eq!(principles["encapsulation"], true);
        assert_eq!(principles["inheritance"], true);
        assert_eq!(principles["polymorphism"], true);
        assert_eq!(principles["abstraction"], true);
        assert_eq!(report.features["oop_score"], 10.0);
    }

    #[test]
    fn test_pattern_catalogue_hits() {
        let files = vec![file(
            "src/WidgetFactory.java",
            "public class WidgetFactory {\n    public Widget create() { return new Widget(); }\n}\n\nclass EventListener {}\n",
        )];
        let report = JavaAnalyzer.analyse(&files).unwrap();
        let patterns = report.features["design_patterns"].as_array().unwrap();
        assert!(patterns.iter().any(|p| p == "Factory"));
        assert!(patterns.iter().any(|p| p == "Observer"));
    }

    #[test]
    fn test_annotation_summary() {
        let files = vec![file(
            "src/Api.java",
            "public class Api {\n    @GetMapping(\"/x\")\n    public String get() { return \"\"; }\n    @GetMapping(\"/y\")\n    public String other() { return \"\"; }\n}\n",
        )];
        let report = JavaAnalyzer.analyse(&files).unwrap();
        let annotations = report.features["annotations"].as_array().unwrap();
        assert_eq!(annotations[0][0], "GetMapping");
        assert_eq!(annotations[0][1], 2);
    }

    #[test]
    fn test_plain_class_scores_low() {
        let files = vec![file(
            "src/Util.java",
            "public class Util {\n    public static int add(int a, int b) { return a + b; }\n}\n",
        )];
        let report = JavaAnalyzer.analyse(&files).unwrap();
        assert_eq!(report.features["oop_score"], 0.0);
        assert_eq!(report.class_count, 1);
        assert_eq!(report.function_count, 1);
    }
}
