//! Language-Specific Code Analysers
//!
//! A polymorphic family behind [`LanguageAnalyzer`], keyed by the detected
//! language string. New languages are added by registering a new variant,
//! never by editing an existing one.
//!
//! All variants are heuristics: tree-sitter supplies structural counts,
//! line scanning supplies idiom flags, and no compiler is ever launched.
//! Per-file parse failures are counted and reported in `summary_text`; a
//! wholesale variant failure surfaces as `AnalyserFailed` and the pipeline
//! degrades to [`generic_report`].

mod c_cpp;
mod java;
mod js_ts;
mod python;

pub use c_cpp::CCppAnalyzer;
pub use java::JavaAnalyzer;
pub use js_ts::JsTsAnalyzer;
pub use python::PythonAnalyzer;

use std::collections::HashMap;

use tracing::debug;

use crate::types::{LanguageReport, Result};

/// A decoded source file handed to an analyser. Oversized files arrive
/// pre-sampled (head only); binary files never arrive at all.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub rel_path: String,
    pub content: String,
    /// True when `content` is a truncated head sample.
    pub sampled: bool,
}

pub trait LanguageAnalyzer: Send + Sync {
    /// Canonical language string reported by this variant.
    fn language(&self) -> &'static str;

    /// Whether this variant handles a detector language string. Variants
    /// covering a language family (JS/TS) override this.
    fn serves(&self, language: &str) -> bool {
        language == self.language()
    }

    /// Whether a file belongs to this analyser, by extension.
    fn matches(&self, rel_path: &str) -> bool;

    fn analyse(&self, files: &[SourceFile]) -> Result<LanguageReport>;
}

/// Registry of analyser variants.
pub struct AnalyzerRegistry {
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
}

impl AnalyzerRegistry {
    /// The standard set: Python, JavaScript/TypeScript, Java, C/C++.
    pub fn standard() -> Self {
        Self {
            analyzers: vec![
                Box::new(PythonAnalyzer),
                Box::new(JsTsAnalyzer),
                Box::new(JavaAnalyzer),
                Box::new(CCppAnalyzer),
            ],
        }
    }

    pub fn get(&self, language: &str) -> Option<&dyn LanguageAnalyzer> {
        self.analyzers
            .iter()
            .find(|a| a.serves(language))
            .map(|a| a.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn LanguageAnalyzer> {
        self.analyzers.iter().map(|a| a.as_ref())
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Fallback used when no variant exists or a variant failed: file count,
/// LOC and language only.
pub fn generic_report(language: &str, files: &[SourceFile]) -> LanguageReport {
    let mut total_loc = 0;
    let mut comment_loc = 0;
    for file in files {
        let (loc, comments) = count_loc(&file.content, &["//", "#"]);
        total_loc += loc;
        comment_loc += comments;
    }
    LanguageReport {
        language: language.to_string(),
        file_count: files.len() as u64,
        total_loc,
        comment_loc,
        summary_text: format!(
            "{}: {} files, {} lines of code (generic analysis)",
            language,
            files.len(),
            total_loc
        ),
        ..Default::default()
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Non-blank lines split into code and comment lines, by line prefix.
pub(crate) fn count_loc(content: &str, comment_prefixes: &[&str]) -> (u64, u64) {
    let mut code = 0;
    let mut comments = 0;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if comment_prefixes.iter().any(|p| trimmed.starts_with(p)) {
            comments += 1;
        } else {
            code += 1;
        }
    }
    (code, comments)
}

pub(crate) fn parse_tree(
    language: &tree_sitter::Language,
    content: &str,
) -> Option<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    if parser.set_language(language).is_err() {
        return None;
    }
    parser.parse(content, None)
}

/// Depth-first visit over every node in a tree.
pub(crate) fn visit_nodes(tree: &tree_sitter::Tree, mut f: impl FnMut(tree_sitter::Node)) {
    fn walk(node: tree_sitter::Node, f: &mut impl FnMut(tree_sitter::Node)) {
        f(node);
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                walk(cursor.node(), f);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
    walk(tree.root_node(), &mut f);
}

pub(crate) fn node_text<'a>(node: tree_sitter::Node, content: &'a str) -> &'a str {
    node.utf8_text(content.as_bytes()).unwrap_or_else(|e| {
        debug!(
            "UTF-8 extraction failed at {}:{}: {}",
            node.start_position().row + 1,
            node.start_position().column,
            e
        );
        ""
    })
}

pub(crate) fn extension_of(rel_path: &str) -> String {
    rel_path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Top `limit` entries of a counter, ordered by count descending then name.
pub(crate) fn top_entries(counter: &HashMap<String, u64>, limit: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counter
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}
