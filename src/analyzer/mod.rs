//! Project analysis: language detection, skill extraction, per-language
//! code analysers, test metrics.

pub mod detect;
pub mod languages;
pub mod skills;
pub mod tests_metrics;

pub use detect::detect_language_and_framework;
pub use languages::{AnalyzerRegistry, LanguageAnalyzer, SourceFile, generic_report};
pub use skills::{SkillContext, augment_skills, extract_skills};
pub use tests_metrics::{TestCounts, count_tests};

use crate::constants::analysis::SAMPLE_HEAD_BYTES;
use crate::types::FileRecord;

/// Decode a project's file records into analyser inputs.
///
/// Binary payloads are skipped; files over `max_file_bytes` are sampled
/// down to their head. `.git` internals never reach an analyser.
/// Unreadable files are skipped and reported as diagnostics.
pub fn load_sources(
    files: &[FileRecord],
    read_bytes: &dyn Fn(&str) -> Option<Vec<u8>>,
    max_file_bytes: u64,
) -> (Vec<SourceFile>, Vec<String>) {
    let mut sources = Vec::new();
    let mut diagnostics = Vec::new();

    for file in files {
        if file.rel_path == ".git"
            || file.rel_path.starts_with(".git/")
            || file.rel_path.contains("/.git/")
        {
            continue;
        }

        let Some(bytes) = read_bytes(&file.rel_path) else {
            diagnostics.push(format!("unreadable file: {}", file.rel_path));
            continue;
        };

        if looks_binary(&bytes) {
            continue;
        }

        let sampled = bytes.len() as u64 > max_file_bytes;
        let slice = if sampled {
            &bytes[..SAMPLE_HEAD_BYTES.min(bytes.len())]
        } else {
            &bytes[..]
        };

        sources.push(SourceFile {
            rel_path: file.rel_path.clone(),
            content: String::from_utf8_lossy(slice).into_owned(),
            sampled,
        });
    }

    (sources, diagnostics)
}

/// NUL byte in the head marks a binary payload.
fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(8000).any(|b| *b == 0)
}
