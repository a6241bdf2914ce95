//! Language and Framework Detection
//!
//! Weighs file extensions and manifest filenames against a fixed ruleset,
//! tie-breaking by total byte share. Below a weight floor no language is
//! reported. Framework detection keys on manifest contents and only runs
//! once a language matched, so a framework never appears without its
//! language.
//!
//! Deterministic, offline, no external calls.

use std::collections::HashMap;

use crate::constants::analysis::DETECTION_WEIGHT_FLOOR;
use crate::types::FileRecord;

/// Weight added per source file of a language.
const EXTENSION_WEIGHT: f64 = 1.0;
/// Weight added when a language's manifest file is present.
const MANIFEST_WEIGHT: f64 = 5.0;

const EXTENSION_RULES: &[(&str, &str)] = &[
    ("py", "Python"),
    ("pyi", "Python"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("mjs", "JavaScript"),
    ("cjs", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("java", "Java"),
    ("c", "C/C++"),
    ("cc", "C/C++"),
    ("cpp", "C/C++"),
    ("cxx", "C/C++"),
    ("h", "C/C++"),
    ("hpp", "C/C++"),
    ("rs", "Rust"),
    ("go", "Go"),
    ("cs", "C#"),
    ("php", "PHP"),
    ("rb", "Ruby"),
    ("kt", "Kotlin"),
    ("swift", "Swift"),
];

const MANIFEST_RULES: &[(&str, &str)] = &[
    ("pyproject.toml", "Python"),
    ("requirements.txt", "Python"),
    ("setup.py", "Python"),
    ("package.json", "JavaScript"),
    ("tsconfig.json", "TypeScript"),
    ("cargo.toml", "Rust"),
    ("go.mod", "Go"),
    ("pom.xml", "Java"),
    ("build.gradle", "Java"),
    ("build.gradle.kts", "Java"),
    ("cmakelists.txt", "C/C++"),
    ("composer.json", "PHP"),
    ("gemfile", "Ruby"),
];

/// Detect `(language, framework)` for a project file set.
///
/// `read_manifest` resolves a root-relative manifest path to its contents;
/// it is only consulted for framework detection after a language matched.
pub fn detect_language_and_framework(
    files: &[FileRecord],
    read_manifest: impl Fn(&str) -> Option<String>,
) -> (Option<String>, Option<String>) {
    let mut weights: HashMap<&str, f64> = HashMap::new();
    let mut byte_share: HashMap<&str, u64> = HashMap::new();

    for file in files {
        let name = file
            .rel_path
            .rsplit('/')
            .next()
            .unwrap_or(&file.rel_path)
            .to_ascii_lowercase();

        if let Some((_, language)) = MANIFEST_RULES.iter().find(|(m, _)| *m == name) {
            // Root-level manifests count more than deeply nested ones.
            let weight = if file.rel_path.contains('/') {
                MANIFEST_WEIGHT / 2.0
            } else {
                MANIFEST_WEIGHT
            };
            *weights.entry(language).or_default() += weight;
        }

        let ext = name.rsplit('.').next().unwrap_or("");
        if let Some((_, language)) = EXTENSION_RULES.iter().find(|(e, _)| *e == ext) {
            *weights.entry(language).or_default() += EXTENSION_WEIGHT;
            *byte_share.entry(language).or_default() += file.size;
        }
    }

    // A TypeScript signal subsumes the JavaScript one: tsconfig + .ts files
    // alongside generated .js should not report JavaScript.
    if weights.get("TypeScript").copied().unwrap_or(0.0)
        >= weights.get("JavaScript").copied().unwrap_or(f64::MAX)
    {
        let js = weights.remove("JavaScript").unwrap_or(0.0);
        *weights.entry("TypeScript").or_default() += js;
        let js_bytes = byte_share.remove("JavaScript").unwrap_or(0);
        *byte_share.entry("TypeScript").or_default() += js_bytes;
    }

    let mut ranked: Vec<(&str, f64)> = weights.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                byte_share
                    .get(b.0)
                    .copied()
                    .unwrap_or(0)
                    .cmp(&byte_share.get(a.0).copied().unwrap_or(0))
            })
            .then_with(|| a.0.cmp(b.0))
    });

    let Some((language, weight)) = ranked.first() else {
        return (None, None);
    };
    if *weight < DETECTION_WEIGHT_FLOOR {
        return (None, None);
    }

    let language = language.to_string();
    let framework = detect_framework(&language, files, &read_manifest);
    (Some(language), framework)
}

fn detect_framework(
    language: &str,
    files: &[FileRecord],
    read_manifest: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let manifest_content = |names: &[&str]| -> String {
        let mut combined = String::new();
        for file in files {
            let base = file
                .rel_path
                .rsplit('/')
                .next()
                .unwrap_or("")
                .to_ascii_lowercase();
            if names.contains(&base.as_str())
                && let Some(content) = read_manifest(&file.rel_path)
            {
                combined.push_str(&content.to_ascii_lowercase());
                combined.push('\n');
            }
        }
        combined
    };

    match language {
        "Python" => {
            let content = manifest_content(&["pyproject.toml", "requirements.txt", "setup.py"]);
            first_hit(
                &content,
                &[
                    ("fastapi", "FastAPI"),
                    ("django", "Django"),
                    ("flask", "Flask"),
                    ("streamlit", "Streamlit"),
                ],
            )
        }
        "JavaScript" | "TypeScript" => {
            let content = manifest_content(&["package.json"]);
            first_hit(
                &content,
                &[
                    ("\"next\"", "Next.js"),
                    ("\"react\"", "React"),
                    ("\"vue\"", "Vue"),
                    ("@angular/core", "Angular"),
                    ("\"svelte\"", "Svelte"),
                    ("\"express\"", "Express"),
                ],
            )
        }
        "Java" => {
            let content = manifest_content(&["pom.xml", "build.gradle", "build.gradle.kts"]);
            first_hit(
                &content,
                &[
                    ("spring-boot-starter", "Spring Boot"),
                    ("springframework", "Spring Boot"),
                ],
            )
        }
        "Rust" => {
            let content = manifest_content(&["cargo.toml"]);
            first_hit(&content, &[("tauri", "Tauri"), ("actix-web", "Actix Web")])
        }
        "C/C++" => files
            .iter()
            .any(|f| {
                f.rel_path
                    .rsplit('/')
                    .next()
                    .is_some_and(|n| n.eq_ignore_ascii_case("cmakelists.txt"))
            })
            .then(|| "CMake".to_string()),
        "Ruby" => files
            .iter()
            .any(|f| f.rel_path == "bin/rails" || f.rel_path == "config/application.rb")
            .then(|| "Rails".to_string()),
        _ => None,
    }
}

fn first_hit(content: &str, rules: &[(&str, &str)]) -> Option<String> {
    rules
        .iter()
        .find(|(needle, _)| content.contains(needle))
        .map(|(_, framework)| framework.to_string())
}
