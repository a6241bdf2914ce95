//! Test Metrics
//!
//! Counts test cases per project, split into unit and integration, from
//! path hints and per-language case markers. A file under
//! `tests/integration/` full of `def test_*` counts as integration;
//! everything else defaults to unit.

use super::languages::SourceFile;

const INTEGRATION_HINTS: &[&str] = &[
    "integration",
    "e2e",
    "acceptance",
    "functional",
    "system",
];

const TEST_PATH_HINTS: &[&str] = &[
    "tests/", "test/", "__tests__/", "spec/", "src/test/",
];

/// Aggregated test counts for a set of source files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounts {
    pub unit: u64,
    pub integration: u64,
}

impl TestCounts {
    pub fn total(&self) -> u64 {
        self.unit + self.integration
    }
}

/// Whether a path looks like a test file at all.
pub fn is_test_path(rel_path: &str) -> bool {
    let lowered = rel_path.to_lowercase();
    let name = lowered.rsplit('/').next().unwrap_or(&lowered);

    TEST_PATH_HINTS.iter().any(|hint| lowered.contains(hint))
        || name.starts_with("test_")
        || name.ends_with("_test.py")
        || name.ends_with(".test.js")
        || name.ends_with(".test.ts")
        || name.ends_with(".test.jsx")
        || name.ends_with(".test.tsx")
        || name.ends_with(".spec.js")
        || name.ends_with(".spec.ts")
        || name.ends_with("test.java")
        || name.ends_with("tests.java")
        || name.ends_with("_test.cc")
        || name.ends_with("_test.cpp")
}

fn is_integration_path(rel_path: &str) -> bool {
    let lowered = rel_path.to_lowercase();
    INTEGRATION_HINTS.iter().any(|hint| lowered.contains(hint))
}

/// Count test cases in one file using the language's case marker.
fn count_cases(language: &str, content: &str) -> u64 {
    let mut count = 0u64;
    match language {
        "Python" => {
            for line in content.lines() {
                let trimmed = line.trim_start();
                if trimmed.starts_with("def test_") || trimmed.starts_with("async def test_") {
                    count += 1;
                }
            }
        }
        "JavaScript" | "TypeScript" => {
            for line in content.lines() {
                let trimmed = line.trim_start();
                if trimmed.starts_with("it(")
                    || trimmed.starts_with("it.each")
                    || trimmed.starts_with("test(")
                    || trimmed.starts_with("test.each")
                {
                    count += 1;
                }
            }
        }
        "Java" => {
            count += content.matches("@Test").count() as u64;
        }
        "C/C++" => {
            for line in content.lines() {
                let trimmed = line.trim_start();
                if trimmed.starts_with("TEST(")
                    || trimmed.starts_with("TEST_F(")
                    || trimmed.starts_with("TEST_CASE(")
                {
                    count += 1;
                }
            }
        }
        _ => {}
    }
    count
}

/// Count unit and integration test cases across a project's files.
pub fn count_tests(language: &str, files: &[SourceFile]) -> TestCounts {
    let mut counts = TestCounts::default();
    for file in files {
        if !is_test_path(&file.rel_path) {
            continue;
        }
        let cases = count_cases(language, &file.content);
        if cases == 0 {
            continue;
        }
        if is_integration_path(&file.rel_path) {
            counts.integration += cases;
        } else {
            counts.unit += cases;
        }
    }
    counts
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
    fn test_path_detection() {
        assert!(is_test_path("tests/test_app.py"));
        assert!(is_test_path("src/__tests__/App.test.tsx"));
        assert!(is_test_path("src/test/java/AppTest.java"));
        assert!(is_test_path("core_test.cc"));
        assert!(!is_test_path("src/app.py"));
    }

    #[test]
    fn test_python_case_counting() {
        let files = vec![
            file(
                "tests/test_app.py",
                "def test_one():\n    pass\n\nasync def test_two():\n    pass\n",
            ),
            file("src/app.py", "def test_looks_like_but_not_in_test_dir(): ..."),
        ];
        let counts = count_tests("Python", &files);
        assert_eq!(counts.unit, 2);
        assert_eq!(counts.integration, 0);
    }

    #[test]
    fn test_integration_split() {
        let files = vec![
            file("tests/unit/test_core.py", "def test_a(): ...\n"),
            file(
                "tests/integration/test_flow.py",
                "def test_b(): ...\ndef test_c(): ...\n",
            ),
        ];
        let counts = count_tests("Python", &files);
        assert_eq!(counts.unit, 1);
        assert_eq!(counts.integration, 2);
    }

    #[test]
    fn test_js_and_java_markers() {
        let js = vec![file(
            "src/app.test.ts",
            "describe('x', () => {\n  it('works', () => {});\n  test('also', () => {});\n});\n",
        )];
        assert_eq!(count_tests("TypeScript", &js).total(), 2);

        let java = vec![file(
            "src/test/java/AppTest.java",
            "@Test\nvoid a() {}\n@Test\nvoid b() {}\n",
        )];
        assert_eq!(count_tests("Java", &java).total(), 2);
    }
}
