//! Project Discovery
//!
//! Locates sub-project roots inside an extracted archive, top-down:
//!
//! 1. A directory is a project root if it contains version-control
//!    metadata (`.git`) or a recognised manifest file.
//! 2. A discovered root shadows its descendants; nested roots are not
//!    emitted.
//! 3. Zero roots found: the content root itself is the single project.
//!
//! File counts exclude `.git` internals and anything the ignore list
//! already dropped at archive-read time.

use std::collections::BTreeSet;

use crate::constants::ingest::MANIFEST_FILES;
use crate::types::CandidateProject;

use super::archive::ArchiveFile;

/// Discover project roots from the accepted archive entries.
///
/// `fallback_name` names the content-root project when no deeper root
/// exists (conventionally the archive filename stem).
pub fn discover_projects(files: &[ArchiveFile], fallback_name: &str) -> Vec<CandidateProject> {
    let mut git_roots: BTreeSet<String> = BTreeSet::new();
    let mut manifest_roots: BTreeSet<String> = BTreeSet::new();

    for file in files {
        let segments: Vec<&str> = file.rel_path.split('/').collect();

        // A `.git` segment marks the directory above it as a repo root.
        if let Some(idx) = segments.iter().position(|s| *s == ".git") {
            git_roots.insert(segments[..idx].join("/"));
        }

        // Manifest in a directory marks that directory.
        if let Some((dir, name)) = split_parent(&file.rel_path)
            && is_manifest(name)
        {
            manifest_roots.insert(dir.to_string());
        }
    }

    let mut roots: BTreeSet<String> = git_roots.union(&manifest_roots).cloned().collect();

    // Shadowing: drop any root with an ancestor that is also a root.
    let shadowed: Vec<String> = roots
        .iter()
        .filter(|root| {
            ancestors(root).any(|ancestor| roots.contains(ancestor))
        })
        .cloned()
        .collect();
    for root in shadowed {
        roots.remove(&root);
    }

    // No VCS or manifest root anywhere: the content root is the single
    // project. When every file lives under one top-level directory, that
    // directory IS the content root for naming purposes.
    if roots.is_empty() {
        roots.insert(sole_top_level_dir(files).unwrap_or_default());
    }

    let mut candidates = Vec::new();
    for root in roots {
        let file_count = files
            .iter()
            .filter(|f| in_root(&f.rel_path, &root) && !is_git_internal(&f.rel_path, &root))
            .count() as u64;
        if file_count == 0 && !root.is_empty() {
            continue;
        }

        let name = if root.is_empty() {
            fallback_name.to_string()
        } else {
            root.rsplit('/').next().unwrap_or(&root).to_string()
        };

        candidates.push(CandidateProject {
            name,
            has_git: git_roots.contains(&root),
            file_count,
            rel_path: root,
        });
    }

    candidates
}

/// Archive-relative paths of all files belonging to a candidate,
/// re-expressed relative to the candidate root. `.git` internals are kept:
/// they carry the history the git analyser needs.
pub fn candidate_files<'a>(
    files: &'a [ArchiveFile],
    candidate: &CandidateProject,
) -> Vec<(&'a ArchiveFile, String)> {
    files
        .iter()
        .filter(|f| in_root(&f.rel_path, &candidate.rel_path))
        .map(|f| {
            let rel = if candidate.rel_path.is_empty() {
                f.rel_path.clone()
            } else {
                f.rel_path[candidate.rel_path.len() + 1..].to_string()
            };
            (f, rel)
        })
        .collect()
}

fn is_manifest(name: &str) -> bool {
    MANIFEST_FILES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(name))
        || name.ends_with(".csproj")
}

fn split_parent(path: &str) -> Option<(&str, &str)> {
    match path.rfind('/') {
        Some(idx) => Some((&path[..idx], &path[idx + 1..])),
        None => Some(("", path)),
    }
}

fn in_root(path: &str, root: &str) -> bool {
    root.is_empty() || path == root || path.starts_with(&format!("{}/", root))
}

fn is_git_internal(path: &str, root: &str) -> bool {
    let rel = if root.is_empty() {
        path
    } else if path.len() > root.len() {
        &path[root.len() + 1..]
    } else {
        return false;
    };
    rel == ".git" || rel.starts_with(".git/") || rel.contains("/.git/")
}

/// The single directory every file lives under, if there is one.
fn sole_top_level_dir(files: &[ArchiveFile]) -> Option<String> {
    let mut top: Option<&str> = None;
    for file in files {
        let (first, rest) = file.rel_path.split_once('/')?;
        if rest.is_empty() {
            return None;
        }
        match top {
            None => top = Some(first),
            Some(existing) if existing == first => {}
            Some(_) => return None,
        }
    }
    top.map(|s| s.to_string())
}

fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.char_indices()
        .filter(|(_, c)| *c == '/')
        .map(move |(idx, _)| &path[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MimeCategory;

    fn file(path: &str) -> ArchiveFile {
        ArchiveFile {
            rel_path: path.to_string(),
            content_hash: format!("hash-{}", path),
            size: 10,
            mime: MimeCategory::from_path(path),
            modified: None,
        }
    }

    #[test]
    fn test_single_project_fallback_descends_sole_directory() {
        let files = vec![file("demo/main.py"), file("demo/README.md")];
        let candidates = discover_projects(&files, "upload");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rel_path, "demo");
        assert_eq!(candidates[0].name, "demo");
        assert_eq!(candidates[0].file_count, 2);
        assert!(!candidates[0].has_git);
    }

    #[test]
    fn test_content_root_fallback_with_mixed_top_level() {
        let files = vec![file("main.py"), file("lib/util.py")];
        let candidates = discover_projects(&files, "upload");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rel_path, "");
        assert_eq!(candidates[0].name, "upload");
        assert_eq!(candidates[0].file_count, 2);
    }

    #[test]
    fn test_manifest_marks_root() {
        let files = vec![
            file("app/pyproject.toml"),
            file("app/src/main.py"),
            file("notes.txt"),
        ];
        let candidates = discover_projects(&files, "upload");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rel_path, "app");
        assert_eq!(candidates[0].name, "app");
        assert_eq!(candidates[0].file_count, 2);
    }

    #[test]
    fn test_git_marks_root_and_is_not_counted() {
        let files = vec![
            file("proj/.git/HEAD"),
            file("proj/.git/config"),
            file("proj/main.c"),
        ];
        let candidates = discover_projects(&files, "upload");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rel_path, "proj");
        assert!(candidates[0].has_git);
        assert_eq!(candidates[0].file_count, 1);
    }

    #[test]
    fn test_nested_roots_are_shadowed() {
        let files = vec![
            file("mono/.git/HEAD"),
            file("mono/package.json"),
            file("mono/packages/web/package.json"),
            file("mono/packages/web/index.ts"),
        ];
        let candidates = discover_projects(&files, "upload");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].rel_path, "mono");
    }

    #[test]
    fn test_sibling_projects_both_emitted() {
        let files = vec![
            file("api/pyproject.toml"),
            file("api/app.py"),
            file("web/package.json"),
            file("web/index.js"),
        ];
        let mut candidates = discover_projects(&files, "upload");
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "api");
        assert_eq!(candidates[1].name, "web");
    }

    #[test]
    fn test_candidate_files_are_root_relative() {
        let files = vec![file("app/pyproject.toml"), file("app/src/main.py")];
        let candidates = discover_projects(&files, "upload");
        let paths: Vec<String> = candidate_files(&files, &candidates[0])
            .into_iter()
            .map(|(_, rel)| rel)
            .collect();
        assert_eq!(paths, vec!["pyproject.toml", "src/main.py"]);
    }
}
