//! Read-only tree walk shared by artifact collection and scope resolution.
//!
//! Callers decide what to prune and what to keep through [`WalkFilter`];
//! the walk itself only guarantees deterministic ordering and never follows
//! symlinks.
use crate::util::slash_path;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names that never contain user sources worth documenting.
pub const IGNORED_DIR_NAMES: [&str; 8] = [
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    ".venv",
    "__pycache__",
];

/// Extra infrastructure directories dropped from staged-change scopes.
pub const INFRA_DIR_NAMES: [&str; 1] = [".github"];

/// Predicate capability for [`walk_files`]. Paths are relative to the walk root.
pub trait WalkFilter {
    /// Whether to descend into `rel_dir`.
    fn descend(&self, _rel_dir: &Path) -> bool {
        true
    }

    /// Whether `rel_file` belongs in the result.
    fn include(&self, rel_file: &Path) -> bool;
}

/// Accepts every file below non-pruned directories.
pub struct AllFiles;

impl WalkFilter for AllFiles {
    fn include(&self, _rel_file: &Path) -> bool {
        true
    }
}

/// Walk `root` and return matching files relative to it, in discovery order.
///
/// Siblings are visited in file-name order. Unreadable entries are skipped.
/// A missing root yields an empty list.
pub fn walk_files(root: &Path, filter: &dyn WalkFilter) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            match entry.path().strip_prefix(root) {
                Ok(rel) => filter.descend(rel),
                Err(_) => false,
            }
        });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        if filter.include(rel) {
            files.push(rel.to_path_buf());
        }
    }
    files
}

/// Excluded directory names (matched at any depth) plus excluded path prefixes.
#[derive(Debug, Clone, Default)]
pub struct PathExclusions {
    names: BTreeSet<String>,
    prefixes: Vec<String>,
}

impl PathExclusions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Exclude a `/`-separated path (and everything below it) from the root.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        if !prefix.is_empty() {
            self.prefixes.push(prefix.to_string());
        }
        self
    }

    /// Whether `rel` sits under an excluded name or prefix.
    pub fn is_excluded(&self, rel: &Path) -> bool {
        self.is_excluded_str(&slash_path(rel))
    }

    pub fn is_excluded_str(&self, rel: &str) -> bool {
        let rel = rel.trim_start_matches("./").trim_matches('/');
        if rel
            .split('/')
            .any(|component| self.names.contains(component))
        {
            return true;
        }
        self.prefixes
            .iter()
            .any(|prefix| rel == prefix || rel.starts_with(&format!("{prefix}/")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct JsonOutsideVendor;

    impl WalkFilter for JsonOutsideVendor {
        fn descend(&self, rel_dir: &Path) -> bool {
            rel_dir.file_name().is_some_and(|name| name != "vendor")
        }

        fn include(&self, rel_file: &Path) -> bool {
            rel_file.extension().is_some_and(|ext| ext == "json")
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, b"{}").expect("write");
    }

    #[test]
    fn filter_prunes_and_selects() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "b/one.json");
        touch(dir.path(), "a/two.json");
        touch(dir.path(), "a/notes.txt");
        touch(dir.path(), "vendor/three.json");
        touch(dir.path(), "a/vendor/four.json");

        let files = walk_files(dir.path(), &JsonOutsideVendor);
        assert_eq!(
            files,
            vec![PathBuf::from("a/two.json"), PathBuf::from("b/one.json")]
        );
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(walk_files(&dir.path().join("absent"), &AllFiles).is_empty());
    }

    #[test]
    fn exclusions_match_names_and_prefixes() {
        let exclusions = PathExclusions::new()
            .with_names(IGNORED_DIR_NAMES)
            .with_prefix("docs/index/");
        assert!(exclusions.is_excluded_str("node_modules/pkg/a.js"));
        assert!(exclusions.is_excluded_str("src/deep/node_modules/x"));
        assert!(exclusions.is_excluded_str("docs/index"));
        assert!(exclusions.is_excluded_str("docs/index/_root.json"));
        assert!(!exclusions.is_excluded_str("docs/indexer/a.json"));
        assert!(!exclusions.is_excluded_str("src/lib.rs"));
    }
}
