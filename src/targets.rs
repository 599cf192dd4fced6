//! Decide which directories the generator should (re)document.
use crate::git::Git;
use crate::paths::RepoPaths;
use crate::walk::{walk_files, AllFiles, PathExclusions, IGNORED_DIR_NAMES, INFRA_DIR_NAMES};
use anyhow::Result;
use serde::Serialize;

/// What the generator is asked to cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "directories")]
pub enum Scope {
    /// Regenerate everything; the generator gets its full-scan flag.
    WholeTree,
    Directories(Vec<String>),
}

impl Scope {
    pub fn is_whole_tree(&self) -> bool {
        matches!(self, Self::WholeTree)
    }

    /// Directory arguments for the generator.
    pub fn generator_dirs(&self) -> Vec<String> {
        match self {
            Self::WholeTree => vec![".".to_string()],
            Self::Directories(dirs) => dirs.clone(),
        }
    }
}

/// Source of currently staged paths.
pub trait StagedPaths {
    fn staged_paths(&self) -> Result<Vec<String>>;
}

impl StagedPaths for Git {
    fn staged_paths(&self) -> Result<Vec<String>> {
        self.staged_files()
    }
}

/// Picks the generation scope from explicit targets, index state, or staged files.
pub struct TargetResolver<'a> {
    explicit: &'a [String],
    paths: &'a RepoPaths,
}

impl<'a> TargetResolver<'a> {
    pub fn new(explicit: &'a [String], paths: &'a RepoPaths) -> Self {
        Self { explicit, paths }
    }

    /// Resolve the scope. Every failure degrades to [`Scope::WholeTree`].
    pub fn resolve(&self, staged: &dyn StagedPaths) -> Scope {
        if !self.explicit.is_empty() {
            return Scope::Directories(self.explicit.to_vec());
        }
        if index_is_empty(self.paths) {
            tracing::info!(index = self.paths.index_rel(), "master index empty, full scan");
            return Scope::WholeTree;
        }
        let files = match staged.staged_paths() {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    "could not list staged files, full scan"
                );
                return Scope::WholeTree;
            }
        };
        let dirs = scope_from_staged(&files, self.paths.index_rel());
        if dirs.is_empty() {
            tracing::debug!("no staged directories in scope, full scan");
            return Scope::WholeTree;
        }
        Scope::Directories(dirs)
    }
}

/// Parent directories of staged files, de-duplicated in first-seen order.
///
/// Root-level files map to themselves. Paths inside the master index or an
/// infrastructure directory are dropped.
pub fn scope_from_staged(files: &[String], index_rel: &str) -> Vec<String> {
    let exclusions = PathExclusions::new()
        .with_names(IGNORED_DIR_NAMES)
        .with_names(INFRA_DIR_NAMES)
        .with_prefix(index_rel);
    let mut dirs: Vec<String> = Vec::new();
    for file in files {
        let file = file.trim().trim_start_matches("./");
        if file.is_empty() || exclusions.is_excluded_str(file) {
            continue;
        }
        let dir = match file.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent,
            _ => file,
        };
        if !dirs.iter().any(|seen| seen == dir) {
            dirs.push(dir.to_string());
        }
    }
    dirs
}

fn index_is_empty(paths: &RepoPaths) -> bool {
    let index = paths.index_dir();
    !index.is_dir() || walk_files(&index, &AllFiles).is_empty()
}
