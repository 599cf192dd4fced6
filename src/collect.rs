//! Discovery of generator output scattered across the working tree.
use crate::walk::{walk_files, PathExclusions, WalkFilter, IGNORED_DIR_NAMES};
use std::path::{Path, PathBuf};

/// File name the generator writes for a directory.
pub const STANDARD_ARTIFACT_NAME: &str = "docmap.json";
/// File name the generator writes when run in enhanced mode.
pub const ENHANCED_ARTIFACT_NAME: &str = "docmap.enhanced.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactVariant {
    Standard,
    Enhanced,
}

impl ArtifactVariant {
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            STANDARD_ARTIFACT_NAME => Some(Self::Standard),
            ENHANCED_ARTIFACT_NAME => Some(Self::Enhanced),
            _ => None,
        }
    }
}

pub fn is_artifact_name(name: &str) -> bool {
    ArtifactVariant::from_file_name(name).is_some()
}

/// Finds artifact files while pruning dependency caches, VCS metadata,
/// build output, and the master index itself.
#[derive(Debug, Clone)]
pub struct ArtifactCollector {
    exclusions: PathExclusions,
}

impl ArtifactCollector {
    pub fn new(index_rel: &str) -> Self {
        Self {
            exclusions: collector_exclusions(index_rel),
        }
    }

    /// Artifact paths relative to `root`, in discovery order.
    pub fn collect(&self, root: &Path) -> Vec<PathBuf> {
        let found = walk_files(root, self);
        tracing::debug!(count = found.len(), "collected artifacts");
        found
    }
}

impl WalkFilter for ArtifactCollector {
    fn descend(&self, rel_dir: &Path) -> bool {
        !self.exclusions.is_excluded(rel_dir)
    }

    fn include(&self, rel_file: &Path) -> bool {
        rel_file
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_artifact_name)
    }
}

/// Exclusions shared by the collector and the index merger.
pub fn collector_exclusions(index_rel: &str) -> PathExclusions {
    PathExclusions::new()
        .with_names(IGNORED_DIR_NAMES)
        .with_prefix(index_rel)
}
