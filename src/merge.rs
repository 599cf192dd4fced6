//! Fold freshly generated artifacts into the flat master index.
use crate::collect::collector_exclusions;
use crate::transform::ArtifactRef;
use crate::walk::PathExclusions;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Counters for one merge batch. `found` always equals the sum of the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub found: usize,
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl MergeSummary {
    /// Artifacts that actually landed in the index.
    pub fn merged(&self) -> usize {
        self.new + self.updated
    }

    fn record(&mut self, outcome: MergeOutcome) {
        self.found += 1;
        match outcome {
            MergeOutcome::New => self.new += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    New,
    Updated,
    Skipped,
}

impl MergeOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
        }
    }
}

/// Moves artifacts from their source positions into `<root>/<index>/`.
///
/// Relocation is destructive: a merged artifact no longer exists where the
/// generator wrote it.
#[derive(Debug, Clone)]
pub struct IndexMerger {
    repo_root: PathBuf,
    index_root: PathBuf,
    exclusions: PathExclusions,
}

impl IndexMerger {
    pub fn new(repo_root: &Path, index_rel: &str) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            index_root: repo_root.join(index_rel),
            exclusions: collector_exclusions(index_rel),
        }
    }

    /// Merge every artifact in `artifacts` (paths relative to the repo root).
    ///
    /// Never fails; individual problems become `skipped`.
    pub fn merge(&self, artifacts: &[PathBuf]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for rel in artifacts {
            if self.exclusions.is_excluded(rel) {
                tracing::debug!(path = %rel.display(), "excluded from merge");
                continue;
            }
            let artifact = ArtifactRef::new(rel);
            let outcome = self.merge_one(&artifact);
            tracing::debug!(
                source = %artifact.source_rel_path.display(),
                dest = %artifact.canonical_name,
                variant = ?artifact.variant,
                outcome = outcome.as_str(),
                "merged artifact"
            );
            summary.record(outcome);
        }
        tracing::info!(
            found = summary.found,
            new = summary.new,
            updated = summary.updated,
            skipped = summary.skipped,
            "index merge complete"
        );
        summary
    }

    fn merge_one(&self, artifact: &ArtifactRef) -> MergeOutcome {
        let source = self.repo_root.join(&artifact.source_rel_path);
        if !source.is_file() {
            tracing::warn!(path = %source.display(), "artifact vanished before merge");
            return MergeOutcome::Skipped;
        }
        let dest = self.index_root.join(&artifact.canonical_name);
        let outcome = if dest.exists() {
            MergeOutcome::Updated
        } else {
            MergeOutcome::New
        };
        match relocate(&source, &dest) {
            Ok(()) => outcome,
            Err(err) => {
                tracing::warn!(
                    source = %source.display(),
                    dest = %dest.display(),
                    error = %format!("{err:#}"),
                    "failed to relocate artifact"
                );
                MergeOutcome::Skipped
            }
        }
    }
}

/// Rename `source` onto `dest`, falling back to copy + remove when the two
/// live on different filesystems.
fn relocate(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    fs::copy(source, dest)
        .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;
    fs::remove_file(source).with_context(|| format!("remove {}", source.display()))?;
    Ok(())
}
