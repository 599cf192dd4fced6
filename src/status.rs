//! Read-only summary of hook state for `docmap-hook status`.
use crate::config::HookConfig;
use crate::generator::{Backend, GeneratorBackends};
use crate::handoff::{HandoffMetadata, HandoffStore};
use crate::paths::RepoPaths;
use crate::walk::{walk_files, AllFiles};
use serde::Serialize;
use std::fmt::Write as _;

pub const STATUS_SCHEMA_VERSION: u32 = 1;

/// Output of `docmap-hook status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub schema_version: u32,
    pub repo_root: String,
    pub index_dir: String,
    pub index_files: usize,
    pub pending_handoff: Option<HandoffMetadata>,
    pub separate_commits: bool,
    pub generator: Option<String>,
    pub handoff_path: String,
    pub config_file: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl StatusReport {
    pub fn collect(
        config: &HookConfig,
        paths: &RepoPaths,
        backends: &GeneratorBackends,
        warnings: Vec<String>,
    ) -> Self {
        let index_files = walk_files(&paths.index_dir(), &AllFiles).len();
        let handoff = HandoffStore::new(paths.handoff_path());
        Self {
            schema_version: STATUS_SCHEMA_VERSION,
            repo_root: paths.root().display().to_string(),
            index_dir: paths.index_rel().to_string(),
            index_files,
            pending_handoff: handoff.load(),
            separate_commits: config.separate_commits,
            generator: backends.primary.as_ref().map(describe_backend),
            handoff_path: paths.handoff_path().display().to_string(),
            config_file: Some(paths.config_path())
                .filter(|path| path.is_file())
                .map(|path| path.display().to_string()),
            warnings,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "repository: {}", self.repo_root);
        let _ = writeln!(out, "index: {}/ ({} files)", self.index_dir, self.index_files);
        let _ = writeln!(
            out,
            "generator: {}",
            self.generator.as_deref().unwrap_or("none (generation skipped)")
        );
        let mode = if self.separate_commits {
            "separate commit"
        } else {
            "with primary commit"
        };
        let _ = writeln!(out, "index commits: {mode}");
        let _ = writeln!(
            out,
            "config: {}",
            self.config_file.as_deref().unwrap_or("defaults")
        );
        match &self.pending_handoff {
            Some(pending) => {
                let _ = writeln!(
                    out,
                    "pending handoff: {} (artifacts: {})",
                    pending.timestamp, pending.has_artifacts
                );
                let _ = writeln!(out, "  message: {}", pending.commit_message);
            }
            None => {
                let _ = writeln!(out, "pending handoff: none");
            }
        }
        for warning in &self.warnings {
            let _ = writeln!(out, "warning: {warning}");
        }
        out
    }
}

fn describe_backend(backend: &Backend) -> String {
    match backend {
        Backend::Container { runtime, image } => format!("{runtime} ({image})"),
        Backend::Local { program } => program.clone(),
    }
}
