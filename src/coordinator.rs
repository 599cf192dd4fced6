//! The two-phase commit protocol.
//!
//! Phase A (pre-commit) regenerates artifacts, folds them into the master
//! index, and either stages the index with the user's commit or leaves a
//! handoff record for phase B. Phase B (post-commit) commits the index on its
//! own. Neither phase ever fails the surrounding git operation: every error
//! is logged with a remediation hint and the phase reports success.
use crate::collect::ArtifactCollector;
use crate::config::HookConfig;
use crate::generator::{run_generator, GeneratorBackends};
use crate::git::{Git, NESTED_COMMIT_ENV};
use crate::handoff::{now_timestamp, HandoffMetadata, HandoffStore};
use crate::merge::{IndexMerger, MergeSummary};
use crate::paths::RepoPaths;
use crate::runner::CommandRunner;
use crate::shutdown::HandoffGuard;
use crate::targets::{Scope, TargetResolver};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// Where a hook phase currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Idle,
    Generating,
    StagedForHandoff,
    StagedWithPrimary,
    Committed,
    Abandoned,
}

impl PhaseState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::StagedForHandoff => "staged_for_handoff",
            Self::StagedWithPrimary => "staged_with_primary",
            Self::Committed => "committed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What phase A did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreCommitReport {
    /// State phase A settled in before returning to idle.
    pub state: PhaseState,
    pub scope: Option<Scope>,
    pub summary: MergeSummary,
}

/// True inside the index commit issued by phase B.
pub fn is_nested_commit() -> bool {
    std::env::var_os(NESTED_COMMIT_ENV).is_some_and(|value| !value.is_empty())
}

/// Drives one hook phase against a single repository.
pub struct CommitCoordinator<'a> {
    config: &'a HookConfig,
    paths: RepoPaths,
    git: Git,
    handoff: HandoffStore,
    backends: GeneratorBackends,
    state: PhaseState,
}

impl<'a> CommitCoordinator<'a> {
    pub fn new(config: &'a HookConfig, paths: RepoPaths, runner: CommandRunner) -> Self {
        let backends = GeneratorBackends::detect(config);
        Self::with_backends(config, paths, runner, backends)
    }

    pub fn with_backends(
        config: &'a HookConfig,
        paths: RepoPaths,
        runner: CommandRunner,
        backends: GeneratorBackends,
    ) -> Self {
        let git = Git::new(runner, paths.root().to_path_buf());
        let handoff = HandoffStore::new(paths.handoff_path());
        Self {
            config,
            paths,
            git,
            handoff,
            backends,
            state: PhaseState::Idle,
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn handoff(&self) -> &HandoffStore {
        &self.handoff
    }

    fn transition(&mut self, next: PhaseState) {
        tracing::info!(from = self.state.as_str(), state = next.as_str(), "phase transition");
        self.state = next;
    }

    fn remediation_hint(&self) -> String {
        format!("commit {}/ manually", self.paths.index_rel())
    }

    /// Phase A. Always returns a report; failures end in `Idle`.
    pub fn pre_commit(&mut self) -> PreCommitReport {
        let start = Instant::now();
        if is_nested_commit() {
            tracing::debug!("nested index commit, skipping generation");
            return self.report(PhaseState::Idle, None, MergeSummary::default());
        }
        self.transition(PhaseState::Generating);
        // A record left by an aborted commit belongs to an earlier pass.
        if self.handoff.delete() {
            tracing::info!(
                path = %self.handoff.path().display(),
                "discarded stale handoff record"
            );
        }
        let report = match self.generate_and_merge() {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(
                    error = %format!("{err:#}"),
                    hint = %self.remediation_hint(),
                    "pre-commit documentation pass failed; commit continues"
                );
                self.handoff.delete();
                self.report(PhaseState::Idle, None, MergeSummary::default())
            }
        };
        if report.state != PhaseState::Idle {
            self.transition(PhaseState::Idle);
        }
        tracing::info!(
            state = report.state.as_str(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pre-commit finished"
        );
        report
    }

    fn report(
        &mut self,
        state: PhaseState,
        scope: Option<Scope>,
        summary: MergeSummary,
    ) -> PreCommitReport {
        if self.state != state {
            self.transition(state);
        }
        PreCommitReport {
            state,
            scope,
            summary,
        }
    }

    fn generate_and_merge(&mut self) -> Result<PreCommitReport> {
        if !self.backends.is_available() {
            tracing::warn!(
                mode = ?self.config.runner_mode,
                "no documentation generator available; skipping"
            );
            return Ok(self.report(PhaseState::Idle, None, MergeSummary::default()));
        }

        let scope = TargetResolver::new(&self.config.target_directories, &self.paths)
            .resolve(&self.git);
        tracing::info!(scope = ?scope, "resolved generation scope");

        let generated = run_generator(
            self.git.runner(),
            &self.backends,
            self.paths.root(),
            &scope,
        );
        if let Err(err) = generated {
            tracing::warn!(
                error = %format!("{err:#}"),
                "documentation generator failed; commit continues without index update"
            );
            return Ok(self.report(PhaseState::Idle, Some(scope), MergeSummary::default()));
        }

        let root = self.paths.root();
        let artifacts = ArtifactCollector::new(self.paths.index_rel()).collect(root);
        let summary = IndexMerger::new(root, self.paths.index_rel()).merge(&artifacts);
        if summary.merged() == 0 {
            tracing::info!(found = summary.found, "no artifacts merged; nothing to commit");
            return Ok(self.report(PhaseState::Idle, Some(scope), summary));
        }

        if self.config.separate_commits {
            let timestamp = now_timestamp();
            let message = self.config.commit_message(&timestamp, summary.merged());
            let metadata = HandoffMetadata::at(timestamp, message, true);
            self.handoff.write(&metadata).context("write handoff record")?;
            tracing::info!(
                path = %self.handoff.path().display(),
                "handoff recorded for post-commit"
            );
            Ok(self.report(PhaseState::StagedForHandoff, Some(scope), summary))
        } else {
            self.git
                .stage(self.paths.index_rel())
                .context("stage master index with the primary commit")?;
            Ok(self.report(PhaseState::StagedWithPrimary, Some(scope), summary))
        }
    }

    /// Phase B. The handoff record is gone when this returns, whatever the
    /// outcome.
    pub fn post_commit(&mut self) -> PhaseState {
        if is_nested_commit() {
            tracing::debug!("nested index commit, nothing to do");
            return PhaseState::Idle;
        }
        let store = self.handoff.clone();
        let _guard = HandoffGuard::new(&store);

        let outcome = match store.load() {
            None => {
                tracing::debug!("no pending handoff");
                PhaseState::Abandoned
            }
            Some(metadata) if !metadata.has_artifacts => {
                tracing::debug!("handoff has no artifacts");
                PhaseState::Abandoned
            }
            Some(metadata) => match self.commit_index(&metadata) {
                Ok(()) => PhaseState::Committed,
                Err(err) => {
                    tracing::warn!(
                        error = %format!("{err:#}"),
                        hint = %self.remediation_hint(),
                        "separate index commit failed"
                    );
                    PhaseState::Abandoned
                }
            },
        };
        self.transition(outcome);
        self.transition(PhaseState::Idle);
        outcome
    }

    fn commit_index(&self, metadata: &HandoffMetadata) -> Result<()> {
        let index = self.paths.index_rel();
        self.git.stage(index).context("stage master index")?;
        let staged = self.git.staged_in(index).context("verify staged index")?;
        if staged.is_empty() {
            return Err(anyhow!("nothing staged under {index}/ after git add"));
        }
        self.git
            .commit_paths(&metadata.commit_message, index)
            .context("commit master index")?;
        tracing::info!(files = staged.len(), message = %metadata.commit_message, "index committed");
        Ok(())
    }
}
