//! Pre/post-commit hook pair that regenerates documentation artifacts, folds
//! them into a flat master index, and commits the index separately from the
//! user's own commit.
//!
//! Phase A (`pre-commit`) generates and merges; phase B (`post-commit`) stages
//! and commits. The two processes cooperate through a small handoff record
//! stored inside the repository's git directory.
pub mod cli;
pub mod collect;
pub mod config;
pub mod coordinator;
pub mod generator;
pub mod git;
pub mod handoff;
pub mod install;
pub mod logging;
pub mod merge;
pub mod paths;
pub mod runner;
pub mod shutdown;
pub mod status;
pub mod targets;
pub mod transform;
pub mod util;
pub mod walk;

pub use config::{HookConfig, LogLevel, RunnerMode};
pub use coordinator::{CommitCoordinator, PhaseState, PreCommitReport};
pub use handoff::{HandoffMetadata, HandoffStore};
pub use merge::MergeSummary;
pub use paths::RepoPaths;
pub use runner::{CommandError, CommandRunner, CommandSpec};
pub use targets::Scope;
