//! CLI argument parsing.
//!
//! The phase subcommands take no arguments: git invokes them directly and all
//! tunables come from the configuration file and environment.
use clap::{Parser, Subcommand};

/// Top-level arguments for `docmap-hook`.
#[derive(Parser, Debug)]
#[command(
    name = "docmap-hook",
    version,
    about = "Regenerate the docmap index on commit and commit it separately",
    after_help = "Commands:\n  pre-commit            Generate artifacts and merge them into the index\n  post-commit           Commit the index recorded by pre-commit\n  status [--json]       Show index size and any pending handoff\n  install [--force]     Write pre-commit and post-commit hook scripts\n\nExamples:\n  docmap-hook install\n  docmap-hook status --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Hook phases and maintenance commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Phase A: regenerate artifacts and fold them into the master index
    PreCommit,
    /// Phase B: commit the master index on its own
    PostCommit,
    /// Show master index and handoff state
    Status(StatusArgs),
    /// Install the pre-commit and post-commit hook scripts
    Install(InstallArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Show master index and handoff state")]
pub struct StatusArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Install the git hook scripts")]
pub struct InstallArgs {
    /// Overwrite hook scripts not written by docmap-hook
    #[arg(long)]
    pub force: bool,
}
