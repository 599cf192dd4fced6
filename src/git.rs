//! Thin git wrappers. Git is driven as an opaque command through
//! [`CommandRunner`]; only its stdout and exit status are consumed.
use crate::runner::{CommandRunner, CommandSpec};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Set on the nested index commit so our own post-commit hook stands down.
pub const NESTED_COMMIT_ENV: &str = "DOCMAP_HOOK_NESTED";

/// Git commands rooted at one worktree.
#[derive(Debug, Clone)]
pub struct Git {
    runner: CommandRunner,
    root: PathBuf,
}

impl Git {
    pub fn new(runner: CommandRunner, root: PathBuf) -> Self {
        Self { runner, root }
    }

    /// Resolve the worktree root containing `cwd`.
    pub fn discover(runner: CommandRunner, cwd: &Path) -> Result<Self> {
        let spec = CommandSpec::from_argv(["git", "rev-parse", "--show-toplevel"]).current_dir(cwd);
        let stdout = runner
            .run_spec(&spec)
            .with_context(|| format!("locate repository from {}", cwd.display()))?;
        let root = stdout.trim();
        if root.is_empty() {
            return Err(anyhow!("git rev-parse returned an empty toplevel"));
        }
        Ok(Self::new(runner, PathBuf::from(root)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv = std::iter::once("git".to_string()).chain(args.into_iter().map(Into::into));
        CommandSpec::from_argv(argv).current_dir(&self.root)
    }

    fn run(&self, spec: &CommandSpec) -> Result<String> {
        self.runner
            .run_spec(spec)
            .with_context(|| format!("run {}", spec.display()))
    }

    /// Absolute git directory (handles worktrees and `GIT_DIR`).
    pub fn git_dir(&self) -> Result<PathBuf> {
        let stdout = self.run(&self.command(["rev-parse", "--absolute-git-dir"]))?;
        Ok(PathBuf::from(stdout.trim()))
    }

    /// Directory git runs hooks from, honoring `core.hooksPath`.
    pub fn hooks_dir(&self) -> Result<PathBuf> {
        let stdout = self.run(&self.command(["rev-parse", "--git-path", "hooks"]))?;
        let path = PathBuf::from(stdout.trim());
        Ok(if path.is_absolute() {
            path
        } else {
            self.root.join(path)
        })
    }

    /// Paths added, copied, modified, or renamed in the index.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let stdout = self.run(&self.command([
            "diff",
            "--cached",
            "--name-only",
            "--diff-filter=ACMR",
            "-z",
        ]))?;
        Ok(split_nul(&stdout))
    }

    /// Staged paths restricted to `pathspec`.
    pub fn staged_in(&self, pathspec: &str) -> Result<Vec<String>> {
        let stdout = self.run(&self.command([
            "diff",
            "--cached",
            "--name-only",
            "-z",
            "--",
            pathspec,
        ]))?;
        Ok(split_nul(&stdout))
    }

    /// Stage additions, modifications, and removals under `pathspec`.
    pub fn stage(&self, pathspec: &str) -> Result<()> {
        self.run(&self.command(["add", "-A", "--", pathspec]))?;
        Ok(())
    }

    /// Commit only `pathspec`, skipping commit hooks other than post-commit.
    pub fn commit_paths(&self, message: &str, pathspec: &str) -> Result<()> {
        let spec = self
            .command(["commit", "--no-verify", "-m", message, "--", pathspec])
            .env(NESTED_COMMIT_ENV, "1");
        self.run(&spec)?;
        Ok(())
    }
}

fn split_nul(stdout: &str) -> Vec<String> {
    stdout
        .split('\0')
        .map(|entry| entry.trim_matches('\n'))
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
