//! Typed paths into a repository using the hook.
//!
//! Centralizing path construction keeps both phases agreeing on where the
//! master index and the handoff record live.
use crate::config::{HookConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Directory inside the git dir reserved for hook state.
pub const STATE_DIR_NAME: &str = "docmap-hook";
/// Handoff record file name inside [`STATE_DIR_NAME`].
pub const HANDOFF_FILE_NAME: &str = "handoff.json";

#[derive(Debug, Clone)]
pub struct RepoPaths {
    root: PathBuf,
    git_dir: PathBuf,
    index_dir: String,
}

impl RepoPaths {
    /// Build paths for a worktree root and its resolved git directory.
    pub fn new(root: PathBuf, git_dir: PathBuf, config: &HookConfig) -> Self {
        Self {
            root,
            git_dir,
            index_dir: config.index_dir.trim_matches('/').to_string(),
        }
    }

    /// Assume a plain `<root>/.git` layout; used when git cannot be queried.
    pub fn with_default_git_dir(root: PathBuf, config: &HookConfig) -> Self {
        let git_dir = root.join(".git");
        Self::new(root, git_dir, config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Master index path relative to the root, `/`-separated.
    pub fn index_rel(&self) -> &str {
        &self.index_dir
    }

    /// Absolute master index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.root.join(&self.index_dir)
    }

    /// Private state directory inside the git dir.
    pub fn state_dir(&self) -> PathBuf {
        self.git_dir.join(STATE_DIR_NAME)
    }

    pub fn handoff_path(&self) -> PathBuf {
        self.state_dir().join(HANDOFF_FILE_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_lives_under_git_dir() {
        let config = HookConfig {
            index_dir: "/docs/index/".to_string(),
            ..HookConfig::default()
        };
        let paths = RepoPaths::with_default_git_dir(PathBuf::from("/repo"), &config);
        assert_eq!(paths.index_rel(), "docs/index");
        assert_eq!(paths.index_dir(), PathBuf::from("/repo/docs/index"));
        assert_eq!(
            paths.handoff_path(),
            PathBuf::from("/repo/.git/docmap-hook/handoff.json")
        );
    }
}
