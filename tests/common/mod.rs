//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use docmap_hook::{HookConfig, RepoPaths, RunnerMode};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Generator stand-in: writes one artifact into every requested directory.
const STUB_GENERATOR: &str = r#"#!/bin/sh
root=.
name=docmap.json
while [ $# -gt 0 ]; do
  case "$1" in
    --root) root="$2"; shift 2 ;;
    --output-name) name="$2"; shift 2 ;;
    --full) echo full > "$root/.stub-full-scan"; shift ;;
    *) mkdir -p "$root/$1"; printf '{"dir":"%s"}\n' "$1" > "$root/$1/$name"; shift ;;
  esac
done
"#;

/// Scratch git repository plus a directory for helper scripts.
pub struct TestRepo {
    repo: TempDir,
    tools: TempDir,
}

pub fn git_available() -> bool {
    let available = Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success());
    if !available {
        eprintln!("Skipping: git not available");
    }
    available
}

impl TestRepo {
    /// Initialize a repository, or `None` when git is missing.
    pub fn init() -> Option<Self> {
        if !git_available() {
            return None;
        }
        let repo = Self {
            repo: tempfile::tempdir().expect("repo tempdir"),
            tools: tempfile::tempdir().expect("tools tempdir"),
        };
        repo.git(&["init", "-q"]);
        repo.git(&["config", "user.name", "Docmap Test"]);
        repo.git(&["config", "user.email", "docmap@example.invalid"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        // Keep hooks from the developer's global config out of the way.
        let hooks = repo.tools.path().join("hooks");
        repo.git(&["config", "core.hooksPath", &hooks.display().to_string()]);
        Some(repo)
    }

    pub fn root(&self) -> PathBuf {
        self.repo
            .path()
            .canonicalize()
            .expect("canonical repo root")
    }

    pub fn hooks_dir(&self) -> PathBuf {
        self.tools.path().join("hooks")
    }

    /// Run git in the repository and return stdout; panics on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.repo.path())
            .env_remove("DOCMAP_HOOK_NESTED")
            .output()
            .expect("spawn git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.repo.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, contents).expect("write file");
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.repo.path().join(rel).exists()
    }

    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// Write an executable script into the tools directory.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.tools.path().join(name);
        fs::write(&path, body).expect("write script");
        make_executable(&path);
        path
    }

    pub fn stub_generator(&self) -> PathBuf {
        self.script("stub-generator", STUB_GENERATOR)
    }

    /// Local-runner config pointing at `program`, with a single attempt.
    pub fn config(&self, program: &Path, separate_commits: bool) -> HookConfig {
        HookConfig {
            max_retries: 1,
            separate_commits,
            runner_mode: RunnerMode::Local,
            generator_program: program.display().to_string(),
            ..HookConfig::default()
        }
    }

    pub fn paths(&self, config: &HookConfig) -> RepoPaths {
        RepoPaths::with_default_git_dir(self.root(), config)
    }

    pub fn staged(&self) -> Vec<String> {
        lines(&self.git(&["diff", "--cached", "--name-only"]))
    }

    pub fn commit_subjects(&self) -> Vec<String> {
        lines(&self.git(&["log", "--format=%s"]))
    }

    pub fn files_in_commit(&self, rev: &str) -> Vec<String> {
        lines(&self.git(&["show", "--name-only", "--format=", rev]))
    }
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
