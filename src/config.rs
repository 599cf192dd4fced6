//! Hook configuration.
//!
//! A `HookConfig` is assembled once per phase invocation from built-in
//! defaults, an optional `.docmap-hook.json` at the repository root, and
//! `DOCMAP_HOOK_*` environment overrides. It is never mutated afterwards;
//! components receive it by reference.
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Current schema version for `.docmap-hook.json`.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Config file name looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = ".docmap-hook.json";

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INDEX_DIR: &str = "docmap";
pub const DEFAULT_GENERATOR_PROGRAM: &str = "docmap";
pub const DEFAULT_GENERATOR_IMAGE: &str = "ghcr.io/docmap/docmap:latest";
pub const DEFAULT_COMMIT_MESSAGE_TEMPLATE: &str =
    "docs(docmap): update documentation index [{timestamp}]";
pub const DEFAULT_CONTAINER_RUNTIMES: [&str; 2] = ["docker", "podman"];

/// Placeholders understood by `render_commit_message`.
pub const TEMPLATE_PLACEHOLDERS: [&str; 2] = ["timestamp", "count"];

/// How the external generator is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerMode {
    /// Container runtime first, then the local executable.
    Auto,
    Container,
    Local,
    /// Never run the generator; phase A becomes a no-op.
    Disabled,
}

impl FromStr for RunnerMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "container" | "docker" => Ok(Self::Container),
            "local" => Ok(Self::Local),
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            other => Err(anyhow!("unknown runner mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string for `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Verbose levels let child processes write stderr straight to the terminal.
    pub fn is_verbose(self) -> bool {
        self >= Self::Debug
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(anyhow!("unknown log level {other:?}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

/// Effective configuration for one phase invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    /// Per-attempt wall-clock limit for every external command.
    pub timeout: Duration,
    /// Total attempts per command (0 behaves like 1).
    pub max_retries: u32,
    pub log_level: LogLevel,
    /// Commit the index in its own post-commit commit instead of the user's.
    pub separate_commits: bool,
    pub commit_message_template: String,
    pub runner_mode: RunnerMode,
    /// When non-empty, generation is limited to exactly these directories.
    pub target_directories: Vec<String>,
    /// Master index directory, relative to the repository root.
    pub index_dir: String,
    pub generator_program: String,
    pub generator_image: String,
    pub container_runtimes: Vec<String>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            log_level: LogLevel::Info,
            separate_commits: true,
            commit_message_template: DEFAULT_COMMIT_MESSAGE_TEMPLATE.to_string(),
            runner_mode: RunnerMode::Auto,
            target_directories: Vec::new(),
            index_dir: DEFAULT_INDEX_DIR.to_string(),
            generator_program: DEFAULT_GENERATOR_PROGRAM.to_string(),
            generator_image: DEFAULT_GENERATOR_IMAGE.to_string(),
            container_runtimes: DEFAULT_CONTAINER_RUNTIMES
                .iter()
                .map(|runtime| runtime.to_string())
                .collect(),
        }
    }
}

/// On-disk shape of `.docmap-hook.json`; every field is optional.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    schema_version: u32,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    log_level: Option<LogLevel>,
    #[serde(default)]
    separate_commits: Option<bool>,
    #[serde(default)]
    commit_message_template: Option<String>,
    #[serde(default)]
    runner_mode: Option<RunnerMode>,
    #[serde(default)]
    target_directories: Option<Vec<String>>,
    #[serde(default)]
    index_dir: Option<String>,
    #[serde(default)]
    generator_program: Option<String>,
    #[serde(default)]
    generator_image: Option<String>,
    #[serde(default)]
    container_runtimes: Option<Vec<String>>,
}

/// Configuration plus the non-fatal problems found while assembling it.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: HookConfig,
    pub warnings: Vec<String>,
}

impl HookConfig {
    /// Assemble the configuration for `repo_root` from the process environment.
    ///
    /// Never fails: an unreadable or invalid config file is reported as a
    /// warning and the remaining layers still apply.
    pub fn load(repo_root: &Path) -> LoadedConfig {
        Self::load_with_env(repo_root, |key| std::env::var(key).ok())
    }

    /// Same as [`HookConfig::load`] with an explicit environment lookup.
    pub fn load_with_env<F>(repo_root: &Path, lookup: F) -> LoadedConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = HookConfig::default();
        let mut warnings = Vec::new();
        let path = repo_root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            match read_config_file(&path) {
                Ok(file) => config.apply_file(file),
                Err(err) => warnings.push(format!(
                    "ignoring {}: {err:#}",
                    path.display()
                )),
            }
        }
        warnings.extend(config.apply_env(lookup));
        if let Err(err) = validate_config(&config) {
            warnings.push(format!("invalid configuration, using defaults: {err:#}"));
            config = HookConfig::default();
        }
        LoadedConfig { config, warnings }
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(secs) = file.timeout_secs {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = file.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        if let Some(separate) = file.separate_commits {
            self.separate_commits = separate;
        }
        if let Some(template) = file.commit_message_template {
            self.commit_message_template = template;
        }
        if let Some(mode) = file.runner_mode {
            self.runner_mode = mode;
        }
        if let Some(dirs) = file.target_directories {
            self.target_directories = dirs;
        }
        if let Some(index_dir) = file.index_dir {
            self.index_dir = index_dir;
        }
        if let Some(program) = file.generator_program {
            self.generator_program = program;
        }
        if let Some(image) = file.generator_image {
            self.generator_image = image;
        }
        if let Some(runtimes) = file.container_runtimes {
            self.container_runtimes = runtimes;
        }
    }

    fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let mut bad = |key: &str, value: &str, err: &dyn fmt::Display| {
            warnings.push(format!("ignoring {key}={value:?}: {err}"));
        };

        if let Some(value) = lookup("DOCMAP_HOOK_TIMEOUT_SECS") {
            match value.trim().parse::<u64>() {
                Ok(secs) => self.timeout = Duration::from_secs(secs),
                Err(err) => bad("DOCMAP_HOOK_TIMEOUT_SECS", &value, &err),
            }
        }
        if let Some(value) = lookup("DOCMAP_HOOK_MAX_RETRIES") {
            match value.trim().parse::<u32>() {
                Ok(max_retries) => self.max_retries = max_retries,
                Err(err) => bad("DOCMAP_HOOK_MAX_RETRIES", &value, &err),
            }
        }
        if let Some(value) = lookup("DOCMAP_HOOK_LOG_LEVEL") {
            match value.parse::<LogLevel>() {
                Ok(level) => self.log_level = level,
                Err(err) => bad("DOCMAP_HOOK_LOG_LEVEL", &value, &err),
            }
        }
        if let Some(value) = lookup("DOCMAP_HOOK_SEPARATE_COMMITS") {
            match parse_bool(&value) {
                Some(separate) => self.separate_commits = separate,
                None => bad("DOCMAP_HOOK_SEPARATE_COMMITS", &value, &"expected a boolean"),
            }
        }
        if let Some(value) = lookup("DOCMAP_HOOK_RUNNER") {
            match value.parse::<RunnerMode>() {
                Ok(mode) => self.runner_mode = mode,
                Err(err) => bad("DOCMAP_HOOK_RUNNER", &value, &err),
            }
        }
        if let Some(value) = lookup("DOCMAP_HOOK_TARGETS") {
            self.target_directories = value
                .split(',')
                .map(str::trim)
                .filter(|dir| !dir.is_empty())
                .map(str::to_string)
                .collect();
        }
        warnings
    }

    /// Commit message for the separate index commit.
    pub fn commit_message(&self, timestamp: &str, count: usize) -> String {
        render_commit_message(&self.commit_message_template, timestamp, count)
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let file: ConfigFile = serde_json::from_slice(&bytes).context("parse config JSON")?;
    if file.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported schema_version {} (expected {})",
            file.schema_version,
            CONFIG_SCHEMA_VERSION
        ));
    }
    Ok(file)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Check invariants the rest of the hook relies on.
pub fn validate_config(config: &HookConfig) -> Result<()> {
    if config.timeout.is_zero() {
        return Err(anyhow!("timeout_secs must be at least 1"));
    }
    let index_dir = config.index_dir.trim_matches('/');
    if index_dir.is_empty() || index_dir == "." {
        return Err(anyhow!("index_dir must name a subdirectory"));
    }
    if Path::new(index_dir).is_absolute() || index_dir.split('/').any(|part| part == "..") {
        return Err(anyhow!("index_dir must stay inside the repository"));
    }
    if config.commit_message_template.trim().is_empty() {
        return Err(anyhow!("commit_message_template is empty"));
    }
    let placeholder = Regex::new(r"\{([A-Za-z_]+)\}").context("compile placeholder regex")?;
    for capture in placeholder.captures_iter(&config.commit_message_template) {
        let name = &capture[1];
        if !TEMPLATE_PLACEHOLDERS.contains(&name) {
            return Err(anyhow!(
                "commit_message_template uses unknown placeholder {{{name}}}"
            ));
        }
    }
    if config.generator_program.trim().is_empty() {
        return Err(anyhow!("generator_program is empty"));
    }
    Ok(())
}

/// Substitute `{timestamp}` and `{count}` in a commit message template.
pub fn render_commit_message(template: &str, timestamp: &str, count: usize) -> String {
    template
        .replace("{timestamp}", timestamp)
        .replace("{count}", &count.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = HookConfig::load_with_env(dir.path(), env_from(&[]));
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.config, HookConfig::default());
        assert_eq!(loaded.config.max_retries, 3);
        assert!(loaded.config.separate_commits);
    }

    #[test]
    fn file_then_env_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{
  "schema_version": 1,
  "timeout_secs": 20,
  "max_retries": 5,
  "separate_commits": false,
  "runner_mode": "local",
  "target_directories": ["src/app"]
}"#,
        )
        .expect("write config");
        let loaded = HookConfig::load_with_env(
            dir.path(),
            env_from(&[
                ("DOCMAP_HOOK_MAX_RETRIES", "2"),
                ("DOCMAP_HOOK_LOG_LEVEL", "debug"),
            ]),
        );
        assert!(loaded.warnings.is_empty(), "{:?}", loaded.warnings);
        let config = loaded.config;
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!config.separate_commits);
        assert_eq!(config.runner_mode, RunnerMode::Local);
        assert_eq!(config.target_directories, vec!["src/app".to_string()]);
    }

    #[test]
    fn unknown_field_is_reported_and_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"schema_version": 1, "colour": "blue"}"#,
        )
        .expect("write config");
        let loaded = HookConfig::load_with_env(dir.path(), env_from(&[]));
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("ignoring"));
        assert_eq!(loaded.config, HookConfig::default());
    }

    #[test]
    fn bad_env_values_are_warnings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = HookConfig::load_with_env(
            dir.path(),
            env_from(&[
                ("DOCMAP_HOOK_TIMEOUT_SECS", "soon"),
                ("DOCMAP_HOOK_SEPARATE_COMMITS", "maybe"),
                ("DOCMAP_HOOK_TARGETS", "src, ,lib"),
            ]),
        );
        assert_eq!(loaded.warnings.len(), 2);
        assert_eq!(
            loaded.config.timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(
            loaded.config.target_directories,
            vec!["src".to_string(), "lib".to_string()]
        );
    }

    #[test]
    fn unknown_placeholder_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"schema_version": 1, "commit_message_template": "docs {author}",
                "max_retries": 9}"#,
        )
        .expect("write config");
        let loaded = HookConfig::load_with_env(dir.path(), env_from(&[]));
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("{author}"));
        assert_eq!(loaded.config.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = HookConfig::load_with_env(
            dir.path(),
            env_from(&[("DOCMAP_HOOK_TIMEOUT_SECS", "0")]),
        );
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("timeout_secs"));
        assert_eq!(
            loaded.config.timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn index_dir_must_stay_inside_repo() {
        let config = HookConfig {
            index_dir: "../elsewhere".to_string(),
            ..HookConfig::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn commit_message_renders_placeholders() {
        let message = render_commit_message(
            "docs: {count} artifacts at {timestamp}",
            "2024-05-01T10:00:00Z",
            4,
        );
        assert_eq!(message, "docs: 4 artifacts at 2024-05-01T10:00:00Z");
    }

    #[test]
    fn log_level_ordering_drives_verbosity() {
        assert!(!LogLevel::Info.is_verbose());
        assert!(LogLevel::Debug.is_verbose());
        assert_eq!("WARNING".parse::<LogLevel>().expect("parse"), LogLevel::Warn);
    }
}
