//! Locating and invoking the external documentation generator.
//!
//! The generator runs either from a container image or as a local
//! executable. When an invocation fails, the remaining strategies of the plan
//! are tried in order before phase A gives up.
use crate::collect::STANDARD_ARTIFACT_NAME;
use crate::config::{HookConfig, RunnerMode};
use crate::runner::{CommandRunner, CommandSpec};
use crate::targets::Scope;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::time::Instant;

/// Mount point of the repository inside the generator container.
pub const CONTAINER_WORKDIR: &str = "/workspace";
/// Asks the generator to document the whole tree.
pub const FULL_SCAN_FLAG: &str = "--full";

/// One way of launching the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Container { runtime: String, image: String },
    Local { program: String },
}

impl Backend {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Container { .. } => "container",
            Self::Local { .. } => "local",
        }
    }
}

/// How the repository root is spelled on the generator command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEncoding {
    Native,
    /// Backslashes rewritten to `/` for runtimes that reject Windows paths.
    ForwardSlash,
}

/// The strategy that produced artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub backend: Backend,
    pub encoding: PathEncoding,
}

/// Detected backends, in the order they are tried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorBackends {
    pub primary: Option<Backend>,
    pub alternate: Option<Backend>,
}

impl GeneratorBackends {
    /// Probe `PATH` for the configured container runtimes and executable.
    pub fn detect(config: &HookConfig) -> Self {
        Self::detect_with(config, |program| which::which(program).is_ok())
    }

    /// Detection with an explicit availability check.
    pub fn detect_with<F>(config: &HookConfig, available: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let container = || {
            config
                .container_runtimes
                .iter()
                .find(|runtime| available(runtime))
                .map(|runtime| Backend::Container {
                    runtime: runtime.clone(),
                    image: config.generator_image.clone(),
                })
        };
        let local = || {
            available(&config.generator_program).then(|| Backend::Local {
                program: config.generator_program.clone(),
            })
        };
        let backends = match config.runner_mode {
            RunnerMode::Disabled => Self::default(),
            RunnerMode::Container => Self {
                primary: container(),
                alternate: None,
            },
            RunnerMode::Local => Self {
                primary: local(),
                alternate: None,
            },
            RunnerMode::Auto => match (container(), local()) {
                (Some(container), local) => Self {
                    primary: Some(container),
                    alternate: local,
                },
                (None, local) => Self {
                    primary: local,
                    alternate: None,
                },
            },
        };
        tracing::debug!(
            mode = ?config.runner_mode,
            primary = backends.primary.as_ref().map(Backend::label),
            alternate = backends.alternate.as_ref().map(Backend::label),
            "generator backends"
        );
        backends
    }

    pub fn is_available(&self) -> bool {
        self.primary.is_some()
    }

    /// Strategies in the order they are attempted.
    pub fn invocation_plan(&self) -> Vec<Invocation> {
        let mut plan = Vec::new();
        if let Some(primary) = &self.primary {
            for encoding in [PathEncoding::Native, PathEncoding::ForwardSlash] {
                plan.push(Invocation {
                    backend: primary.clone(),
                    encoding,
                });
            }
        }
        if let Some(alternate) = &self.alternate {
            plan.push(Invocation {
                backend: alternate.clone(),
                encoding: PathEncoding::Native,
            });
        }
        plan
    }
}

/// Full argv for one invocation.
pub fn build_argv(invocation: &Invocation, root: &Path, scope: &Scope) -> Vec<String> {
    let root = encode_path(root, invocation.encoding);
    let mut argv = match &invocation.backend {
        Backend::Local { program } => vec![program.clone(), "--root".to_string(), root],
        Backend::Container { runtime, image } => vec![
            runtime.clone(),
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{root}:{CONTAINER_WORKDIR}"),
            "-w".to_string(),
            CONTAINER_WORKDIR.to_string(),
            image.clone(),
            "--root".to_string(),
            CONTAINER_WORKDIR.to_string(),
        ],
    };
    if scope.is_whole_tree() {
        argv.push(FULL_SCAN_FLAG.to_string());
    }
    argv.push("--output-name".to_string());
    argv.push(STANDARD_ARTIFACT_NAME.to_string());
    argv.extend(scope.generator_dirs());
    argv
}

fn encode_path(path: &Path, encoding: PathEncoding) -> String {
    let native = path.display().to_string();
    match encoding {
        PathEncoding::Native => native,
        PathEncoding::ForwardSlash => native.replace('\\', "/"),
    }
}

/// Run the plan until one invocation succeeds.
pub fn run_generator(
    runner: &CommandRunner,
    backends: &GeneratorBackends,
    root: &Path,
    scope: &Scope,
) -> Result<Invocation> {
    let mut tried: Vec<Vec<String>> = Vec::new();
    let mut last_error = None;
    for invocation in backends.invocation_plan() {
        let argv = build_argv(&invocation, root, scope);
        if tried.contains(&argv) {
            continue;
        }
        tried.push(argv.clone());
        let spec = CommandSpec::from_argv(argv).current_dir(root);
        let start = Instant::now();
        match runner.run_spec(&spec) {
            Ok(_) => {
                tracing::info!(
                    backend = invocation.backend.label(),
                    encoding = ?invocation.encoding,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "generator finished"
                );
                return Ok(invocation);
            }
            Err(err) => {
                tracing::warn!(
                    backend = invocation.backend.label(),
                    encoding = ?invocation.encoding,
                    error = %err,
                    "generator invocation failed, trying next strategy"
                );
                last_error = Some(err);
            }
        }
    }
    match last_error {
        Some(err) => Err(anyhow::Error::new(err).context(format!(
            "all {} generator invocation strategies failed",
            tried.len()
        ))),
        None => Err(anyhow!("no generator backend available")),
    }
}
