//! Bounded, retried execution of external commands.
//!
//! Every external collaborator (git, the generator, container runtimes) is
//! driven through [`CommandRunner`]. Each attempt is synchronous and limited
//! by the configured timeout; failed attempts back off exponentially with a
//! blocking sleep before the next try.
use crate::config::HookConfig;
use crate::util::{trimmed_output, truncate_string};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Delay before the second attempt; doubles for every further attempt.
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_ERROR_OUTPUT_BYTES: usize = 2048;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid command {command:?}: {reason}")]
    Invalid { command: String, reason: String },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to capture output of {program}: {source}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} timed out after {}ms", .timeout.as_millis())]
    Timeout { program: String, timeout: Duration },
    #[error("{program} exited with {status}{}", stderr_suffix(.stderr))]
    NonZeroExit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        command: String,
        attempts: u32,
        last_error: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl CommandError {
    /// Transient errors are retried; everything else ends the attempt loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. }
                | Self::Capture { .. }
                | Self::Timeout { .. }
                | Self::NonZeroExit { .. }
        )
    }
}

/// An argv plus the process context it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Split a command string with shell quoting rules; no shell is involved.
    pub fn parse(command: &str) -> Result<Self, CommandError> {
        let argv = shell_words::split(command).map_err(|err| CommandError::Invalid {
            command: command.to_string(),
            reason: err.to_string(),
        })?;
        if argv.is_empty() {
            return Err(CommandError::Invalid {
                command: command.to_string(),
                reason: "command is empty".to_string(),
            });
        }
        Ok(Self::from_argv(argv))
    }

    pub fn from_argv<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Shell-quoted rendering for logs and error messages.
    pub fn display(&self) -> String {
        shell_words::join(&self.argv)
    }
}

/// Executes commands with a per-attempt timeout and an attempt budget.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
    max_attempts: u32,
    backoff_base: Duration,
    capture_stderr: bool,
}

impl CommandRunner {
    pub fn new(config: &HookConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_attempts: config.max_retries.max(1),
            backoff_base: BACKOFF_BASE,
            capture_stderr: !config.log_level.is_verbose(),
        }
    }

    /// Override the backoff base (tests use milliseconds).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Parse and run a command string, returning captured stdout.
    pub fn run(&self, command: &str) -> Result<String, CommandError> {
        let spec = CommandSpec::parse(command)?;
        self.run_spec(&spec)
    }

    /// Run `spec` until it succeeds or the attempt budget is spent.
    pub fn run_spec(&self, spec: &CommandSpec) -> Result<String, CommandError> {
        if spec.argv.is_empty() {
            return Err(CommandError::Invalid {
                command: String::new(),
                reason: "command is empty".to_string(),
            });
        }
        let command = spec.display();
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            let start = Instant::now();
            match self.run_once(spec) {
                Ok(stdout) => {
                    tracing::debug!(
                        command = %command,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        stdout_bytes = stdout.len(),
                        "command succeeded"
                    );
                    return Ok(stdout);
                }
                Err(err) => {
                    tracing::warn!(
                        command = %command,
                        attempt,
                        attempts = self.max_attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %err,
                        "command attempt failed"
                    );
                    let transient = err.is_transient();
                    last_error = err.to_string();
                    if !transient {
                        return Err(err);
                    }
                }
            }
            if attempt < self.max_attempts {
                thread::sleep(backoff_delay(self.backoff_base, attempt));
            }
        }
        Err(CommandError::Exhausted {
            command,
            attempts: self.max_attempts,
            last_error,
        })
    }

    fn run_once(&self, spec: &CommandSpec) -> Result<String, CommandError> {
        let program = spec.program().to_string();
        let capture_err = |source: io::Error| CommandError::Capture {
            program: program.clone(),
            source,
        };

        // Output goes to anonymous temp files so a chatty child can never
        // block on a full pipe while we poll for its exit.
        let mut stdout_file = tempfile::tempfile().map_err(capture_err)?;
        let mut stderr_file = tempfile::tempfile().map_err(capture_err)?;

        let mut command = Command::new(&program);
        command
            .args(&spec.argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone().map_err(capture_err)?));
        if self.capture_stderr {
            command.stderr(Stdio::from(stderr_file.try_clone().map_err(capture_err)?));
        } else {
            command.stderr(Stdio::inherit());
        }
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?;
        let status = self.wait_with_timeout(&mut child, &program)?;

        let stdout = read_capture(&mut stdout_file).map_err(capture_err)?;
        if status.success() {
            return Ok(String::from_utf8_lossy(&stdout).into_owned());
        }
        let stderr = if self.capture_stderr {
            let bytes = read_capture(&mut stderr_file).map_err(capture_err)?;
            truncate_string(&trimmed_output(&bytes), MAX_ERROR_OUTPUT_BYTES)
        } else {
            String::new()
        };
        Err(CommandError::NonZeroExit {
            program,
            status,
            stderr,
        })
    }

    fn wait_with_timeout(
        &self,
        child: &mut Child,
        program: &str,
    ) -> Result<ExitStatus, CommandError> {
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CommandError::Timeout {
                            program: program.to_string(),
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    return Err(CommandError::Capture {
                        program: program.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

/// Delay after the given failed attempt (1-based): `base * 2^(attempt - 1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

fn read_capture(file: &mut File) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(all(test, unix))]
#[path = "runner_tests.rs"]
mod tests;
