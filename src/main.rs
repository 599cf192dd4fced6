use anyhow::{Context, Result};
use clap::Parser;
use docmap_hook::cli::{Command, InstallArgs, RootArgs, StatusArgs};
use docmap_hook::generator::GeneratorBackends;
use docmap_hook::git::Git;
use docmap_hook::install::install_hooks;
use docmap_hook::logging;
use docmap_hook::shutdown;
use docmap_hook::status::StatusReport;
use docmap_hook::{CommandRunner, CommitCoordinator, HookConfig, LogLevel, RepoPaths};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    let cwd = std::env::current_dir().context("resolve current directory")?;
    match args.command {
        Command::PreCommit => {
            run_phase(&cwd, Phase::PreCommit);
            Ok(())
        }
        Command::PostCommit => {
            run_phase(&cwd, Phase::PostCommit);
            Ok(())
        }
        Command::Status(args) => cmd_status(&cwd, args),
        Command::Install(args) => cmd_install(&cwd, args),
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    PreCommit,
    PostCommit,
}

struct Session {
    config: HookConfig,
    paths: RepoPaths,
    runner: CommandRunner,
    git: Git,
    warnings: Vec<String>,
}

/// Locate the repository, load configuration, and start logging.
fn open_session(cwd: &Path) -> Result<Session> {
    let probe = CommandRunner::new(&HookConfig {
        max_retries: 1,
        ..HookConfig::default()
    });
    let root = Git::discover(probe, cwd)?.root().to_path_buf();
    let loaded = HookConfig::load(&root);
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = logging::init_tracing(loaded.config.log_level);
    for warning in &loaded.warnings {
        tracing::warn!(%warning, "configuration");
    }

    let config = loaded.config;
    let runner = CommandRunner::new(&config);
    let git = Git::new(runner.clone(), root.clone());
    let paths = match git.git_dir() {
        Ok(git_dir) => RepoPaths::new(root, git_dir, &config),
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "using default git dir");
            RepoPaths::with_default_git_dir(root, &config)
        }
    };
    Ok(Session {
        config,
        paths,
        runner,
        git,
        warnings: loaded.warnings,
    })
}

/// Run one hook phase. Never fails: git must not see a non-zero status.
fn run_phase(cwd: &Path, phase: Phase) {
    let session = match open_session(cwd) {
        Ok(session) => session,
        Err(err) => {
            let _ = logging::init_tracing(LogLevel::Info);
            tracing::warn!(
                error = %format!("{err:#}"),
                ?phase,
                "docmap-hook skipped for this commit"
            );
            return;
        }
    };
    shutdown::install(&session.paths.handoff_path());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut coordinator =
            CommitCoordinator::new(&session.config, session.paths.clone(), session.runner.clone());
        match phase {
            Phase::PreCommit => {
                coordinator.pre_commit();
            }
            Phase::PostCommit => {
                coordinator.post_commit();
            }
        }
    }));
    if outcome.is_err() {
        tracing::error!(?phase, "docmap-hook panicked; commit continues");
    }
}

fn cmd_status(cwd: &Path, args: StatusArgs) -> Result<()> {
    let session = open_session(cwd)?;
    let backends = GeneratorBackends::detect(&session.config);
    let report = StatusReport::collect(
        &session.config,
        &session.paths,
        &backends,
        session.warnings,
    );
    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize status report")?;
        println!("{text}");
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn cmd_install(cwd: &Path, args: InstallArgs) -> Result<()> {
    let session = open_session(cwd)?;
    let hooks_dir = session.git.hooks_dir()?;
    let binary = std::env::current_exe().context("resolve docmap-hook executable")?;
    for path in install_hooks(&hooks_dir, &binary, args.force)? {
        println!("wrote {}", path.display());
    }
    Ok(())
}
