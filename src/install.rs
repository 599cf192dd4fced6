//! Hook script installation.
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Marker line identifying scripts this tool wrote.
pub const HOOK_MARKER: &str = "# installed by docmap-hook";

/// Git hook names and the subcommand each one runs.
pub const HOOKS: [(&str, &str); 2] = [("pre-commit", "pre-commit"), ("post-commit", "post-commit")];

pub fn hook_script(binary: &Path, subcommand: &str) -> String {
    let binary = shell_words::quote(&binary.display().to_string()).into_owned();
    format!("#!/bin/sh\n{HOOK_MARKER}\nexec {binary} {subcommand}\n")
}

/// Write both hook scripts into `hooks_dir`.
///
/// Existing hooks not written by this tool are left alone unless `force`.
pub fn install_hooks(hooks_dir: &Path, binary: &Path, force: bool) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(hooks_dir).with_context(|| format!("create {}", hooks_dir.display()))?;
    let mut written = Vec::new();
    for (hook, subcommand) in HOOKS {
        let path = hooks_dir.join(hook);
        if path.exists() && !force {
            let existing =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            if !existing.contains(HOOK_MARKER) {
                return Err(anyhow!(
                    "{} already exists (pass --force to overwrite)",
                    path.display()
                ));
            }
        }
        fs::write(&path, hook_script(binary, subcommand))
            .with_context(|| format!("write {}", path.display()))?;
        make_executable(&path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_both_hooks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let hooks = dir.path().join("hooks");
        let written =
            install_hooks(&hooks, Path::new("/opt/docmap tools/docmap-hook"), false)
                .expect("install");
        assert_eq!(written.len(), 2);
        let pre = fs::read_to_string(hooks.join("pre-commit")).expect("read");
        assert!(pre.starts_with("#!/bin/sh\n"));
        assert!(pre.contains("exec '/opt/docmap tools/docmap-hook' pre-commit"), "{pre}");

        // Re-running over our own scripts is fine.
        install_hooks(&hooks, Path::new("/usr/bin/docmap-hook"), false).expect("reinstall");
    }

    #[test]
    fn foreign_hook_needs_force() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("pre-commit"), "#!/bin/sh\nmake lint\n").expect("write");
        let binary = Path::new("/usr/bin/docmap-hook");
        let err = install_hooks(dir.path(), binary, false).expect_err("foreign hook");
        assert!(err.to_string().contains("--force"));
        install_hooks(dir.path(), binary, true).expect("forced install");
        let pre = fs::read_to_string(dir.path().join("pre-commit")).expect("read");
        assert!(pre.contains(HOOK_MARKER));
    }
}
