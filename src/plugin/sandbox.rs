//! Failure-isolated plugin execution
//!
//! Runs a plugin unit as a subprocess with stdout and stderr captured to
//! ephemeral files under the cache directory. Failures never escape this
//! boundary: the caller always gets an outcome with whatever stdout the
//! plugin managed to produce.

use chrono::Local;
use colored::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::PluginUnit;
use crate::config::SandboxConfig;

/// Sentinel exit status for a missing or un-invocable unit
pub const EXIT_NOT_FOUND: i32 = 127;

/// Lines of stderr included in a failure diagnostic
const DIAGNOSTIC_STDERR_LINES: usize = 20;
/// Lines of stdout included in a failure diagnostic
const DIAGNOSTIC_STDOUT_LINES: usize = 10;

/// Outcome of one sandboxed invocation
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub plugin_name: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutcome {
    pub fn failed(&self) -> bool {
        self.exit_code != 0 || !self.stderr.is_empty()
    }
}

/// Removes both capture files on every exit path
struct CaptureGuard {
    stdout: PathBuf,
    stderr: PathBuf,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        for path in [&self.stdout, &self.stderr] {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove capture file {}: {}", path.display(), e);
                }
            }
        }
    }
}

pub struct Sandbox {
    cache_dir: PathBuf,
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(cache_dir: PathBuf, config: SandboxConfig) -> Self {
        Self { cache_dir, config }
    }

    /// Execute a plugin unit, capturing output and classifying the outcome.
    ///
    /// Never returns an error: a missing unit yields the 127 sentinel and a
    /// spawn failure is folded into the outcome's stderr.
    pub fn execute_safe(&self, unit: &PluginUnit, args: &[String]) -> ExecOutcome {
        // Capture names carry the process id so concurrent invocations of
        // different runtime instances cannot collide.
        let pid = std::process::id();
        let guard = CaptureGuard {
            stdout: self.cache_dir.join(format!("{}.{}.out", unit.name, pid)),
            stderr: self.cache_dir.join(format!("{}.{}.err", unit.name, pid)),
        };

        let outcome = self.invoke(unit, args, &guard);

        if outcome.failed() {
            log::error!(
                "Plugin '{}' failed: exit {} stderr: {}",
                outcome.plugin_name,
                outcome.exit_code,
                outcome.stderr.trim_end()
            );

            if self.config.debug {
                surface_diagnostic(outcome.clone());
            }
        }

        // Captures are gone before the outcome is signaled
        drop(guard);
        outcome
    }

    fn invoke(&self, unit: &PluginUnit, args: &[String], guard: &CaptureGuard) -> ExecOutcome {
        let mut outcome = ExecOutcome {
            plugin_name: unit.name.clone(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: EXIT_NOT_FOUND,
        };

        if !unit.exists() {
            outcome.stderr = format!("plugin not found: {}", unit.path.display());
            return outcome;
        }

        if let Err(e) = fs::create_dir_all(&self.cache_dir) {
            outcome.stderr = format!("cannot create cache directory: {}", e);
            return outcome;
        }

        let (stdout_file, stderr_file) = match (File::create(&guard.stdout), File::create(&guard.stderr)) {
            (Ok(out), Ok(err)) => (out, err),
            (Err(e), _) | (_, Err(e)) => {
                outcome.stderr = format!("cannot create capture files: {}", e);
                return outcome;
            }
        };

        let mut command = if is_executable(&unit.path) {
            Command::new(&unit.path)
        } else {
            let mut cmd = Command::new(&self.config.interpreter);
            cmd.arg(&unit.path);
            cmd
        };

        let status = command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .status();

        match status {
            Ok(status) => {
                outcome.exit_code = status.code().unwrap_or(EXIT_NOT_FOUND);
                outcome.stdout = fs::read_to_string(&guard.stdout).unwrap_or_default();
                outcome.stderr = fs::read_to_string(&guard.stderr).unwrap_or_default();
            }
            Err(e) => {
                outcome.stderr = format!("failed to invoke plugin: {}", e);
            }
        }

        outcome
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Fire-and-forget diagnostic display; never blocks the caller and its
/// outcome is never observed.
fn surface_diagnostic(outcome: ExecOutcome) {
    std::thread::spawn(move || {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        eprintln!(
            "\n{} plugin {} failed (exit {}) at {}",
            "✗".red().bold(),
            outcome.plugin_name.cyan().bold(),
            outcome.exit_code,
            timestamp
        );

        let stderr_head = head(&outcome.stderr, DIAGNOSTIC_STDERR_LINES);
        if !stderr_head.is_empty() {
            eprintln!("{}", "stderr:".bold());
            eprintln!("{}", stderr_head.red());
        }

        let stdout_head = head(&outcome.stdout, DIAGNOSTIC_STDOUT_LINES);
        if !stdout_head.is_empty() {
            eprintln!("{}", "stdout:".bold());
            eprintln!("{}", stdout_head.dimmed());
        }
    });
}

fn head(text: &str, lines: usize) -> String {
    text.lines().take(lines).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginUnit;
    use tempfile::tempdir;

    fn sandbox(cache_dir: &Path) -> Sandbox {
        Sandbox::new(cache_dir.to_path_buf(), SandboxConfig::default())
    }

    fn write_script(dir: &Path, name: &str, content: &str) -> PluginUnit {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        PluginUnit::new(path)
    }

    #[test]
    fn test_success_returns_exact_stdout() {
        let temp = tempdir().unwrap();
        let unit = write_script(temp.path(), "ok.sh", "#!/usr/bin/env bash\nprintf 'BAT 87%%'\n");

        let outcome = sandbox(temp.path()).execute_safe(&unit, &[]);
        assert!(!outcome.failed());
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, "BAT 87%");
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let temp = tempdir().unwrap();
        let unit = write_script(temp.path(), "bad.sh", "#!/usr/bin/env bash\necho oops >&2\nexit 1\n");

        let outcome = sandbox(temp.path()).execute_safe(&unit, &[]);
        assert!(outcome.failed());
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.stdout.is_empty());
        assert!(outcome.stderr.contains("oops"));
    }

    #[test]
    fn test_stderr_with_zero_exit_is_failure_with_partial_output() {
        let temp = tempdir().unwrap();
        let unit = write_script(
            temp.path(),
            "partial.sh",
            "#!/usr/bin/env bash\necho 'partial text'\necho 'grumble' >&2\nexit 0\n",
        );

        let outcome = sandbox(temp.path()).execute_safe(&unit, &[]);
        assert!(outcome.failed());
        assert_eq!(outcome.exit_code, 0);
        // graceful degradation: stdout survives the failure classification
        assert_eq!(outcome.stdout.trim_end(), "partial text");
    }

    #[test]
    fn test_missing_unit_yields_sentinel() {
        let temp = tempdir().unwrap();
        let unit = PluginUnit::new(temp.path().join("ghost.sh"));

        let outcome = sandbox(temp.path()).execute_safe(&unit, &[]);
        assert!(outcome.failed());
        assert_eq!(outcome.exit_code, EXIT_NOT_FOUND);
    }

    #[test]
    fn test_arguments_are_forwarded() {
        let temp = tempdir().unwrap();
        let unit = write_script(temp.path(), "echoer.sh", "#!/usr/bin/env bash\necho \"$1-$2\"\n");

        let outcome = sandbox(temp.path()).execute_safe(&unit, &["a".to_string(), "b".to_string()]);
        assert_eq!(outcome.stdout.trim_end(), "a-b");
    }

    #[test]
    fn test_capture_files_removed_on_all_paths() {
        let temp = tempdir().unwrap();
        let cache = temp.path().join("cache");
        let sb = sandbox(&cache);

        let ok = write_script(temp.path(), "ok.sh", "#!/usr/bin/env bash\necho hi\n");
        let bad = write_script(temp.path(), "bad.sh", "#!/usr/bin/env bash\nexit 3\n");
        let ghost = PluginUnit::new(temp.path().join("ghost.sh"));

        for unit in [&ok, &bad, &ghost] {
            sb.execute_safe(unit, &[]);
        }

        let leftovers: Vec<_> = fs::read_dir(&cache)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "capture files left behind: {:?}", leftovers);
    }

    #[test]
    fn test_executable_unit_invoked_directly() {
        let temp = tempdir().unwrap();
        let unit = write_script(temp.path(), "direct.sh", "#!/usr/bin/env bash\necho direct\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&unit.path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&unit.path, perms).unwrap();
        }

        let outcome = sandbox(temp.path()).execute_safe(&unit, &[]);
        assert_eq!(outcome.stdout.trim_end(), "direct");
        assert!(!outcome.failed());
    }
}
