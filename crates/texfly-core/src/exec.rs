//! Process execution seam.
//!
//! Every external tool texfly touches besides the compiler (`tlmgr`, `sudo`,
//! graphical escalators, terminal emulators, speech programs) is started through
//! [`CommandExecutor`], so the resolution and escalation logic can be tested
//! without a TeX distribution or root access.

use anyhow::{Context, Result};
use log::debug;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread;

/// Trait for executing system commands.
/// This allows us to mock `std::process::Command` in tests.
///
/// A launch failure (program missing, not executable) is always an `Err`;
/// a program that ran and failed is an `Ok` carrying its status.
pub trait CommandExecutor: Send + Sync + std::fmt::Debug {
    /// Runs a command to completion, capturing stdout and stderr.
    fn execute(&self, program: &Path, args: &[&str]) -> Result<Output>;

    /// Runs a command to completion with the caller's terminal attached, so
    /// prompts and progress reach the operator.
    fn run(&self, program: &Path, args: &[&str]) -> Result<ExitStatus>;

    /// Runs a command with `input` written to its stdin, capturing output.
    fn execute_with_input(&self, program: &Path, input: &str) -> Result<Output>;

    /// Starts a command and returns without waiting for it. The process is
    /// still reaped once it exits.
    fn spawn(&self, program: &Path, args: &[&str]) -> Result<()>;
}

/// Default implementation of [`CommandExecutor`] using `std::process::Command`.
#[derive(Debug)]
pub struct RealCommandExecutor;

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, program: &Path, args: &[&str]) -> Result<Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", program.display()))
    }

    fn run(&self, program: &Path, args: &[&str]) -> Result<ExitStatus> {
        Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("Failed to execute {}", program.display()))
    }

    fn execute_with_input(&self, program: &Path, input: &str) -> Result<Output> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute {}", program.display()))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        Ok(child.wait_with_output()?)
    }

    fn spawn(&self, program: &Path, args: &[&str]) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", program.display()))?;
        let name = program.display().to_string();
        thread::spawn(move || match child.wait() {
            Ok(status) => debug!("{} exited with {}", name, status),
            Err(e) => debug!("Failed to wait for {}: {}", name, e),
        });
        Ok(())
    }
}

/// Canned result for one command line in [`MockCommandExecutor`].
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockOutput {
    pub stdout: String,
    pub stderr: String,
    pub status_code: i32,
}

#[cfg(test)]
impl MockOutput {
    pub fn stdout(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            ..Self::default()
        }
    }

    pub fn failure(stderr: &str, status_code: i32) -> Self {
        Self {
            stderr: stderr.to_string(),
            status_code,
            ..Self::default()
        }
    }
}

/// A mocked executor for testing that doesn't actually run system commands.
///
/// Outputs are keyed by the full command line (`program arg1 arg2`); unknown
/// command lines succeed silently. Every call is recorded in `calls`.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockCommandExecutor {
    pub outputs: std::collections::HashMap<String, MockOutput>,
    /// Programs that fail to launch, as if not installed.
    pub missing: std::collections::HashSet<String>,
    /// Deleted whenever something is spawned, standing in for a terminal
    /// that ran its script to the end.
    pub remove_on_spawn: Option<std::path::PathBuf>,
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn with_output(mut self, line: &str, output: MockOutput) -> Self {
        self.outputs.insert(line.to_string(), output);
        self
    }

    pub fn with_missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, program: &Path, args: &[&str]) -> Result<MockOutput> {
        let line = std::iter::once(program.display().to_string())
            .chain(args.iter().map(|a| a.to_string()))
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());
        if self.missing.contains(&program.display().to_string()) {
            return Err(anyhow::Error::new(std::io::Error::from(std::io::ErrorKind::NotFound))
                .context(format!("Failed to execute {}", program.display())));
        }
        Ok(self.outputs.get(&line).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
fn exit_status(code: i32) -> ExitStatus {
    #[cfg(unix)]
    let status = {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code << 8)
    };
    #[cfg(windows)]
    let status = {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code as u32)
    };
    status
}

#[cfg(test)]
impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, program: &Path, args: &[&str]) -> Result<Output> {
        let mock = self.record(program, args)?;
        Ok(Output {
            status: exit_status(mock.status_code),
            stdout: mock.stdout.into_bytes(),
            stderr: mock.stderr.into_bytes(),
        })
    }

    fn run(&self, program: &Path, args: &[&str]) -> Result<ExitStatus> {
        Ok(exit_status(self.record(program, args)?.status_code))
    }

    fn execute_with_input(&self, program: &Path, input: &str) -> Result<Output> {
        self.execute(program, &[input])
    }

    fn spawn(&self, program: &Path, args: &[&str]) -> Result<()> {
        self.record(program, args)?;
        if let Some(path) = &self.remove_on_spawn {
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_spawned_process_is_reaped() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > {}.tmp && mv {0}.tmp {0}", pid_file.display());
        RealCommandExecutor
            .spawn(Path::new("sh"), &["-c", script.as_str()])
            .unwrap();

        assert!(wait_until(|| pid_file.exists()));
        let pid = fs::read_to_string(&pid_file).unwrap();
        let proc_entry = Path::new("/proc").join(pid.trim());
        // A zombie keeps its /proc entry until its parent waits on it.
        assert!(wait_until(|| !proc_entry.exists()));
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let err = RealCommandExecutor
            .spawn(Path::new("/nonexistent/terminal"), &[])
            .unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }
}
