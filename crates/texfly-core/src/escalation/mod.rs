//! Running commands as the superuser.
//!
//! ## Tiers
//!
//! Escalators are tried in order; one that cannot be used (not installed,
//! authorization refused) hands over to the next, and none is tried twice.
//!
//! 1. **Same session**: `sudo` in the current terminal (session-only runs),
//!    or `osascript ... with administrator privileges` on macOS.
//! 2. **Graphical**: the first of `gksudo`, `kdesudo`, `pkexec` that starts.
//! 3. **New terminal**: a terminal window runs `sudo` behind a banner. A
//!    lock file is written before the window opens, the script deletes it as
//!    its last step, and the caller polls until it is gone.
//!
//! A session-only run stops after tier 1.

use crate::config::shell_quote;
use crate::error::EscalationError;
use crate::exec::{CommandExecutor, RealCommandExecutor};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod lock;

pub use lock::{LockPoll, DEFAULT_LOCK_POLL};

/// osascript error numbers meaning the password dialog was refused.
const APPLESCRIPT_DENIALS: &[&str] = &["(-128)", "(-60005)", "(-60006)", "(-60007)"];

/// Terminal emulators tried, in order, by the new-terminal tier.
pub const TERMINAL_EMULATORS: &[&str] = &["x-terminal-emulator", "xterm"];

/// How a graphical escalator expects the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// One argument holding the whole shell command line.
    ShellLine,
    /// The program and its arguments as separate arguments.
    Argv,
}

/// A one-shot graphical privilege tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicalTool {
    pub program: &'static str,
    pub style: ArgStyle,
    /// Exit codes meaning authorization was not obtained.
    pub denial_codes: &'static [i32],
}

/// Graphical tools tried, in order.
pub const GRAPHICAL_TOOLS: &[GraphicalTool] = &[
    GraphicalTool {
        program: "gksudo",
        style: ArgStyle::ShellLine,
        denial_codes: &[],
    },
    GraphicalTool {
        program: "kdesudo",
        style: ArgStyle::ShellLine,
        denial_codes: &[],
    },
    GraphicalTool {
        program: "pkexec",
        style: ArgStyle::Argv,
        denial_codes: &[126, 127],
    },
];

/// One way of getting superuser rights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalator {
    /// `sudo` in the caller's terminal.
    SameSession,
    /// macOS administrator prompt through `osascript`.
    AppleScript,
    Graphical(GraphicalTool),
    /// A new terminal window running `sudo`, synchronized through a lock
    /// file.
    NewTerminal { emulators: Vec<&'static str> },
}

impl Escalator {
    pub fn name(&self) -> String {
        match self {
            Self::SameSession => "sudo".to_string(),
            Self::AppleScript => "osascript".to_string(),
            Self::Graphical(tool) => tool.program.to_string(),
            Self::NewTerminal { .. } => "new terminal".to_string(),
        }
    }

    /// 1 for same-session mechanisms, 2 for graphical tools, 3 for a new
    /// terminal.
    pub fn tier(&self) -> u8 {
        match self {
            Self::SameSession | Self::AppleScript => 1,
            Self::Graphical(_) => 2,
            Self::NewTerminal { .. } => 3,
        }
    }
}

/// The fallback chain for this platform.
pub fn default_chain(session_only: bool) -> Vec<Escalator> {
    if session_only {
        return vec![Escalator::SameSession];
    }
    let mut chain = Vec::new();
    if cfg!(target_os = "macos") {
        chain.push(Escalator::AppleScript);
    } else {
        chain.extend(GRAPHICAL_TOOLS.iter().cloned().map(Escalator::Graphical));
    }
    chain.push(Escalator::NewTerminal {
        emulators: TERMINAL_EMULATORS.to_vec(),
    });
    chain
}

/// A command to run as the superuser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Shown above the password prompt when a terminal has to be opened.
    pub banner: String,
}

impl PrivilegedCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            banner: String::new(),
        }
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    /// The command as one shell line, each word quoted as needed.
    pub fn shell_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|word| shell_quote(&word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Script for the new-terminal tier. Deleting `lock` is its last step,
    /// whatever `sudo` returned.
    pub fn terminal_script(&self, lock: &Path) -> String {
        let intro = format!(
            "The graphical privilege escalator failed for some reason; we'll try asking for your administrator password here instead.\n{}",
            "-".repeat(18)
        );
        let mut script = format!("echo {}; ", shell_quote(&intro));
        if !self.banner.is_empty() {
            script.push_str(&format!("echo {}; ", shell_quote(&self.banner)));
        }
        script.push_str(&format!(
            "sudo {}; rm -f {}",
            self.shell_line(),
            shell_quote(&lock.to_string_lossy())
        ));
        script
    }

    fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Runs commands with superuser rights.
pub trait Escalate {
    fn escalate(&mut self, command: &PrivilegedCommand) -> Result<(), EscalationError>;
}

/// Result of trying a single escalator.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attempt {
    Done,
    /// Hand over to the next escalator.
    Unusable(String),
}

/// Walks the escalator chain until one of them runs the command.
#[derive(Debug, Clone)]
pub struct EscalationProvider {
    chain: Vec<Escalator>,
    executor: Arc<dyn CommandExecutor>,
    lock_path: PathBuf,
    poll: LockPoll,
}

impl EscalationProvider {
    pub fn new(chain: Vec<Escalator>, lock_path: PathBuf) -> Self {
        Self::with_executor(chain, lock_path, Arc::new(RealCommandExecutor))
    }

    pub fn with_executor(
        chain: Vec<Escalator>,
        lock_path: PathBuf,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            chain,
            executor,
            lock_path,
            poll: DEFAULT_LOCK_POLL,
        }
    }

    pub fn with_poll(mut self, poll: LockPoll) -> Self {
        self.poll = poll;
        self
    }

    pub fn chain(&self) -> &[Escalator] {
        &self.chain
    }

    fn attempt(
        &self,
        escalator: &Escalator,
        command: &PrivilegedCommand,
    ) -> Result<Attempt, EscalationError> {
        match escalator {
            Escalator::SameSession => {
                let argv = command.argv();
                let args: Vec<&str> = argv.iter().map(String::as_str).collect();
                match self.executor.run(Path::new("sudo"), &args) {
                    Ok(status) => {
                        if !status.success() {
                            warn!("sudo {} exited with {}", command.shell_line(), status);
                        }
                        Ok(Attempt::Done)
                    }
                    Err(e) => Ok(Attempt::Unusable(format!("{:#}", e))),
                }
            }
            Escalator::AppleScript => {
                let script = format!(
                    "do shell script \"{}\" with administrator privileges",
                    applescript_escape(&command.shell_line())
                );
                match self.executor.execute_with_input(Path::new("osascript"), &script) {
                    Ok(output) if output.status.success() => Ok(Attempt::Done),
                    Ok(output) => {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        if APPLESCRIPT_DENIALS.iter().any(|code| stderr.contains(code)) {
                            Ok(Attempt::Unusable(format!(
                                "authorization failed: {}",
                                stderr.trim()
                            )))
                        } else {
                            warn!("osascript reported: {}", stderr.trim());
                            Ok(Attempt::Done)
                        }
                    }
                    Err(e) => Ok(Attempt::Unusable(format!("{:#}", e))),
                }
            }
            Escalator::Graphical(tool) => {
                let args = match tool.style {
                    ArgStyle::ShellLine => vec![command.shell_line()],
                    ArgStyle::Argv => command.argv(),
                };
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match self.executor.run(Path::new(tool.program), &args) {
                    Ok(status) => match status.code() {
                        Some(code) if tool.denial_codes.contains(&code) => Ok(Attempt::Unusable(
                            format!("authorization not obtained (exit {})", code),
                        )),
                        _ => {
                            if !status.success() {
                                warn!("{} exited with {}", tool.program, status);
                            }
                            Ok(Attempt::Done)
                        }
                    },
                    Err(e) => Ok(Attempt::Unusable(format!("{:#}", e))),
                }
            }
            Escalator::NewTerminal { emulators } => self.spawn_in_new_terminal(emulators, command),
        }
    }

    fn spawn_in_new_terminal(
        &self,
        emulators: &[&'static str],
        command: &PrivilegedCommand,
    ) -> Result<Attempt, EscalationError> {
        if let Some(dir) = self.lock_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.lock_path, "Terminal privilege escalator running.")?;

        let shell = format!(
            "sh -c {}",
            shell_quote(&command.terminal_script(&self.lock_path))
        );
        for emulator in emulators {
            match self.executor.spawn(Path::new(emulator), &["-e", shell.as_str()]) {
                Ok(()) => {
                    info!("Waiting for the {} window to finish", emulator);
                    self.poll.wait_for_removal(&self.lock_path)?;
                    return Ok(Attempt::Done);
                }
                Err(e) => debug!("{:#}", e),
            }
        }

        let _ = fs::remove_file(&self.lock_path);
        Ok(Attempt::Unusable("no terminal emulator found".to_string()))
    }
}

impl Escalate for EscalationProvider {
    fn escalate(&mut self, command: &PrivilegedCommand) -> Result<(), EscalationError> {
        let mut attempted = Vec::new();
        for escalator in &self.chain {
            if matches!(escalator, Escalator::NewTerminal { .. }) {
                info!("A new terminal will open and you may be prompted for your sudo password.");
            }
            match self.attempt(escalator, command)? {
                Attempt::Done => return Ok(()),
                Attempt::Unusable(reason) => {
                    warn!(
                        "Privilege escalator {} (tier {}) failed: {}",
                        escalator.name(),
                        escalator.tier(),
                        reason
                    );
                    attempted.push(escalator.name());
                }
            }
        }
        Err(EscalationError::Exhausted { attempted })
    }
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
