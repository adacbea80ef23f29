//! Run configuration and its defaults.

use crate::error::ConfigError;
use crate::escalation::LockPoll;
use crate::notify::NotifyChannel;
use std::path::PathBuf;

/// Compiler used when none is given.
pub const DEFAULT_COMPILER: &str = "pdflatex";

/// Arguments passed to the compiler when none are given.
pub const DEFAULT_ARGUMENTS: &str = "-synctex=1 -interaction=nonstopmode";

/// Name of the TeX Live package manager binary.
pub const TLMGR: &str = "tlmgr";

/// Directory (under the home directory) holding the new-terminal lock file.
pub const STATE_DIR_NAME: &str = ".texfly";

/// Everything a run needs to know, filled in by the CLI.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub compiler: String,
    /// Compiler arguments, already shell-tokenized.
    pub arguments: Vec<String>,
    /// TeX Live `bin` directory. When unset, tools are looked up on `PATH`.
    pub texlive_bin: Option<PathBuf>,
    /// Only escalate inside the current terminal (`sudo`).
    pub session_only: bool,
    /// Compile once without assistance when `tlmgr` is missing.
    pub fail_silently: bool,
    pub notify: NotifyChannel,
    pub state_dir: PathBuf,
    pub lock_poll: LockPoll,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            arguments: DEFAULT_ARGUMENTS.split_whitespace().map(String::from).collect(),
            texlive_bin: None,
            session_only: false,
            fail_silently: false,
            notify: NotifyChannel::Off,
            state_dir: default_state_dir(),
            lock_poll: LockPoll::default(),
        }
    }
}

impl RunConfig {
    /// Replaces the compiler arguments with a shell-tokenized string.
    pub fn with_argument_string(mut self, arguments: &str) -> Result<Self, ConfigError> {
        self.arguments = split_arguments(arguments)?;
        Ok(self)
    }

    /// Path of the compiler binary, inside the bin override if one is set.
    pub fn compiler_path(&self) -> PathBuf {
        match &self.texlive_bin {
            Some(bin) => bin.join(&self.compiler),
            None => PathBuf::from(&self.compiler),
        }
    }

    /// Resolves a TeX Live tool inside the bin override, or on `PATH`.
    pub fn tool_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        match &self.texlive_bin {
            Some(bin) => Ok(bin.join(name)),
            None => which::which(name).map_err(|_| ConfigError::ToolNotFound(name.to_string())),
        }
    }

    /// Whether the compiler in use is the built-in default.
    pub fn uses_default_compiler(&self) -> bool {
        self.compiler == DEFAULT_COMPILER
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("newterminal_lock")
    }
}

/// Splits a compiler argument string the way a POSIX shell would.
pub fn split_arguments(arguments: &str) -> Result<Vec<String>, ConfigError> {
    shlex::split(arguments).ok_or_else(|| ConfigError::UnbalancedArguments(arguments.to_string()))
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(STATE_DIR_NAME)
}

/// Displays a path for a shell command line, quoting it when needed.
pub(crate) fn shell_quote(text: &str) -> String {
    shlex::try_quote(text)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.compiler, "pdflatex");
        assert_eq!(config.arguments, vec!["-synctex=1", "-interaction=nonstopmode"]);
        assert!(config.uses_default_compiler());
        assert!(config.lock_path().ends_with(".texfly/newterminal_lock"));
    }

    #[test]
    fn test_argument_string_is_shell_tokenized() {
        let config = RunConfig::default()
            .with_argument_string(r#"-jobname "my report" -shell-escape"#)
            .unwrap();
        assert_eq!(config.arguments, vec!["-jobname", "my report", "-shell-escape"]);
    }

    #[test]
    fn test_unbalanced_arguments() {
        let err = RunConfig::default().with_argument_string("-jobname \"oops").unwrap_err();
        assert!(matches!(err, ConfigError::UnbalancedArguments(_)));
    }

    #[test]
    fn test_bin_override() {
        let config = RunConfig {
            texlive_bin: Some(PathBuf::from("/opt/texlive/bin/x86_64-linux")),
            compiler: "lualatex".into(),
            ..RunConfig::default()
        };
        assert_eq!(
            config.compiler_path(),
            PathBuf::from("/opt/texlive/bin/x86_64-linux/lualatex")
        );
        assert_eq!(
            config.tool_path("tlmgr").unwrap(),
            PathBuf::from("/opt/texlive/bin/x86_64-linux/tlmgr")
        );
        assert!(!config.uses_default_compiler());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("tlmgr"), "tlmgr");
        assert_eq!(shell_quote("/my dir/tlmgr"), "'/my dir/tlmgr'");
    }
}
