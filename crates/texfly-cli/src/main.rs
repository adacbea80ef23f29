use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use texfly_core::compiler::{Compile, Compiler};
use texfly_core::config::{RunConfig, DEFAULT_ARGUMENTS, DEFAULT_COMPILER, TLMGR};
use texfly_core::convergence::ConvergenceLoop;
use texfly_core::error::{IndexError, LaunchError};
use texfly_core::escalation::{default_chain, EscalationProvider};
use texfly_core::exec::RealCommandExecutor;
use texfly_core::notify::{Notifier, NotifyChannel};
use texfly_core::package_manager::{EscalationState, TlmgrIndex, TlmgrInstaller};
use texfly_log::DiagnosticClassifier;

#[derive(Parser)]
#[command(name = "texfly", version)]
#[command(
    about = "Compiles a .tex document, downloading missing TeX Live packages on the fly",
    long_about = None
)]
struct Cli {
    /// The .tex file to compile (a compiler log with --diagnose)
    #[arg(value_name = "FILE")]
    document: PathBuf,

    /// Your LaTeX compiler
    #[arg(short, long, env = "TEXFLY_COMPILER", default_value = DEFAULT_COMPILER)]
    compiler: String,

    /// Arguments to pass to the compiler
    #[arg(
        short,
        long,
        value_name = "ARGS",
        env = "TEXFLY_ARGUMENTS",
        default_value = DEFAULT_ARGUMENTS,
        allow_hyphen_values = true
    )]
    arguments: String,

    /// Custom location for the TeX Live bin folder
    #[arg(long, value_name = "LOCATION", env = "TEXFLY_TEXLIVE_BIN")]
    texlive_bin: Option<PathBuf>,

    /// Only ask for the administrator password in this terminal, never
    /// graphically or in a new terminal
    #[arg(long, env = "TEXFLY_TERMINAL_ONLY")]
    terminal_only: bool,

    /// If tlmgr cannot be found, compile the document anyway
    #[arg(short, long, env = "TEXFLY_FAIL_SILENTLY")]
    fail_silently: bool,

    /// Notification channel: off, bell or speech
    #[arg(long, value_name = "CHANNEL", env = "TEXFLY_NOTIFY", default_value = "off")]
    notify: NotifyChannel,

    /// Classify an existing compiler log and print what would be installed, as JSON
    #[arg(long)]
    diagnose: bool,

    /// Show debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logger(&cli);

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

fn init_logger(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<i32> {
    if cli.diagnose {
        return diagnose(&cli.document);
    }

    let config = RunConfig {
        compiler: cli.compiler.clone(),
        texlive_bin: cli.texlive_bin.clone(),
        session_only: cli.terminal_only,
        fail_silently: cli.fail_silently,
        notify: cli.notify,
        ..RunConfig::default()
    }
    .with_argument_string(&cli.arguments)?;

    let mut compiler = Compiler::new(config.compiler_path()).with_args(config.arguments.clone());

    let (tlmgr, state) = match probe_tlmgr(&config) {
        Ok(found) => found,
        Err(e) if config.fail_silently => {
            info!("{}; compiling once without package installation.", e);
            return compile_once(&mut compiler, &cli.document, &config);
        }
        Err(e) => {
            let hint = if config.texlive_bin.is_none() {
                " Are you sure you have TeX Live 2010 or later?"
            } else {
                ""
            };
            return Err(e).context(format!("It appears tlmgr is not installed.{}", hint));
        }
    };

    let escalator = EscalationProvider::new(default_chain(config.session_only), config.lock_path())
        .with_poll(config.lock_poll);
    let installer = TlmgrInstaller::new(tlmgr.clone(), state, escalator);
    let index = TlmgrIndex::new(tlmgr);

    let mut texfly = ConvergenceLoop::new(&cli.document, compiler, index, installer)
        .with_notifier(Notifier::new(config.notify));
    match texfly.run() {
        Ok(outcome) => Ok(outcome.exit_code),
        Err(e) => Err(launch_failure(e, &config)),
    }
}

fn probe_tlmgr(config: &RunConfig) -> Result<(PathBuf, EscalationState), IndexError> {
    let tlmgr = config
        .tool_path(TLMGR)
        .map_err(|_| IndexError::Unavailable {
            path: PathBuf::from(TLMGR),
            source: None,
        })?;
    let state = EscalationState::probe(&tlmgr, &RealCommandExecutor)?;
    Ok((tlmgr, state))
}

fn compile_once(compiler: &mut Compiler, document: &Path, config: &RunConfig) -> Result<i32> {
    match compiler.compile(document) {
        Ok(result) => Ok(result.exit_code),
        Err(e) => Err(launch_failure(e, config)),
    }
}

fn launch_failure(e: LaunchError, config: &RunConfig) -> anyhow::Error {
    let hint = if config.uses_default_compiler() {
        "\n\n(Or run texfly --help for info on how to choose a different compiler.)"
    } else {
        ""
    };
    anyhow::Error::new(e).context(format!(
        "Unable to start {}; are you sure it is installed?{}",
        config.compiler, hint
    ))
}

/// Prints every detection in a compiler log, grouped by tier.
fn diagnose(log: &Path) -> Result<i32> {
    let content = fs::read(log).with_context(|| format!("Failed to read {}", log.display()))?;
    let content = String::from_utf8_lossy(&content);
    let classifier = DiagnosticClassifier::new(log.with_extension("tex"));
    let detections = classifier.detect(&content);
    println!("{}", serde_json::to_string_pretty(&detections)?);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["texfly", "main.tex"]).unwrap();
        assert_eq!(cli.document, PathBuf::from("main.tex"));
        assert_eq!(cli.compiler, DEFAULT_COMPILER);
        assert_eq!(cli.arguments, DEFAULT_ARGUMENTS);
        assert_eq!(cli.notify, NotifyChannel::Off);
        assert!(!cli.terminal_only);
        assert!(!cli.fail_silently);
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "texfly",
            "-c",
            "lualatex",
            "-a",
            "-shell-escape -interaction=nonstopmode",
            "--texlive-bin",
            "/opt/texlive/2023/bin/x86_64-linux",
            "--terminal-only",
            "-f",
            "--notify",
            "speech",
            "thesis.tex",
        ])
        .unwrap();
        assert_eq!(cli.compiler, "lualatex");
        assert_eq!(cli.arguments, "-shell-escape -interaction=nonstopmode");
        assert!(cli.terminal_only);
        assert!(cli.fail_silently);
        assert_eq!(cli.notify, NotifyChannel::Speech);
    }

    #[test]
    fn test_document_required() {
        assert!(Cli::try_parse_from(["texfly"]).is_err());
    }

    #[test]
    fn test_bad_notify_channel() {
        assert!(Cli::try_parse_from(["texfly", "--notify", "pager", "main.tex"]).is_err());
    }
}
