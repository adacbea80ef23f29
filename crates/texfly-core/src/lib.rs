//! # texfly core
//!
//! Compiles a TeX document, installs whatever packages its compiler output
//! says are missing, and recompiles until nothing new is missing.
//!
//! ## Modules
//!
//! - [`convergence`] - the compile loop and its stopping rule
//! - [`compiler`] - runs the TeX engine, relaying and capturing its output
//! - [`package_manager`] - `tlmgr` search and install
//! - [`escalation`] - running `tlmgr` as the superuser, with fallbacks
//! - [`config`] - run configuration and defaults
//! - [`notify`] - optional bell/speech notifications
//!
//! ## Wiring a run
//!
//! ```no_run
//! use std::sync::Arc;
//! use texfly_core::compiler::Compiler;
//! use texfly_core::config::{RunConfig, TLMGR};
//! use texfly_core::convergence::ConvergenceLoop;
//! use texfly_core::escalation::{default_chain, EscalationProvider};
//! use texfly_core::exec::RealCommandExecutor;
//! use texfly_core::package_manager::{EscalationState, TlmgrIndex, TlmgrInstaller};
//!
//! let config = RunConfig::default();
//! let tlmgr = config.tool_path(TLMGR)?;
//! let state = EscalationState::probe(&tlmgr, &RealCommandExecutor)?;
//!
//! let escalator = EscalationProvider::new(default_chain(config.session_only), config.lock_path());
//! let installer = TlmgrInstaller::new(tlmgr.clone(), state, escalator);
//! let compiler = Compiler::new(config.compiler_path()).with_args(config.arguments.clone());
//!
//! let outcome = ConvergenceLoop::new("main.tex", compiler, TlmgrIndex::new(tlmgr), installer).run()?;
//! std::process::exit(outcome.exit_code);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod compiler;
pub mod config;
pub mod convergence;
pub mod error;
pub mod escalation;
pub mod exec;
pub mod notify;
pub mod package_manager;
