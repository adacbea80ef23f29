use super::index::PERMISSION_MARKER;
use super::PackageCandidateSet;
use crate::error::{IndexError, InstallError};
use crate::escalation::{Escalate, PrivilegedCommand};
use crate::exec::{CommandExecutor, RealCommandExecutor};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SELF_UPDATE_INFO: &str = "Updating tlmgr prior to installing packages\n(this is necessary to avoid complaints from itself).";

/// What the run knows about its rights over the TeX Live installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EscalationState {
    /// Whether the current account may modify the installation itself.
    pub write_permission: bool,
    /// Whether `tlmgr update --self` has already run. Set at most once.
    pub self_updated: bool,
}

impl EscalationState {
    /// Checks that `tlmgr` starts and whether the current account may write
    /// to the installation, using `tlmgr remove` with nothing to remove.
    pub fn probe(tlmgr: &Path, executor: &dyn CommandExecutor) -> Result<Self, IndexError> {
        let output = executor
            .execute(tlmgr, &["remove"])
            .map_err(|e| IndexError::Unavailable {
                path: tlmgr.to_path_buf(),
                source: e.downcast::<std::io::Error>().ok(),
            })?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(Self {
            write_permission: !stderr.contains(PERMISSION_MARKER),
            self_updated: false,
        })
    }
}

/// Installs a batch of candidate packages.
pub trait PackageInstaller {
    fn install(&mut self, candidates: &PackageCandidateSet) -> Result<(), InstallError>;
}

/// [`PackageInstaller`] running `tlmgr install`, directly or through an
/// escalator.
#[derive(Debug)]
pub struct TlmgrInstaller<E> {
    tlmgr: PathBuf,
    executor: Arc<dyn CommandExecutor>,
    state: EscalationState,
    escalator: E,
}

impl<E: Escalate> TlmgrInstaller<E> {
    pub fn new(tlmgr: PathBuf, state: EscalationState, escalator: E) -> Self {
        Self::with_executor(tlmgr, state, escalator, Arc::new(RealCommandExecutor))
    }

    pub fn with_executor(
        tlmgr: PathBuf,
        state: EscalationState,
        escalator: E,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            tlmgr,
            executor,
            state,
            escalator,
        }
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    pub fn escalator(&self) -> &E {
        &self.escalator
    }

    /// `tlmgr update --self`, once per run, before the first install. tlmgr
    /// refuses installs while it is itself out of date.
    fn initialize(&mut self) -> Result<(), InstallError> {
        if self.state.self_updated {
            return Ok(());
        }
        self.state.self_updated = true;
        info!("{}", SELF_UPDATE_INFO.replace('\n', " "));

        if !self.state.write_permission {
            info!("Default user doesn't have permission to modify the TeX Live distribution; upgrading to superuser for all future tasks.");
        }
        let args = vec!["update".to_string(), "--self".to_string()];
        self.run(args, format!("{}\n", SELF_UPDATE_INFO))
    }

    fn run(&mut self, args: Vec<String>, banner: String) -> Result<(), InstallError> {
        if self.state.write_permission {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let status = self
                .executor
                .run(&self.tlmgr, &args)
                .map_err(|e| InstallError::Launch {
                    program: self.tlmgr.display().to_string(),
                    reason: format!("{:#}", e),
                })?;
            if !status.success() {
                warn!("tlmgr {} exited with {}", args.join(" "), status);
            }
            return Ok(());
        }

        let command = PrivilegedCommand::new(self.tlmgr.clone(), args).with_banner(format!(
            "This is texfly's 'install packages on the fly' feature.\n\n{}",
            banner
        ));
        self.escalator.escalate(&command)?;
        Ok(())
    }
}

impl<E: Escalate> PackageInstaller for TlmgrInstaller<E> {
    fn install(&mut self, candidates: &PackageCandidateSet) -> Result<(), InstallError> {
        if candidates.is_empty() {
            return Ok(());
        }
        self.initialize()?;

        info!("Attempting to install LaTeX package(s): {}", candidates);
        let args = std::iter::once("install".to_string())
            .chain(candidates.iter().map(String::from))
            .collect();
        self.run(
            args,
            format!(
                "Attempting to install LaTeX package(s): {}\n(Some of them might not be real.)\n",
                candidates
            ),
        )
    }
}
