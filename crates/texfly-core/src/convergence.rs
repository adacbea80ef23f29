//! The compile, resolve, install, recompile loop.

use crate::compiler::Compile;
use crate::error::{InstallError, LaunchError};
use crate::notify::Notifier;
use crate::package_manager::{PackageCandidateSet, PackageIndex, PackageInstaller};
use log::{error, info};
use std::path::{Path, PathBuf};
use texfly_log::ir::MissingResource;
use texfly_log::{DiagnosticClassifier, ResolutionMemory};

/// Why the loop stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The last compile reported nothing new.
    Converged,
    /// Installing stopped being possible. The document was still compiled.
    InstallFailed(InstallError),
}

/// Result of a whole run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Exit code of the last compile; the process exits with it.
    pub exit_code: i32,
    pub compiles: usize,
    /// Every resource acted on, with what it resolved to.
    pub attempts: Vec<(MissingResource, PackageCandidateSet)>,
    pub stop: StopReason,
}

impl RunOutcome {
    pub fn converged(&self) -> bool {
        matches!(self.stop, StopReason::Converged)
    }
}

/// Owns everything that must persist across iterations: the resolution
/// memory here, the escalation state inside the installer.
pub struct ConvergenceLoop<C, I, P> {
    document: PathBuf,
    classifier: DiagnosticClassifier,
    memory: ResolutionMemory,
    compiler: C,
    index: I,
    installer: P,
    notifier: Notifier,
}

impl<C, I, P> ConvergenceLoop<C, I, P>
where
    C: Compile,
    I: PackageIndex,
    P: PackageInstaller,
{
    pub fn new(document: impl Into<PathBuf>, compiler: C, index: I, installer: P) -> Self {
        let document = document.into();
        Self {
            classifier: DiagnosticClassifier::new(document.clone()),
            document,
            memory: ResolutionMemory::new(),
            compiler,
            index,
            installer,
            notifier: Notifier::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn memory(&self) -> &ResolutionMemory {
        &self.memory
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn installer(&self) -> &P {
        &self.installer
    }

    /// Compiles until the output names no resource that has not already been
    /// acted on.
    ///
    /// Only a compiler that cannot be started is an error. A failed install
    /// ends the loop with the exit code of the compile before it.
    pub fn run(&mut self) -> Result<RunOutcome, LaunchError> {
        let mut compiles = 0;
        let mut attempts = Vec::new();

        loop {
            let result = self.compiler.compile(&self.document)?;
            compiles += 1;

            let Some(resource) = self.classifier.classify(&result.output, &self.memory) else {
                info!(
                    "No new missing files or fonts after {} compile(s); done.",
                    compiles
                );
                self.notifier.notify(if result.exit_code == 0 {
                    "Compilation finished"
                } else {
                    "Compilation finished with errors"
                });
                return Ok(RunOutcome {
                    exit_code: result.exit_code,
                    compiles,
                    attempts,
                    stop: StopReason::Converged,
                });
            };

            info!("Missing {}", resource);
            let candidates = match &resource {
                MissingResource::ExplicitFile(name) | MissingResource::FontFile(name) => {
                    self.index.resolve_file(name)
                }
                MissingResource::FontName(name) => self.index.resolve_font(name),
            };
            self.memory.record(&resource);

            if !candidates.is_empty() {
                self.notifier.notify(&format!("Installing {}", candidates));
            }
            let installed = self.installer.install(&candidates);
            attempts.push((resource, candidates));

            if let Err(e) = installed {
                error!("Unable to install packages: {}", e);
                error!("The document has already been compiled, so there's nothing else to do.");
                self.notifier.notify("Package installation failed");
                return Ok(RunOutcome {
                    exit_code: result.exit_code,
                    compiles,
                    attempts,
                    stop: StopReason::InstallFailed(e),
                });
            }
        }
    }
}
