use crate::error::LaunchError;
use log::{debug, warn};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured output and exit status of one compiler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub output: String,
    pub exit_code: i32,
}

/// Anything that can compile the document once.
pub trait Compile {
    fn compile(&mut self, document: &Path) -> Result<CompileResult, LaunchError>;
}

/// A Compiler holds the configuration for executing an external TeX engine.
#[derive(Debug, Clone)]
pub struct Compiler {
    pub engine: PathBuf, // e.g. "pdflatex", "/opt/texlive/bin/x86_64-linux/lualatex"
    pub extra_args: Vec<String>,
}

impl Compiler {
    pub fn new(engine: impl Into<PathBuf>) -> Self {
        Self {
            engine: engine.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Runs the engine on `document`, copying every line of its stdout to
    /// `sink` as it arrives while also capturing it.
    ///
    /// stdin is inherited so an engine stopping for input can still be
    /// answered by a human.
    pub fn compile_to<W: Write>(
        &self,
        document: &Path,
        sink: &mut W,
    ) -> Result<CompileResult, LaunchError> {
        let launch_error = |source| LaunchError {
            compiler: self.engine.display().to_string(),
            source,
        };

        debug!(
            "Running {} {:?} {}",
            self.engine.display(),
            self.extra_args,
            document.display()
        );
        let mut child = Command::new(&self.engine)
            .args(&self.extra_args)
            .arg(document)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(launch_error)?;

        let output = match child.stdout.take() {
            Some(stdout) => relay(stdout, sink),
            None => String::new(),
        };

        let status = child.wait().map_err(launch_error)?;
        // Killed by a signal: report a generic failure.
        let exit_code = status.code().unwrap_or(1);
        debug!("{} exited with {}", self.engine.display(), exit_code);

        Ok(CompileResult { output, exit_code })
    }
}

impl Compile for Compiler {
    fn compile(&mut self, document: &Path) -> Result<CompileResult, LaunchError> {
        let stdout = std::io::stdout();
        let mut sink = stdout.lock();
        self.compile_to(document, &mut sink)
    }
}

fn relay<R: Read, W: Write>(source: R, sink: &mut W) -> String {
    let mut reader = BufReader::new(source);
    let mut captured = String::new();
    let mut line = Vec::new();
    let mut echo = true;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Stopped reading compiler output: {}", e);
                break;
            }
        }
        if echo && sink.write_all(&line).and_then(|_| sink.flush()).is_err() {
            // Keep capturing even if nobody is watching anymore.
            echo = false;
        }
        captured.push_str(&String::from_utf8_lossy(&line));
    }
    captured
}
