use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use texfly_core::compiler::{Compile, CompileResult};
use texfly_core::convergence::{ConvergenceLoop, StopReason};
use texfly_core::error::{EscalationError, InstallError, LaunchError};
use texfly_core::escalation::{Escalate, PrivilegedCommand};
use texfly_core::package_manager::{
    EscalationState, PackageCandidateSet, PackageIndex, PackageInstaller, TlmgrInstaller,
};
use texfly_log::ir::MissingResource;

/// Replays compiler outputs in order, repeating the last one forever.
struct ScriptedCompiler {
    outputs: VecDeque<(String, i32)>,
    last: (String, i32),
    compiles: usize,
}

impl ScriptedCompiler {
    fn new(outputs: &[(&str, i32)]) -> Self {
        Self {
            outputs: outputs.iter().map(|(o, c)| (o.to_string(), *c)).collect(),
            last: (String::new(), 0),
            compiles: 0,
        }
    }
}

impl Compile for ScriptedCompiler {
    fn compile(&mut self, _document: &Path) -> Result<CompileResult, LaunchError> {
        self.compiles += 1;
        if let Some(next) = self.outputs.pop_front() {
            self.last = next;
        }
        Ok(CompileResult {
            output: self.last.0.clone(),
            exit_code: self.last.1,
        })
    }
}

struct MissingCompiler;

impl Compile for MissingCompiler {
    fn compile(&mut self, _document: &Path) -> Result<CompileResult, LaunchError> {
        Err(LaunchError {
            compiler: "pdflatex".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

#[derive(Default)]
struct FakeIndex {
    files: HashMap<String, Vec<&'static str>>,
    fonts: HashMap<String, Vec<&'static str>>,
    queries: std::cell::RefCell<Vec<String>>,
}

impl PackageIndex for FakeIndex {
    fn resolve_file(&self, name: &str) -> PackageCandidateSet {
        self.queries.borrow_mut().push(name.to_string());
        self.files.get(name).into_iter().flatten().copied().collect()
    }

    fn resolve_font(&self, name: &str) -> PackageCandidateSet {
        self.queries.borrow_mut().push(name.to_string());
        self.fonts.get(name).into_iter().flatten().copied().collect()
    }
}

#[derive(Default)]
struct RecordingInstaller {
    batches: Vec<PackageCandidateSet>,
}

impl PackageInstaller for RecordingInstaller {
    fn install(&mut self, candidates: &PackageCandidateSet) -> Result<(), InstallError> {
        self.batches.push(candidates.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CountingEscalator {
    commands: Vec<Vec<String>>,
    exhausted: bool,
}

impl Escalate for CountingEscalator {
    fn escalate(&mut self, command: &PrivilegedCommand) -> Result<(), EscalationError> {
        self.commands.push(command.args.clone());
        if self.exhausted {
            Err(EscalationError::Exhausted {
                attempted: vec!["gksudo".into(), "new terminal".into()],
            })
        } else {
            Ok(())
        }
    }
}

fn set(names: &[&str]) -> PackageCandidateSet {
    names.iter().copied().collect()
}

const MISSING_FOO: &str = "(./main.tex\n! LaTeX Error: File `foo.sty' not found.\n";
const CLEAN: &str = "(./main.tex)\nOutput written on main.pdf (1 page).\n";
const PLAIN_FONT: &str = "! Font \\tenrm=cmr10 not loadable: Metric (TFM) file not found.\n";

#[test]
fn test_single_missing_package_then_clean() {
    let compiler = ScriptedCompiler::new(&[(MISSING_FOO, 1), (CLEAN, 0)]);
    let mut index = FakeIndex::default();
    index.files.insert("foo.sty".into(), vec!["foo"]);

    let mut run = ConvergenceLoop::new("main.tex", compiler, index, RecordingInstaller::default());
    let outcome = run.run().unwrap();

    assert!(outcome.converged());
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.compiles, 2);
    assert_eq!(
        outcome.attempts,
        vec![(
            MissingResource::ExplicitFile("foo.sty".into()),
            set(&["foo"])
        )]
    );
    assert_eq!(run.installer().batches.len(), 1);
}

#[test]
fn test_recurring_font_error_installs_once() {
    let compiler = ScriptedCompiler::new(&[(PLAIN_FONT, 1), (PLAIN_FONT, 1)]);
    let mut index = FakeIndex::default();
    index.files.insert("cmr10.tfm".into(), vec!["cm"]);

    let mut run = ConvergenceLoop::new("letter.tex", compiler, index, RecordingInstaller::default());
    let outcome = run.run().unwrap();

    assert!(outcome.converged());
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(outcome.compiles, 2);
    assert_eq!(run.installer().batches, vec![set(&["cm"])]);
}

#[test]
fn test_unresolvable_file_stops() {
    // Nothing provides the file; the loop still recompiles once, then stops.
    let compiler = ScriptedCompiler::new(&[(MISSING_FOO, 1)]);
    let mut run = ConvergenceLoop::new(
        "main.tex",
        compiler,
        FakeIndex::default(),
        RecordingInstaller::default(),
    );
    let outcome = run.run().unwrap();

    assert!(outcome.converged());
    assert_eq!(outcome.compiles, 2);
    assert!(outcome.attempts[0].1.is_empty());
}

#[test]
fn test_self_reference_is_not_installed() {
    let compiler = ScriptedCompiler::new(&[("! I can't find file `main.tex'.\n", 1)]);
    let index = FakeIndex::default();
    let mut run = ConvergenceLoop::new("main.tex", compiler, index, RecordingInstaller::default());
    let outcome = run.run().unwrap();

    assert_eq!(outcome.compiles, 1);
    assert!(outcome.attempts.is_empty());
    assert!(run.installer().batches.is_empty());
}

#[test]
fn test_tiers_walked_in_priority_order() {
    let output = "! LaTeX Error: File `libertine.sty' not found.\n\
                  ! Font \\EU1/LinuxLibertineO(0)/m/n/10=file:Linux Libertine O:script=latn at 10pt not loadable.\n";
    let compiler = ScriptedCompiler::new(&[(output, 1)]);
    let mut run = ConvergenceLoop::new(
        "thesis.tex",
        compiler,
        FakeIndex::default(),
        RecordingInstaller::default(),
    );
    let outcome = run.run().unwrap();

    let kinds: Vec<&MissingResource> = outcome.attempts.iter().map(|(r, _)| r).collect();
    assert_eq!(
        kinds,
        vec![
            &MissingResource::ExplicitFile("libertine.sty".into()),
            // Intentional: the `file:` spec also reaches the metric tier once.
            &MissingResource::FontFile("file:Linux.tfm".into()),
            &MissingResource::FontName("Linux Libertine O".into()),
        ]
    );
    assert_eq!(outcome.compiles, 4);
}

#[test]
fn test_iterations_bounded_by_distinct_identifiers() {
    // Alternating errors: each one was already handled once.
    let a = "! LaTeX Error: File `a.sty' not found.\n";
    let b = "! LaTeX Error: File `b.sty' not found.\n";
    let compiler = ScriptedCompiler::new(&[(a, 1), (b, 1), (a, 1), (b, 1), (a, 1)]);
    let mut run = ConvergenceLoop::new(
        "main.tex",
        compiler,
        FakeIndex::default(),
        RecordingInstaller::default(),
    );
    let outcome = run.run().unwrap();

    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.compiles, 3);
    assert_eq!(run.memory().attempts(), 2);
}

#[test]
fn test_launch_error_is_fatal() {
    let mut run = ConvergenceLoop::new(
        "main.tex",
        MissingCompiler,
        FakeIndex::default(),
        RecordingInstaller::default(),
    );
    let err = run.run().unwrap_err();
    assert_eq!(err.compiler, "pdflatex");
}

#[test]
fn test_escalation_routing_without_write_permission() {
    let c = "! LaTeX Error: File `c.sty' not found.\n";
    let compiler = ScriptedCompiler::new(&[(MISSING_FOO, 1), (c, 1), (CLEAN, 0)]);
    let mut index = FakeIndex::default();
    index.files.insert("foo.sty".into(), vec!["foo", "foo-extra"]);
    index.files.insert("c.sty".into(), vec!["cee"]);

    let installer = TlmgrInstaller::new(
        PathBuf::from("tlmgr"),
        EscalationState {
            write_permission: false,
            self_updated: false,
        },
        CountingEscalator::default(),
    );
    let mut run = ConvergenceLoop::new("main.tex", compiler, index, installer);
    let outcome = run.run().unwrap();

    assert!(outcome.converged());
    assert_eq!(
        run.installer().escalator().commands,
        vec![
            vec!["update".to_string(), "--self".to_string()],
            vec!["install".to_string(), "foo".to_string(), "foo-extra".to_string()],
            vec!["install".to_string(), "cee".to_string()],
        ]
    );
}

#[test]
fn test_exhausted_escalation_keeps_compiler_exit_code() {
    let compiler = ScriptedCompiler::new(&[(MISSING_FOO, 7), (CLEAN, 0)]);
    let mut index = FakeIndex::default();
    index.files.insert("foo.sty".into(), vec!["foo"]);

    let installer = TlmgrInstaller::new(
        PathBuf::from("tlmgr"),
        EscalationState::default(),
        CountingEscalator {
            exhausted: true,
            ..CountingEscalator::default()
        },
    );
    let mut run = ConvergenceLoop::new("main.tex", compiler, index, installer);
    let outcome = run.run().unwrap();

    assert_eq!(outcome.exit_code, 7);
    assert_eq!(outcome.compiles, 1);
    assert!(matches!(
        outcome.stop,
        StopReason::InstallFailed(InstallError::Escalation(EscalationError::Exhausted { .. }))
    ));
    assert_eq!(run.compiler().compiles, 1);
}
