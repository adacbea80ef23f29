use super::PackageCandidateSet;
use crate::error::IndexError;
use crate::exec::{CommandExecutor, RealCommandExecutor};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shows up in nearly every file search (`texmf-dist/tex/latex/<pkg>/...`)
/// and is dropped from every result, even when it is the real answer.
pub const FALSE_POSITIVE_PACKAGE: &str = "latex";

/// Search results outside the distribution tree are ignored.
const FILE_ROOT: &str = "texmf-dist/";
const FONT_ROOT: &str = "texmf-dist/fonts/";

/// Marker `tlmgr` prints when the account may not touch the installation.
pub(crate) const PERMISSION_MARKER: &str = "don't have permission";

static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((.*)\)").unwrap());

/// Maps missing files and fonts to the packages that provide them.
pub trait PackageIndex {
    fn resolve_file(&self, name: &str) -> PackageCandidateSet;
    fn resolve_font(&self, name: &str) -> PackageCandidateSet;
}

/// [`PackageIndex`] backed by `tlmgr search --global --file`.
#[derive(Debug, Clone)]
pub struct TlmgrIndex {
    path: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl TlmgrIndex {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            executor: Arc::new(RealCommandExecutor),
        }
    }

    /// Creates a new `TlmgrIndex` with a custom executor (for testing).
    pub fn with_executor(path: PathBuf, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { path, executor }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs the remote file search and returns its raw, trimmed lines.
    pub fn search(&self, term: &str) -> Result<Vec<String>, IndexError> {
        let output = self
            .executor
            .execute(&self.path, &["search", "--global", "--file", term])
            .map_err(|e| IndexError::Unavailable {
                path: self.path.clone(),
                source: e.downcast::<std::io::Error>().ok(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains(PERMISSION_MARKER) {
            return Err(IndexError::Denied {
                term: term.to_string(),
            });
        }
        if !output.status.success() {
            return Err(IndexError::Failed {
                term: term.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    fn lookup(&self, root: &str, term: &str, exact: bool) -> PackageCandidateSet {
        let kind = if root == FONT_ROOT { "font" } else { "file" };
        info!("Searching repositories for missing {} {}", kind, term);

        let candidates = match self.search(term) {
            Ok(lines) => candidate_packages(&lines, root, term, exact),
            Err(e) => {
                warn!("{}", e);
                PackageCandidateSet::new()
            }
        };

        if candidates.is_empty() {
            info!("No results found for {}", term);
        } else {
            debug!("Candidates for {}: {}", term, candidates);
        }
        candidates
    }
}

impl PackageIndex for TlmgrIndex {
    fn resolve_file(&self, name: &str) -> PackageCandidateSet {
        self.lookup(FILE_ROOT, name, true)
    }

    fn resolve_font(&self, name: &str) -> PackageCandidateSet {
        let font = strip_annotation(name);
        let found = self.lookup(FONT_ROOT, &font, false);
        if !found.is_empty() {
            return found;
        }

        // Font metadata casing is unreliable; try lower case once.
        let lowered = font.to_lowercase();
        if lowered == font {
            return found;
        }
        self.lookup(FONT_ROOT, &lowered, false)
    }
}

/// Removes `(...)` style annotations such as `Foo Serif(0)`.
pub fn strip_annotation(font: &str) -> String {
    PARENTHETICAL.replace_all(font, "").trim().to_string()
}

/// Reduces search output to package names.
///
/// Matching lines look like `texmf-dist/.../<package>/<file>`; sometimes
/// the package sits one directory higher, so both the parent and the
/// grandparent directory are taken.
pub fn candidate_packages(
    lines: &[String],
    root: &str,
    term: &str,
    exact: bool,
) -> PackageCandidateSet {
    let suffix = format!("/{}", term);
    let mut candidates: PackageCandidateSet = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !exact || line.ends_with(&suffix))
        // Directories making up `root` itself are never package names.
        .filter_map(|line| line.strip_prefix(root))
        .flat_map(|relative| {
            let mut dirs = relative.rsplit('/').skip(1);
            [dirs.next(), dirs.next()]
        })
        .flatten()
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .collect();

    candidates.remove(FALSE_POSITIVE_PACKAGE);
    candidates
}
