use crate::ir::{Detections, MissingResource, ResourceTier};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

static LATEX_FILE_NOT_FOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"! LaTeX Error: File `([^`']*)' not found").unwrap());
static TEX_CANT_FIND_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"! I can't find file `([^`']*)'").unwrap());
// `! Font \T1/cmr/m/n/10=ecrm1000 at 10.0pt not loadable: ...`
// Also fires on XeTeX `=file:Foo Serif` specs, giving `file:Foo.tfm`. That
// lookup finds nothing and the font-name tier takes over on the next compile.
// Intentional: do not exclude `file:` here.
static FONT_METRIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"! Font \\[^=]*=([^\s]*)\s").unwrap());
// `! Font \EU1/Foo(0)/m/n/10=file:Foo Serif:script=latn at 10pt not loadable`
static FONT_FILE_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"! Font [^\n]*file:([^:\n]*):").unwrap());
static FONT_PATH_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"! Font \\[^/]*/([^/]*)/").unwrap());

/// Extension appended to names pulled out of font metric errors.
pub const METRIC_EXTENSION: &str = ".tfm";

/// Scans captured compiler output for missing files and fonts.
///
/// The classifier is bound to the document being compiled so that the
/// document never reports itself as a missing dependency.
#[derive(Debug, Clone)]
pub struct DiagnosticClassifier {
    document: PathBuf,
}

impl DiagnosticClassifier {
    pub fn new(document: impl Into<PathBuf>) -> Self {
        Self {
            document: document.into(),
        }
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Collects every match of every tier, in the order the patterns are
    /// applied.
    pub fn detect(&self, output: &str) -> Detections {
        let files = captures(&LATEX_FILE_NOT_FOUND, output)
            .chain(captures(&TEX_CANT_FIND_FILE, output))
            .filter(|name| !name.is_empty() && !self.is_document(name))
            .map(str::to_string)
            .collect();

        let font_files = captures(&FONT_METRIC, output)
            .filter(|name| !name.is_empty())
            .map(|name| format!("{}{}", name, METRIC_EXTENSION))
            .collect();

        let fonts = captures(&FONT_FILE_SPEC, output)
            .chain(captures(&FONT_PATH_SEGMENT, output))
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .collect();

        Detections {
            files,
            font_files,
            fonts,
        }
    }

    /// Returns the resource to act on next, or `None` when nothing new was
    /// detected and the compile that produced `output` is the final one.
    pub fn classify(&self, output: &str, memory: &ResolutionMemory) -> Option<MissingResource> {
        memory.select(&self.detect(output))
    }

    fn is_document(&self, name: &str) -> bool {
        let name = without_cur_dir(Path::new(name));
        let document = without_cur_dir(&self.document);
        if name == document {
            return true;
        }
        // TeX may echo the bare file name, with or without extension.
        match (name.parent(), document.file_name()) {
            (Some(parent), Some(file_name)) if parent.as_os_str().is_empty() => {
                name.as_os_str() == file_name
                    || (document.extension().is_some()
                        && Some(name.as_os_str()) == document.file_stem())
            }
            _ => false,
        }
    }
}

/// `./main.tex` and `main.tex` name the same file.
fn without_cur_dir(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}

fn captures<'a>(pattern: &'a Regex, output: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    pattern
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Identifiers already acted on, one slot per tier.
///
/// Lives for the whole run and is never reset: once an identifier has been
/// resolved for a tier, seeing it again in that tier is proof that the
/// install did not help, so it is never acted on twice.
#[derive(Debug, Clone, Default)]
pub struct ResolutionMemory {
    last: [Option<String>; 3],
    attempted: [HashSet<String>; 3],
}

impl ResolutionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the top match of the highest-priority tier whose top match has
    /// not been attempted yet.
    pub fn select(&self, detections: &Detections) -> Option<MissingResource> {
        ResourceTier::ALL.into_iter().find_map(|tier| {
            detections
                .top(tier)
                .filter(|name| !self.was_attempted(tier, name))
                .map(|name| MissingResource::new(tier, name.to_string()))
        })
    }

    pub fn record(&mut self, resource: &MissingResource) {
        let slot = resource.tier().index();
        self.attempted[slot].insert(resource.name().to_string());
        self.last[slot] = Some(resource.name().to_string());
    }

    pub fn was_attempted(&self, tier: ResourceTier, name: &str) -> bool {
        self.attempted[tier.index()].contains(name)
    }

    /// The identifier most recently acted on for `tier`.
    pub fn last(&self, tier: ResourceTier) -> Option<&str> {
        self.last[tier.index()].as_deref()
    }

    /// Number of distinct identifiers acted on across all tiers.
    pub fn attempts(&self) -> usize {
        self.attempted.iter().map(HashSet::len).sum()
    }
}
