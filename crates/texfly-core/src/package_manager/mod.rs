//! Package resolution and installation through the TeX Live Manager.
//!
//! ## Overview
//!
//! A missing resource goes through two steps:
//!
//! ```text
//!  MissingResource ──► PackageIndex ──► PackageCandidateSet ──► PackageInstaller
//!                     (tlmgr search)                           (tlmgr install,
//!                                                               maybe escalated)
//! ```
//!
//! Both steps sit behind traits so the compile loop can be driven by test
//! doubles. The production implementations, [`TlmgrIndex`] and
//! [`TlmgrInstaller`], run `tlmgr` through a shared
//! [`CommandExecutor`](crate::exec::CommandExecutor).
//!
//! Resolution is always a live query: nothing is cached between calls.

use std::collections::BTreeSet;
use std::fmt;

pub mod index;
pub mod installer;

pub use index::{PackageIndex, TlmgrIndex, FALSE_POSITIVE_PACKAGE};
pub use installer::{EscalationState, PackageInstaller, TlmgrInstaller};

/// Deduplicated package names found for one missing resource.
///
/// Empty means unresolved. More than one entry means the search was
/// ambiguous; all of them get installed, since a spurious package costs less
/// than a missing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageCandidateSet(BTreeSet<String>);

impl PackageCandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, package: impl Into<String>) -> bool {
        self.0.insert(package.into())
    }

    pub fn remove(&mut self, package: &str) -> bool {
        self.0.remove(package)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.0.contains(package)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PackageCandidateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for PackageCandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        f.write_str(&names.join(" "))
    }
}
