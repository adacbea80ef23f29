//! # texfly log classifier
//!
//! Turns the unstructured output of a TeX engine into a typed
//! [`MissingResource`](ir::MissingResource).
//!
//! Three patterns are applied, from most to least reliable:
//!
//! 1. explicit missing files (`! LaTeX Error: File `foo.sty' not found`)
//! 2. font metric files inferred from font loading errors (`ecrm1000.tfm`)
//! 3. font family names scraped from font errors (`Linux Libertine O`)
//!
//! The [`ResolutionMemory`](classifier::ResolutionMemory) remembers what has
//! already been acted on per tier, which is what lets the compile loop stop.
//!
//! ```
//! use texfly_log::{DiagnosticClassifier, ResolutionMemory};
//! use texfly_log::ir::MissingResource;
//!
//! let classifier = DiagnosticClassifier::new("main.tex");
//! let mut memory = ResolutionMemory::new();
//! let output = "! LaTeX Error: File `tikz.sty' not found.\n";
//!
//! let found = classifier.classify(output, &memory);
//! assert_eq!(found, Some(MissingResource::ExplicitFile("tikz.sty".into())));
//!
//! memory.record(found.as_ref().unwrap());
//! assert_eq!(classifier.classify(output, &memory), None);
//! ```

/// Classifier implementation and resolution memory.
pub mod classifier;
/// Typed missing-resource IR.
pub mod ir;


pub use classifier::{DiagnosticClassifier, ResolutionMemory};
