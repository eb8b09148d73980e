//! reqtrace-core - Core library for transition spec validation
//!
//! This crate provides the building blocks for validating a declarative
//! state-transition specification against an embedded firmware test suite:
//!
//! - Parsing the spec document into ordered structures ([`SpecDocument`])
//! - Indexing which test functions exist in source ([`FunctionIndex`])
//! - Extracting Gherkin-style annotation blocks from test sources
//!   ([`extract_annotations`])
//! - Building and running the compiled test binaries ([`TestRunner`])
//! - Classifying every spec entry into one verdict ([`classify`])
//!
//! # Features
//!
//! - `yaml` (default) - parse spec documents with the general-purpose
//!   `serde_yaml` parser. Without it, the built-in subset parser handles
//!   the one document shape this tool needs, with zero dependencies.
//!
//! # Classifying a spec
//!
//! ```
//! use reqtrace_core::{classify, parse_subset, FunctionIndex, SpecDocument, Status};
//!
//! let doc = parse_subset(
//!     "transitions:\n  - id: T1\n    test_function: test_plug_in\n",
//! );
//! let mut spec = SpecDocument::from_value(&doc);
//!
//! let mut index = FunctionIndex::new();
//! index.add_file_content("test_states.c", "void test_plug_in(void) {}");
//!
//! // Reference mode: existence of the function is sufficient evidence
//! classify(&mut spec.transitions, &index, None);
//! assert_eq!(spec.transitions[0].status, Some(Status::Pass));
//! ```

mod annotations;
mod classify;
mod document;
mod runner;
mod scanner;
mod spec;

pub use annotations::{TestAnnotation, extract_annotations, extract_from_dir, parse_annotation_block};
pub use classify::{Status, classify};
pub use document::{
    DocValue, has_general_parser, load_document, parse_document, parse_scalar, parse_subset,
    serialize_document,
};
pub use runner::{FAIL_MARKER, PASS_MARKER, RunOutcome, RunResults, TestRunner};
pub use scanner::FunctionIndex;
pub use spec::{SpecDocument, TransitionSpec};

#[cfg(feature = "yaml")]
pub use document::parse_yaml;
