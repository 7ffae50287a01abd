//! Build manifest loading.
//!
//! A manifest is a JSON description of the rules of a project and of the
//! genrules to run over them. It is what the CLI reads; library callers with
//! their own graph can skip it entirely.

mod types;

pub use types::*;
