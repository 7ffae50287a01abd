//! apkrule-lib: Core types and logic for apkrule
//!
//! This crate provides the two pieces of an Android build engine that sit
//! between the rule graph and the executor:
//! - `resources`: the transitive, ordered, deduplicated resource dependencies
//!   of a packaging rule, computed once and shared
//! - `genrule`: the sandboxed step plan of a rule that runs an external command
//! - `execute`: a reference runner for those plans

pub mod consts;
pub mod execute;
pub mod fs;
pub mod genrule;
pub mod graph;
pub mod manifest;
pub mod platform;
pub mod resources;
pub mod rule;
pub mod util;
