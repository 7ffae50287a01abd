//! Build rules as supplied by the graph-loading subsystem.
//!
//! Rules are immutable once constructed. The resolver and planner only ever
//! read them.

mod types;

pub use types::{BuildRule, BuildTarget, ResourceDep, RuleKind, TargetError};
