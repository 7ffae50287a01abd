//! Target platform and per-host path defaults.
//!
//! The platform is always passed explicitly to the planner; [`Os::current`]
//! exists for callers that want to plan for the host.

pub mod os;
pub mod paths;

pub use os::Os;
