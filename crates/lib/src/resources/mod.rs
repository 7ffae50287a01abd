//! Ordered resource dependencies of a packaged artifact.
//!
//! A binary (or instrumentation APK) needs the transitive closure of the
//! rules that contribute resources, in the order they were first discovered.
//! Downstream merging lets earlier entries win when resource identifiers
//! collide, so that order is part of the contract.
//!
//! - [`ResourceDepsFinder`]: per-rule-kind traversal strategy
//! - [`ResourceResolver`]: compute-once cache around a finder
//! - [`ExclusionSet`]: rules left out of the merged view

mod finder;
mod resolver;
mod types;

pub use finder::{BinaryResources, InstrumentationResources, ResourceDepsFinder, ResourceWalker, finder_for};
pub use resolver::ResourceResolver;
pub use types::{ExclusionSet, ResolveError, ResolvedResourceList, ResourceDetails, ResourceResolution};
