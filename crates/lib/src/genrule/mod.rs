//! Sandboxed step planning for command-running rules.
//!
//! [`GenrulePlanner::plan`] turns a [`CommandSpec`] into a fixed-shape
//! [`StepPlan`]:
//!
//! 1. remove the previous output
//! 2. create the output's parent directory
//! 3. clean the rule's working directory
//! 4. clean the rule's staged-inputs directory
//! 5. symlink each input into the staging directory (sorted)
//! 6. run the command with `OUT` and the bound tokens in its environment
//!
//! Planning is a pure function of its arguments: the platform and the
//! inherited environment are passed in, never read from the host.

mod layout;
mod plan;
mod shell;
mod types;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::rule::BuildTarget;

pub use layout::SandboxLayout;
pub use plan::{GenrulePlanner, PlanContext, PlannerConfig};
pub use shell::shell_argv;
pub use types::{CommandSpec, Environment, PlanError, Step, StepPlan};

/// Maps a rule to the artifact it produces, relative to the project root
/// (or absolute).
pub trait ArtifactLocator {
  fn artifact_path(&self, target: &BuildTarget) -> Option<&Path>;
}

impl ArtifactLocator for BTreeMap<BuildTarget, PathBuf> {
  fn artifact_path(&self, target: &BuildTarget) -> Option<&Path> {
    self.get(target).map(PathBuf::as_path)
  }
}
