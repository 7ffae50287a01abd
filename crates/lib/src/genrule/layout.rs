use std::path::{Path, PathBuf};

use crate::consts::{SRCS_DIR_SUFFIX, TMP_DIR_SUFFIX};
use crate::platform::paths::gen_dir;
use crate::rule::BuildTarget;

/// Where a genrule's output and private directories live.
///
/// Every path is keyed by the rule's target, so two rules never share a
/// working or staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
  gen_dir: PathBuf,
}

impl Default for SandboxLayout {
  fn default() -> Self {
    Self::new(gen_dir())
  }
}

impl SandboxLayout {
  pub fn new(gen_dir: impl Into<PathBuf>) -> Self {
    Self { gen_dir: gen_dir.into() }
  }

  pub fn gen_dir(&self) -> &Path {
    &self.gen_dir
  }

  /// `<gen>/<base>/<out>`
  pub fn output_path(&self, target: &BuildTarget, out: &str) -> PathBuf {
    self.rule_dir(target).join(out)
  }

  /// `<gen>/<base>/<name>__tmp`, the command's working directory.
  pub fn tmp_dir(&self, target: &BuildTarget) -> PathBuf {
    self
      .rule_dir(target)
      .join(format!("{}{}", target.short_name(), TMP_DIR_SUFFIX))
  }

  /// `<gen>/<base>/<name>__srcs`, where inputs are staged.
  pub fn srcs_dir(&self, target: &BuildTarget) -> PathBuf {
    self
      .rule_dir(target)
      .join(format!("{}{}", target.short_name(), SRCS_DIR_SUFFIX))
  }

  fn rule_dir(&self, target: &BuildTarget) -> PathBuf {
    self.gen_dir.join(target.base_path())
  }
}
