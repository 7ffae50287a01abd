use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a [`BuildTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
  #[error("build target '{0}' must start with '//'")]
  MissingPrefix(String),

  #[error("build target '{0}' must have the form //base/path:name")]
  MissingName(String),
}

/// Fully qualified identity of a build rule, e.g. `//src/com/facebook:sign_fb4a`.
///
/// The part before `:` is the base path (the directory of the build file,
/// relative to the project root); the part after is the short name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildTarget {
  base_path: String,
  name: String,
}

impl BuildTarget {
  pub fn new(base_path: &str, name: &str) -> Self {
    Self {
      base_path: base_path.trim_matches('/').to_string(),
      name: name.to_string(),
    }
  }

  pub fn parse(s: &str) -> Result<Self, TargetError> {
    let rest = s
      .strip_prefix("//")
      .ok_or_else(|| TargetError::MissingPrefix(s.to_string()))?;
    let (base, name) = rest
      .rsplit_once(':')
      .filter(|(_, name)| !name.is_empty())
      .ok_or_else(|| TargetError::MissingName(s.to_string()))?;
    Ok(Self::new(base, name))
  }

  /// Directory of the rule relative to the project root (empty for the root package).
  pub fn base_path(&self) -> &Path {
    Path::new(&self.base_path)
  }

  pub fn short_name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for BuildTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "//{}:{}", self.base_path, self.name)
  }
}

impl FromStr for BuildTarget {
  type Err = TargetError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for BuildTarget {
  type Error = TargetError;

  fn try_from(s: String) -> Result<Self, Self::Error> {
    Self::parse(&s)
  }
}

impl From<BuildTarget> for String {
  fn from(target: BuildTarget) -> Self {
    target.to_string()
  }
}

/// What a rule builds. Only the kinds that own a resource traversal
/// (`Binary`, `InstrumentationApk`) have behavior in this crate; the rest are
/// plain graph nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
  Library,
  Resource,
  Binary,
  InstrumentationApk { apk_under_test: BuildTarget },
  Genrule,
}

/// Packaged resources contributed by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDep {
  /// The rule exposing these resources.
  pub target: BuildTarget,

  /// Resource directory. `None` means the rule only carries assets.
  pub res_dir: Option<PathBuf>,

  /// Package the generated resource identifiers belong to.
  pub package: Option<String>,

  pub assets_dir: Option<PathBuf>,
}

impl ResourceDep {
  /// Returns the resource directory if the rule declares a non-empty one.
  pub fn res_dir(&self) -> Option<&Path> {
    self
      .res_dir
      .as_deref()
      .filter(|dir| !dir.as_os_str().is_empty())
  }

  pub fn assets_dir(&self) -> Option<&Path> {
    self
      .assets_dir
      .as_deref()
      .filter(|dir| !dir.as_os_str().is_empty())
  }
}

/// A node of the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRule {
  pub target: BuildTarget,
  pub kind: RuleKind,

  /// Direct dependencies, in declaration order. Traversals follow this order.
  pub deps: Vec<BuildTarget>,

  pub resources: Option<ResourceDep>,

  /// Omit this rule from merged (dex) dependency views.
  pub exclude_from_merge: bool,

  /// Path of the artifact the rule produces, relative to the project root.
  pub output: Option<PathBuf>,
}

impl BuildRule {
  pub fn new(target: BuildTarget, kind: RuleKind) -> Self {
    Self {
      target,
      kind,
      deps: Vec::new(),
      resources: None,
      exclude_from_merge: false,
      output: None,
    }
  }

  pub fn with_deps(mut self, deps: impl IntoIterator<Item = BuildTarget>) -> Self {
    self.deps = deps.into_iter().collect();
    self
  }

  /// Attach resources. The directories are recorded against this rule's target.
  pub fn with_resources(mut self, res_dir: Option<&str>, package: Option<&str>, assets_dir: Option<&str>) -> Self {
    self.resources = Some(ResourceDep {
      target: self.target.clone(),
      res_dir: res_dir.map(PathBuf::from),
      package: package.map(str::to_string),
      assets_dir: assets_dir.map(PathBuf::from),
    });
    self
  }

  pub fn excluded_from_merge(mut self) -> Self {
    self.exclude_from_merge = true;
    self
  }

  pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
    self.output = Some(output.into());
    self
  }

  /// Resources of this rule when it declares a non-empty resource directory.
  pub fn android_resources(&self) -> Option<&ResourceDep> {
    self.resources.as_ref().filter(|res| res.res_dir().is_some())
  }
}
