use std::collections::HashSet;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::graph::RuleGraph;
use crate::rule::{BuildTarget, ResourceDep};

/// Errors that can occur while resolving resource dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// A reachable rule declares a resource directory that is not on disk.
  #[error("rule {target} declares resource directory {} which does not exist", path.display())]
  MissingResourceDirectory { target: BuildTarget, path: PathBuf },

  /// The traversal re-entered a rule that is still on its stack.
  #[error("dependency cycle detected at {target}")]
  CyclicGraphDetected { target: BuildTarget },

  /// A root or dependency is not part of the graph.
  #[error("unknown rule: {0}")]
  UnknownRule(BuildTarget),

  /// The rule kind has no resource traversal (only binaries and instrumentation APKs do).
  #[error("rule {0} does not package resources")]
  UnsupportedRuleKind(BuildTarget),
}

/// What one traversal produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceResolution {
  /// Rules with a resource directory, in first-discovered order.
  pub resources: Vec<ResourceDep>,

  /// Asset directories of every traversed rule, assets-only rules included.
  pub asset_dirs: Vec<PathBuf>,
}

/// Immutable, cheaply cloneable list of resource dependencies.
///
/// Clones share the same allocation, so a memoized list handed out twice is
/// pointer-identical (see [`ResolvedResourceList::ptr_eq`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResourceList(Arc<[ResourceDep]>);

impl ResolvedResourceList {
  pub fn new(resources: Vec<ResourceDep>) -> Self {
    Self(resources.into())
  }

  pub fn targets(&self) -> impl Iterator<Item = &BuildTarget> {
    self.0.iter().map(|res| &res.target)
  }

  /// True if both lists are the same allocation.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}

impl Deref for ResolvedResourceList {
  type Target = [ResourceDep];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

/// Rules to omit from a derived view without touching the primary list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(HashSet<BuildTarget>);

impl ExclusionSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Entries of `list` whose rule carries the `exclude_from_merge` flag.
  pub fn flagged(graph: &dyn RuleGraph, list: &[ResourceDep]) -> Self {
    list
      .iter()
      .filter(|res| graph.rule(&res.target).is_some_and(|rule| rule.exclude_from_merge))
      .map(|res| res.target.clone())
      .collect()
  }

  pub fn insert(&mut self, target: BuildTarget) -> bool {
    self.0.insert(target)
  }

  pub fn contains(&self, target: &BuildTarget) -> bool {
    self.0.contains(target)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl FromIterator<BuildTarget> for ExclusionSet {
  fn from_iter<I: IntoIterator<Item = BuildTarget>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Aggregated inputs for resource compilation, derived from a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceDetails {
  /// Resource directories in precedence order.
  pub res_dirs: Vec<PathBuf>,

  /// Distinct packages, in order of first appearance.
  pub packages: Vec<String>,

  pub asset_dirs: Vec<PathBuf>,
}

impl ResourceDetails {
  pub(crate) fn collect<'a>(resources: impl IntoIterator<Item = &'a ResourceDep>, asset_dirs: &[PathBuf]) -> Self {
    let mut details = ResourceDetails {
      asset_dirs: asset_dirs.to_vec(),
      ..Default::default()
    };

    for res in resources {
      if let Some(dir) = res.res_dir() {
        details.res_dirs.push(dir.to_path_buf());
      }
      if let Some(package) = &res.package
        && !details.packages.contains(package)
      {
        details.packages.push(package.clone());
      }
    }

    details
  }
}
