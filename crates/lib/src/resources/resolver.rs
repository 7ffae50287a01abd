use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::fs::Filesystem;
use crate::graph::RuleGraph;
use crate::rule::{BuildTarget, ResourceDep};

use super::finder::{BinaryResources, ResourceDepsFinder, ResourceWalker, finder_for};
use super::types::{ExclusionSet, ResolveError, ResolvedResourceList, ResourceDetails};

#[derive(Debug)]
struct Resolved {
  resources: ResolvedResourceList,
  asset_dirs: Vec<PathBuf>,
}

/// Resolves and caches the resource dependencies of one packaging rule.
///
/// The traversal runs at most once per instance. Concurrent first callers
/// block until it finishes and then observe the same list. Failures are
/// cached too; the graph is immutable, so retrying would fail the same way.
pub struct ResourceResolver<'g> {
  graph: &'g (dyn RuleGraph + Sync),
  fs: &'g (dyn Filesystem + Sync),
  finder: Box<dyn ResourceDepsFinder + Send + Sync + 'g>,
  resolved: OnceLock<Result<Resolved, ResolveError>>,
  traversals: AtomicUsize,
}

impl<'g> ResourceResolver<'g> {
  pub fn new(
    graph: &'g (dyn RuleGraph + Sync),
    fs: &'g (dyn Filesystem + Sync),
    finder: impl ResourceDepsFinder + Send + Sync + 'g,
  ) -> Self {
    Self::with_boxed_finder(graph, fs, Box::new(finder))
  }

  /// Resolver over everything reachable from `roots`.
  pub fn for_roots(graph: &'g (dyn RuleGraph + Sync), fs: &'g (dyn Filesystem + Sync), roots: Vec<BuildTarget>) -> Self {
    Self::new(graph, fs, BinaryResources { roots })
  }

  /// Resolver for a packaging rule of the graph, using the finder for its kind.
  pub fn for_rule(
    graph: &'g (dyn RuleGraph + Sync),
    fs: &'g (dyn Filesystem + Sync),
    target: &BuildTarget,
  ) -> Result<Self, ResolveError> {
    let rule = graph
      .rule(target)
      .ok_or_else(|| ResolveError::UnknownRule(target.clone()))?;
    Ok(Self::with_boxed_finder(graph, fs, finder_for(rule)?))
  }

  fn with_boxed_finder(
    graph: &'g (dyn RuleGraph + Sync),
    fs: &'g (dyn Filesystem + Sync),
    finder: Box<dyn ResourceDepsFinder + Send + Sync + 'g>,
  ) -> Self {
    Self {
      graph,
      fs,
      finder,
      resolved: OnceLock::new(),
      traversals: AtomicUsize::new(0),
    }
  }

  /// Ordered, deduplicated resource dependencies.
  ///
  /// Every call after the first returns a clone of the same list.
  pub fn resolve(&self) -> Result<ResolvedResourceList, ResolveError> {
    self.resolved().map(|resolved| resolved.resources.clone())
  }

  /// [`resolve`](Self::resolve) minus the rules in `excluded`, order preserved.
  pub fn resolve_excluding_merge(&self, excluded: &ExclusionSet) -> Result<Vec<ResourceDep>, ResolveError> {
    let resources = &self.resolved()?.resources;
    Ok(
      resources
        .iter()
        .filter(|res| !excluded.contains(&res.target))
        .cloned()
        .collect(),
    )
  }

  /// [`resolve_excluding_merge`](Self::resolve_excluding_merge) with the rules
  /// flagged `exclude_from_merge` in the graph.
  pub fn resolve_merge_view(&self) -> Result<Vec<ResourceDep>, ResolveError> {
    let resources = &self.resolved()?.resources;
    let excluded = ExclusionSet::flagged(self.graph, resources);
    self.resolve_excluding_merge(&excluded)
  }

  pub fn resource_details(&self) -> Result<ResourceDetails, ResolveError> {
    let resolved = self.resolved()?;
    Ok(ResourceDetails::collect(resolved.resources.iter(), &resolved.asset_dirs))
  }

  /// [`resource_details`](Self::resource_details) over the
  /// [`resolve_merge_view`](Self::resolve_merge_view) listing. Asset
  /// directories are not subject to merge exclusion and stay unchanged.
  pub fn merge_view_details(&self) -> Result<ResourceDetails, ResolveError> {
    let resources = self.resolve_merge_view()?;
    Ok(ResourceDetails::collect(resources.iter(), &self.resolved()?.asset_dirs))
  }

  /// Number of graph traversals performed so far (0 or 1).
  pub fn traversal_count(&self) -> usize {
    self.traversals.load(Ordering::SeqCst)
  }

  fn resolved(&self) -> Result<&Resolved, ResolveError> {
    let result = self.resolved.get_or_init(|| {
      self.traversals.fetch_add(1, Ordering::SeqCst);
      info!("resolving resource dependencies");

      let walker = ResourceWalker::new(self.graph, self.fs);
      let resolution = self.finder.find_resource_deps(&walker)?;

      debug!(
        resources = resolution.resources.len(),
        asset_dirs = resolution.asset_dirs.len(),
        "resource dependencies resolved"
      );

      Ok(Resolved {
        resources: ResolvedResourceList::new(resolution.resources),
        asset_dirs: resolution.asset_dirs,
      })
    });

    result.as_ref().map_err(Clone::clone)
  }
}
