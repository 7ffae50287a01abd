use std::collections::HashSet;

use tracing::trace;

use crate::fs::Filesystem;
use crate::graph::RuleGraph;
use crate::rule::{BuildRule, BuildTarget, RuleKind};

use super::types::{ResolveError, ResourceResolution};

/// Strategy for finding the resource dependencies of one kind of packaging rule.
pub trait ResourceDepsFinder {
  /// Finds the transitive resource dependencies, in the order they should be
  /// handed to resource compilation.
  fn find_resource_deps(&self, walker: &ResourceWalker<'_>) -> Result<ResourceResolution, ResolveError>;
}

/// Depth-first walk over a [`RuleGraph`] collecting resources.
///
/// Each rule is entered once, in pre-order, following the declaration order
/// of `deps`. Assets-only rules are traversed but not listed.
#[derive(Clone, Copy)]
pub struct ResourceWalker<'a> {
  graph: &'a dyn RuleGraph,
  fs: &'a dyn Filesystem,
}

impl<'a> ResourceWalker<'a> {
  pub fn new(graph: &'a dyn RuleGraph, fs: &'a dyn Filesystem) -> Self {
    Self { graph, fs }
  }

  pub fn walk(&self, roots: &[BuildTarget]) -> Result<ResourceResolution, ResolveError> {
    let mut visited: HashSet<&'a BuildTarget> = HashSet::new();
    let mut on_stack: HashSet<&'a BuildTarget> = HashSet::new();
    let mut out = ResourceResolution::default();

    for root in roots {
      if visited.contains(root) {
        continue;
      }
      let rule = self.lookup(root)?;
      self.enter(rule, &mut visited, &mut on_stack, &mut out)?;

      let mut stack: Vec<(&'a BuildRule, usize)> = vec![(rule, 0)];
      while let Some(frame) = stack.last_mut() {
        let (rule, next) = *frame;
        frame.1 += 1;

        match rule.deps.get(next) {
          Some(dep) if on_stack.contains(dep) => {
            return Err(ResolveError::CyclicGraphDetected { target: dep.clone() });
          }
          Some(dep) if visited.contains(dep) => {}
          Some(dep) => {
            let dep_rule = self.lookup(dep)?;
            self.enter(dep_rule, &mut visited, &mut on_stack, &mut out)?;
            stack.push((dep_rule, 0));
          }
          None => {
            on_stack.remove(&rule.target);
            stack.pop();
          }
        }
      }
    }

    Ok(out)
  }

  fn lookup(&self, target: &BuildTarget) -> Result<&'a BuildRule, ResolveError> {
    self
      .graph
      .rule(target)
      .ok_or_else(|| ResolveError::UnknownRule(target.clone()))
  }

  fn enter(
    &self,
    rule: &'a BuildRule,
    visited: &mut HashSet<&'a BuildTarget>,
    on_stack: &mut HashSet<&'a BuildTarget>,
    out: &mut ResourceResolution,
  ) -> Result<(), ResolveError> {
    visited.insert(&rule.target);
    on_stack.insert(&rule.target);

    let Some(res) = &rule.resources else {
      return Ok(());
    };

    if let Some(res_dir) = res.res_dir() {
      if !self.fs.is_dir(res_dir) {
        return Err(ResolveError::MissingResourceDirectory {
          target: rule.target.clone(),
          path: res_dir.to_path_buf(),
        });
      }
      trace!(target = %rule.target, res_dir = ?res_dir, "found resource dependency");
      out.resources.push(res.clone());
    }

    if let Some(assets_dir) = res.assets_dir() {
      out.asset_dirs.push(assets_dir.to_path_buf());
    }

    Ok(())
  }
}

/// Resources of an application binary: everything reachable from its deps.
#[derive(Debug, Clone)]
pub struct BinaryResources {
  pub roots: Vec<BuildTarget>,
}

impl ResourceDepsFinder for BinaryResources {
  fn find_resource_deps(&self, walker: &ResourceWalker<'_>) -> Result<ResourceResolution, ResolveError> {
    walker.walk(&self.roots)
  }
}

/// Resources of an instrumentation APK.
///
/// The APK under test already packages its own resources, so only the ones
/// reachable from the instrumentation rule and not from the APK under test
/// are listed, in their original order.
#[derive(Debug, Clone)]
pub struct InstrumentationResources {
  pub roots: Vec<BuildTarget>,
  pub apk_under_test: BuildTarget,
}

impl ResourceDepsFinder for InstrumentationResources {
  fn find_resource_deps(&self, walker: &ResourceWalker<'_>) -> Result<ResourceResolution, ResolveError> {
    let under_test = walker.walk(std::slice::from_ref(&self.apk_under_test))?;
    let own = walker.walk(&self.roots)?;

    let provided: HashSet<&BuildTarget> = under_test.resources.iter().map(|res| &res.target).collect();
    let resources = own
      .resources
      .into_iter()
      .filter(|res| !provided.contains(&res.target))
      .collect();
    let asset_dirs = own
      .asset_dirs
      .into_iter()
      .filter(|dir| !under_test.asset_dirs.contains(dir))
      .collect();

    Ok(ResourceResolution { resources, asset_dirs })
  }
}

/// The finder for a packaging rule, chosen by its kind.
pub fn finder_for(rule: &BuildRule) -> Result<Box<dyn ResourceDepsFinder + Send + Sync>, ResolveError> {
  match &rule.kind {
    RuleKind::Binary => Ok(Box::new(BinaryResources {
      roots: rule.deps.clone(),
    })),
    RuleKind::InstrumentationApk { apk_under_test } => Ok(Box::new(InstrumentationResources {
      roots: rule.deps.clone(),
      apk_under_test: apk_under_test.clone(),
    })),
    _ => Err(ResolveError::UnsupportedRuleKind(rule.target.clone())),
  }
}
