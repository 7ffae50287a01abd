//! The build-rule dependency graph.
//!
//! The graph is owned by whoever loaded it; this crate only reads it through
//! the [`RuleGraph`] trait. [`DependencyGraph`] is the arena implementation
//! used by the manifest loader and the tests.

use std::collections::HashMap;
use std::path::Path;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::debug;

use crate::genrule::ArtifactLocator;
use crate::rule::{BuildRule, BuildTarget};

/// Errors raised while assembling or validating a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  #[error("duplicate rule: {0}")]
  DuplicateRule(BuildTarget),

  #[error("rule {rule} depends on unknown rule {dep}")]
  UnknownDependency { rule: BuildTarget, dep: BuildTarget },

  #[error("dependency cycle detected through {0}")]
  CycleDetected(BuildTarget),
}

/// Read access to build rules by identity.
pub trait RuleGraph {
  fn rule(&self, target: &BuildTarget) -> Option<&BuildRule>;
}

/// Arena of build rules indexed by target.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
  rules: Vec<BuildRule>,
  index: HashMap<BuildTarget, usize>,
}

impl DependencyGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a graph from rules, rejecting duplicate targets.
  pub fn from_rules(rules: impl IntoIterator<Item = BuildRule>) -> Result<Self, GraphError> {
    let mut graph = Self::new();
    for rule in rules {
      graph.add_rule(rule)?;
    }
    Ok(graph)
  }

  pub fn add_rule(&mut self, rule: BuildRule) -> Result<(), GraphError> {
    if self.index.contains_key(&rule.target) {
      return Err(GraphError::DuplicateRule(rule.target));
    }
    self.index.insert(rule.target.clone(), self.rules.len());
    self.rules.push(rule);
    Ok(())
  }

  /// Rules in insertion order.
  pub fn rules(&self) -> impl Iterator<Item = &BuildRule> {
    self.rules.iter()
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Check that every dependency exists and that the graph is acyclic.
  ///
  /// Acyclicity is the caller's contract; this is the up-front version of
  /// the check the resource traversal also performs.
  pub fn validate(&self) -> Result<(), GraphError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.rules.len(), 0);
    let nodes: Vec<NodeIndex> = (0..self.rules.len()).map(|idx| graph.add_node(idx)).collect();

    for (idx, rule) in self.rules.iter().enumerate() {
      for dep in &rule.deps {
        let Some(&dep_idx) = self.index.get(dep) else {
          return Err(GraphError::UnknownDependency {
            rule: rule.target.clone(),
            dep: dep.clone(),
          });
        };
        graph.add_edge(nodes[idx], nodes[dep_idx], ());
      }
    }

    toposort(&graph, None).map_err(|cycle| {
      let rule = &self.rules[graph[cycle.node_id()]];
      GraphError::CycleDetected(rule.target.clone())
    })?;

    debug!(rules = self.rules.len(), "dependency graph validated");
    Ok(())
  }
}

impl RuleGraph for DependencyGraph {
  fn rule(&self, target: &BuildTarget) -> Option<&BuildRule> {
    self.index.get(target).map(|&idx| &self.rules[idx])
  }
}

impl ArtifactLocator for DependencyGraph {
  fn artifact_path(&self, target: &BuildTarget) -> Option<&Path> {
    self.rule(target).and_then(|rule| rule.output.as_deref())
  }
}
