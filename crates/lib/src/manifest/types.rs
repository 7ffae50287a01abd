//! Manifest types for apkrule.
//!
//! # Example
//!
//! ```json
//! {
//!   "rules": [
//!     { "target": "//res/a:res", "type": "resource", "res_dir": "res/a/res", "package": "com.a" },
//!     { "target": "//apps:fb4a", "type": "binary", "deps": ["//res/a:res"], "output": "build-out/fb4a.apk" }
//!   ],
//!   "genrules": [
//!     { "target": "//src:sign", "cmd": "python signer.py $APK > $OUT", "out": "signed.apk",
//!       "srcs": ["src/signer.py"], "tokens": { "APK": "//apps:fb4a" } }
//!   ]
//! }
//! ```
//!
//! Genrules become graph nodes of kind [`RuleKind::Genrule`] whose
//! dependencies are their token targets and whose output lies under the
//! sandbox layout, so one genrule can consume another's output.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::genrule::{CommandSpec, SandboxLayout};
use crate::graph::{DependencyGraph, GraphError};
use crate::rule::{BuildRule, BuildTarget, ResourceDep, RuleKind};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid manifest: {0}")]
  Parse(#[from] serde_json::Error),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error("{0} has type genrule; declare it under \"genrules\" instead")]
  GenruleKind(BuildTarget),
}

/// A non-genrule rule as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDecl {
  pub target: BuildTarget,

  #[serde(flatten)]
  pub kind: RuleKind,

  #[serde(default)]
  pub deps: Vec<BuildTarget>,

  #[serde(default)]
  pub res_dir: Option<PathBuf>,

  #[serde(default)]
  pub package: Option<String>,

  #[serde(default)]
  pub assets_dir: Option<PathBuf>,

  #[serde(default)]
  pub exclude_from_merge: bool,

  #[serde(default)]
  pub output: Option<PathBuf>,
}

impl RuleDecl {
  fn into_rule(self) -> BuildRule {
    let has_resources = self.res_dir.is_some() || self.package.is_some() || self.assets_dir.is_some();
    let resources = has_resources.then(|| ResourceDep {
      target: self.target.clone(),
      res_dir: self.res_dir,
      package: self.package,
      assets_dir: self.assets_dir,
    });

    BuildRule {
      target: self.target,
      kind: self.kind,
      deps: self.deps,
      resources,
      exclude_from_merge: self.exclude_from_merge,
      output: self.output,
    }
  }
}

/// The complete set of rules of a project.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
  #[serde(default)]
  pub rules: Vec<RuleDecl>,

  #[serde(default)]
  pub genrules: Vec<CommandSpec>,
}

impl BuildManifest {
  pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest = Self::from_json(&content)?;
    debug!(
      path = ?path,
      rules = manifest.rules.len(),
      genrules = manifest.genrules.len(),
      "loaded manifest"
    );
    Ok(manifest)
  }

  pub fn from_json(content: &str) -> Result<Self, ManifestError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn genrule(&self, target: &BuildTarget) -> Option<&CommandSpec> {
    self.genrules.iter().find(|spec| &spec.target == target)
  }

  /// Assemble and validate the dependency graph.
  ///
  /// Genrule outputs are placed according to `layout`.
  pub fn to_graph(&self, layout: &SandboxLayout) -> Result<DependencyGraph, ManifestError> {
    let mut graph = DependencyGraph::new();

    for decl in &self.rules {
      if decl.kind == RuleKind::Genrule {
        return Err(ManifestError::GenruleKind(decl.target.clone()));
      }
      graph.add_rule(decl.clone().into_rule())?;
    }

    for spec in &self.genrules {
      let rule = BuildRule::new(spec.target.clone(), RuleKind::Genrule)
        .with_deps(spec.tokens.values().cloned())
        .with_output(layout.output_path(&spec.target, &spec.out));
      graph.add_rule(rule)?;
    }

    graph.validate()?;
    Ok(graph)
  }

  /// Genrules grouped into waves that can each run in parallel.
  ///
  /// A genrule lands in the wave after the latest genrule it consumes. Rules
  /// that are not genrules are expected to be built already.
  pub fn genrule_waves(&self) -> Result<Vec<Vec<&CommandSpec>>, ManifestError> {
    let index: HashMap<&BuildTarget, usize> = self
      .genrules
      .iter()
      .enumerate()
      .map(|(idx, spec)| (&spec.target, idx))
      .collect();

    // Edges only between genrules
    let deps: Vec<Vec<usize>> = self
      .genrules
      .iter()
      .map(|spec| spec.tokens.values().filter_map(|dep| index.get(dep).copied()).collect())
      .collect();

    let mut level: Vec<Option<usize>> = vec![None; self.genrules.len()];
    let mut current_level = 0;
    let mut remaining = self.genrules.len();

    while remaining > 0 {
      let ready: Vec<usize> = (0..self.genrules.len())
        .filter(|&idx| level[idx].is_none())
        .filter(|&idx| deps[idx].iter().all(|&dep| level[dep].is_some_and(|l| l < current_level)))
        .collect();

      if ready.is_empty() {
        let stuck = level.iter().position(Option::is_none).unwrap_or(0);
        return Err(GraphError::CycleDetected(self.genrules[stuck].target.clone()).into());
      }

      for idx in ready {
        level[idx] = Some(current_level);
        remaining -= 1;
      }
      current_level += 1;
    }

    let mut waves: BTreeMap<usize, Vec<&CommandSpec>> = BTreeMap::new();
    for (idx, spec) in self.genrules.iter().enumerate() {
      if let Some(l) = level[idx] {
        waves.entry(l).or_default().push(spec);
      }
    }

    Ok(waves.into_values().collect())
  }
}
