mod plan;
mod resolve;
mod run;

pub use plan::cmd_plan;
pub use resolve::cmd_resolve;
pub use run::cmd_run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use apkrule_lib::fs::LocalFilesystem;
use apkrule_lib::genrule::SandboxLayout;
use apkrule_lib::graph::DependencyGraph;
use apkrule_lib::manifest::BuildManifest;

/// A loaded manifest together with the graph and filesystem it is rooted at.
struct Project {
  manifest: BuildManifest,
  graph: DependencyGraph,
  fs: LocalFilesystem,
  layout: SandboxLayout,
}

impl Project {
  fn load(manifest_path: &Path, project_root: Option<&Path>) -> Result<Self> {
    let manifest = BuildManifest::from_path(manifest_path)
      .with_context(|| format!("Failed to load manifest: {}", manifest_path.display()))?;

    let root = match project_root {
      Some(root) => root.to_path_buf(),
      None => manifest_dir(manifest_path),
    };
    let fs =
      LocalFilesystem::open(&root).with_context(|| format!("Failed to open project root: {}", root.display()))?;

    let layout = SandboxLayout::default();
    let graph = manifest.to_graph(&layout).context("Invalid build graph")?;

    Ok(Self {
      manifest,
      graph,
      fs,
      layout,
    })
  }
}

fn manifest_dir(manifest_path: &Path) -> PathBuf {
  manifest_path
    .parent()
    .filter(|parent| !parent.as_os_str().is_empty())
    .map(Path::to_path_buf)
    .unwrap_or_else(|| PathBuf::from("."))
}
