//! Implementation of the `apkrule resolve` command.
//!
//! Lists the resource dependencies of a set of rules in the order resource
//! compilation consumes them.

use std::path::Path;

use anyhow::{Context, Result};

use apkrule_lib::resources::ResourceResolver;
use apkrule_lib::rule::BuildTarget;

use crate::output::{print_info, print_json, print_stat, print_success};

use super::Project;

pub fn cmd_resolve(
  manifest_path: &Path,
  project_root: Option<&Path>,
  roots: Vec<BuildTarget>,
  rule: Option<BuildTarget>,
  exclude_flagged: bool,
  json: bool,
) -> Result<()> {
  let project = Project::load(manifest_path, project_root)?;

  let resolver = match &rule {
    Some(target) => ResourceResolver::for_rule(&project.graph, &project.fs, target)
      .with_context(|| format!("Cannot resolve resources for {}", target))?,
    None => ResourceResolver::for_roots(&project.graph, &project.fs, roots),
  };

  let (resources, details) = if exclude_flagged {
    resolver
      .resolve_merge_view()
      .and_then(|resources| Ok((resources, resolver.merge_view_details()?)))
  } else {
    resolver
      .resolve()
      .and_then(|list| Ok((list.to_vec(), resolver.resource_details()?)))
  }
  .context("Resource resolution failed")?;

  if json {
    let json_output = serde_json::json!({
      "resources": resources,
      "res_dirs": details.res_dirs,
      "packages": details.packages,
      "asset_dirs": details.asset_dirs,
    });
    return print_json(&json_output);
  }

  if resources.is_empty() {
    print_info("No resource dependencies");
  } else {
    print_success(&format!("{} resource dependencies", resources.len()));
    for res in &resources {
      let res_dir = res.res_dir().map(|dir| dir.display().to_string()).unwrap_or_default();
      match &res.package {
        Some(package) => println!("  {} {} ({})", res.target, res_dir, package),
        None => println!("  {} {}", res.target, res_dir),
      }
    }
  }

  if !details.asset_dirs.is_empty() {
    println!();
    print_stat("Assets", &details.asset_dirs.len().to_string());
    for dir in &details.asset_dirs {
      println!("  {}", dir.display());
    }
  }

  Ok(())
}
