//! Implementation of the `apkrule plan` command.
//!
//! Plans a single genrule against the current environment and prints its
//! steps without running any of them.

use std::path::Path;

use anyhow::{Context, Result, anyhow};

use apkrule_lib::genrule::{Environment, GenrulePlanner, PlanContext, PlannerConfig};
use apkrule_lib::platform::Os;
use apkrule_lib::rule::BuildTarget;
use apkrule_lib::util::hash::Hashable;

use crate::output::{print_json, print_stat, print_step, print_success};

use super::Project;

pub fn cmd_plan(
  manifest_path: &Path,
  project_root: Option<&Path>,
  target: &BuildTarget,
  platform: Option<Os>,
  json: bool,
) -> Result<()> {
  let project = Project::load(manifest_path, project_root)?;
  let spec = project
    .manifest
    .genrule(target)
    .ok_or_else(|| anyhow!("No genrule named {} in {}", target, manifest_path.display()))?;

  let defaults = PlannerConfig::default();
  let planner = GenrulePlanner::new(PlannerConfig {
    platform: platform.unwrap_or(defaults.platform),
    layout: project.layout.clone(),
    ..defaults
  });
  let env = Environment::from_process();
  let ctx = PlanContext {
    env: &env,
    artifacts: &project.graph,
    fs: &project.fs,
  };

  let plan = planner
    .plan_rule(spec, &ctx)
    .with_context(|| format!("Failed to plan {}", target))?;
  let hash = plan.compute_hash().context("Failed to compute plan hash")?;

  if json {
    let json_output = serde_json::json!({ "hash": hash.0, "plan": plan });
    return print_json(&json_output);
  }

  print_success(&format!("Plan for {}: {} steps", target, plan.len()));
  print_stat("Hash", &hash.0);
  print_stat("Output", &plan.output().display().to_string());
  print_stat("Platform", planner.config().platform.as_str());
  println!();
  for (index, step) in plan.steps().iter().enumerate() {
    print_step(index, step.short_name(), &step.description());
  }

  Ok(())
}
