//! Implementation of the `apkrule run` command.
//!
//! Plans and executes the genrules of a manifest wave by wave. Genrules in
//! the same wave are independent and run in parallel; a wave only starts
//! once the previous one has fully succeeded.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use apkrule_lib::execute::{ExecuteConfig, ShellRunner, cancellation, execute_plans};
use apkrule_lib::genrule::{CommandSpec, Environment, GenrulePlanner, PlanContext, PlannerConfig};
use apkrule_lib::rule::BuildTarget;

use crate::output::{format_elapsed, print_error, print_info, print_success};

use super::Project;

pub fn cmd_run(
  manifest_path: &Path,
  project_root: Option<&Path>,
  targets: &[BuildTarget],
  jobs: Option<usize>,
  timeout: Option<Duration>,
) -> Result<()> {
  let project = Project::load(manifest_path, project_root)?;

  for target in targets {
    if project.manifest.genrule(target).is_none() {
      bail!("No genrule named {} in {}", target, manifest_path.display());
    }
  }
  let selected: HashSet<&BuildTarget> = targets.iter().collect();

  let waves: Vec<Vec<&CommandSpec>> = project
    .manifest
    .genrule_waves()
    .context("Invalid build graph")?
    .into_iter()
    .map(|wave| {
      wave
        .into_iter()
        .filter(|spec| selected.is_empty() || selected.contains(&spec.target))
        .collect::<Vec<_>>()
    })
    .filter(|wave| !wave.is_empty())
    .collect();

  if waves.is_empty() {
    print_info("No genrules to run");
    return Ok(());
  }

  let planner = GenrulePlanner::new(PlannerConfig {
    layout: project.layout.clone(),
    ..PlannerConfig::default()
  });
  let env = Environment::from_process();
  let config = match jobs {
    Some(parallelism) => ExecuteConfig { parallelism },
    None => ExecuteConfig::default(),
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let fs = Arc::new(project.fs.clone());
  let runner = Arc::new(ShellRunner);
  let started = Instant::now();

  let (handle, cancel) = cancellation();
  let handle = Arc::new(handle);

  let (built, failed) = rt.block_on(async {
    {
      let handle = handle.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupted, cancelling build");
          handle.cancel();
        }
      });
    }
    if let Some(timeout) = timeout {
      let handle = handle.clone();
      tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        warn!(timeout = ?timeout, "timed out, cancelling build");
        handle.cancel();
      });
    }

    let mut built = 0;
    for (wave_idx, wave) in waves.iter().enumerate() {
      let ctx = PlanContext {
        env: &env,
        artifacts: &project.graph,
        fs: &*fs,
      };

      let mut plans = Vec::with_capacity(wave.len());
      let mut failed = 0;
      for spec in wave {
        match planner.plan_rule(spec, &ctx) {
          Ok(plan) => plans.push(plan),
          Err(e) => {
            print_error(&e.to_string());
            failed += 1;
          }
        }
      }
      if failed > 0 {
        return (built, failed);
      }

      info!(wave = wave_idx, genrules = plans.len(), "starting wave");
      for (target, result) in execute_plans(plans, fs.clone(), runner.clone(), &config, &cancel).await {
        match result {
          Ok(report) => {
            built += 1;
            print_success(&format!("{} ({})", target, format_elapsed(report.elapsed)));
          }
          Err(e) => {
            print_error(&e.to_string());
            failed += 1;
          }
        }
      }
      if failed > 0 {
        return (built, failed);
      }
    }

    (built, 0)
  });

  if failed > 0 {
    bail!("{} genrule(s) failed, {} built", failed, built);
  }

  println!();
  print_success(&format!(
    "Built {} genrule(s) in {}",
    built,
    format_elapsed(started.elapsed())
  ));
  Ok(())
}
