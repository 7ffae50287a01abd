//! Plan execution.
//!
//! This module runs [`StepPlan`]s produced by the planner. It handles:
//! - Strictly sequential steps within one plan
//! - Bounded parallelism across independent plans
//! - Cancellation of in-flight commands
//!
//! Nothing is retried and partial sandbox state is left in place; the next
//! attempt starts by removing the previous output anyway.

pub mod process;
pub mod types;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::fs::Filesystem;
use crate::genrule::{Step, StepPlan};
use crate::rule::BuildTarget;

pub use process::{ProcessRunner, ShellRunner};
pub use types::{CancelHandle, CancelToken, ExecuteConfig, ExecuteError, PlanReport, ProcessExit, cancellation};

/// Execute the steps of one plan in order.
///
/// The first failing step aborts the plan and its error is returned; later
/// steps are not run.
pub async fn execute_plan<F, R>(
  plan: &StepPlan,
  fs: &F,
  runner: &R,
  cancel: &CancelToken,
) -> Result<PlanReport, ExecuteError>
where
  F: Filesystem + ?Sized,
  R: ProcessRunner,
{
  let target = plan.target();
  let started = Instant::now();

  info!(target = %target, steps = plan.len(), "executing plan");

  for (index, step) in plan.steps().iter().enumerate() {
    if cancel.is_cancelled() {
      return Err(ExecuteError::Cancelled { target: target.clone() });
    }

    debug!(target = %target, index, step = step.short_name(), command = %step.description(), "running step");

    if let Step::Shell { argv, env, cwd } = step {
      let cwd = fs.absolutize(cwd);
      let exit = runner
        .run(argv, &cwd, env, cancel)
        .await
        .map_err(|source| ExecuteError::Spawn {
          target: target.clone(),
          source,
        })?;
      if !exit.success() {
        return Err(ExecuteError::CommandExecutionFailure {
          target: target.clone(),
          exit,
        });
      }
    } else {
      run_fs_step(step, fs).map_err(|source| ExecuteError::SandboxSetupFailure {
        target: target.clone(),
        index,
        step: step.short_name(),
        source,
      })?;
    }
  }

  let elapsed = started.elapsed();
  info!(target = %target, elapsed = ?elapsed, "plan succeeded");

  Ok(PlanReport {
    target: target.clone(),
    steps: plan.len(),
    elapsed,
  })
}

fn run_fs_step<F: Filesystem + ?Sized>(step: &Step, fs: &F) -> io::Result<()> {
  match step {
    Step::RemoveFile { path } => fs.remove_file(path),
    Step::Mkdir { path } => fs.create_dir_all(path),
    Step::MakeCleanDir { path } => fs.make_clean_dir(path),
    Step::Symlink { source, link } => fs.symlink(source, link),
    Step::Shell { .. } => Ok(()),
  }
}

/// Execute independent plans concurrently, at most `config.parallelism` at a time.
///
/// Plans must not depend on each other's outputs. A failing plan does not
/// stop the others. Results come back in the order the plans were given.
pub async fn execute_plans<F, R>(
  plans: Vec<StepPlan>,
  fs: Arc<F>,
  runner: Arc<R>,
  config: &ExecuteConfig,
  cancel: &CancelToken,
) -> Vec<(BuildTarget, Result<PlanReport, ExecuteError>)>
where
  F: Filesystem + Send + Sync + 'static,
  R: ProcessRunner + Send + Sync + 'static,
{
  info!(plans = plans.len(), parallelism = config.parallelism, "starting plan execution");

  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
  let mut join_set = JoinSet::new();
  let mut tasks = HashMap::new();

  for (position, plan) in plans.into_iter().enumerate() {
    let fs = fs.clone();
    let runner = runner.clone();
    let cancel = cancel.clone();
    let semaphore = semaphore.clone();

    let task_target = plan.target().clone();
    let handle = join_set.spawn(async move {
      let target = plan.target().clone();

      // Acquire semaphore permit inside the task
      let Ok(_permit) = semaphore.acquire().await else {
        return (position, target.clone(), Err(ExecuteError::Cancelled { target }));
      };

      let result = execute_plan(&plan, &*fs, &*runner, &cancel).await;
      if let Err(e) = &result {
        error!(target = %target, error = %e, "plan failed");
      }

      (position, target, result)
    });
    tasks.insert(handle.id(), (position, task_target));
  }

  let mut results = Vec::with_capacity(tasks.len());

  while let Some(join_result) = join_set.join_next_with_id().await {
    match join_result {
      Ok((_, outcome)) => results.push(outcome),
      Err(e) => {
        // A panicked task still owes its plan an outcome
        let Some((position, target)) = tasks.remove(&e.id()) else {
          error!(error = %e, "unknown plan task failed");
          continue;
        };
        error!(target = %target, error = %e, "plan task panicked");
        let message = e.to_string();
        results.push((position, target.clone(), Err(ExecuteError::Panicked { target, message })));
      }
    }
  }

  results.sort_by_key(|(position, _, _)| *position);
  results
    .into_iter()
    .map(|(_, target, result)| (target, result))
    .collect()
}
