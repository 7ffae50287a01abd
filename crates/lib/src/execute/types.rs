//! Types for plan execution.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::rule::BuildTarget;

/// How a command process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
  /// The process exited with this code.
  Code(i32),
  /// The process was terminated by a signal.
  Signaled,
  /// The process was killed because the build was cancelled.
  Cancelled,
}

impl ProcessExit {
  pub fn success(&self) -> bool {
    matches!(self, ProcessExit::Code(0))
  }
}

impl fmt::Display for ProcessExit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ProcessExit::Code(code) => write!(f, "exit code {}", code),
      ProcessExit::Signaled => write!(f, "terminated by signal"),
      ProcessExit::Cancelled => write!(f, "cancelled"),
    }
  }
}

/// Errors that abort a plan. Every variant names the rule.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A filesystem step failed.
  #[error("{target}: step {index} ({step}) failed: {source}")]
  SandboxSetupFailure {
    target: BuildTarget,
    index: usize,
    step: &'static str,
    #[source]
    source: io::Error,
  },

  /// The command ran but did not succeed.
  #[error("{target}: command failed with {exit}")]
  CommandExecutionFailure { target: BuildTarget, exit: ProcessExit },

  /// The command could not be started.
  #[error("{target}: failed to spawn command: {source}")]
  Spawn {
    target: BuildTarget,
    #[source]
    source: io::Error,
  },

  /// The build was cancelled between steps.
  #[error("{target}: cancelled")]
  Cancelled { target: BuildTarget },

  /// The task running the plan panicked.
  #[error("{target}: execution panicked: {message}")]
  Panicked { target: BuildTarget, message: String },
}

impl ExecuteError {
  pub fn target(&self) -> &BuildTarget {
    match self {
      ExecuteError::SandboxSetupFailure { target, .. }
      | ExecuteError::CommandExecutionFailure { target, .. }
      | ExecuteError::Spawn { target, .. }
      | ExecuteError::Cancelled { target }
      | ExecuteError::Panicked { target, .. } => target,
    }
  }
}

/// Summary of a plan that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
  pub target: BuildTarget,
  pub steps: usize,
  pub elapsed: Duration,
}

/// Configuration for plan execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of plans to execute in parallel.
  pub parallelism: usize,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Create a linked cancel handle and token.
pub fn cancellation() -> (CancelHandle, CancelToken) {
  let (tx, rx) = watch::channel(false);
  (CancelHandle(tx), CancelToken(rx))
}

/// Cancels every [`CancelToken`] created alongside it.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
  pub fn cancel(&self) {
    self.0.send_replace(true);
  }
}

/// Observes cancellation of a build.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
  /// A token that is never cancelled.
  pub fn never() -> Self {
    let (_tx, rx) = watch::channel(false);
    Self(rx)
  }

  pub fn is_cancelled(&self) -> bool {
    *self.0.borrow()
  }

  /// Resolves once cancelled. Pends forever if the handle is dropped without cancelling.
  pub async fn cancelled(&self) {
    let mut rx = self.0.clone();
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}
