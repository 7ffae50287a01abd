//! Process execution for the command step of a plan.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::types::{CancelToken, ProcessExit};

/// Runs one command to completion.
pub trait ProcessRunner {
  /// Run `argv` in `cwd` with exactly `env`. Cancelling `cancel` must
  /// terminate the process and yield [`ProcessExit::Cancelled`].
  fn run(
    &self,
    argv: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    cancel: &CancelToken,
  ) -> impl Future<Output = io::Result<ProcessExit>> + Send;
}

/// [`ProcessRunner`] that spawns real processes through tokio.
///
/// The environment is cleared and replaced by the plan's environment, so a
/// command sees exactly what the planner resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ProcessRunner for ShellRunner {
  async fn run(
    &self,
    argv: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    cancel: &CancelToken,
  ) -> io::Result<ProcessExit> {
    let (program, args) = argv
      .split_first()
      .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

    let mut command = Command::new(program);
    command
      .args(args)
      .current_dir(cwd)
      .env_clear()
      .envs(env)
      .stdin(Stdio::null())
      .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    debug!(program = %program, working_dir = ?cwd, "spawning process");

    let mut child = command.spawn()?;

    tokio::select! {
      status = child.wait() => {
        let status = status?;
        Ok(status.code().map(ProcessExit::Code).unwrap_or(ProcessExit::Signaled))
      }
      _ = cancel.cancelled() => {
        warn!(program = %program, "cancelling running command");
        kill_process_group(&child);
        child.kill().await?;
        Ok(ProcessExit::Cancelled)
      }
    }
  }
}

/// Kill everything the command started. The command leads its own process
/// group, so background jobs of the script go down with it.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
  use rustix::process::{self, Pid, Signal};

  let Some(pid) = child.id().and_then(|id| Pid::from_raw(id as i32)) else {
    return;
  };
  if let Err(e) = process::kill_process_group(pid, Signal::KILL) {
    debug!(error = %e, "failed to signal process group");
  }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}
