//! Test utilities for apkrule-lib.
//!
//! In-memory stand-ins for the filesystem and process runner, plus
//! cross-platform helpers for tests that spawn real shells.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::execute::{CancelToken, ProcessExit, ProcessRunner};
use crate::fs::Filesystem;

/// A filesystem call observed by [`RecordingFilesystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
  RemoveFile(PathBuf),
  CreateDirAll(PathBuf),
  MakeCleanDir(PathBuf),
  Symlink { source: PathBuf, link: PathBuf },
}

/// [`Filesystem`] that records calls instead of touching the disk.
///
/// Paths are absolutized under `/abs`. Only successful calls are recorded.
#[derive(Debug, Default)]
pub struct RecordingFilesystem {
  /// `None` means every directory exists.
  dirs: Option<HashSet<PathBuf>>,
  failing: HashSet<PathBuf>,
  ops: Mutex<Vec<FsOp>>,
}

impl RecordingFilesystem {
  pub fn new() -> Self {
    Self::default()
  }

  /// Only the listed directories exist.
  pub fn with_dirs<P: Into<PathBuf>>(dirs: impl IntoIterator<Item = P>) -> Self {
    Self {
      dirs: Some(dirs.into_iter().map(Into::into).collect()),
      ..Self::default()
    }
  }

  /// Any call whose path (or link) is `path` fails with `PermissionDenied`.
  pub fn failing_on(mut self, path: impl Into<PathBuf>) -> Self {
    self.failing.insert(path.into());
    self
  }

  pub fn ops(&self) -> Vec<FsOp> {
    self.ops.lock().unwrap().clone()
  }

  fn record(&self, path: &Path, op: FsOp) -> io::Result<()> {
    if self.failing.contains(path) {
      return Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("refusing to touch {}", path.display()),
      ));
    }
    self.ops.lock().unwrap().push(op);
    Ok(())
  }
}

impl Filesystem for RecordingFilesystem {
  fn remove_file(&self, path: &Path) -> io::Result<()> {
    self.record(path, FsOp::RemoveFile(path.to_path_buf()))
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    self.record(path, FsOp::CreateDirAll(path.to_path_buf()))
  }

  fn make_clean_dir(&self, path: &Path) -> io::Result<()> {
    self.record(path, FsOp::MakeCleanDir(path.to_path_buf()))
  }

  fn symlink(&self, source: &Path, link: &Path) -> io::Result<()> {
    self.record(
      link,
      FsOp::Symlink {
        source: source.to_path_buf(),
        link: link.to_path_buf(),
      },
    )
  }

  fn absolutize(&self, path: &Path) -> PathBuf {
    Path::new("/abs").join(path)
  }

  fn is_dir(&self, path: &Path) -> bool {
    self.dirs.as_ref().is_none_or(|dirs| dirs.contains(path))
  }
}

/// A command seen by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCall {
  pub argv: Vec<String>,
  pub cwd: PathBuf,
  pub env: BTreeMap<String, String>,
}

/// [`ProcessRunner`] that records commands and exits with a fixed code.
#[derive(Debug)]
pub struct ScriptedRunner {
  exit: ProcessExit,
  calls: Mutex<Vec<RunnerCall>>,
}

impl ScriptedRunner {
  pub fn exiting_with(code: i32) -> Self {
    Self {
      exit: ProcessExit::Code(code),
      calls: Mutex::new(Vec::new()),
    }
  }

  pub fn calls(&self) -> Vec<RunnerCall> {
    self.calls.lock().unwrap().clone()
  }
}

impl ProcessRunner for ScriptedRunner {
  async fn run(
    &self,
    argv: &[String],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    _cancel: &CancelToken,
  ) -> io::Result<ProcessExit> {
    self.calls.lock().unwrap().push(RunnerCall {
      argv: argv.to_vec(),
      cwd: cwd.to_path_buf(),
      env: env.clone(),
    });
    Ok(self.exit)
  }
}

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}
