//! Filesystem primitives used by the resolver and the step runner.
//!
//! All paths handed to a [`Filesystem`] may be relative; implementations
//! resolve them against their project root.

use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;

/// The filesystem operations the core issues. Nothing in this crate touches
/// the disk except through this trait.
pub trait Filesystem {
  /// Remove a file. A missing file is not an error.
  fn remove_file(&self, path: &Path) -> io::Result<()>;

  /// Create a directory and all of its parents. Existing directories are fine.
  fn create_dir_all(&self, path: &Path) -> io::Result<()>;

  /// Create a directory, deleting any previous contents.
  fn make_clean_dir(&self, path: &Path) -> io::Result<()>;

  /// Create `link` pointing at `source`, creating the parent of `link` first.
  fn symlink(&self, source: &Path, link: &Path) -> io::Result<()>;

  /// Absolute form of `path`. Must be deterministic for a given filesystem.
  fn absolutize(&self, path: &Path) -> PathBuf;

  fn is_dir(&self, path: &Path) -> bool;
}

/// [`Filesystem`] backed by the local disk, rooted at a project directory.
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
  root: PathBuf,
}

impl LocalFilesystem {
  /// Use `root` verbatim as the project root.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Canonicalize `root` and use it as the project root.
  pub fn open(root: &Path) -> io::Result<Self> {
    Ok(Self::new(dunce::canonicalize(root)?))
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

impl Filesystem for LocalFilesystem {
  fn remove_file(&self, path: &Path) -> io::Result<()> {
    let path = self.absolutize(path);
    trace!(path = ?path, "remove file");
    match std::fs::remove_file(&path) {
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      other => other,
    }
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    let path = self.absolutize(path);
    trace!(path = ?path, "create directory");
    std::fs::create_dir_all(path)
  }

  fn make_clean_dir(&self, path: &Path) -> io::Result<()> {
    let path = self.absolutize(path);
    trace!(path = ?path, "make clean directory");
    match std::fs::remove_dir_all(&path) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
      _ => {}
    }
    std::fs::create_dir_all(path)
  }

  fn symlink(&self, source: &Path, link: &Path) -> io::Result<()> {
    let source = self.absolutize(source);
    let link = self.absolutize(link);
    trace!(source = ?source, link = ?link, "symlink");

    if let Some(parent) = link.parent() {
      std::fs::create_dir_all(parent)?;
    }
    if link.symlink_metadata().is_ok() {
      std::fs::remove_file(&link)?;
    }

    #[cfg(unix)]
    {
      std::os::unix::fs::symlink(&source, &link)
    }

    #[cfg(windows)]
    {
      if source.is_dir() {
        std::os::windows::fs::symlink_dir(&source, &link)
      } else {
        std::os::windows::fs::symlink_file(&source, &link)
      }
    }
  }

  fn absolutize(&self, path: &Path) -> PathBuf {
    self.root.join(path)
  }

  fn is_dir(&self, path: &Path) -> bool {
    self.absolutize(path).is_dir()
  }
}
