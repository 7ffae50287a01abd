use std::path::PathBuf;

use crate::consts::{DEFAULT_GEN_DIR, GEN_DIR_ENV};

/// Directory for generated outputs, relative to the project root.
///
/// `APKRULE_GEN_DIR` overrides the default `build-out/gen`.
pub fn gen_dir() -> PathBuf {
  std::env::var(GEN_DIR_ENV)
    .ok()
    .filter(|dir| !dir.is_empty())
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from(DEFAULT_GEN_DIR))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn gen_dir_env_takes_precedence() {
    temp_env::with_var(GEN_DIR_ENV, Some("out/generated"), || {
      assert_eq!(gen_dir(), PathBuf::from("out/generated"));
    });
  }

  #[test]
  #[serial]
  fn gen_dir_falls_back_to_default() {
    temp_env::with_var(GEN_DIR_ENV, None::<&str>, || {
      assert_eq!(gen_dir(), PathBuf::from("build-out/gen"));
    });
    temp_env::with_var(GEN_DIR_ENV, Some(""), || {
      assert_eq!(gen_dir(), PathBuf::from("build-out/gen"));
    });
  }
}
