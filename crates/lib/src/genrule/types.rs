use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::platform::Os;
use crate::rule::BuildTarget;
use crate::util::hash::Hashable;

/// Errors detected while planning. No steps are produced when planning fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  /// A token names a dependency that has no produced artifact.
  #[error("{target}: token ${token} refers to {dep}, which has no output artifact")]
  UnboundToken {
    target: BuildTarget,
    token: String,
    dep: BuildTarget,
  },

  /// None of `cmd`, `bash` or `cmd_exe` applies to the platform.
  #[error("{target}: no command to run on {platform}")]
  MissingCommand { target: BuildTarget, platform: Os },

  #[error("{target}: token ${token} is reserved")]
  ReservedToken { target: BuildTarget, token: String },

  /// An input is absolute or escapes the project root.
  #[error("{target}: invalid input {}", path.display())]
  InvalidInput { target: BuildTarget, path: PathBuf },

  /// Two inputs would be staged at the same place.
  #[error("{target}: more than one input stages to {}", path.display())]
  DuplicateInput { target: BuildTarget, path: PathBuf },
}

/// A rule that runs an external command over declared inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
  pub target: BuildTarget,

  /// Command for any platform without a more specific variant.
  #[serde(default)]
  pub cmd: Option<String>,

  /// POSIX-only variant, preferred over `cmd` on POSIX platforms.
  #[serde(default)]
  pub bash: Option<String>,

  /// Windows-only variant, preferred over `cmd` on Windows.
  #[serde(default)]
  pub cmd_exe: Option<String>,

  /// Declared inputs, relative to the project root.
  #[serde(default)]
  pub srcs: Vec<PathBuf>,

  /// Output file name, relative to the rule's generated directory.
  pub out: String,

  /// Environment tokens bound to the outputs of other rules.
  #[serde(default)]
  pub tokens: BTreeMap<String, BuildTarget>,
}

impl CommandSpec {
  pub fn new(target: BuildTarget, out: &str) -> Self {
    Self {
      target,
      cmd: None,
      bash: None,
      cmd_exe: None,
      srcs: Vec::new(),
      out: out.to_string(),
      tokens: BTreeMap::new(),
    }
  }

  pub fn with_cmd(mut self, cmd: &str) -> Self {
    self.cmd = Some(cmd.to_string());
    self
  }

  pub fn with_bash(mut self, bash: &str) -> Self {
    self.bash = Some(bash.to_string());
    self
  }

  pub fn with_cmd_exe(mut self, cmd_exe: &str) -> Self {
    self.cmd_exe = Some(cmd_exe.to_string());
    self
  }

  pub fn with_srcs<P: Into<PathBuf>>(mut self, srcs: impl IntoIterator<Item = P>) -> Self {
    self.srcs = srcs.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_token(mut self, name: &str, dep: BuildTarget) -> Self {
    self.tokens.insert(name.to_string(), dep);
    self
  }

  /// The command variant to run on `platform`. Empty strings count as unset.
  pub fn command_for(&self, platform: Os) -> Option<&str> {
    let specific = if platform.is_posix() { &self.bash } else { &self.cmd_exe };
    [specific, &self.cmd]
      .into_iter()
      .filter_map(|variant| variant.as_deref())
      .find(|cmd| !cmd.trim().is_empty())
  }
}

/// Explicit environment a command inherits before rule-specific overlays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of the current process environment.
  ///
  /// Variables whose name or value is not valid UTF-8 are skipped.
  pub fn from_process() -> Self {
    std::env::vars_os()
      .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
        (Ok(key), Ok(value)) => Some((key, value)),
        (key, _) => {
          let name = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
          warn!(variable = %name, "skipping non UTF-8 environment variable");
          None
        }
      })
      .collect()
  }

  pub fn with(mut self, key: &str, value: &str) -> Self {
    self.insert(key, value);
    self
  }

  pub fn insert(&mut self, key: &str, value: &str) {
    self.0.insert(key.to_string(), value.to_string());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn into_inner(self) -> BTreeMap<String, String> {
    self.0
  }
}

impl FromIterator<(String, String)> for Environment {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// One primitive action of a [`StepPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
  /// Delete a file if present.
  RemoveFile { path: PathBuf },

  /// Create a directory and its parents.
  Mkdir { path: PathBuf },

  /// Create a directory, wiping any previous contents.
  MakeCleanDir { path: PathBuf },

  /// Create `link` (and its parent) pointing at `source`.
  Symlink { source: PathBuf, link: PathBuf },

  /// Run a command.
  Shell {
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: PathBuf,
  },
}

impl Step {
  pub fn short_name(&self) -> &'static str {
    match self {
      Step::RemoveFile { .. } => "rm",
      Step::Mkdir { .. } => "mkdir",
      Step::MakeCleanDir { .. } => "make_clean_dir",
      Step::Symlink { .. } => "symlink",
      Step::Shell { .. } => "genrule",
    }
  }

  /// Shell-like rendering for logs and dry runs.
  pub fn description(&self) -> String {
    match self {
      Step::RemoveFile { path } => format!("rm -f {}", quote(&path.to_string_lossy())),
      Step::Mkdir { path } => format!("mkdir -p {}", quote(&path.to_string_lossy())),
      Step::MakeCleanDir { path } => {
        let path = quote(&path.to_string_lossy());
        format!("rm -rf {} && mkdir -p {}", path, path)
      }
      Step::Symlink { source, link } => {
        let parent = link.parent().unwrap_or(Path::new("."));
        format!(
          "mkdir -p {} && ln -sf {} {}",
          quote(&parent.to_string_lossy()),
          quote(&source.to_string_lossy()),
          quote(&link.to_string_lossy())
        )
      }
      Step::Shell { argv, .. } => argv.iter().map(|arg| quote(arg)).collect::<Vec<_>>().join(" "),
    }
  }
}

fn quote(arg: &str) -> String {
  let plain = !arg.is_empty()
    && arg
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
  if plain {
    arg.to_string()
  } else {
    format!("'{}'", arg.replace('\'', r"'\''"))
  }
}

/// Ordered steps that build one genrule. Immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepPlan {
  target: BuildTarget,
  inputs: Vec<PathBuf>,
  output: PathBuf,
  steps: Vec<Step>,
}

impl Hashable for StepPlan {}

impl StepPlan {
  pub(crate) fn new(target: BuildTarget, inputs: Vec<PathBuf>, output: PathBuf, steps: Vec<Step>) -> Self {
    Self {
      target,
      inputs,
      output,
      steps,
    }
  }

  pub fn target(&self) -> &BuildTarget {
    &self.target
  }

  /// Declared inputs, sorted. These are what the output is compared against
  /// when deciding whether to rebuild.
  pub fn inputs(&self) -> &[PathBuf] {
    &self.inputs
  }

  /// Output path as given to the planner.
  pub fn output(&self) -> &Path {
    &self.output
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  fn spec() -> CommandSpec {
    CommandSpec::new(BuildTarget::new("tools", "gen"), "out.txt")
  }

  #[test]
  fn posix_prefers_bash_over_cmd() {
    let spec = spec().with_cmd("generic").with_bash("posix").with_cmd_exe("windows");
    assert_eq!(spec.command_for(Os::Linux), Some("posix"));
    assert_eq!(spec.command_for(Os::MacOs), Some("posix"));
    assert_eq!(spec.command_for(Os::Windows), Some("windows"));
  }

  #[test]
  fn empty_variants_fall_back_to_cmd() {
    let spec = spec().with_cmd("generic").with_bash("").with_cmd_exe("  ");
    assert_eq!(spec.command_for(Os::Linux), Some("generic"));
    assert_eq!(spec.command_for(Os::Windows), Some("generic"));
  }

  #[test]
  fn no_variant_means_no_command() {
    assert_eq!(spec().with_bash("posix only").command_for(Os::Windows), None);
    assert_eq!(spec().command_for(Os::Linux), None);
  }

  #[test]
  fn step_descriptions_render_like_shell_commands() {
    let rm = Step::RemoveFile {
      path: PathBuf::from("build-out/gen/signed.apk"),
    };
    assert_eq!(rm.short_name(), "rm");
    assert_eq!(rm.description(), "rm -f build-out/gen/signed.apk");

    let link = Step::Symlink {
      source: PathBuf::from("src/key.properties"),
      link: PathBuf::from("gen/a__srcs/key.properties"),
    };
    assert_eq!(
      link.description(),
      "mkdir -p gen/a__srcs && ln -sf src/key.properties gen/a__srcs/key.properties"
    );

    let shell = Step::Shell {
      argv: vec!["/bin/bash".into(), "-e".into(), "-c".into(), "echo it's > $OUT".into()],
      env: BTreeMap::new(),
      cwd: PathBuf::from("gen/a__tmp"),
    };
    assert_eq!(shell.short_name(), "genrule");
    assert_eq!(shell.description(), r"/bin/bash -e -c 'echo it'\''s > $OUT'");
  }

  #[test]
  fn command_spec_deserializes_with_defaults() {
    let spec: CommandSpec = serde_json::from_str(
      r#"{ "target": "//src:sign", "cmd": "python signer.py $APK > $OUT", "out": "signed.apk",
           "tokens": { "APK": "//:fb4a" } }"#,
    )
    .unwrap();
    assert!(spec.srcs.is_empty());
    assert_eq!(spec.tokens["APK"], BuildTarget::new("", "fb4a"));
  }

  #[test]
  #[serial]
  fn process_environment_is_captured() {
    temp_env::with_var("APKRULE_TEST_CAPTURED", Some("yes"), || {
      let env = Environment::from_process();
      assert_eq!(env.get("APKRULE_TEST_CAPTURED"), Some("yes"));
    });
  }

  #[test]
  #[serial]
  #[cfg(unix)]
  fn non_utf8_process_variables_are_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    temp_env::with_vars(
      [
        ("APKRULE_TEST_BINARY", Some(OsStr::from_bytes(b"\xff\xfe"))),
        ("APKRULE_TEST_PLAIN", Some(OsStr::new("ok"))),
      ],
      || {
        let env = Environment::from_process();
        assert_eq!(env.get("APKRULE_TEST_BINARY"), None);
        assert_eq!(env.get("APKRULE_TEST_PLAIN"), Some("ok"));
      },
    );
  }
}
