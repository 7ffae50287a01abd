use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::consts::{DEFAULT_POSIX_SHELL, OUT_ENV};
use crate::fs::Filesystem;
use crate::platform::Os;
use crate::rule::BuildTarget;

use super::layout::SandboxLayout;
use super::shell::shell_argv;
use super::types::{CommandSpec, Environment, PlanError, Step, StepPlan};
use super::ArtifactLocator;

/// Planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
  /// Platform the command will run on. Selects the command variant and shell.
  pub platform: Os,

  pub layout: SandboxLayout,

  /// POSIX interpreter, invoked as `<shell> -e -c <command>`.
  pub posix_shell: String,
}

impl Default for PlannerConfig {
  fn default() -> Self {
    Self {
      platform: Os::current().unwrap_or(Os::Linux),
      layout: SandboxLayout::default(),
      posix_shell: DEFAULT_POSIX_SHELL.to_string(),
    }
  }
}

/// Everything outside the rule itself that a plan depends on.
#[derive(Clone, Copy)]
pub struct PlanContext<'a> {
  /// Environment the command inherits.
  pub env: &'a Environment,

  /// Resolves token targets to their artifacts.
  pub artifacts: &'a dyn ArtifactLocator,

  /// Used to absolutize paths only; planning never touches the disk.
  pub fs: &'a dyn Filesystem,
}

/// Produces [`StepPlan`]s for command-running rules.
#[derive(Debug, Clone, Default)]
pub struct GenrulePlanner {
  config: PlannerConfig,
}

impl GenrulePlanner {
  pub fn new(config: PlannerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &PlannerConfig {
    &self.config
  }

  /// Plan `spec` writing to its conventional output path under the gen dir.
  pub fn plan_rule(&self, spec: &CommandSpec, ctx: &PlanContext<'_>) -> Result<StepPlan, PlanError> {
    let output_path = self.config.layout.output_path(&spec.target, &spec.out);
    self.plan(spec, &output_path, ctx)
  }

  /// Plan `spec` writing to `output_path`.
  ///
  /// Yields `4 + N + 1` steps for N inputs. All validation happens before
  /// the first step is produced, so a failed plan has no steps at all.
  pub fn plan(&self, spec: &CommandSpec, output_path: &Path, ctx: &PlanContext<'_>) -> Result<StepPlan, PlanError> {
    let target = &spec.target;
    let platform = self.config.platform;

    let command = spec
      .command_for(platform)
      .ok_or_else(|| PlanError::MissingCommand {
        target: target.clone(),
        platform,
      })?;

    let tokens = resolve_tokens(spec, ctx)?;
    let staged = stage_inputs(spec)?;

    let tmp_dir = self.config.layout.tmp_dir(target);
    let srcs_dir = self.config.layout.srcs_dir(target);
    let output_dir = output_path
      .parent()
      .filter(|parent| !parent.as_os_str().is_empty())
      .unwrap_or(Path::new("."));

    let mut env = ctx.env.clone().into_inner();
    env.extend(tokens);
    env.insert(
      OUT_ENV.to_string(),
      ctx.fs.absolutize(output_path).to_string_lossy().into_owned(),
    );

    let mut steps = Vec::with_capacity(staged.len() + 5);
    steps.push(Step::RemoveFile {
      path: output_path.to_path_buf(),
    });
    steps.push(Step::Mkdir {
      path: output_dir.to_path_buf(),
    });
    steps.push(Step::MakeCleanDir { path: tmp_dir.clone() });
    steps.push(Step::MakeCleanDir { path: srcs_dir.clone() });
    for (relative, source) in &staged {
      steps.push(Step::Symlink {
        source: (*source).to_path_buf(),
        link: srcs_dir.join(relative),
      });
    }
    steps.push(Step::Shell {
      argv: shell_argv(platform, &self.config.posix_shell, command),
      env,
      cwd: tmp_dir,
    });

    debug!(
      target = %target,
      inputs = staged.len(),
      steps = steps.len(),
      platform = %platform,
      "planned genrule"
    );

    let mut inputs = spec.srcs.clone();
    inputs.sort();
    Ok(StepPlan::new(target.clone(), inputs, output_path.to_path_buf(), steps))
  }
}

/// Absolute artifact path for every token.
fn resolve_tokens(spec: &CommandSpec, ctx: &PlanContext<'_>) -> Result<BTreeMap<String, String>, PlanError> {
  let mut resolved = BTreeMap::new();
  for (token, dep) in &spec.tokens {
    if token == OUT_ENV {
      return Err(PlanError::ReservedToken {
        target: spec.target.clone(),
        token: token.clone(),
      });
    }
    let artifact = ctx
      .artifacts
      .artifact_path(dep)
      .ok_or_else(|| PlanError::UnboundToken {
        target: spec.target.clone(),
        token: token.clone(),
        dep: dep.clone(),
      })?;
    resolved.insert(
      token.clone(),
      ctx.fs.absolutize(artifact).to_string_lossy().into_owned(),
    );
  }
  Ok(resolved)
}

/// Staging path -> declared input, ordered by staging path.
fn stage_inputs(spec: &CommandSpec) -> Result<BTreeMap<PathBuf, &Path>, PlanError> {
  let mut staged = BTreeMap::new();
  for src in &spec.srcs {
    let relative = staged_path(&spec.target, src)?;
    if staged.insert(relative.clone(), src.as_path()).is_some() {
      return Err(PlanError::DuplicateInput {
        target: spec.target.clone(),
        path: relative,
      });
    }
  }
  Ok(staged)
}

/// Path of `src` relative to the rule's package, or to the project root when
/// it lives elsewhere.
fn staged_path(target: &BuildTarget, src: &Path) -> Result<PathBuf, PlanError> {
  let base = target.base_path();
  let relative = if base.as_os_str().is_empty() {
    src
  } else {
    src.strip_prefix(base).unwrap_or(src)
  };

  let invalid = || PlanError::InvalidInput {
    target: target.clone(),
    path: src.to_path_buf(),
  };

  let mut staged = PathBuf::new();
  for component in relative.components() {
    match component {
      Component::Normal(part) => staged.push(part),
      Component::CurDir => {}
      Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Err(invalid()),
    }
  }

  if staged.as_os_str().is_empty() {
    return Err(invalid());
  }
  Ok(staged)
}
