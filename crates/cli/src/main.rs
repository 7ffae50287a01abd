mod cmd;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use apkrule_lib::platform::Os;
use apkrule_lib::rule::BuildTarget;

/// apkrule - resource resolution and sandboxed genrule planning
#[derive(Parser)]
#[command(name = "apkrule")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project root that manifest paths are relative to (default: the manifest's directory)
  #[arg(short = 'C', long, global = true)]
  project_root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve the transitive resource dependencies of rules
  Resolve {
    /// Path to the build manifest
    manifest: PathBuf,

    /// Walk everything reachable from these targets
    #[arg(long = "root", value_parser = parse_target, required_unless_present = "rule")]
    roots: Vec<BuildTarget>,

    /// Resolve for this packaging rule, using the traversal of its kind
    #[arg(long, value_parser = parse_target, conflicts_with = "roots")]
    rule: Option<BuildTarget>,

    /// Drop rules flagged exclude_from_merge from the listing
    #[arg(long)]
    exclude_flagged: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the steps that would build a genrule
  Plan {
    /// Path to the build manifest
    manifest: PathBuf,

    /// Genrule to plan
    #[arg(value_parser = parse_target)]
    target: BuildTarget,

    /// Plan for this platform instead of the host (linux, macos, windows)
    #[arg(long)]
    platform: Option<Os>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Build the genrules of a manifest
  Run {
    /// Path to the build manifest
    manifest: PathBuf,

    /// Only build these genrules
    #[arg(long = "target", value_parser = parse_target)]
    targets: Vec<BuildTarget>,

    /// Maximum number of genrules to run at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Cancel the build after this long (e.g. "30s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
  },
}

fn parse_target(s: &str) -> Result<BuildTarget, String> {
  BuildTarget::parse(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let root = cli.project_root.as_deref();

  match cli.command {
    Commands::Resolve {
      manifest,
      roots,
      rule,
      exclude_flagged,
      json,
    } => cmd::cmd_resolve(&manifest, root, roots, rule, exclude_flagged, json),
    Commands::Plan {
      manifest,
      target,
      platform,
      json,
    } => cmd::cmd_plan(&manifest, root, &target, platform, json),
    Commands::Run {
      manifest,
      targets,
      jobs,
      timeout,
    } => cmd::cmd_run(&manifest, root, &targets, jobs, timeout),
  }
}
