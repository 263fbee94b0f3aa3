//! `redund` – command line front end of the redundancy-resolution pipeline.
//!
//! 1. `redund filter` removes every configuration that collides with the
//!    scene and writes `<stamp>_collision_free_solutions.json`.
//! 2. `redund optimize` picks one configuration per point with minimum
//!    total joint travel and writes `<stamp>_shortest_path.json`.
//! 3. `redund run` does both, feeding the filter output to the optimizer.
//!
//! Inputs default to the newest artifacts under `<data>/auto_generated/`.
//! **Ctrl-C** during a search stops it and still saves the best path found.

mod config;
mod pipeline;
mod telemetry;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use redund_artifacts::{ComputeTimesLog, DataLayout, Stage};
use redund_scene::SessionMode;
use redund_types::{ExportedPath, Metadata, SolutionSet, TeeLog, TracingLog};
use tracing::warn;

use crate::config::Config;
use crate::pipeline::{FilterOutcome, OptimizeOutcome, PipelineError, StageInputs};

// ────────────────────────────────────────────────────────────────────────────
// Command line
// ────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "redund", version, about = "Collision filtering and minimum-travel path selection for redundant robots")]
struct Cli {
    /// Data directory holding `auto_generated/` (default `data`).
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Config file (default `<data>/redund.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drop colliding configurations from the latest solution set.
    Filter {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        scene: SceneArgs,
    },
    /// Find the minimum joint-travel path through collision-free solutions.
    Optimize {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Filter, then optimize the filter's output.
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Print the JSON Schema of the artifact contracts.
    Schema {
        #[arg(value_enum, default_value_t = SchemaKind::All)]
        kind: SchemaKind,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Solution set to read instead of the latest one.
    #[arg(long)]
    solutions: Option<PathBuf>,
    /// Metadata to read instead of the latest one.
    #[arg(long)]
    metadata: Option<PathBuf>,
}

impl InputArgs {
    fn stage_inputs(&self) -> StageInputs {
        StageInputs {
            solutions: self.solutions.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Args, Debug, Default)]
struct SceneArgs {
    /// Session mode: `headless` or `visual`.
    #[arg(long)]
    mode: Option<SessionMode>,
}

impl SceneArgs {
    fn apply(&self, cfg: &mut Config) {
        if let Some(mode) = self.mode {
            cfg.session.mode = mode;
        }
    }
}

#[derive(Args, Debug, Default)]
struct SearchArgs {
    /// Sample this many start/end pairs instead of trying all of them.
    #[arg(long, conflicts_with = "exhaustive")]
    iterations: Option<usize>,
    /// Try every start/end pair, even if the config sets `iterations`.
    #[arg(long)]
    exhaustive: bool,
    /// Seed for the pair sampler.
    #[arg(long)]
    seed: Option<u64>,
    /// Stop searching after this many seconds.
    #[arg(long, value_name = "SECS")]
    time_limit: Option<f64>,
}

impl SearchArgs {
    fn apply(&self, cfg: &mut Config) {
        if self.exhaustive {
            cfg.search.iterations = None;
        }
        if self.iterations.is_some() {
            cfg.search.iterations = self.iterations;
        }
        if self.seed.is_some() {
            cfg.search.seed = self.seed;
        }
        if self.time_limit.is_some() {
            cfg.search.time_limit_secs = self.time_limit;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemaKind {
    Solutions,
    Metadata,
    Path,
    All,
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = telemetry::init_tracing("redund");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut cfg = load_config(&cli)?;

    match cli.command {
        Commands::Filter { inputs, scene } => {
            scene.apply(&mut cfg);
            let log = run_log(&cfg, Stage::Filter);
            let filtered = pipeline::run_filter(&cfg, &inputs.stage_inputs(), &log)?;
            print_filter(&filtered);
            filtered.ensure_no_dead_points()?;
        }
        Commands::Optimize { inputs, search } => {
            search.apply(&mut cfg);
            let cancel = install_interrupt_flag();
            let log = run_log(&cfg, Stage::Optimize);
            let optimized =
                pipeline::run_optimize(&cfg, &inputs.stage_inputs(), Some(cancel), &log)?;
            print_optimize(&optimized);
        }
        Commands::Run {
            inputs,
            scene,
            search,
        } => {
            scene.apply(&mut cfg);
            search.apply(&mut cfg);
            let cancel = install_interrupt_flag();

            let filter_log = run_log(&cfg, Stage::Filter);
            let filtered = pipeline::run_filter(&cfg, &inputs.stage_inputs(), &filter_log)?;
            print_filter(&filtered);

            let optimize_inputs = StageInputs {
                solutions: Some(filtered.output.clone()),
                metadata: inputs.metadata.clone(),
            };
            let optimize_log = run_log(&cfg, Stage::Optimize);
            let optimized =
                pipeline::run_optimize(&cfg, &optimize_inputs, Some(cancel), &optimize_log);
            if let Ok(outcome) = &optimized {
                print_optimize(outcome);
            }
            // Dead points take precedence over the "no path" they cause.
            filtered.ensure_no_dead_points()?;
            optimized?;
        }
        Commands::Schema { kind } => print_schema(kind)?,
        Commands::Config => print!("{}", toml::to_string_pretty(&cfg)?),
    }
    Ok(())
}

/// File, then environment, then `--data`.
fn load_config(cli: &Cli) -> Result<Config, PipelineError> {
    let data_dir = cli.data.clone().unwrap_or_else(|| PathBuf::from("data"));
    let path = config::config_path(cli.config.as_deref(), &data_dir);
    let mut cfg =
        config::load(&path, &data_dir, cli.config.is_some()).map_err(PipelineError::Config)?;
    if let Some(data) = &cli.data {
        cfg.data_dir = data.clone();
    }
    Ok(cfg)
}

/// Run messages go to the tracing subscriber and, unless disabled, to
/// `compute_times.log`.
fn run_log(cfg: &Config, stage: Stage) -> TeeLog {
    let mut log = TeeLog::new().with(Box::new(TracingLog));
    if cfg.run.log_file {
        let path = DataLayout::new(&cfg.data_dir).compute_log();
        match ComputeTimesLog::open(&path, stage) {
            Ok(file) => log = log.with(Box::new(file)),
            Err(e) => warn!(error = %e, "run log file disabled"),
        }
    }
    log
}

/// First Ctrl-C sets the returned flag; a second one exits immediately.
fn install_interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            eprintln!("{}", "Interrupted twice, exiting without saving.".red().bold());
            std::process::exit(130);
        }
        eprintln!(
            "{}",
            "Ctrl-C received: stopping the search, the best path so far will be saved."
                .yellow()
                .bold()
        );
    }) {
        warn!("Failed to install Ctrl-C handler: {e}");
    }
    flag
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

fn print_filter(outcome: &FilterOutcome) {
    let report = &outcome.report;
    println!(
        "{} collision filter: {} → {} configurations over {} points in {:.3}s",
        "✓".green().bold(),
        report.starting,
        report.surviving.to_string().bold(),
        report.solutions.len(),
        report.elapsed.as_secs_f64()
    );
    println!("  read  {}", outcome.input.display());
    println!("  wrote {}", outcome.output.display().to_string().bold());
    if !report.dead_points.is_empty() {
        println!(
            "  {} points without a collision-free configuration: {:?}",
            "!".yellow().bold(),
            report.dead_points
        );
    }
}

fn print_optimize(outcome: &OptimizeOutcome) {
    let report = &outcome.report;
    println!(
        "{} path optimizer: cost {} over {} points ({} pairs in {:.3}s)",
        "✓".green().bold(),
        format!("{:.6}", report.best.cost).bold(),
        outcome.exported.len(),
        report.pairs_evaluated,
        report.elapsed.as_secs_f64()
    );
    if report.interrupted {
        println!("  {} search interrupted, best path so far saved", "!".yellow().bold());
    }
    println!("  read  {} (lift height {})", outcome.input.display(), outcome.lift);
    println!("  wrote {}", outcome.output.display().to_string().bold());
}

fn print_schema(kind: SchemaKind) -> Result<(), serde_json::Error> {
    let schemas = match kind {
        SchemaKind::Solutions => vec![schemars::schema_for!(SolutionSet)],
        SchemaKind::Metadata => vec![schemars::schema_for!(Metadata)],
        SchemaKind::Path => vec![schemars::schema_for!(ExportedPath)],
        SchemaKind::All => vec![
            schemars::schema_for!(SolutionSet),
            schemars::schema_for!(Metadata),
            schemars::schema_for!(ExportedPath),
        ],
    };
    for schema in schemas {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    }
    Ok(())
}

/// Held by every test that reads or writes process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Lock [`ENV_LOCK`], ignoring poison left by a failed test.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("redund").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filter_accepts_mode_and_inputs() {
        let cli = parse(&["--data", "/d", "filter", "--mode", "gui", "--solutions", "s.json"]);
        assert_eq!(cli.data.as_deref(), Some(std::path::Path::new("/d")));
        let Commands::Filter { inputs, scene } = cli.command else {
            panic!("expected filter");
        };
        assert_eq!(scene.mode, Some(SessionMode::Visual));
        assert_eq!(inputs.solutions, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn iterations_and_exhaustive_conflict() {
        let err = Cli::try_parse_from(["redund", "optimize", "--iterations", "5", "--exhaustive"]);
        assert!(err.is_err());
    }

    #[test]
    fn search_flags_override_config() {
        let mut cfg = Config::default();
        cfg.search.iterations = Some(100);
        let Commands::Optimize { search, .. } = parse(&["optimize", "--exhaustive", "--seed", "3"]).command
        else {
            panic!("expected optimize");
        };
        search.apply(&mut cfg);
        assert_eq!(cfg.search.iterations, None);
        assert_eq!(cfg.search.seed, Some(3));

        let Commands::Run { search, .. } = parse(&["run", "--iterations", "20", "--time-limit", "1.5"]).command
        else {
            panic!("expected run");
        };
        search.apply(&mut cfg);
        assert_eq!(cfg.search.iterations, Some(20));
        assert_eq!(cfg.search.time_limit_secs, Some(1.5));
    }

    #[test]
    fn schema_defaults_to_all() {
        let Commands::Schema { kind } = parse(&["schema"]).command else {
            panic!("expected schema");
        };
        assert_eq!(kind, SchemaKind::All);
        assert!(print_schema(SchemaKind::Metadata).is_ok());
    }

    #[test]
    fn data_flag_wins_over_config_file() {
        let _env = crate::env_lock();
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("r.toml");
        std::fs::write(&file, "data_dir = \"/from/file\"\n").unwrap();
        let file_arg = file.display().to_string();
        let flagged =
            load_config(&parse(&["--config", &file_arg, "--data", "/flag", "config"])).unwrap();
        assert_eq!(flagged.data_dir, PathBuf::from("/flag"));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let _env = crate::env_lock();
        let cli = parse(&["--config", "/no/such/redund.toml", "config"]);
        assert!(matches!(load_config(&cli), Err(PipelineError::Config(_))));
    }
}
