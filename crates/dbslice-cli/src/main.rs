mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use dbslice_config::{
    ConfigError, SubsetConfig, ValidationReport, apply_config, config_json_schema,
    load_config_value, validate_config,
};
use dbslice_core::{CatalogSnapshot, Dialect, Error as CoreError, Table};
use dbslice_subset::{Subset, SubsetError, SubsetReport};
use registry::{RunContext, init_run_logging, init_stderr_logging, start_run, write_report};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("subset error: {0}")]
    Subset(#[from] SubsetError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0} error(s)")]
    InvalidConfig(usize),
}

#[derive(Parser, Debug)]
#[command(name = "dbslice", version, about = "Referentially consistent database subsets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan subset queries and record them in a run directory.
    Plan(PlanArgs),
    /// Print the subset report to stdout.
    Inspect(SubsetArgs),
    /// Print the JSON Schema of subset config files.
    ConfigSchema,
}

#[derive(Args, Debug)]
struct SubsetArgs {
    /// Catalog snapshot (JSON) describing tables and foreign keys.
    #[arg(long)]
    catalog: PathBuf,
    /// Subset config (.toml or .json).
    #[arg(long)]
    config: Option<PathBuf>,
    /// SQL dialect; overrides the config and the catalog engine.
    #[arg(long, value_name = "postgres|mysql")]
    dialect: Option<Dialect>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    subset: SubsetArgs,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Optional extra path for subset_report.json.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Inspect(args) => run_inspect(args),
        Command::ConfigSchema => {
            println!("{}", serde_json::to_string_pretty(&config_json_schema())?);
            Ok(())
        }
    }
}

fn run_plan(args: PlanArgs) -> Result<(), CliError> {
    let PlanArgs {
        subset,
        run_dir,
        out,
    } = args;

    let inputs = load_inputs(&subset)?;
    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        catalog: subset.catalog.clone(),
        config: subset.config.clone(),
        dialect: inputs.dialect,
        run_dir,
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_id, dialect = %inputs.dialect);
    let timer = Instant::now();

    let report = plan_report(inputs)?;
    write_report(&run_paths, &report, out.as_deref())?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);

    Ok(())
}

fn run_inspect(args: SubsetArgs) -> Result<(), CliError> {
    init_stderr_logging()?;

    let inputs = load_inputs(&args)?;
    let report = plan_report(inputs)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Catalog tables with the config applied, and the resolved dialect.
struct PlanInputs {
    tables: Vec<Table>,
    dialect: Dialect,
}

fn load_inputs(args: &SubsetArgs) -> Result<PlanInputs, CliError> {
    let snapshot = load_catalog(&args.catalog)?;
    let engine_dialect = snapshot.dialect();
    let mut tables = snapshot.into_tables()?;

    let config = match &args.config {
        Some(path) => Some(load_config(path, &tables)?),
        None => None,
    };
    let dialect = resolve_dialect(args.dialect, config.as_ref(), engine_dialect)?;
    if let Some(config) = &config {
        tables = apply_config(tables, config);
    }

    Ok(PlanInputs { tables, dialect })
}

fn plan_report(inputs: PlanInputs) -> Result<SubsetReport, CliError> {
    let subset = Subset::new(inputs.tables, inputs.dialect)?;
    let report = subset.report();
    tracing::info!(
        event = "subset_report_ready",
        tables = report.summary.tables,
        planned_tables = report.summary.planned_tables,
        cyclic_components = report.summary.cyclic_components
    );
    Ok(report)
}

fn load_catalog(path: &Path) -> Result<CatalogSnapshot, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_config(path: &Path, tables: &[Table]) -> Result<SubsetConfig, CliError> {
    let config_json = load_config_value(path)?;
    let schema = serde_json::to_value(config_json_schema())?;
    match validate_config(&config_json, &schema, tables) {
        Ok(validated) => {
            for warning in &validated.warnings {
                eprintln!("warning {warning}");
            }
            Ok(validated.config)
        }
        Err(report) => Err(report_failure(&report)),
    }
}

fn report_failure(report: &ValidationReport) -> CliError {
    for issue in report.errors.iter().chain(&report.warnings) {
        eprintln!("{issue}");
    }
    CliError::InvalidConfig(report.errors.len())
}

/// Flag first, then the config file, then the catalog engine.
fn resolve_dialect(
    flag: Option<Dialect>,
    config: Option<&SubsetConfig>,
    engine: dbslice_core::Result<Dialect>,
) -> Result<Dialect, CliError> {
    if let Some(dialect) = flag.or_else(|| config.and_then(|c| c.dialect)) {
        return Ok(dialect);
    }
    Ok(engine?)
}
