use std::path::{Path, PathBuf};

use std::time::Duration;

use clap::Parser;
use humantime::format_duration;
use log::{error, info};

use crate::consistency::Agreement;
use crate::context::RunContext;
use crate::error::EpiError;
use crate::execution_stats::{log_speedup_report, print_speedup_report, SpeedupReport};
use crate::loader::load_scenario;
use crate::log::{apply_log_spec, set_module_filter, LevelFilter, LogSpec};
use crate::parameters::Parameters;
use crate::population::Population;
use crate::report::{output_path, write_results, ResultFormat, ResultSet};

/// Simulates infection spread on a grid twice, sequentially and partitioned across workers, and
/// checks that both runs agree.
#[derive(Parser, Debug, Clone)]
#[command(name = "epigrid", version, about)]
pub struct Args {
    /// Number of ticks to simulate
    #[arg(allow_negative_numbers = true)]
    pub simulation_time: i64,

    /// Scenario file
    pub input: PathBuf,

    /// Number of workers for the partitioned run; must divide the population size
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Directory for result files. Defaults to the directory of the input file
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional path for a JSON parameters file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Result file format
    #[arg(long, value_enum, default_value_t = ResultFormat::Text)]
    pub format: ResultFormat,

    /// Log level, either a single level or a list like `info,epigrid::partitioned=trace`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log every person after every sequential tick
    #[arg(long)]
    pub trace_ticks: bool,
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub agreement: Agreement,
    pub report: SpeedupReport,
    /// `None` if the file could not be written.
    pub sequential_output: Option<PathBuf>,
    pub partitioned_output: Option<PathBuf>,
}

fn simulation_ticks(simulation_time: i64) -> Result<u32, EpiError> {
    if simulation_time <= 0 {
        return Err(EpiError::Config(format!(
            "simulation time must be positive, got {simulation_time}"
        )));
    }
    u32::try_from(simulation_time)
        .map_err(|_| EpiError::Config(format!("simulation time {simulation_time} is too large")))
}

fn configure_logging(args: &Args) -> Result<(), EpiError> {
    if let Some(spec) = &args.log_level {
        let spec: LogSpec = spec.parse()?;
        apply_log_spec(&spec);
    }
    if args.trace_ticks {
        set_module_filter("epigrid::sequential", LevelFilter::Trace);
    }
    Ok(())
}

// A result file that cannot be written is reported and the run carries on.
fn write_or_log(args: &Args, set: ResultSet, population: &Population) -> Option<PathBuf> {
    let path = output_path(&args.input, args.output_dir.as_deref(), set, args.format);
    match write_results(&path, population, args.format) {
        Ok(()) => {
            info!("wrote {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("could not write {}: {e}", path.display());
            None
        }
    }
}

// The sequential results stand on their own when the partitioned run aborts.
fn partitioned_failure(
    sequential_time: Duration,
    sequential_output: Option<&Path>,
    e: EpiError,
) -> EpiError {
    info!(
        "sequential run completed in {} before the partitioned run failed",
        format_duration(sequential_time)
    );
    if let Some(path) = sequential_output {
        info!("sequential results remain in {}", path.display());
    }
    e
}

fn load_parameters(config: Option<&Path>) -> Result<Parameters, EpiError> {
    match config {
        Some(path) => {
            info!("loading parameters from {}", path.display());
            Parameters::load(path)
        }
        None => Ok(Parameters::default()),
    }
}

/// Runs both engines for the given arguments, writes their results and compares them.
///
/// # Errors
/// Returns an `EpiError` for bad configuration or input, or if the partitioned run aborts. In
/// the latter case the sequential results have already been written.
pub fn run_with_args(args: &Args) -> Result<RunSummary, EpiError> {
    configure_logging(args)?;
    let ticks = simulation_ticks(args.simulation_time)?;
    let parameters = load_parameters(args.config.as_deref())?;
    let scenario = load_scenario(&args.input, &parameters)?;

    let mut context = RunContext::new(scenario, parameters, ticks, args.workers)?;

    let sequential_time = context.run_sequential();
    let sequential_output = write_or_log(
        args,
        ResultSet::Sequential,
        context.sequential_population(),
    );

    context.run_partitioned().map_err(|e| {
        partitioned_failure(sequential_time, sequential_output.as_deref(), e)
    })?;
    let partitioned_output = write_or_log(
        args,
        ResultSet::Partitioned,
        context.partitioned_population(),
    );

    let report = context.speedup_report().ok_or_else(|| {
        EpiError::Coordination("partitioned run finished without timing".to_string())
    })?;
    log_speedup_report(&report);

    Ok(RunSummary {
        agreement: context.agreement(),
        report,
        sequential_output,
        partitioned_output,
    })
}

/// Prints the consistency verdict and the speedup report.
pub fn print_summary(summary: &RunSummary) {
    println!("{}", summary.agreement);
    print_speedup_report(&summary.report);
}

/// Parses the command line and runs.
///
/// # Errors
/// Returns an `EpiError` if the run fails; see [`run_with_args`].
pub fn run() -> Result<RunSummary, EpiError> {
    let args = Args::parse();
    let summary = run_with_args(&args)?;
    print_summary(&summary);
    Ok(summary)
}
