//! `runner`: executes one journey file against a session endpoint.
//!
//! ## Exit codes
//! | code | meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | every action succeeded and every cleanup ran             |
//! | 1    | setup, recorder or output failure                        |
//! | 2    | the journey file could not be loaded                     |
//! | 3    | an action failed (unknown, bad args, runtime, cleanup)   |
//! | 4    | the journey was cancelled (signal or `--deadline`)       |
//! | 5    | the session endpoint could not be opened                 |

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cuj_runner::actions::global;
use cuj_runner::core::{cancel_after, cancel_on_signal};
use cuj_runner::metrics::{Direction, Metric, MetricConfig, PerfValues, Recorder, RecorderError};
use cuj_runner::session::{self, SessionRef};
use cuj_runner::subscribers::Observer;
use cuj_runner::{
    Journey, JourneyError, LogWriter, Registry, RunError, RunReport, Runner, RunnerConfig, format_duration,
    parse_duration,
};

const EXIT_SETUP: u8 = 1;
const EXIT_LOAD: u8 = 2;
const EXIT_ACTION: u8 = 3;
const EXIT_CANCELLED: u8 = 4;
const EXIT_SESSION: u8 = 5;

/// Composed user journey runner.
#[derive(Parser, Debug)]
#[command(name = "runner")]
#[command(about = "Run a composed user journey against a UI session")]
#[command(version)]
struct Cli {
    /// Journey file (JSON array of action descriptors)
    #[arg(short, long, env = "CUJ_JOURNEY")]
    journey: PathBuf,

    /// Session endpoint (`dryrun://<label>` or `tcp://<host>:<port>`)
    #[arg(short, long, env = "CUJ_SESSION", default_value = "dryrun://")]
    session: String,

    /// Cancel the journey after this long (e.g. `90s`, `2m30s`)
    #[arg(long, env = "CUJ_DEADLINE", value_parser = duration_arg)]
    deadline: Option<Duration>,

    /// Upper bound for each cleanup continuation (`0s` = unbounded)
    #[arg(long, env = "CUJ_CLEANUP_TIMEOUT", default_value = "10s", value_parser = duration_arg)]
    cleanup_timeout: Duration,

    /// Credential handed to unlock actions
    #[arg(long, env = "CUJ_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Histogram to record, as `smoothness:<name>` or `latency:<name>` (repeatable)
    #[arg(long = "metric", value_parser = metric_arg)]
    metrics: Vec<MetricConfig>,

    /// Directory receiving `perf_values.txt` and the recorded histograms
    #[arg(short, long, env = "CUJ_OUT")]
    out: Option<PathBuf>,
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

fn metric_arg(s: &str) -> Result<MetricConfig, String> {
    MetricConfig::parse(s).ok_or_else(|| format!("expected smoothness:<name> or latency:<name>, got {s:?}"))
}

/// Terminal error with its exit code.
struct Failure {
    code: u8,
    error: anyhow::Error,
}

impl Failure {
    fn new(code: u8, error: impl Into<anyhow::Error>) -> Self {
        Self {
            code,
            error: error.into(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: cannot start runtime: {e}");
            return ExitCode::from(EXIT_SETUP);
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            eprintln!("error: {:#}", failure.error);
            ExitCode::from(failure.code)
        }
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    let journey = Journey::load(&cli.journey)
        .await
        .map_err(|e| Failure::new(EXIT_LOAD, e))?;
    info!(path = %cli.journey.display(), tasks = journey.len(), "journey loaded");

    let session = session::connect(&cli.session)
        .await
        .map_err(|e| Failure::new(EXIT_SESSION, e))?;

    let mut registry = Registry::with_builtins();
    registry
        .merge(&global())
        .map_err(|e| Failure::new(EXIT_SETUP, e))?;

    let mut cfg = RunnerConfig {
        cleanup_timeout: cli.cleanup_timeout,
        ..RunnerConfig::default()
    };
    if let Some(credential) = cli.credential {
        cfg = cfg.with_credential(credential);
    }

    let mut recorder = if cli.metrics.is_empty() {
        None
    } else {
        let recorder =
            Recorder::for_session(session.clone(), cli.metrics).map_err(|e| Failure::new(EXIT_SETUP, e))?;
        Some(recorder)
    };

    let observer = Observer::spawn(cfg.bus_capacity_clamped(), vec![Arc::new(LogWriter)]);
    let runner = Runner::with_config(registry, cfg).with_bus(observer.bus());

    let token = CancellationToken::new();
    let signals = cancel_on_signal(token.clone());
    let deadline = cli.deadline.map(|d| cancel_after(token.clone(), d));

    let res = execute(&runner, &journey, &session, &token, recorder.as_mut()).await;

    signals.abort();
    if let Some(handle) = deadline {
        handle.abort();
    }
    observer.shutdown().await;

    let report = res?;
    println!(
        "{} action(s) in {}",
        report.dispatched.len(),
        format_duration(report.elapsed)
    );

    if let Some(dir) = &cli.out {
        write_outputs(dir, &report, recorder.as_ref())
            .await
            .map_err(|e| Failure::new(EXIT_SETUP, e))?;
    }
    Ok(())
}

async fn execute(
    runner: &Runner,
    journey: &Journey,
    session: &SessionRef,
    token: &CancellationToken,
    recorder: Option<&mut Recorder>,
) -> Result<RunReport, Failure> {
    let res = match recorder {
        None => runner.run(journey, token, session).await,
        Some(recorder) => {
            match recorder
                .run(token, |t| async move { runner.run(journey, &t, session).await })
                .await
            {
                Ok(report) => Ok(report),
                Err(RecorderError::Run(e)) => Err(e),
                Err(RecorderError::Metrics(e)) => return Err(Failure::new(EXIT_SETUP, e)),
            }
        }
    };
    res.map_err(run_failure)
}

fn run_failure(err: RunError) -> Failure {
    for failure in &err.cleanup {
        warn!(action = %failure.action, index = failure.index, error = %failure.error, "cleanup failed");
    }
    let code = exit_code(&err.error);
    Failure::new(code, err)
}

fn exit_code(err: &JourneyError) -> u8 {
    if err.is_load_error() {
        EXIT_LOAD
    } else if err.is_cancelled() {
        EXIT_CANCELLED
    } else {
        EXIT_ACTION
    }
}

async fn write_outputs(dir: &Path, report: &RunReport, recorder: Option<&Recorder>) -> anyhow::Result<()> {
    let mut pv = PerfValues::new();
    pv.set(
        Metric::new("Journey.Duration", "ms", Direction::SmallerIsBetter),
        report.elapsed.as_secs_f64() * 1000.0,
    )?;
    pv.set(
        Metric::new("Journey.Actions", "count", Direction::BiggerIsBetter),
        report.dispatched.len() as f64,
    )?;

    if let Some(recorder) = recorder {
        recorder.record(&mut pv)?;
        let path = recorder
            .save_histograms(dir)
            .await
            .context("writing histograms")?;
        info!(path = %path.display(), "histograms written");
    }

    let path = pv.save(dir).await.context("writing perf values")?;
    info!(path = %path.display(), "perf values written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_metric_flag_parsing() {
        assert!(metric_arg("smoothness:Ash.Smoothness").is_ok());
        assert!(metric_arg("jank:Foo").is_err());
        assert_eq!(duration_arg("1m30s"), Ok(Duration::from_secs(90)));
    }
}
