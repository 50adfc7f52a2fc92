use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use argh::FromArgs;
use tokio_util::sync::CancellationToken;
use visibility_service::Backend;
use yansi::Paint;

use crate::config::{Config, Storage};
use crate::detector::Detector;
use crate::harness;
use crate::log::RecordLog;
use crate::observability;
use crate::producer::Producer;
use crate::size::PayloadSize;
use crate::stats::Ledger;
use crate::workload::Mode;

/// Measures how long changes to a storage backend take to become visible.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    pub config: Option<PathBuf>,

    #[argh(subcommand)]
    pub command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Produce(ProduceCommand),
    Detect(DetectCommand),
    Run(RunCommand),
    Summarize(SummarizeCommand),
    Version(VersionCommand),
}

/// write (or delete) the sequence of objects and log when each write completed
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "produce")]
struct ProduceCommand {
    /// number of objects
    #[argh(option)]
    iterations: Option<u64>,
    /// payload size, such as 64K or 1M
    #[argh(option)]
    size: Option<PayloadSize>,
    /// write empty objects
    #[argh(switch)]
    empty: bool,
    /// measure "write" or "delete"
    #[argh(option)]
    mode: Option<Mode>,
    /// delay between writes, such as 1s
    #[argh(option)]
    write_interval: Option<humantime::Duration>,
    /// time limit of a single write attempt, such as 30s
    #[argh(option)]
    write_timeout: Option<humantime::Duration>,
    /// path of the write log
    #[argh(option)]
    write_log: Option<PathBuf>,
}

/// poll for the sequence of objects and log when each became visible
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "detect")]
struct DetectCommand {
    /// number of objects
    #[argh(option)]
    iterations: Option<u64>,
    /// payload size, such as 64K or 1M
    #[argh(option)]
    size: Option<PayloadSize>,
    /// expect empty objects
    #[argh(switch)]
    empty: bool,
    /// measure "write" or "delete"
    #[argh(option)]
    mode: Option<Mode>,
    /// delay between writes of the producer, such as 1s
    #[argh(option)]
    write_interval: Option<humantime::Duration>,
    /// delay between polls, such as 100ms
    #[argh(option)]
    poll_interval: Option<humantime::Duration>,
    /// time after which an object is given up, such as 5s
    #[argh(option)]
    max_wait: Option<humantime::Duration>,
    /// only compare sizes, not contents
    #[argh(switch)]
    no_verify: bool,
    /// path of the detection log
    #[argh(option)]
    detection_log: Option<PathBuf>,
}

/// write and detect in one process, then append the summary to the ledger
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "run")]
struct RunCommand {
    /// number of objects
    #[argh(option)]
    iterations: Option<u64>,
    /// payload size, such as 64K or 1M
    #[argh(option)]
    size: Option<PayloadSize>,
    /// write empty objects
    #[argh(switch)]
    empty: bool,
    /// measure "write" or "delete"
    #[argh(option)]
    mode: Option<Mode>,
    /// delay between writes, such as 1s
    #[argh(option)]
    write_interval: Option<humantime::Duration>,
    /// time limit of a single write attempt, such as 30s
    #[argh(option)]
    write_timeout: Option<humantime::Duration>,
    /// delay between polls, such as 100ms
    #[argh(option)]
    poll_interval: Option<humantime::Duration>,
    /// time after which an object is given up, such as 5s
    #[argh(option)]
    max_wait: Option<humantime::Duration>,
    /// only compare sizes, not contents
    #[argh(switch)]
    no_verify: bool,
    /// path of the write log
    #[argh(option)]
    write_log: Option<PathBuf>,
    /// path of the detection log
    #[argh(option)]
    detection_log: Option<PathBuf>,
    /// path of the ledger
    #[argh(option)]
    ledger: Option<PathBuf>,
    /// label of the ledger row
    #[argh(option)]
    label: Option<String>,
}

/// correlate existing logs and append the summary to the ledger
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "summarize")]
struct SummarizeCommand {
    /// path of the write log
    #[argh(option)]
    write_log: Option<PathBuf>,
    /// path of the detection log
    #[argh(option)]
    detection_log: Option<PathBuf>,
    /// path of the ledger
    #[argh(option)]
    ledger: Option<PathBuf>,
    /// label of the ledger row
    #[argh(option)]
    label: Option<String>,
    /// path to export the raw latencies to
    #[argh(option)]
    samples: Option<PathBuf>,
}

/// print the harness version
#[derive(Default, Debug, FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCommand {}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_some<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl Command {
    /// Applies the flags of the command on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        let run = &mut config.run;
        let output = &mut config.output;

        match self {
            Command::Produce(cmd) => {
                set(&mut run.iterations, cmd.iterations);
                set(&mut run.size, cmd.size);
                run.empty |= cmd.empty;
                set(&mut run.mode, cmd.mode);
                set(&mut run.write_interval, cmd.write_interval.map(Into::into));
                set(&mut run.write_timeout, cmd.write_timeout.map(Into::into));
                set(&mut output.write_log, cmd.write_log.clone());
            }
            Command::Detect(cmd) => {
                set(&mut run.iterations, cmd.iterations);
                set(&mut run.size, cmd.size);
                run.empty |= cmd.empty;
                set(&mut run.mode, cmd.mode);
                set(&mut run.write_interval, cmd.write_interval.map(Into::into));
                set(&mut run.poll_interval, cmd.poll_interval.map(Into::into));
                set(&mut run.max_wait, cmd.max_wait.map(Into::into));
                run.verify_digest &= !cmd.no_verify;
                set(&mut output.detection_log, cmd.detection_log.clone());
            }
            Command::Run(cmd) => {
                set(&mut run.iterations, cmd.iterations);
                set(&mut run.size, cmd.size);
                run.empty |= cmd.empty;
                set(&mut run.mode, cmd.mode);
                set(&mut run.write_interval, cmd.write_interval.map(Into::into));
                set(&mut run.write_timeout, cmd.write_timeout.map(Into::into));
                set(&mut run.poll_interval, cmd.poll_interval.map(Into::into));
                set(&mut run.max_wait, cmd.max_wait.map(Into::into));
                run.verify_digest &= !cmd.no_verify;
                set(&mut output.write_log, cmd.write_log.clone());
                set(&mut output.detection_log, cmd.detection_log.clone());
                set(&mut output.ledger, cmd.ledger.clone());
                set_some(&mut output.label, cmd.label.clone());
            }
            Command::Summarize(cmd) => {
                set(&mut output.write_log, cmd.write_log.clone());
                set(&mut output.detection_log, cmd.detection_log.clone());
                set(&mut output.ledger, cmd.ledger.clone());
                set_some(&mut output.label, cmd.label.clone());
                set_some(&mut output.samples, cmd.samples.clone());
            }
            Command::Version(_) => (),
        }
    }
}

/// Bootstrap the runtime and execute the CLI command.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    // Special switch to just print the version and exit.
    if let Command::Version(_) = args.command {
        println!("visibility-bench {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    args.command.apply(&mut config);
    config.validate()?;

    // Sentry should be initialized before creating the async runtime.
    let _sentry_guard = observability::init_sentry(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("main-rt")
        .enable_all()
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config);
    tracing::debug!(?config);

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, stopping after the current item");
                    cancel.cancel();
                }
            }
        });

        match args.command {
            Command::Produce(_) => produce(&config, &cancel).await,
            Command::Detect(_) => detect(&config, &cancel).await,
            Command::Run(_) => {
                let backend = connect(&config).await?;
                harness::run(backend, &config, &cancel).await.map(drop)
            }
            Command::Summarize(_) => summarize(&config),
            Command::Version(_) => unreachable!(),
        }
    })
}

async fn connect(config: &Config) -> Result<Arc<dyn Backend>> {
    let backend = visibility_service::connect(config.storage.as_storage_config())
        .await
        .context("failed to connect to storage backend")?;
    Ok(Arc::from(backend))
}

fn warn_in_memory(config: &Config) {
    if let Storage::Memory { .. } = config.storage {
        tracing::warn!("in-memory storage is not shared with other processes");
    }
}

async fn produce(config: &Config, cancel: &CancellationToken) -> Result<()> {
    warn_in_memory(config);
    let backend = connect(config).await?;

    let header = harness::log_header(config);
    let mut log = RecordLog::open(&config.output.write_log, Some(&header))
        .await
        .context("failed to open write log")?;

    let producer = Producer::new(backend, config.workload(), config.producer_config());
    let count = producer.run(config.run.mode, &mut log, cancel).await?;

    println!(
        "{} {} items, logged to {}",
        "PRODUCED:".bold().green(),
        count.bold(),
        log.path().display()
    );
    Ok(())
}

async fn detect(config: &Config, cancel: &CancellationToken) -> Result<()> {
    warn_in_memory(config);
    let backend = connect(config).await?;

    let header = harness::log_header(config);
    let mut log = RecordLog::open(&config.output.detection_log, Some(&header))
        .await
        .context("failed to open detection log")?;

    let detector = Detector::new(backend, config.workload(), config.detector_config());
    let found = detector.run(&mut log, cancel).await?;

    println!(
        "{} {} of {} items, logged to {}",
        "DETECTED:".bold().green(),
        found.bold(),
        config.run.iterations,
        log.path().display()
    );
    Ok(())
}

fn summarize(config: &Config) -> Result<()> {
    let label = config
        .output
        .label
        .clone()
        .unwrap_or_else(|| harness::default_label(config));

    let summary = harness::summarize_logs(&config.output, &label)?;
    Ledger::new(&config.output.ledger).append(&summary)?;
    harness::print_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["visibility-bench"], args).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "run",
            "--iterations",
            "5",
            "--size",
            "64k",
            "--max-wait",
            "2s",
            "--no-verify",
            "--label",
            "lan",
        ]);

        let mut config = Config::default();
        args.command.apply(&mut config);

        assert_eq!(config.run.iterations, 5);
        assert_eq!(config.run.size, PayloadSize(65536));
        assert_eq!(config.run.max_wait, Duration::from_secs(2));
        assert_eq!(config.run.poll_interval, Duration::from_millis(100));
        assert!(!config.run.verify_digest);
        assert_eq!(config.output.label.as_deref(), Some("lan"));
    }

    #[test]
    fn absent_flags_keep_config() {
        let args = parse(&["detect", "--mode", "delete"]);

        let mut config = Config::default();
        config.run.iterations = 42;
        args.command.apply(&mut config);

        assert_eq!(config.run.iterations, 42);
        assert_eq!(config.run.mode, Mode::Delete);
        assert!(config.run.verify_digest);
    }

    #[test]
    fn detect_takes_the_write_cadence() {
        let args = parse(&["detect", "--write-interval", "5s"]);

        let mut config = Config::default();
        args.command.apply(&mut config);

        assert_eq!(config.run.write_interval, Duration::from_secs(5));
        assert_eq!(config.detector_config().write_interval, Duration::from_secs(5));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Args::from_args(&["visibility-bench"], &["produce", "--size", "1G"]).is_err());
        assert!(Args::from_args(&["visibility-bench"], &["detect", "--mode", "read"]).is_err());
    }
}
