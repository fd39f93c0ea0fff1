//! Camera inventory across branch sites via Hikvision ISAPI.
//!
//! Reads a JSON list of branch devices, asks each for its streaming channel
//! configuration, and writes one CSV row per camera.
//!
//! Usage:
//!   isapi-inventory
//!   isapi-inventory -c branches_config.json -o cameras.csv --timeout 5
//!   isapi-inventory --syslog          # log to syslog (cron jobs)

mod config;
mod digest;
mod error;
mod isapi;
mod normalize;
mod pipeline;
mod writer;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::error;

use crate::config::RunOptions;
use crate::error::InventoryError;
use crate::isapi::IsapiClient;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "isapi-inventory", about = "Collect ISAPI camera channel metadata from all branches into one CSV")]
struct Cli {
    /// Path to the JSON branch list.
    #[arg(short = 'c', long = "config", default_value = "branches_config.json")]
    config: PathBuf,

    /// Path of the CSV file to write (overwritten on every run).
    #[arg(short = 'o', long = "output", default_value = "camera_metadata_all_branches.csv")]
    output: PathBuf,

    /// Per-device request timeout in seconds.
    #[arg(short = 't', long = "timeout", default_value_t = 10)]
    timeout: u64,

    /// Log to syslog instead of stderr.
    #[arg(long)]
    syslog: bool,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            config_path: self.config.clone(),
            output_path: self.output.clone(),
            timeout:     Duration::from_secs(self.timeout),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.syslog) {
        eprintln!("isapi-inventory: logging setup: {e}");
        process::exit(1);
    }

    let opts = cli.run_options();
    let client = match IsapiClient::new(opts.timeout) {
        Ok(c) => c,
        Err(e) => {
            error!("cannot build HTTP client: {e}");
            process::exit(1);
        }
    };

    let result = pipeline::run(&opts, &client).await;
    if let Err(e) = &result {
        error!("{e}");
    }
    let code = exit_code(&result);
    if code != 0 {
        process::exit(code);
    }
}

/// Exit status for a finished run.
///
/// Branch failures, an empty result and an unusable branch file all exit 0;
/// only a failed output write is reported as 1.
fn exit_code(result: &error::Result<pipeline::RunSummary>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(InventoryError::Config(_) | InventoryError::Json(_)) => 0,
        Err(_) => 1,
    }
}

// ── Logging setup ─────────────────────────────────────────────────────────────

fn setup_logging(use_syslog: bool) -> anyhow::Result<()> {
    if use_syslog {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process:  "isapi-inventory".into(),
            pid:      process::id(),
        };
        let logger = syslog::unix(formatter)
            .map_err(|e| anyhow::anyhow!("syslog connect failed: {e}"))?;
        log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
            .map(|()| log::set_max_level(log::LevelFilter::Info))
            .map_err(|e| anyhow::anyhow!("set_logger: {e}"))?;
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init()
            .map_err(|e| anyhow::anyhow!("set_logger: {e}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_run_options() {
        let cli = Cli::parse_from(["isapi-inventory"]);
        let opts = cli.run_options();
        let defaults = RunOptions::default();
        assert_eq!(opts.config_path, defaults.config_path);
        assert_eq!(opts.output_path, defaults.output_path);
        assert_eq!(opts.timeout, defaults.timeout);
        assert!(!cli.syslog);
    }

    fn summary(outcomes: Vec<pipeline::BranchOutcome>, written: Option<PathBuf>) -> pipeline::RunSummary {
        pipeline::RunSummary { outcomes, written }
    }

    #[test]
    fn partial_failure_exits_zero() {
        let rec = normalize::map_channel(&serde_json::Map::new(), "A", "t");
        let result = Ok(summary(
            vec![
                pipeline::BranchOutcome::Collected { branch: "A".into(), records: vec![rec] },
                pipeline::BranchOutcome::Failed { branch: "B".into(), reason: "timed out".into() },
            ],
            Some(PathBuf::from("out.csv")),
        ));
        assert_eq!(exit_code(&result), 0);
    }

    #[test]
    fn empty_result_exits_zero() {
        let result = Ok(summary(
            vec![pipeline::BranchOutcome::Failed { branch: "A".into(), reason: "timed out".into() }],
            None,
        ));
        assert_eq!(exit_code(&result), 0);
    }

    #[tokio::test]
    async fn missing_config_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            config_path: dir.path().join("branches_config.json"),
            output_path: dir.path().join("out.csv"),
            ..RunOptions::default()
        };
        let client = IsapiClient::new(opts.timeout).unwrap();
        let result = pipeline::run(&opts, &client).await;
        assert!(matches!(result, Err(InventoryError::Config(_))));
        assert_eq!(exit_code(&result), 0);
        assert!(!opts.output_path.exists());
    }

    #[test]
    fn malformed_config_exits_zero() {
        let err = config::parse_branches("not json").unwrap_err();
        assert_eq!(exit_code(&Err(err)), 0);
    }

    #[test]
    fn failed_write_exits_one() {
        let err = InventoryError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(exit_code(&Err(err)), 1);
    }

    #[test]
    fn overrides() {
        let cli = Cli::parse_from([
            "isapi-inventory", "-c", "/etc/branches.json", "--output", "/tmp/x.csv", "-t", "3",
        ]);
        let opts = cli.run_options();
        assert_eq!(opts.config_path, PathBuf::from("/etc/branches.json"));
        assert_eq!(opts.output_path, PathBuf::from("/tmp/x.csv"));
        assert_eq!(opts.timeout, Duration::from_secs(3));
    }
}
