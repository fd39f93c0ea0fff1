//! One inventory run: load branches, poll each in order, write the CSV.
//!
//! Flow:
//!   1. Load the branch list (fatal if missing or unparsable)
//!   2. For each branch in file order: fetch, normalize, record the outcome
//!   3. Concatenate collected records; write them, or warn if there are none

use std::path::PathBuf;

use chrono::Local;
use log::{error, info, warn};

use crate::config::{self, BranchEntry, RunOptions};
use crate::error::Result;
use crate::isapi::ChannelSource;
use crate::normalize::{self, CameraRecord};
use crate::writer;

/// What polling one branch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome {
    Collected { branch: String, records: Vec<CameraRecord> },
    Failed    { branch: String, reason: String },
}

impl BranchOutcome {
    pub fn branch(&self) -> &str {
        match self {
            BranchOutcome::Collected { branch, .. } | BranchOutcome::Failed { branch, .. } => branch,
        }
    }

    pub fn is_collected(&self) -> bool {
        matches!(self, BranchOutcome::Collected { .. })
    }

    pub fn records(&self) -> &[CameraRecord] {
        match self {
            BranchOutcome::Collected { records, .. } => records,
            BranchOutcome::Failed { .. } => &[],
        }
    }
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// One outcome per config entry, in config order.
    pub outcomes: Vec<BranchOutcome>,
    /// Output file, if anything was written.
    pub written:  Option<PathBuf>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_collected()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn record_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.records().len()).sum()
    }
}

/// Poll a single config entry.
pub async fn poll_branch<S: ChannelSource>(source: &S, entry: &BranchEntry) -> BranchOutcome {
    let desc = match entry {
        BranchEntry::Valid(desc) => desc,
        BranchEntry::Invalid { label, reason } => {
            error!("skipping branch {label}: invalid config entry: {reason}");
            return BranchOutcome::Failed { branch: label.clone(), reason: reason.clone() };
        }
    };

    info!("connecting to {} ({})...", desc.branch, desc.ip);
    match source.fetch_channels(desc).await {
        Ok(raw) => {
            let records =
                normalize::normalize_channels(&raw, &desc.branch, &Local::now().naive_local());
            info!("{}: {} channel(s)", desc.branch, records.len());
            BranchOutcome::Collected { branch: desc.branch.clone(), records }
        }
        Err(e) => {
            error!("could not retrieve data from {}: {e}", desc.ip);
            BranchOutcome::Failed { branch: desc.branch.clone(), reason: e.to_string() }
        }
    }
}

/// Poll every entry sequentially, in order.
pub async fn collect<S: ChannelSource>(source: &S, entries: &[BranchEntry]) -> Vec<BranchOutcome> {
    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in entries {
        outcomes.push(poll_branch(source, entry).await);
    }
    outcomes
}

/// All collected records, branch by branch in outcome order.
pub fn aggregate(outcomes: &[BranchOutcome]) -> Vec<CameraRecord> {
    outcomes.iter().flat_map(|o| o.records().iter().cloned()).collect()
}

/// Run the whole inventory against `source`.
///
/// Only config loading and output writing can fail the run; branch failures
/// are reported in the returned summary.
pub async fn run<S: ChannelSource>(opts: &RunOptions, source: &S) -> Result<RunSummary> {
    info!("starting metadata aggregation...");
    let entries = config::load_branches(&opts.config_path)?;

    let outcomes = collect(source, &entries).await;
    let records  = aggregate(&outcomes);

    let written = if records.is_empty() {
        warn!("no data collected from any branch");
        None
    } else {
        writer::write_records(&opts.output_path, &records)?;
        info!("data aggregated and saved to {}", opts.output_path.display());
        Some(opts.output_path.clone())
    };

    let summary = RunSummary { outcomes, written };
    info!(
        "{} branch(es) polled, {} succeeded, {} failed, {} camera(s)",
        summary.outcomes.len(),
        summary.succeeded(),
        summary.failed(),
        summary.record_count()
    );
    if summary.failed() > 0 {
        let failed: Vec<&str> = summary
            .outcomes
            .iter()
            .filter(|o| !o.is_collected())
            .map(BranchOutcome::branch)
            .collect();
        warn!("branches without data: {}", failed.join(", "));
    }
    Ok(summary)
}
