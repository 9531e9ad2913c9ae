//! CLI commands implementation

use anyhow::{Context, Result};
use gpusched_core::{
    build_jobs, load_duration_profiles, prune, JobRecord, Policy, RawRow, SchedConfig,
};
use gpusched_policy::PolicyEngine;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Read a trace CSV into raw rows keyed by header
pub fn read_trace<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Options of the `order` command
#[derive(Debug)]
pub struct OrderArgs {
    pub trace: PathBuf,
    pub profiles: Option<PathBuf>,
    pub policy: Option<Policy>,
    pub now: Option<u64>,
    pub limit: Option<usize>,
    pub json: bool,
}

/// One line of `order` output
#[derive(Debug, Serialize)]
struct OrderedJob<'a> {
    position: usize,
    job_id: &'a str,
    user: &'a str,
    group: &'a str,
    num_gpu: u32,
    num_cpu: u32,
    duration: u64,
    submit_time: u64,
    /// Numeric GPU model code, absent when the trace has none
    gpu_type: Option<u8>,
    user_rrid: u32,
    tickets: u64,
}

fn ordered_rows(jobs: &[JobRecord]) -> Vec<OrderedJob<'_>> {
    jobs.iter()
        .enumerate()
        .map(|(position, j)| OrderedJob {
            position,
            job_id: &j.job_id,
            user: &j.user,
            group: &j.group,
            num_gpu: j.num_gpu(),
            num_cpu: j.num_cpu(),
            duration: j.duration(),
            submit_time: j.submit_time,
            gpu_type: j.gpu_type.map(|t| t.code()),
            user_rrid: j.user_rrid,
            tickets: j.tickets,
        })
        .collect()
}

/// Load, prune and order a trace, returning the queue as the executor would
/// see it
pub fn ordered_queue(config: &SchedConfig, args: &OrderArgs) -> Result<(Policy, Vec<JobRecord>)> {
    let file = std::fs::File::open(&args.trace)
        .with_context(|| format!("Failed to open trace {}", args.trace.display()))?;
    let rows = read_trace(file)?;

    let profiles = match &args.profiles {
        Some(path) => Some(load_profiles(path)?),
        None => None,
    };

    let mut jobs = build_jobs(&rows, profiles.as_ref());
    info!(rows = rows.len(), jobs = jobs.len(), "Trace loaded");

    let clamps = prune(&mut jobs, config.cluster.gpu_limit, config.cluster.cpu_limit);
    if clamps > 0 {
        info!(clamps, "Oversized requests clamped");
    }

    if let Some(now) = args.now {
        for job in jobs.iter_mut() {
            job.refresh_wait_time(now);
        }
    }

    let policy = args.policy.unwrap_or(config.policy.allocation);
    let mut engine = PolicyEngine::from_config(config);
    engine.order(&mut jobs, policy);
    Ok((policy, jobs))
}

fn load_profiles(path: &Path) -> Result<gpusched_core::DurationProfiles> {
    load_duration_profiles(path)
        .with_context(|| format!("Failed to load duration profiles {}", path.display()))
}

/// Print the queue order produced by the selected policy
pub fn order(config: &SchedConfig, args: OrderArgs) -> Result<()> {
    let (policy, jobs) = ordered_queue(config, &args)?;
    let shown = args.limit.unwrap_or(jobs.len()).min(jobs.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ordered_rows(&jobs[..shown]))?);
        return Ok(());
    }

    if policy.is_randomized() {
        println!("Policy: {} ({} jobs, seed {})", policy, jobs.len(), config.seed);
    } else {
        println!("Policy: {} ({} jobs)", policy, jobs.len());
    }
    println!(
        "{:<6} {:<20} {:<12} {:<8} {:<8} {:<10} {:<10}",
        "POS", "JOB", "USER", "GPU", "CPU", "DURATION", "SUBMIT"
    );
    println!("{}", "-".repeat(80));
    for (pos, job) in jobs[..shown].iter().enumerate() {
        println!(
            "{:<6} {:<20} {:<12} {:<8} {:<8} {:<10} {:<10}",
            pos,
            job.job_id,
            job.user,
            job.num_gpu(),
            job.num_cpu(),
            job.duration(),
            job.submit_time
        );
    }
    Ok(())
}

/// List every policy with its legacy id
pub fn policies() -> Result<()> {
    println!("{:<4} {:<16} {:<10}", "ID", "POLICY", "SEEDED");
    println!("{}", "-".repeat(32));
    for policy in Policy::ALL {
        let seeded = if policy.is_randomized() { "yes" } else { "no" };
        println!("{:<4} {:<16} {:<10}", policy.legacy_id(), policy, seeded);
    }
    Ok(())
}

/// Print the effective configuration as TOML
pub fn show_config(config: &SchedConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
