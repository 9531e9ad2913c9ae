//! Job records and the trace row builder

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::profile::DurationProfiles;
use crate::{GpuType, SchedError, SchedResult};

/// One raw trace row: field name to string value
pub type RawRow = HashMap<String, String>;

/// Trace fields that scheduling never reads
const DROPPED_FIELDS: [&str; 10] = [
    "fuxi_job_name",
    "fuxi_task_name",
    "inst_id",
    "running_cluster",
    "model_name",
    "iterations",
    "interval",
    "vc",
    "jobid",
    "status",
];

/// Duration statistics of a user's historical jobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationEstimate {
    pub dur_avg: f64,
    pub dur_std: f64,
    pub dur_med: f64,
    /// Mean after discarding the top and bottom 10%
    pub dur_trim_mean: f64,
}

/// Canonical job record
///
/// Demand fields are private: `size` and `resource` are derived from them and
/// are recomputed by every setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub user: String,
    pub group: String,
    num_gpu: u32,
    num_cpu: u32,
    duration: u64,
    pub num_inst: u32,
    pub submit_time: u64,
    size: u64,
    resource: [u32; 2],
    pub gpu_type: Option<GpuType>,
    /// Time already run, maintained by the executor
    pub on_time: u64,
    /// Time lost to preemption, maintained by the executor
    pub wasted: u64,
    /// Completion timestamp once known
    pub jct: Option<u64>,
    pub node: Option<String>,
    pub estimate: Option<DurationEstimate>,
    pub wait_time: f64,
    pub user_dur: f64,
    pub user_gpu_dur: f64,
    pub group_dur: f64,
    pub group_gpu_dur: f64,
    /// Per-user round-robin position inside the current batch
    pub user_rrid: u32,
    /// Written by the lottery
    pub tickets: u64,
}

impl JobRecord {
    /// Create a job with the given demand and every other field at its default
    pub fn new(
        job_id: impl Into<String>,
        user: impl Into<String>,
        group: impl Into<String>,
        num_gpu: u32,
        num_cpu: u32,
        duration: u64,
        submit_time: u64,
    ) -> Self {
        let mut job = Self {
            job_id: job_id.into(),
            user: user.into(),
            group: group.into(),
            num_gpu,
            num_cpu,
            duration: duration.max(1),
            num_inst: 1,
            submit_time,
            size: 0,
            resource: [0, 0],
            gpu_type: None,
            on_time: 0,
            wasted: 0,
            jct: None,
            node: None,
            estimate: None,
            wait_time: 0.0,
            user_dur: 0.0,
            user_gpu_dur: 0.0,
            group_dur: 0.0,
            group_gpu_dur: 0.0,
            user_rrid: 0,
            tickets: 0,
        };
        job.rederive();
        job
    }

    pub fn num_gpu(&self) -> u32 {
        self.num_gpu
    }

    pub fn num_cpu(&self) -> u32 {
        self.num_cpu
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// `(num_gpu + num_cpu) * duration`, saturating at `u64::MAX`
    pub fn size(&self) -> u64 {
        self.size
    }

    /// `[num_gpu, num_cpu]`
    pub fn resource(&self) -> [u32; 2] {
        self.resource
    }

    /// Replace the GPU and CPU demand
    pub fn set_demand(&mut self, num_gpu: u32, num_cpu: u32) {
        self.num_gpu = num_gpu;
        self.num_cpu = num_cpu;
        self.rederive();
    }

    /// Replace the duration; values below 1 become 1
    pub fn set_duration(&mut self, duration: u64) {
        self.duration = duration.max(1);
        self.rederive();
    }

    /// Set `wait_time` to the time spent queued as of `now`
    pub fn refresh_wait_time(&mut self, now: u64) {
        self.wait_time = now.saturating_sub(self.submit_time) as f64;
    }

    /// Queueing delay once the job has completed
    pub fn queue_delay(&self) -> Option<u64> {
        self.jct.map(|jct| jct.saturating_sub(self.duration))
    }

    /// `J id-[G g,C c]-O:on_time/D:duration`, used when reporting preemptions
    pub fn preempt_summary(&self) -> String {
        format!(
            "J {}-[G {},C {}]-O:{:>3}/D:{:>3}",
            self.job_id, self.num_gpu, self.num_cpu, self.on_time, self.duration
        )
    }

    /// Concise form plus node and `queue delay ---> jct`, for finished jobs
    pub fn done_summary(&self) -> String {
        let concise = format!(
            "J {}([G {},C {}]-D {}-N {})",
            self.job_id,
            self.num_gpu,
            self.num_cpu,
            self.duration,
            self.node.as_deref().unwrap_or("-")
        );
        let delay = self
            .queue_delay()
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        let jct = self.jct.map_or_else(|| "-".to_string(), |j| j.to_string());
        format!("{:>25}: {:>4} ---> {:>4}", concise, delay, jct)
    }

    fn rederive(&mut self) {
        self.size = (self.num_gpu as u64 + self.num_cpu as u64).saturating_mul(self.duration);
        self.resource = [self.num_gpu, self.num_cpu];
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "J {}([G {},C {}]-D {})",
            self.job_id, self.num_gpu, self.num_cpu, self.duration
        )
    }
}

fn field<'a>(raw: &'a RawRow, key: &str) -> Option<&'a str> {
    raw.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_float(raw: &RawRow, key: &str) -> SchedResult<Option<f64>> {
    match field(raw, key) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| SchedError::parse(key, value)),
    }
}

/// Parse an optional numeric field, falling back to `default` when it is
/// missing or malformed. Malformed values are reported, not fatal.
fn float_or(raw: &RawRow, key: &str, default: f64) -> f64 {
    match parse_float(raw, key) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(e) => {
            warn!(field = key, error = %e, "Malformed trace field, using default");
            default
        }
    }
}

/// Build a canonical job record from one trace row.
///
/// `num_gpu` and `num_cpu` are fractional device counts in the trace and are
/// stored in percent. A row without `job_id` or without a parseable
/// `duration` is rejected; every other field has a default.
pub fn build_job(raw: &RawRow, profiles: Option<&DurationProfiles>) -> SchedResult<JobRecord> {
    let job_id = field(raw, "job_id")
        .ok_or_else(|| SchedError::MissingField("job_id".to_string()))?
        .to_string();
    let user = raw.get("user").cloned().unwrap_or_default();
    let group = raw.get("group").cloned().unwrap_or_default();

    let duration = parse_float(raw, "duration")?
        .ok_or_else(|| SchedError::MissingField("duration".to_string()))?;
    // Truncate, then floor at 1; a zero or negative duration would divide by
    // zero in the response ratio.
    let duration = (duration.trunc() as i64).max(1) as u64;

    let num_gpu = (100.0 * float_or(raw, "num_gpu", 0.0)).round().max(0.0) as u32;
    let num_cpu = (100.0 * float_or(raw, "num_cpu", 0.0)).round().max(0.0) as u32;
    let submit_time = float_or(raw, "submit_time", 1.0).round().max(0.0) as u64;
    let num_inst = float_or(raw, "num_inst", 1.0).round().max(0.0) as u32;

    let mut job = JobRecord::new(job_id, user, group, num_gpu, num_cpu, duration, submit_time);
    job.num_inst = num_inst;
    job.wait_time = float_or(raw, "wait_time", 0.0);
    job.user_dur = float_or(raw, "user_dur", 0.0);
    job.user_gpu_dur = float_or(raw, "user_gpu_dur", 0.0);
    job.group_dur = float_or(raw, "group_dur", 0.0);
    job.group_gpu_dur = float_or(raw, "group_gpu_dur", 0.0);
    job.gpu_type = field(raw, "gpu_type").and_then(|v| match v.parse::<GpuType>() {
        Ok(t) => Some(t),
        Err(e) => {
            debug!(job_id = %job.job_id, error = %e, "Unknown GPU type");
            None
        }
    });

    if let Some(profile) = profiles.and_then(|p| p.get(&job.user)) {
        job.estimate = Some(profile.estimate());
    }

    let dropped = DROPPED_FIELDS.iter().filter(|f| raw.contains_key(**f)).count();
    if dropped > 0 {
        debug!(job_id = %job.job_id, dropped, "Dropped trace-only fields");
    }

    Ok(job)
}

/// Build a job from `raw` and append it to `jobs`, preserving arrival order
pub fn add_job(
    jobs: &mut Vec<JobRecord>,
    raw: &RawRow,
    profiles: Option<&DurationProfiles>,
) -> SchedResult<()> {
    let job = build_job(raw, profiles)?;
    jobs.push(job);
    Ok(())
}

/// Build every row of a batch. Rows that fail are logged and skipped so one
/// bad row never loses the rest of the trace.
pub fn build_jobs<'a, I>(rows: I, profiles: Option<&DurationProfiles>) -> Vec<JobRecord>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut jobs = Vec::new();
    for (line, raw) in rows.into_iter().enumerate() {
        if let Err(e) = add_job(&mut jobs, raw, profiles) {
            warn!(row = line, error = %e, "Skipping trace row");
        }
    }
    jobs
}

/// Number each user's jobs 0, 1, 2, ... in queue order.
///
/// Used as the tie-break of every ordering policy so that jobs of several
/// users interleave when their primary keys are equal.
pub fn assign_user_rrid(jobs: &mut [JobRecord]) {
    let mut next: HashMap<&str, u32> = HashMap::new();
    let mut ids = Vec::with_capacity(jobs.len());
    for job in jobs.iter() {
        let counter = next.entry(job.user.as_str()).or_insert(0);
        ids.push(*counter);
        *counter += 1;
    }
    for (job, rrid) in jobs.iter_mut().zip(ids) {
        job.user_rrid = rrid;
    }
}
