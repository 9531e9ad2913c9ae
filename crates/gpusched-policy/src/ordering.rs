//! Deterministic ordering policies
//!
//! Every policy is a stable sort on a primary key, with ties broken by
//! `user_rrid` ascending so equal-key jobs of different users interleave.
//! The executor dequeues from the front.

use gpusched_core::JobRecord;
use std::cmp::Ordering;

/// Stable sort by `key`, ties by `user_rrid`
pub fn order_by_key<F>(jobs: &mut [JobRecord], key: F)
where
    F: Fn(&JobRecord) -> f64,
{
    jobs.sort_by(|a, b| compare(a, b, &key));
}

fn compare<F>(a: &JobRecord, b: &JobRecord, key: &F) -> Ordering
where
    F: Fn(&JobRecord) -> f64,
{
    key(a)
        .total_cmp(&key(b))
        .then_with(|| a.user_rrid.cmp(&b.user_rrid))
}

/// Whether `jobs` is already in `key` order
pub fn is_ordered_by<F>(jobs: &[JobRecord], key: F) -> bool
where
    F: Fn(&JobRecord) -> f64,
{
    jobs.windows(2)
        .all(|w| compare(&w[0], &w[1], &key) != Ordering::Greater)
}

pub fn fifo_key(job: &JobRecord) -> f64 {
    job.submit_time as f64
}

pub fn sjf_key(job: &JobRecord) -> f64 {
    job.duration() as f64
}

/// User estimator: profile mean when known, trace `user_dur` otherwise
pub fn sju_key(job: &JobRecord) -> f64 {
    job.estimate.map_or(job.user_dur, |e| e.dur_avg)
}

pub fn sjg_key(job: &JobRecord) -> f64 {
    job.group_dur
}

pub fn sjgg_key(job: &JobRecord) -> f64 {
    job.group_gpu_dur
}

/// `(wait_time + duration) / duration`
pub fn response_ratio(job: &JobRecord) -> f64 {
    let duration = job.duration() as f64;
    (job.wait_time + duration) / duration
}

pub fn hrrn_key(job: &JobRecord) -> f64 {
    -response_ratio(job)
}

pub fn fifo(jobs: &mut [JobRecord]) {
    order_by_key(jobs, fifo_key);
}

pub fn sjf(jobs: &mut [JobRecord]) {
    order_by_key(jobs, sjf_key);
}

pub fn sju(jobs: &mut [JobRecord]) {
    order_by_key(jobs, sju_key);
}

pub fn sjg(jobs: &mut [JobRecord]) {
    order_by_key(jobs, sjg_key);
}

pub fn sjgg(jobs: &mut [JobRecord]) {
    order_by_key(jobs, sjgg_key);
}

/// Highest response ratio first
pub fn hrrn(jobs: &mut [JobRecord]) {
    order_by_key(jobs, hrrn_key);
}

/// Highest response ratio first, ratios scaled by the queue maximum
pub fn hrrn_norm(jobs: &mut [JobRecord]) {
    let max_ratio = jobs
        .iter()
        .map(response_ratio)
        .fold(f64::MIN_POSITIVE, f64::max);
    order_by_key(jobs, |job| -response_ratio(job) / max_ratio);
}
