//! Preemption victim ordering

use gpusched_core::{JobRecord, PreemptPolicy};
use std::cmp::Reverse;

/// Order running jobs so the preferred victim comes first. Ties fall back to
/// `job_id` so the choice is reproducible.
pub fn preempt_order(jobs: &mut [JobRecord], policy: PreemptPolicy) {
    match policy {
        PreemptPolicy::Sdf => {
            jobs.sort_by(|a, b| {
                remaining(a)
                    .cmp(&remaining(b))
                    .then_with(|| a.job_id.cmp(&b.job_id))
            });
        }
        PreemptPolicy::Ssf => {
            jobs.sort_by(|a, b| a.size().cmp(&b.size()).then_with(|| a.job_id.cmp(&b.job_id)));
        }
        PreemptPolicy::Lgf => {
            jobs.sort_by(|a, b| {
                Reverse(a.num_gpu())
                    .cmp(&Reverse(b.num_gpu()))
                    .then_with(|| a.job_id.cmp(&b.job_id))
            });
        }
    }
}

/// Time a job still needs to finish
fn remaining(job: &JobRecord) -> u64 {
    job.duration().saturating_sub(job.on_time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(id: &str, num_gpu: u32, duration: u64, on_time: u64) -> JobRecord {
        let mut job = JobRecord::new(id, "u", "g", num_gpu, 100, duration, 0);
        job.on_time = on_time;
        job
    }

    fn ids(jobs: &[JobRecord]) -> Vec<&str> {
        jobs.iter().map(|j| j.job_id.as_str()).collect()
    }

    fn sample() -> Vec<JobRecord> {
        vec![
            running("a", 100, 10, 8),
            running("b", 400, 5, 0),
            running("c", 200, 3, 0),
        ]
    }

    #[test]
    fn test_smallest_duration_first() {
        let mut jobs = sample();
        preempt_order(&mut jobs, PreemptPolicy::Sdf);
        assert_eq!(ids(&jobs), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_smallest_size_first() {
        let mut jobs = sample();
        preempt_order(&mut jobs, PreemptPolicy::Ssf);
        // sizes: a 2000, b 2500, c 900
        assert_eq!(ids(&jobs), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_largest_gpu_first() {
        let mut jobs = sample();
        jobs.push(running("d", 400, 1, 0));
        preempt_order(&mut jobs, PreemptPolicy::Lgf);
        assert_eq!(ids(&jobs), vec!["b", "d", "c", "a"]);
    }
}
