//! Resource guard: clamps oversized job requests to the per-job caps

use tracing::warn;

use crate::JobRecord;

/// Clamp `num_gpu` and `num_cpu` of every job to the given limits.
///
/// Each clamp emits one warning and is corrective, never fatal. Clamping goes
/// through [`JobRecord::set_demand`], so `size` and `resource` stay consistent
/// with the new demand. Jobs already within limits are left untouched.
/// Returns the number of clamps applied.
pub fn prune(jobs: &mut [JobRecord], gpu_limit: u32, cpu_limit: u32) -> usize {
    let mut clamps = 0;
    for job in jobs.iter_mut() {
        if job.num_gpu() > gpu_limit {
            let gpu_was = job.num_gpu();
            job.set_demand(gpu_limit, job.num_cpu());
            warn!(job = %job, from = gpu_was, to = gpu_limit, "Clamped GPU request");
            clamps += 1;
        }
        if job.num_cpu() > cpu_limit {
            let cpu_was = job.num_cpu();
            job.set_demand(job.num_gpu(), cpu_limit);
            warn!(job = %job, from = cpu_was, to = cpu_limit, "Clamped CPU request");
            clamps += 1;
        }
    }
    clamps
}
