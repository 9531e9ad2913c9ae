//! Trace rows through the guard and the engine, as the simulation loop drives them

use gpusched_core::{build_jobs, prune, JobRecord, Policy, RawRow};
use gpusched_policy::ordering::{self, is_ordered_by};
use gpusched_policy::PolicyEngine;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn three_jobs() -> Vec<JobRecord> {
    let rows = vec![
        row(&[("job_id", "j0"), ("user", "u"), ("duration", "5"), ("submit_time", "0")]),
        row(&[("job_id", "j1"), ("user", "u"), ("duration", "1"), ("submit_time", "1")]),
        row(&[("job_id", "j2"), ("user", "u"), ("duration", "3"), ("submit_time", "2")]),
    ];
    build_jobs(&rows, None)
}

#[test]
fn test_sjf_and_fifo_scenario() {
    let mut engine = PolicyEngine::new(0, 1.0);
    let mut jobs = three_jobs();
    // submit_time "0" parses to 0, not the missing-field default
    assert_eq!(jobs[0].submit_time, 0);

    engine.order(&mut jobs, Policy::Sjf);
    let durations: Vec<u64> = jobs.iter().map(|j| j.duration()).collect();
    assert_eq!(durations, vec![1, 3, 5]);

    engine.order(&mut jobs, Policy::Fifo);
    let submits: Vec<u64> = jobs.iter().map(|j| j.submit_time).collect();
    assert_eq!(submits, vec![0, 1, 2]);
}

#[test]
fn test_prune_then_order() {
    let rows = vec![
        row(&[("job_id", "big"), ("user", "u"), ("num_gpu", "1.5"), ("duration", "4")]),
        row(&[("job_id", "ok"), ("user", "u"), ("num_gpu", "0.5"), ("duration", "2")]),
    ];
    let mut jobs = build_jobs(&rows, None);
    assert_eq!(prune(&mut jobs, 100, 9600), 1);
    assert_eq!(jobs[0].num_gpu(), 100);
    assert_eq!(jobs[0].size(), 400);

    PolicyEngine::new(0, 1.0).order(&mut jobs, Policy::Sjf);
    assert_eq!(jobs[0].job_id, "ok");
}

fn random_batch(rng: &mut Pcg64) -> Vec<JobRecord> {
    let users = ["alice", "bob", "carol"];
    let len = rng.gen_range(0..30);
    (0..len)
        .map(|i| {
            let user = users[rng.gen_range(0..users.len())];
            let mut job = JobRecord::new(
                format!("j{}", i),
                user,
                "g",
                rng.gen_range(0..400),
                rng.gen_range(0..800),
                rng.gen_range(1..6),
                rng.gen_range(0..4),
            );
            job.wait_time = rng.gen_range(0..10) as f64;
            job.user_dur = rng.gen_range(0..3) as f64;
            job.group_dur = rng.gen_range(0..3) as f64;
            job.group_gpu_dur = rng.gen_range(0..3) as f64;
            job
        })
        .collect()
}

#[test]
fn test_deterministic_policies_sort_permutations() {
    // HRRN_norm scales every ratio by the same positive maximum, so it must
    // satisfy the HRRN comparator too
    let checks: [(Policy, fn(&JobRecord) -> f64); 7] = [
        (Policy::Fifo, ordering::fifo_key),
        (Policy::Sjf, ordering::sjf_key),
        (Policy::Sju, ordering::sju_key),
        (Policy::Sjg, ordering::sjg_key),
        (Policy::Sjgg, ordering::sjgg_key),
        (Policy::Hrrn, ordering::hrrn_key),
        (Policy::HrrnNorm, ordering::hrrn_key),
    ];
    let mut rng = Pcg64::seed_from_u64(2024);
    let mut engine = PolicyEngine::new(1, 1.0);

    for _ in 0..200 {
        let batch = random_batch(&mut rng);
        for (policy, key) in checks {
            let mut jobs = batch.clone();
            engine.order(&mut jobs, policy);
            assert!(is_ordered_by(&jobs, key), "{} out of order", policy);

            let mut before: Vec<&str> = batch.iter().map(|j| j.job_id.as_str()).collect();
            let mut after: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
            before.sort_unstable();
            after.sort_unstable();
            assert_eq!(before, after, "{} lost or duplicated a job", policy);
        }
    }
}

#[test]
fn test_stateful_policies_keep_every_job() {
    let mut rng = Pcg64::seed_from_u64(77);
    let mut engine = PolicyEngine::new(3, 1.0);
    for _ in 0..100 {
        let batch = random_batch(&mut rng);
        for policy in [
            Policy::Lottery,
            Policy::FairShareGroup,
            Policy::FairShareUser,
        ] {
            let mut jobs = batch.clone();
            engine.order(&mut jobs, policy);
            assert_eq!(jobs.len(), batch.len());
            let mut after: Vec<&str> = jobs.iter().map(|j| j.job_id.as_str()).collect();
            after.sort_unstable();
            after.dedup();
            assert_eq!(after.len(), batch.len());
        }
    }
}
