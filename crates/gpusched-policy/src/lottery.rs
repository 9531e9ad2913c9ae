//! Lottery scheduling
//!
//! A weighted shuffle without replacement: position 0 is won by a job with
//! probability proportional to its tickets, position 1 by one of the
//! remaining jobs in the same way, and so on.

use gpusched_core::JobRecord;
use rand::Rng;
use tracing::debug;

/// Upper bound on one job's tickets, so a queue's total never overflows
pub const MAX_TICKETS: u64 = u32::MAX as u64;

/// Tickets held by `job`: `max(trunc(group_gpu_dur * weight), 1)`, capped at
/// [`MAX_TICKETS`]
pub fn assign_tickets(job: &JobRecord, weight: f64) -> u64 {
    let tickets = (job.group_gpu_dur * weight).trunc();
    if tickets >= MAX_TICKETS as f64 {
        MAX_TICKETS
    } else if tickets >= 1.0 {
        tickets as u64
    } else {
        1
    }
}

/// Reorder `jobs` in place by repeated ticket draws.
///
/// `cumulative[k]` holds, for every position `k >= i` still in play, the
/// ticket sum of positions `i..=k`, so the winner of draw `i` is found by
/// binary search. Writes each job's `tickets`.
pub fn lottery_sort<R: Rng + ?Sized>(jobs: &mut [JobRecord], weight: f64, rng: &mut R) {
    let mut cumulative = Vec::with_capacity(jobs.len());
    let mut total: u64 = 0;
    for job in jobs.iter_mut() {
        job.tickets = assign_tickets(job, weight);
        total += job.tickets;
        cumulative.push(total);
    }

    for i in 0..jobs.len() {
        if total == 0 {
            debug!(position = i, "Lottery out of tickets");
            break;
        }

        let draw = rng.gen_range(1..=total);
        let winner = i + cumulative[i..].partition_point(|&c| c < draw);
        jobs.swap(i, winner);

        // Positions before the winner lose the job moved out of slot i; the
        // winner's slot and everything after it lose the winning job.
        let won = jobs[i].tickets;
        if winner > i {
            let moved = jobs[winner].tickets;
            for c in &mut cumulative[i + 1..winner] {
                *c -= moved;
            }
        }
        for c in &mut cumulative[winner.max(i + 1)..] {
            *c -= won;
        }
        total -= won;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn ticketed(id: &str, group_gpu_dur: f64) -> JobRecord {
        let mut job = JobRecord::new(id, "u", "g", 100, 0, 1, 0);
        job.group_gpu_dur = group_gpu_dur;
        job
    }

    #[test]
    fn test_assign_tickets() {
        assert_eq!(assign_tickets(&ticketed("a", 0.0), 1.0), 1);
        assert_eq!(assign_tickets(&ticketed("a", 0.9), 1.0), 1);
        assert_eq!(assign_tickets(&ticketed("a", 7.8), 1.0), 7);
        assert_eq!(assign_tickets(&ticketed("a", 7.8), 2.0), 15);
        assert_eq!(assign_tickets(&ticketed("a", 7.8), 0.0), 1);
        assert_eq!(assign_tickets(&ticketed("a", 1e30), 1.0), MAX_TICKETS);
        assert_eq!(assign_tickets(&ticketed("a", f64::INFINITY), 1.0), MAX_TICKETS);
        assert_eq!(assign_tickets(&ticketed("a", f64::NAN), 1.0), 1);
    }

    #[test]
    fn test_lottery_with_huge_tickets() {
        let mut jobs: Vec<JobRecord> = (0..4).map(|i| ticketed(&i.to_string(), 1e30)).collect();
        jobs.push(ticketed("small", 1.0));
        lottery_sort(&mut jobs, 2.0, &mut Pcg64::seed_from_u64(8));
        assert_eq!(jobs.len(), 5);
        assert!(jobs[..4].iter().all(|j| j.tickets == MAX_TICKETS));
        assert_eq!(jobs[4].job_id, "small");
    }

    #[test]
    fn test_lottery_is_permutation() {
        let mut rng = Pcg64::seed_from_u64(3);
        let mut jobs: Vec<JobRecord> = (0..20)
            .map(|i| ticketed(&i.to_string(), (i * 3 % 11) as f64))
            .collect();
        lottery_sort(&mut jobs, 1.0, &mut rng);

        let mut ids: Vec<u32> = jobs.iter().map(|j| j.job_id.parse().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<u32>>());
        assert!(jobs.iter().all(|j| j.tickets >= 1));
    }

    #[test]
    fn test_lottery_same_seed_same_order() {
        let base: Vec<JobRecord> = (0..10).map(|i| ticketed(&i.to_string(), i as f64)).collect();
        let mut a = base.clone();
        let mut b = base;
        lottery_sort(&mut a, 1.0, &mut Pcg64::seed_from_u64(11));
        lottery_sort(&mut b, 1.0, &mut Pcg64::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn test_lottery_first_position_follows_ticket_share() {
        let base = vec![ticketed("a", 1.0), ticketed("b", 2.0), ticketed("c", 7.0)];
        let mut rng = Pcg64::seed_from_u64(42);
        let runs = 20_000;
        let mut wins = [0u32; 3];
        for _ in 0..runs {
            let mut jobs = base.clone();
            lottery_sort(&mut jobs, 1.0, &mut rng);
            let idx = match jobs[0].job_id.as_str() {
                "a" => 0,
                "b" => 1,
                _ => 2,
            };
            wins[idx] += 1;
        }
        for (won, share) in wins.iter().zip([0.1, 0.2, 0.7]) {
            let freq = *won as f64 / runs as f64;
            assert!((freq - share).abs() < 0.02, "freq {} share {}", freq, share);
        }
    }

    #[test]
    fn test_lottery_second_position_without_replacement() {
        // Once "c" wins the first slot, "a" and "b" split the second 1:2.
        let base = vec![ticketed("a", 1.0), ticketed("b", 2.0), ticketed("c", 7.0)];
        let mut rng = Pcg64::seed_from_u64(5);
        let mut b_second = 0u32;
        let mut c_first = 0u32;
        for _ in 0..20_000 {
            let mut jobs = base.clone();
            lottery_sort(&mut jobs, 1.0, &mut rng);
            if jobs[0].job_id == "c" {
                c_first += 1;
                if jobs[1].job_id == "b" {
                    b_second += 1;
                }
            }
        }
        let freq = b_second as f64 / c_first as f64;
        assert!((freq - 2.0 / 3.0).abs() < 0.03, "freq {}", freq);
    }

    #[test]
    fn test_lottery_empty_and_single() {
        let mut rng = Pcg64::seed_from_u64(0);
        let mut empty: Vec<JobRecord> = Vec::new();
        lottery_sort(&mut empty, 1.0, &mut rng);
        assert!(empty.is_empty());

        let mut one = vec![ticketed("solo", 4.0)];
        lottery_sort(&mut one, 1.0, &mut rng);
        assert_eq!(one[0].job_id, "solo");
        assert_eq!(one[0].tickets, 4);
    }
}
