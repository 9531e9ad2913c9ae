//! Policy engine: dispatches one ordering decision to the active policy

use gpusched_core::rng::POLICY_STREAM;
use gpusched_core::{assign_user_rrid, seeded, JobRecord, Policy, SchedConfig, SchedRng};
use tracing::{debug, info};

use crate::fair_share::{Consumer, FairShare};
use crate::{lottery, ordering};

/// Owns the state that outlives a single decision: the random source and the
/// fair-share accumulators. One engine per simulation run.
pub struct PolicyEngine {
    /// Random source of the lottery
    rng: SchedRng,
    /// Ticket multiplier of the lottery
    lottery_weight: f64,
    /// Fair-share state across groups
    group_share: FairShare,
    /// Fair-share state across users
    user_share: FairShare,
    /// Number of decisions taken
    decisions: u64,
}

impl PolicyEngine {
    /// Create an engine for the run seeded with `seed`
    pub fn new(seed: u64, lottery_weight: f64) -> Self {
        info!(seed, lottery_weight, "Policy engine initialized");

        Self {
            rng: seeded(seed, POLICY_STREAM),
            lottery_weight,
            group_share: FairShare::new(Consumer::Group),
            user_share: FairShare::new(Consumer::User),
            decisions: 0,
        }
    }

    pub fn from_config(config: &SchedConfig) -> Self {
        Self::new(config.seed, config.policy.lottery_weight)
    }

    /// Reorder the queue in place for the current decision point.
    ///
    /// `user_rrid` is renumbered over the queue first, so every policy sees
    /// the tie-break of the current batch. Learned policies keep arrival
    /// order here; the agent picks the placement action separately.
    pub fn order(&mut self, jobs: &mut [JobRecord], policy: Policy) {
        assign_user_rrid(jobs);

        match policy {
            Policy::Fifo | Policy::Learned(_) => ordering::fifo(jobs),
            Policy::Sjf => ordering::sjf(jobs),
            Policy::Sju => ordering::sju(jobs),
            Policy::Sjg => ordering::sjg(jobs),
            Policy::Sjgg => ordering::sjgg(jobs),
            Policy::Hrrn => ordering::hrrn(jobs),
            Policy::HrrnNorm => ordering::hrrn_norm(jobs),
            Policy::Lottery => lottery::lottery_sort(jobs, self.lottery_weight, &mut self.rng),
            Policy::FairShareGroup => self.group_share.order(jobs),
            Policy::FairShareUser => self.user_share.order(jobs),
        }

        self.decisions += 1;
        debug!(
            policy = %policy,
            queued = jobs.len(),
            head = jobs.first().map(|j| j.job_id.as_str()).unwrap_or("-"),
            "Queue ordered"
        );
    }

    /// Fair-share state across groups
    pub fn group_share(&self) -> &FairShare {
        &self.group_share
    }

    /// Fair-share state across users
    pub fn user_share(&self) -> &FairShare {
        &self.user_share
    }

    /// Mutable fair-share state, for loops that correct optimistic charges
    pub fn share_mut(&mut self, consumer: Consumer) -> &mut FairShare {
        match consumer {
            Consumer::Group => &mut self.group_share,
            Consumer::User => &mut self.user_share,
        }
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }
}
