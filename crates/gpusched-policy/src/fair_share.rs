//! Fair-share scheduling across groups or users
//!
//! Usage is accounted optimistically: every job placed in an ordering is
//! charged its `group_gpu_dur` to its consumer right away, as if it will run.
//! Callers that learn a job did not run can hand the time back with
//! [`FairShare::release`].

use gpusched_core::JobRecord;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// What a fair-share policy balances across
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Group,
    User,
}

impl Consumer {
    fn of(self, job: &JobRecord) -> &str {
        match self {
            Consumer::Group => &job.group,
            Consumer::User => &job.user,
        }
    }
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consumer::Group => write!(f, "group"),
            Consumer::User => write!(f, "user"),
        }
    }
}

/// Accumulated GPU time per consumer
#[derive(Debug, Clone)]
pub struct FairShare {
    consumer: Consumer,
    usage: HashMap<String, f64>,
}

impl FairShare {
    pub fn new(consumer: Consumer) -> Self {
        Self {
            consumer,
            usage: HashMap::new(),
        }
    }

    pub fn consumer(&self) -> Consumer {
        self.consumer
    }

    /// Accumulated usage of `name`, 0 if never seen
    pub fn usage(&self, name: &str) -> f64 {
        self.usage.get(name).copied().unwrap_or(0.0)
    }

    /// Stable sort by the consumer's accumulated usage, least first, then
    /// charge every listed job to its consumer.
    pub fn order(&mut self, jobs: &mut [JobRecord]) {
        let consumer = self.consumer;
        for job in jobs.iter() {
            self.usage.entry(consumer.of(job).to_string()).or_insert(0.0);
        }

        let usage = &self.usage;
        jobs.sort_by(|a, b| {
            let ua = usage.get(consumer.of(a)).copied().unwrap_or(0.0);
            let ub = usage.get(consumer.of(b)).copied().unwrap_or(0.0);
            ua.total_cmp(&ub)
        });

        for job in jobs.iter() {
            if let Some(used) = self.usage.get_mut(consumer.of(job)) {
                *used += job.group_gpu_dur;
            }
        }
        debug!(consumer = %consumer, consumers = self.usage.len(), "Fair share ordered");
    }

    /// Hand back usage charged for work that never ran
    pub fn release(&mut self, name: &str, amount: f64) {
        if let Some(used) = self.usage.get_mut(name) {
            *used = (*used - amount).max(0.0);
        }
    }

    pub fn reset(&mut self) {
        self.usage.clear();
    }
}
