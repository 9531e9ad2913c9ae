//! Policy identifiers
//!
//! The set of scheduling policies is closed: new policies are added by
//! extending [`Policy`], never by string or integer lookup tables at the call
//! site. Names and legacy numeric ids are still accepted at the edges
//! (configuration files, command line) and converted once.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::SchedError;

/// Reward shaping used by a learned policy run.
///
/// The formulas are computed by the simulation loop; the core only carries
/// the name so configuration and logs agree on which variant ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewardVariant {
    /// `-sqrt(penalty_done_jobs) + 3 * throughput`
    Rl1,
    /// `-sqrt(penalty_done_jobs)`
    Rl2,
    /// `-mean(sqrt(penalty_done_jobs)) + throughput`
    Rl3,
    /// `-mean(sqrt(penalty_wait_time_cluster_job)) + throughput`
    Rl4,
    /// Same shaping as RL4, separate experiment slot
    Rl5,
}

impl fmt::Display for RewardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardVariant::Rl1 => write!(f, "RL1"),
            RewardVariant::Rl2 => write!(f, "RL2"),
            RewardVariant::Rl3 => write!(f, "RL3"),
            RewardVariant::Rl4 => write!(f, "RL4"),
            RewardVariant::Rl5 => write!(f, "RL5"),
        }
    }
}

/// Job allocation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Policy {
    /// Shortest job first on true duration
    Sjf,
    /// Shortest job first on the user duration estimator
    Sju,
    /// Shortest job first on the group duration estimator
    Sjg,
    /// Shortest job first on the group and GPU duration estimator
    Sjgg,
    /// First in, first out
    #[default]
    Fifo,
    /// Highest response ratio next
    Hrrn,
    /// Highest response ratio next, normalized by the queue maximum
    HrrnNorm,
    /// Weighted random order without replacement
    Lottery,
    /// Fair share across groups
    FairShareGroup,
    /// Fair share across users
    FairShareUser,
    /// Learned policy with the given reward shaping
    Learned(RewardVariant),
}

impl Policy {
    pub const ALL: [Policy; 15] = [
        Policy::Sjf,
        Policy::Sju,
        Policy::Sjg,
        Policy::Sjgg,
        Policy::Fifo,
        Policy::Hrrn,
        Policy::HrrnNorm,
        Policy::Lottery,
        Policy::FairShareGroup,
        Policy::FairShareUser,
        Policy::Learned(RewardVariant::Rl1),
        Policy::Learned(RewardVariant::Rl2),
        Policy::Learned(RewardVariant::Rl3),
        Policy::Learned(RewardVariant::Rl4),
        Policy::Learned(RewardVariant::Rl5),
    ];

    /// Numeric id used by trace experiment logs
    pub fn legacy_id(&self) -> u8 {
        match self {
            Policy::Sjf => 0,
            Policy::Sju => 1,
            Policy::Sjg => 2,
            Policy::Sjgg => 4,
            Policy::Fifo => 8,
            Policy::Hrrn => 9,
            Policy::HrrnNorm => 10,
            Policy::Lottery => 12,
            Policy::FairShareGroup => 13,
            Policy::FairShareUser => 14,
            Policy::Learned(RewardVariant::Rl1) => 15,
            Policy::Learned(RewardVariant::Rl2) => 16,
            Policy::Learned(RewardVariant::Rl3) => 17,
            Policy::Learned(RewardVariant::Rl4) => 18,
            Policy::Learned(RewardVariant::Rl5) => 19,
        }
    }

    /// Whether the outcome depends on the run seed
    pub fn is_randomized(&self) -> bool {
        matches!(self, Policy::Lottery | Policy::Learned(_))
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Sjf => write!(f, "SJF"),
            Policy::Sju => write!(f, "SJU"),
            Policy::Sjg => write!(f, "SJG"),
            Policy::Sjgg => write!(f, "SJGG"),
            Policy::Fifo => write!(f, "FIFO"),
            Policy::Hrrn => write!(f, "HRRN"),
            Policy::HrrnNorm => write!(f, "HRRN_norm"),
            Policy::Lottery => write!(f, "Lottery"),
            Policy::FairShareGroup => write!(f, "FairShareGroup"),
            Policy::FairShareUser => write!(f, "FairShareUser"),
            Policy::Learned(variant) => write!(f, "{}", variant),
        }
    }
}

impl TryFrom<u8> for Policy {
    type Error = SchedError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Policy::ALL
            .iter()
            .copied()
            .find(|p| p.legacy_id() == id)
            .ok_or_else(|| SchedError::Policy(format!("unknown policy id {}", id)))
    }
}

impl FromStr for Policy {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<u8>() {
            return Policy::try_from(id);
        }
        let wanted = s.to_ascii_lowercase().replace(['-', '_'], "");
        Policy::ALL
            .iter()
            .copied()
            .find(|p| p.to_string().to_ascii_lowercase().replace('_', "") == wanted)
            .ok_or_else(|| SchedError::Policy(format!("unknown policy '{}'", s)))
    }
}

impl TryFrom<String> for Policy {
    type Error = SchedError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Policy> for String {
    fn from(p: Policy) -> Self {
        p.to_string()
    }
}

/// Preemption victim ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PreemptPolicy {
    /// Smallest remaining duration first
    #[default]
    Sdf,
    /// Smallest size first
    Ssf,
    /// Largest GPU demand first
    Lgf,
}

impl fmt::Display for PreemptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreemptPolicy::Sdf => write!(f, "SDF"),
            PreemptPolicy::Ssf => write!(f, "SSF"),
            PreemptPolicy::Lgf => write!(f, "LGF"),
        }
    }
}
