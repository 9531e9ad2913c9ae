//! Seeded random sources
//!
//! A run has one seed. Each randomized component owns a generator derived
//! from that seed and a fixed stream id, so adding draws in one component
//! never shifts the sequence seen by another.

use rand::SeedableRng;
use rand_pcg::Pcg64;

/// Generator type used throughout gpusched
pub type SchedRng = Pcg64;

/// Stream id of the policy engine generator
pub const POLICY_STREAM: u64 = 1;
/// Stream id of the learned policy generator
pub const AGENT_STREAM: u64 = 2;

/// Build the generator for `stream` of the run seeded with `seed`
pub fn seeded(seed: u64, stream: u64) -> SchedRng {
    Pcg64::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
