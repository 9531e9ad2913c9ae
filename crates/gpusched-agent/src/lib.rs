//! gpusched-agent: Learned scheduling policy for gpusched
//!
//! A deep Q-network agent:
//! - Experience replay with a bounded ring buffer
//! - A two-hidden-layer action-value network with manual back-propagation
//! - Adam or SGD updates and soft (Polyak) target synchronization
//! - Epsilon-greedy action selection

pub mod agent;
pub mod network;
pub mod optimizer;
pub mod replay;

pub use agent::Agent;
pub use network::QNetwork;
pub use optimizer::Optimizer;
pub use replay::{Batch, Experience, ReplayBuffer};
