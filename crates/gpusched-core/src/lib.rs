//! gpusched-core: Core types for the gpusched policy engine
//!
//! This crate provides the types shared by every scheduling policy:
//! - Job records and the trace row builder
//! - Per-user duration profiles
//! - The resource guard
//! - Policy identifiers, configuration and error handling
//! - Seeded random sources

pub mod config;
pub mod error;
pub mod gpu;
pub mod guard;
pub mod job;
pub mod policy;
pub mod profile;
pub mod rng;

pub use config::*;
pub use error::*;
pub use gpu::*;
pub use guard::prune;
pub use job::*;
pub use policy::*;
pub use profile::*;
pub use rng::{seeded, SchedRng};
