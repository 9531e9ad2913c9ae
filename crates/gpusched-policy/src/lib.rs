//! gpusched-policy: Job ordering policies for gpusched
//!
//! This crate decides the order in which queued jobs are offered to the
//! executor:
//! - Deterministic orderings (FIFO, SJF family, HRRN family)
//! - Lottery scheduling
//! - Fair share across groups or users
//! - Preemption victim ordering

pub mod engine;
pub mod fair_share;
pub mod lottery;
pub mod ordering;
pub mod preemption;

pub use engine::PolicyEngine;
pub use fair_share::{Consumer, FairShare};
pub use lottery::{assign_tickets, lottery_sort};
pub use preemption::preempt_order;
