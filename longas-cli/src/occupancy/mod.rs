//! Occupancy snapshots and the diff between two of them

pub mod diff;
pub mod types;

pub use diff::{arrivals, discharged_records};
pub use types::*;
