//! Candidate schedule producers and KPI evaluation.
//!
//! # Producers
//!
//! - `BaselineScheduler`: FIFO-by-deadline, first compatible machine.
//!   Conservative fallback that never over-books a machine.
//! - `BatchingScheduler`: groups jobs by product so each machine pays at
//!   most one changeover per product group.
//! - `Rebalancer`: local search that moves tail jobs from the most loaded
//!   machine to less loaded compatible machines.
//!
//! All producers are greedy and deterministic; none backtracks, and none
//! mutates its inputs.
//!
//! # KPI
//!
//! `Kpi` computes tardiness, setup totals, switch count and utilization
//! imbalance for any (possibly partial) schedule.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Allahverdi et al. (2008), "A survey of scheduling problems with setup times or costs"

mod baseline;
mod batching;
mod kpi;
mod rebalance;
mod timeline;

pub use baseline::BaselineScheduler;
pub use batching::BatchingScheduler;
pub use kpi::Kpi;
pub use rebalance::{RebalanceConfig, RebalanceMove, RebalanceOutcome, Rebalancer};
pub use timeline::{MachineTimeline, Slot};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Job, Machine};

/// Unscheduled reason: the job lists no machines.
pub const REASON_NO_OPTIONS: &str = "no machine options";
/// Unscheduled reason: the processing time is zero or negative.
pub const REASON_BAD_DURATION: &str = "non-positive processing time";
/// Unscheduled reason: no listed machine exists and can produce the product.
pub const REASON_NO_COMPATIBLE: &str = "no compatible machine";
/// Unscheduled reason: compatible machines exist but none has room.
pub const REASON_NO_SLOT: &str = "no feasible slot within shift and overtime";

/// Dispatch order: rush first, then due time, then job id.
pub fn dispatch_cmp(a: &Job, b: &Job) -> Ordering {
    b.is_rush()
        .cmp(&a.is_rush())
        .then_with(|| a.due_time.cmp(&b.due_time))
        .then_with(|| a.job_id.cmp(&b.job_id))
}

/// Jobs sorted by [`dispatch_cmp`].
pub(crate) fn dispatch_order(jobs: &[Arc<Job>]) -> Vec<&Arc<Job>> {
    let mut ordered: Vec<&Arc<Job>> = jobs.iter().collect();
    ordered.sort_by(|a, b| dispatch_cmp(a, b));
    ordered
}

/// Reason a job can never be placed, independent of machine state.
pub(crate) fn admission_failure(job: &Job) -> Option<&'static str> {
    if job.machine_options.is_empty() {
        Some(REASON_NO_OPTIONS)
    } else if job.processing_time <= 0 {
        Some(REASON_BAD_DURATION)
    } else {
        None
    }
}

pub(crate) fn machine_index(machines: &[Machine]) -> HashMap<&str, &Machine> {
    machines
        .iter()
        .map(|m| (m.machine_id.as_str(), m))
        .collect()
}
