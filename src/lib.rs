//! Shift-level production scheduling.
//!
//! Assigns single-operation jobs to machines within one shift, honoring
//! machine capabilities, downtime, overtime limits and sequence-dependent
//! setup times. Several candidate schedules are built, validated and
//! scored; the best one is returned with a human-readable explanation.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Job`, `Machine`, `DowntimeWindow`,
//!   `Constraint`, `SetupMatrix`, `Schedule`, `JobAssignment`
//! - **`scheduler`**: Candidate producers (baseline, batching,
//!   rebalancing) and `Kpi` evaluation
//! - **`validation`**: Input integrity checks and schedule validation
//! - **`orchestration`**: The candidate pipeline (`Optimizer`) and
//!   selection of the best schedule
//! - **`config`**: JSON configuration and the demo plant
//! - **`import`**: Comma-separated job and downtime import
//! - **`generator`**: Seeded random jobs and downtime
//!
//! # Time Model
//!
//! Schedule times are integer minutes since midnight of the planning
//! date; intervals are half-open. See [`models::interval`].
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Allahverdi et al. (2008), "A survey of scheduling problems with
//!   setup times or costs"

pub mod config;
pub mod generator;
pub mod import;
pub mod models;
pub mod orchestration;
pub mod scheduler;
pub mod validation;
