//! Production scheduling domain models.
//!
//! Provides the data types for one shift's scheduling problem and its
//! solutions: jobs, machines with downtime, the shift constraint with
//! setup times, and schedules of job assignments.
//!
//! # Domain Mappings
//!
//! | Model | Shop floor |
//! |-------|-----------|
//! | Job | Production order for one product type |
//! | Machine | Line or cell with product capabilities |
//! | DowntimeWindow | Maintenance, breakdown, planned stop |
//! | Constraint | Shift window, overtime, changeovers |
//! | Schedule | Shift production plan |

mod constraint;
mod error;
pub mod interval;
mod job;
mod machine;
mod schedule;

pub use constraint::{Constraint, SetupMatrix};
pub use error::ModelError;
pub use interval::{format_minute, minute_of_day, overlaps, TimeWindow};
pub use job::{Job, Priority};
pub use machine::{DowntimeWindow, Machine};
pub use schedule::{JobAssignment, Schedule, UnscheduledJob};
