//! Input and schedule validation.
//!
//! - [`validate_input`]: integrity of jobs and machines before scheduling.
//! - [`validate_schedule`]: constraint check of a produced schedule,
//!   yielding a violation list classified as structural, feasibility or
//!   unschedulable.

mod input;
mod schedule;

pub use input::{validate_input, ValidationError, ValidationErrorKind, ValidationResult};
pub use schedule::{
    validate_schedule, LateJob, ValidationOutcome, ValidationReport, Violation, ViolationClass,
    ViolationKind,
};
