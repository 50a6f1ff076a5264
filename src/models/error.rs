use chrono::{NaiveDateTime, NaiveTime};

/// A model invariant was violated while constructing domain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A downtime window does not satisfy `start < end`.
    InvalidDowntime {
        machine_id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// A shift does not satisfy `shift_start < shift_end`.
    InvalidShift { start: NaiveTime, end: NaiveTime },
    /// A job has a processing time of zero or less.
    NonPositiveProcessingTime { job_id: String, minutes: i64 },
    /// Overtime allowance is negative.
    NegativeOvertime(i64),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDowntime {
                machine_id,
                start,
                end,
            } => write!(
                f,
                "Downtime on machine {machine_id} must start before it ends ({start} .. {end})"
            ),
            Self::InvalidShift { start, end } => {
                write!(f, "Shift must start before it ends ({start} .. {end})")
            }
            Self::NonPositiveProcessingTime { job_id, minutes } => write!(
                f,
                "Job {job_id} has non-positive processing time ({minutes} min)"
            ),
            Self::NegativeOvertime(minutes) => {
                write!(f, "Overtime allowance cannot be negative ({minutes} min)")
            }
        }
    }
}

impl std::error::Error for ModelError {}
