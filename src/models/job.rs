//! Production job model.
//!
//! A job is a single unit of production: one product type, one processing
//! duration, one due time, and the set of machines it may run on.
//! Jobs are immutable once built and are shared between schedules
//! through `Arc<Job>`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::interval::minute_of_day;

/// Scheduling priority of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Regular job.
    #[default]
    Normal,
    /// Expedited job, ordered ahead of normal jobs.
    Rush,
}

impl Priority {
    /// Parses `"normal"` / `"rush"` (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "rush" => Some(Self::Rush),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Rush => f.write_str("rush"),
        }
    }
}

/// A production job to be scheduled.
///
/// # Time Representation
/// `processing_time` is in minutes; `due_time` is a time of day on the
/// planning date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub job_id: String,
    /// Product produced by this job (setup and capability lookups).
    pub product_type: String,
    /// Processing duration in minutes.
    pub processing_time: i64,
    /// Time of day by which the job should complete.
    pub due_time: NaiveTime,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: Priority,
    /// Machines this job may run on, in preference order.
    /// An empty list makes the job permanently unschedulable.
    pub machine_options: Vec<String>,
}

impl Job {
    /// Creates a normal-priority job with no machine options.
    pub fn new(
        job_id: impl Into<String>,
        product_type: impl Into<String>,
        processing_time: i64,
        due_time: NaiveTime,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            product_type: product_type.into(),
            processing_time,
            due_time,
            priority: Priority::Normal,
            machine_options: Vec::new(),
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Marks the job as rush.
    pub fn rush(self) -> Self {
        self.with_priority(Priority::Rush)
    }

    /// Appends an allowed machine.
    pub fn with_machine(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_options.push(machine_id.into());
        self
    }

    /// Replaces the allowed machines.
    pub fn with_machine_options<I, S>(mut self, machine_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.machine_options = machine_ids.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn is_rush(&self) -> bool {
        self.priority == Priority::Rush
    }

    /// Due time in minutes since midnight.
    #[inline]
    pub fn due_minute(&self) -> i64 {
        minute_of_day(self.due_time)
    }

    /// Whether `machine_id` is among this job's machine options.
    pub fn allows_machine(&self, machine_id: &str) -> bool {
        self.machine_options.iter().any(|m| m == machine_id)
    }
}
