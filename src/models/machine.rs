//! Machine and downtime models.
//!
//! A machine produces the product types listed in its capabilities and is
//! unavailable during its downtime windows. Downtime may be added between
//! runs to model disruptions; every optimization run works on its own
//! snapshot (see `orchestration::OptimizationRequest`).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::error::ModelError;
use super::interval::{format_minute, minutes_from_midnight, TimeWindow};

/// A period during which a machine cannot run jobs.
///
/// Invariant: `start < end` (enforced by [`DowntimeWindow::new`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeWindow {
    /// Absolute start timestamp.
    pub start: NaiveDateTime,
    /// Absolute end timestamp (exclusive).
    pub end: NaiveDateTime,
    /// Free-text reason (maintenance, breakdown, ...).
    pub reason: String,
}

impl DowntimeWindow {
    /// Creates a downtime window, rejecting empty or inverted intervals.
    pub fn new(
        machine_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        reason: impl Into<String>,
    ) -> Result<Self, ModelError> {
        if start >= end {
            return Err(ModelError::InvalidDowntime {
                machine_id: machine_id.to_string(),
                start,
                end,
            });
        }
        Ok(Self {
            start,
            end,
            reason: reason.into(),
        })
    }

    /// Projects the window onto `date` as minutes relative to its midnight.
    pub fn window_on(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow::new(
            minutes_from_midnight(date, self.start),
            minutes_from_midnight(date, self.end),
        )
    }

    /// Whether the job interval `[job_start, job_end)` on `date` overlaps this window.
    pub fn overlaps_with(&self, job_start: i64, job_end: i64, date: NaiveDate) -> bool {
        self.window_on(date)
            .overlaps(&TimeWindow::new(job_start, job_end))
    }

    /// `HH:MM-HH:MM` relative to `date`.
    pub fn describe_on(&self, date: NaiveDate) -> String {
        let w = self.window_on(date);
        format!("{}-{}", format_minute(w.start), format_minute(w.end))
    }
}

/// A production machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine identifier.
    pub machine_id: String,
    /// Product types this machine can produce.
    pub capabilities: Vec<String>,
    /// Downtime windows, ordered by start.
    #[serde(default)]
    pub downtime_windows: Vec<DowntimeWindow>,
}

impl Machine {
    /// Creates a machine with no capabilities and no downtime.
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            capabilities: Vec::new(),
            downtime_windows: Vec::new(),
        }
    }

    /// Adds a product capability.
    pub fn with_capability(mut self, product_type: impl Into<String>) -> Self {
        self.capabilities.push(product_type.into());
        self
    }

    /// Adds several product capabilities.
    pub fn with_capabilities<I, S>(mut self, product_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities
            .extend(product_types.into_iter().map(Into::into));
        self
    }

    /// Builder form of [`Machine::add_downtime`].
    pub fn with_downtime(
        mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        reason: impl Into<String>,
    ) -> Result<Self, ModelError> {
        self.add_downtime(start, end, reason)?;
        Ok(self)
    }

    /// Adds a downtime window, keeping windows ordered by start.
    pub fn add_downtime(
        &mut self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        reason: impl Into<String>,
    ) -> Result<(), ModelError> {
        let window = DowntimeWindow::new(&self.machine_id, start, end, reason)?;
        let pos = self
            .downtime_windows
            .partition_point(|w| w.start <= window.start);
        self.downtime_windows.insert(pos, window);
        Ok(())
    }

    /// Whether this machine can produce `product_type`.
    pub fn can_produce(&self, product_type: &str) -> bool {
        self.capabilities.iter().any(|c| c == product_type)
    }

    /// Downtime windows projected onto `date`, ordered by start.
    pub fn blocked_windows(&self, date: NaiveDate) -> Vec<TimeWindow> {
        let mut windows: Vec<TimeWindow> = self
            .downtime_windows
            .iter()
            .map(|w| w.window_on(date))
            .collect();
        windows.sort_by_key(|w| (w.start, w.end));
        windows
    }

    /// Re-checks the `start < end` invariant of every window.
    ///
    /// Windows can bypass [`DowntimeWindow::new`] through deserialization.
    pub fn validate(&self) -> Result<(), ModelError> {
        for w in &self.downtime_windows {
            if w.start >= w.end {
                return Err(ModelError::InvalidDowntime {
                    machine_id: self.machine_id.clone(),
                    start: w.start,
                    end: w.end,
                });
            }
        }
        Ok(())
    }
}
