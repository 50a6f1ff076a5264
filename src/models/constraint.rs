//! Shift constraint and setup times.
//!
//! A [`Constraint`] fixes the planning date, the shift window with its
//! overtime allowance, the sequence-dependent setup times, and the
//! weights used to compare valid candidate schedules.
//!
//! # Reference
//! Allahverdi et al. (2008), "A survey of scheduling problems with
//! setup times or costs"

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::ModelError;
use super::interval::{minute_of_day, TimeWindow};

/// Sequence-dependent setup times keyed by `"FROM->TO"`.
///
/// Missing pairs cost 0, and a product following itself always costs 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetupMatrix {
    transitions: BTreeMap<String, i64>,
}

impl SetupMatrix {
    /// Creates an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup key for a product pair.
    pub fn key(from: &str, to: &str) -> String {
        format!("{from}->{to}")
    }

    /// Defines the changeover time from `from` to `to` (minutes).
    pub fn set(&mut self, from: &str, to: &str, minutes: i64) {
        self.transitions.insert(Self::key(from, to), minutes);
    }

    /// Builder form of [`SetupMatrix::set`].
    pub fn with(mut self, from: &str, to: &str, minutes: i64) -> Self {
        self.set(from, to, minutes);
        self
    }

    /// Defines the same changeover time in both directions.
    pub fn with_symmetric(self, a: &str, b: &str, minutes: i64) -> Self {
        self.with(a, b, minutes).with(b, a, minutes)
    }

    /// Changeover time from `from` to `to` in minutes.
    pub fn get(&self, from: &str, to: &str) -> i64 {
        if from == to {
            return 0;
        }
        self.transitions
            .get(&Self::key(from, to))
            .copied()
            .unwrap_or(0)
    }

    /// Setup before a job of `to`, given the previous product on the machine.
    pub fn before(&self, previous: Option<&str>, to: &str) -> i64 {
        previous.map_or(0, |from| self.get(from, to))
    }

    /// Number of explicitly defined transitions.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Shift-level scheduling constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Reference date that anchors time-of-day values and downtime.
    pub planning_date: NaiveDate,
    /// Shift start (time of day).
    pub shift_start: NaiveTime,
    /// Shift end (time of day).
    pub shift_end: NaiveTime,
    /// Minutes the feasible end may extend past `shift_end`.
    #[serde(default)]
    pub max_overtime_minutes: i64,
    /// Changeover times between product types.
    #[serde(default)]
    pub setup_times: SetupMatrix,
    /// Weight of total tardiness when ranking valid candidates.
    #[serde(default = "default_tardiness_weight")]
    pub tardiness_weight: f64,
    /// Weight of total setup time when ranking valid candidates.
    #[serde(default = "default_setup_weight")]
    pub setup_weight: f64,
    /// Weight of utilization imbalance when ranking valid candidates.
    #[serde(default = "default_utilization_weight")]
    pub utilization_weight: f64,
}

fn default_tardiness_weight() -> f64 {
    1.0
}

fn default_setup_weight() -> f64 {
    0.5
}

fn default_utilization_weight() -> f64 {
    0.3
}

impl Constraint {
    /// Creates a constraint with no overtime, no setups, and default weights.
    pub fn new(
        planning_date: NaiveDate,
        shift_start: NaiveTime,
        shift_end: NaiveTime,
    ) -> Result<Self, ModelError> {
        let constraint = Self {
            planning_date,
            shift_start,
            shift_end,
            max_overtime_minutes: 0,
            setup_times: SetupMatrix::new(),
            tardiness_weight: default_tardiness_weight(),
            setup_weight: default_setup_weight(),
            utilization_weight: default_utilization_weight(),
        };
        constraint.validate()?;
        Ok(constraint)
    }

    /// Sets the overtime allowance (minutes).
    pub fn with_overtime(mut self, minutes: i64) -> Self {
        self.max_overtime_minutes = minutes;
        self
    }

    /// Sets the setup matrix.
    pub fn with_setup_times(mut self, setup_times: SetupMatrix) -> Self {
        self.setup_times = setup_times;
        self
    }

    /// Sets the candidate-ranking weights.
    pub fn with_weights(mut self, tardiness: f64, setup: f64, utilization: f64) -> Self {
        self.tardiness_weight = tardiness;
        self.setup_weight = setup;
        self.utilization_weight = utilization;
        self
    }

    /// Checks shift ordering and overtime sign.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.shift_start >= self.shift_end {
            return Err(ModelError::InvalidShift {
                start: self.shift_start,
                end: self.shift_end,
            });
        }
        if self.max_overtime_minutes < 0 {
            return Err(ModelError::NegativeOvertime(self.max_overtime_minutes));
        }
        Ok(())
    }

    #[inline]
    pub fn shift_start_minute(&self) -> i64 {
        minute_of_day(self.shift_start)
    }

    #[inline]
    pub fn shift_end_minute(&self) -> i64 {
        minute_of_day(self.shift_end)
    }

    /// Latest feasible end: shift end plus overtime.
    #[inline]
    pub fn horizon_end_minute(&self) -> i64 {
        self.shift_end_minute() + self.max_overtime_minutes
    }

    /// Regular shift length in minutes (overtime excluded).
    #[inline]
    pub fn shift_duration(&self) -> i64 {
        self.shift_end_minute() - self.shift_start_minute()
    }

    /// The feasible window `[shift_start, shift_end + overtime]`.
    pub fn feasible_window(&self) -> TimeWindow {
        TimeWindow::new(self.shift_start_minute(), self.horizon_end_minute())
    }

    /// Setup before a job of `to` following `previous` on the same machine.
    #[inline]
    pub fn setup_before(&self, previous: Option<&str>, to: &str) -> i64 {
        self.setup_times.before(previous, to)
    }
}
