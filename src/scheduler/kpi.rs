//! Schedule quality metrics (KPIs).
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total Tardiness | Sum of max(0, completion - due) over scheduled jobs (min) |
//! | Total Setup Time | Sum of setup minutes before each assignment |
//! | Setup Switches | Assignments preceded by a non-zero setup |
//! | Utilization Imbalance | (max busy ratio - min busy ratio) * 100 |
//! | Utilization by Machine | Busy minutes / shift duration per machine |
//!
//! Busy minutes include setup. Unscheduled jobs contribute nothing here;
//! accounting for them is the validator's job.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Constraint, Machine, Schedule};

/// Schedule performance indicators. Times are in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    /// Sum of tardiness across scheduled jobs.
    pub total_tardiness: i64,
    /// Sum of setup minutes.
    pub total_setup_time: i64,
    /// Number of assignments with a non-zero setup.
    pub num_setup_switches: usize,
    /// Spread between most and least utilized machine, in percentage points.
    pub utilization_imbalance: f64,
    /// Busy ratio of every machine over the regular shift.
    pub utilization_by_machine: BTreeMap<String, f64>,
}

impl Kpi {
    /// Computes KPIs for a schedule.
    ///
    /// Every machine in `machines` takes part in the utilization spread,
    /// idle ones included.
    pub fn calculate(schedule: &Schedule, machines: &[Machine], constraint: &Constraint) -> Self {
        let mut total_tardiness = 0;
        let mut total_setup_time = 0;
        let mut num_setup_switches = 0;

        for a in schedule.iter_assignments() {
            total_tardiness += a.tardiness();
            total_setup_time += a.setup_minutes_before;
            if a.setup_minutes_before > 0 {
                num_setup_switches += 1;
            }
        }

        let shift = constraint.shift_duration();
        let utilization_by_machine: BTreeMap<String, f64> = machines
            .iter()
            .map(|m| {
                let busy = schedule.busy_minutes(&m.machine_id);
                let ratio = if shift > 0 {
                    busy as f64 / shift as f64
                } else {
                    0.0
                };
                (m.machine_id.clone(), ratio)
            })
            .collect();

        let max = utilization_by_machine
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let min = utilization_by_machine
            .values()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let utilization_imbalance = if utilization_by_machine.is_empty() {
            0.0
        } else {
            (max - min) * 100.0
        };

        Self {
            total_tardiness,
            total_setup_time,
            num_setup_switches,
            utilization_imbalance,
            utilization_by_machine,
        }
    }

    /// Weighted objective used to rank valid candidates (lower is better).
    pub fn weighted_score(&self, constraint: &Constraint) -> f64 {
        constraint.tardiness_weight * self.total_tardiness as f64
            + constraint.setup_weight * self.total_setup_time as f64
            + constraint.utilization_weight * self.utilization_imbalance
    }
}
