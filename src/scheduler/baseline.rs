//! Baseline FIFO-by-deadline scheduler.
//!
//! # Algorithm
//!
//! 1. Sort jobs by (rush first, due time ascending, job id ascending).
//! 2. For each job, walk its machine options in the given order.
//! 3. On the first compatible machine with a feasible appended slot
//!    (setup paid, downtime skipped, within shift + overtime), place it.
//! 4. Jobs that fit nowhere are recorded as unscheduled.
//!
//! Never over-books a machine and always terminates.
//!
//! # Complexity
//! O(n log n + n * m * d) where n=jobs, m=machine options, d=downtime windows.

use std::collections::HashMap;
use std::sync::Arc;

use super::timeline::MachineTimeline;
use super::{admission_failure, dispatch_order, machine_index, REASON_NO_COMPATIBLE, REASON_NO_SLOT};
use crate::models::{Constraint, Job, JobAssignment, Machine, Schedule};

/// Deterministic, order-preserving constructive scheduler.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{NaiveDate, NaiveTime};
/// use shift_optimizer::models::{Constraint, Job, Machine};
/// use shift_optimizer::scheduler::BaselineScheduler;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
/// let constraint = Constraint::new(date, hm(8, 0), hm(16, 0)).unwrap();
/// let machines = vec![Machine::new("M1").with_capability("P_A")];
/// let jobs = vec![Arc::new(Job::new("J1", "P_A", 60, hm(10, 0)).with_machine("M1"))];
///
/// let schedule = BaselineScheduler::new().schedule(&jobs, &machines, &constraint);
/// assert_eq!(schedule.assignment_count(), 1);
/// assert_eq!(schedule.assignment_for_job("J1").unwrap().start_time, 480);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineScheduler;

impl BaselineScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Builds a schedule from scratch.
    pub fn schedule(&self, jobs: &[Arc<Job>], machines: &[Machine], constraint: &Constraint) -> Schedule {
        let by_id = machine_index(machines);
        let mut timelines: HashMap<&str, MachineTimeline<'_>> = HashMap::new();
        let mut schedule = Schedule::new();

        for job in dispatch_order(jobs) {
            if let Some(reason) = admission_failure(job) {
                schedule.mark_unscheduled(&job.job_id, reason);
                continue;
            }

            let mut compatible = false;
            let mut placed = false;

            for option in &job.machine_options {
                let Some(&machine) = by_id.get(option.as_str()) else {
                    continue;
                };
                if !machine.can_produce(&job.product_type) {
                    continue;
                }
                compatible = true;

                let timeline = timelines
                    .entry(machine.machine_id.as_str())
                    .or_insert_with(|| MachineTimeline::new(machine, constraint));
                if let Some(slot) = timeline.earliest_slot(job) {
                    timeline.commit(slot, job);
                    schedule.add_assignment(JobAssignment::placed(
                        Arc::clone(job),
                        &machine.machine_id,
                        slot.start,
                        slot.setup,
                    ));
                    placed = true;
                    break;
                }
            }

            if !placed {
                let reason = if compatible {
                    REASON_NO_SLOT
                } else {
                    REASON_NO_COMPATIBLE
                };
                schedule.mark_unscheduled(&job.job_id, reason);
            }
        }

        schedule
    }

    /// Short summary of a baseline schedule.
    pub fn explain(&self, schedule: &Schedule) -> String {
        format!(
            "Baseline FIFO: jobs taken rush-first by due time, each on its first compatible machine. \
             {} assigned, {} unscheduled.",
            schedule.assignment_count(),
            schedule.unscheduled.len()
        )
    }
}
