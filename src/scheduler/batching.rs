//! Setup-minimizing batching scheduler.
//!
//! # Algorithm
//!
//! 1. Group jobs by product type; order each group rush-first by due time.
//! 2. Take groups largest first (ties: earliest due time in the group,
//!    then product name).
//! 3. For a group, pick the compatible machine with the most free time
//!    before its next hard stop (downtime or shift end + overtime) and
//!    append the group's jobs there back to back, so the changeover is
//!    paid once.
//! 4. Jobs that do not fit spill, most urgent first, to the next best
//!    compatible machine. Jobs that fit nowhere are unscheduled.
//!
//! Trades tardiness for fewer changeovers; validation and selection
//! downstream decide whether that trade pays off.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::timeline::MachineTimeline;
use super::{
    admission_failure, dispatch_cmp, machine_index, REASON_NO_COMPATIBLE, REASON_NO_SLOT,
};
use crate::models::{Constraint, Job, JobAssignment, Machine, Schedule};

/// Groups same-product jobs per machine to minimize setup switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchingScheduler;

impl BatchingScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Builds a batched schedule from scratch.
    pub fn schedule(&self, jobs: &[Arc<Job>], machines: &[Machine], constraint: &Constraint) -> Schedule {
        let by_id = machine_index(machines);
        let mut timelines: Vec<MachineTimeline<'_>> = machines
            .iter()
            .map(|m| MachineTimeline::new(m, constraint))
            .collect();
        let mut schedule = Schedule::new();

        let mut groups: BTreeMap<&str, Vec<&Arc<Job>>> = BTreeMap::new();
        for job in jobs {
            if let Some(reason) = admission_failure(job) {
                schedule.mark_unscheduled(&job.job_id, reason);
                continue;
            }
            groups.entry(job.product_type.as_str()).or_default().push(job);
        }
        for group in groups.values_mut() {
            group.sort_by(|a, b| dispatch_cmp(a, b));
        }

        let mut ordered: Vec<(&str, Vec<&Arc<Job>>)> = groups.into_iter().collect();
        ordered.sort_by(|(pa, a), (pb, b)| {
            b.len()
                .cmp(&a.len())
                .then_with(|| earliest_due(a).cmp(&earliest_due(b)))
                .then_with(|| pa.cmp(pb))
        });

        for (product, group) in ordered {
            let mut remaining = group;
            let mut tried = vec![false; timelines.len()];

            while !remaining.is_empty() {
                let best = timelines
                    .iter()
                    .enumerate()
                    .filter(|(i, tl)| {
                        !tried[*i]
                            && tl.machine().can_produce(product)
                            && remaining.iter().any(|j| j.allows_machine(tl.machine_id()))
                    })
                    .max_by(|(ia, a), (ib, b)| {
                        a.free_before_next_block()
                            .cmp(&b.free_before_next_block())
                            .then_with(|| ib.cmp(ia))
                    })
                    .map(|(i, _)| i);
                let Some(idx) = best else {
                    break;
                };
                tried[idx] = true;

                let timeline = &mut timelines[idx];
                let mut spilled = Vec::new();
                for job in remaining {
                    if job.allows_machine(timeline.machine_id()) {
                        if let Some(slot) = timeline.earliest_slot(job) {
                            timeline.commit(slot, job);
                            schedule.add_assignment(JobAssignment::placed(
                                Arc::clone(job),
                                timeline.machine_id(),
                                slot.start,
                                slot.setup,
                            ));
                            continue;
                        }
                    }
                    spilled.push(job);
                }
                remaining = spilled;
            }

            for job in remaining {
                let compatible = job.machine_options.iter().any(|id| {
                    by_id
                        .get(id.as_str())
                        .is_some_and(|m| m.can_produce(&job.product_type))
                });
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

    /// Short summary of a batched schedule.
    pub fn explain(&self, schedule: &Schedule) -> String {
        let switches = schedule
            .iter_assignments()
            .filter(|a| a.setup_minutes_before > 0)
            .count();
        let setup: i64 = schedule
            .iter_assignments()
            .map(|a| a.setup_minutes_before)
            .sum();
        format!(
            "Batching: same-product jobs grouped per machine, largest groups first. \
             {} assigned, {} unscheduled, {} setup switches ({} min).",
            schedule.assignment_count(),
            schedule.unscheduled.len(),
            switches,
            setup
        )
    }
}

fn earliest_due(group: &[&Arc<Job>]) -> Option<chrono::NaiveTime> {
    group.iter().map(|j| j.due_time).min()
}
