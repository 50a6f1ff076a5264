//! Per-machine append cursor.
//!
//! Tracks where the next job can be appended on one machine and which
//! product ran last, and finds the earliest feasible slot for a job:
//! setup is paid first, then setup and processing together are pushed
//! past any downtime they would overlap, and the slot is rejected if it
//! would end after `shift_end + max_overtime_minutes`.

use crate::models::{overlaps, Constraint, Job, Machine, Schedule, TimeWindow};

/// A feasible slot for a job on a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start: i64,
    pub end: i64,
    pub setup: i64,
}

/// Append-only view of one machine's timeline.
#[derive(Debug, Clone)]
pub struct MachineTimeline<'a> {
    machine: &'a Machine,
    constraint: &'a Constraint,
    blocked: Vec<TimeWindow>,
    cursor: i64,
    last_product: Option<String>,
}

impl<'a> MachineTimeline<'a> {
    /// Empty timeline starting at shift start.
    pub fn new(machine: &'a Machine, constraint: &'a Constraint) -> Self {
        Self {
            machine,
            constraint,
            blocked: machine.blocked_windows(constraint.planning_date),
            cursor: constraint.shift_start_minute(),
            last_product: None,
        }
    }

    /// Timeline positioned after the machine's last assignment in `schedule`.
    pub fn after(machine: &'a Machine, constraint: &'a Constraint, schedule: &Schedule) -> Self {
        let mut timeline = Self::new(machine, constraint);
        if let Some(last) = schedule.last_assignment(&machine.machine_id) {
            timeline.cursor = timeline.cursor.max(last.end_time);
            timeline.last_product = Some(last.product_type().to_string());
        }
        timeline
    }

    #[inline]
    pub fn machine(&self) -> &'a Machine {
        self.machine
    }

    #[inline]
    pub fn machine_id(&self) -> &'a str {
        &self.machine.machine_id
    }

    /// End of the last committed slot (or shift start).
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Earliest feasible slot for `job` appended to this timeline.
    pub fn earliest_slot(&self, job: &Job) -> Option<Slot> {
        let setup = self
            .constraint
            .setup_before(self.last_product.as_deref(), &job.product_type);
        let duration = job.processing_time;
        let mut start = self.cursor.max(self.constraint.shift_start_minute()) + setup;

        // The changeover must clear downtime too. Every hit moves `start`
        // strictly forward, so this terminates.
        while let Some(w) = self
            .blocked
            .iter()
            .find(|w| overlaps(start - setup, start + duration, w.start, w.end))
        {
            start = w.end + setup;
        }

        let end = start + duration;
        (end <= self.constraint.horizon_end_minute()).then_some(Slot { start, end, setup })
    }

    /// Advances the cursor past a slot taken by `job`.
    pub fn commit(&mut self, slot: Slot, job: &Job) {
        self.cursor = slot.end;
        self.last_product = Some(job.product_type.clone());
    }

    /// Free minutes from the cursor until the next downtime or the horizon.
    pub fn free_before_next_block(&self) -> i64 {
        let horizon = self.constraint.horizon_end_minute();
        let mut from = self.cursor.max(self.constraint.shift_start_minute());
        while let Some(w) = self.blocked.iter().find(|w| w.contains(from)) {
            from = w.end;
        }
        let next_block = self
            .blocked
            .iter()
            .filter(|w| w.start >= from)
            .map(|w| w.start)
            .min()
            .unwrap_or(horizon)
            .min(horizon);
        (next_block - from).max(0)
    }
}
