//! Schedule (solution) model.
//!
//! A schedule maps each machine to its ordered sequence of job
//! assignments and explicitly lists the jobs that could not be placed.
//! Schedules share jobs through `Arc<Job>` and never copy or mutate them.
//!
//! # Invariants
//! Producers are expected to uphold these; the validator re-checks them.
//! - Per machine, assignments are ordered by `start_time` and do not overlap.
//! - A job appears in at most one machine's sequence.
//! - An assignment's machine is one of the job's machine options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::constraint::Constraint;
use super::interval::TimeWindow;
use super::job::Job;

/// A job placed on a machine during `[start_time, end_time)`.
///
/// Times are minutes since midnight of the planning date. The setup
/// changeover occupies the `setup_minutes_before` minutes right before
/// `start_time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAssignment {
    /// The scheduled job (shared, never copied).
    pub job: Arc<Job>,
    /// Machine running the job.
    pub machine_id: String,
    /// Processing start (minutes).
    pub start_time: i64,
    /// Processing end (minutes, exclusive).
    pub end_time: i64,
    /// Changeover minutes consumed immediately before `start_time`.
    pub setup_minutes_before: i64,
}

impl JobAssignment {
    /// Creates an assignment over an explicit interval with no setup.
    pub fn new(job: Arc<Job>, machine_id: impl Into<String>, start_time: i64, end_time: i64) -> Self {
        Self {
            job,
            machine_id: machine_id.into(),
            start_time,
            end_time,
            setup_minutes_before: 0,
        }
    }

    /// Creates an assignment whose end is `start_time + processing_time`.
    pub fn placed(job: Arc<Job>, machine_id: impl Into<String>, start_time: i64, setup: i64) -> Self {
        let end_time = start_time + job.processing_time;
        Self::new(job, machine_id, start_time, end_time).with_setup(setup)
    }

    /// Sets the setup time.
    pub fn with_setup(mut self, setup_minutes: i64) -> Self {
        self.setup_minutes_before = setup_minutes;
        self
    }

    #[inline]
    pub fn job_id(&self) -> &str {
        &self.job.job_id
    }

    #[inline]
    pub fn product_type(&self) -> &str {
        &self.job.product_type
    }

    /// Processing interval.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Machine time consumed: processing plus setup.
    #[inline]
    pub fn busy_minutes(&self) -> i64 {
        (self.end_time - self.start_time) + self.setup_minutes_before
    }

    /// Minutes past the job's due time (0 if on time).
    #[inline]
    pub fn tardiness(&self) -> i64 {
        (self.end_time - self.job.due_minute()).max(0)
    }
}

/// A job the producer could not place, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnscheduledJob {
    pub job_id: String,
    pub reason: String,
}

/// A candidate production schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Per-machine assignment sequences, ordered by start time.
    pub assignments: BTreeMap<String, Vec<JobAssignment>>,
    /// Jobs explicitly reported as not placed.
    pub unscheduled: Vec<UnscheduledJob>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an assignment into its machine's sequence, keeping start order.
    pub fn add_assignment(&mut self, assignment: JobAssignment) {
        let seq = self
            .assignments
            .entry(assignment.machine_id.clone())
            .or_default();
        let pos = seq.partition_point(|a| a.start_time <= assignment.start_time);
        seq.insert(pos, assignment);
    }

    /// Records a job as unscheduled.
    pub fn mark_unscheduled(&mut self, job_id: impl Into<String>, reason: impl Into<String>) {
        self.unscheduled.push(UnscheduledJob {
            job_id: job_id.into(),
            reason: reason.into(),
        });
    }

    /// Assignments on a machine (empty if none).
    pub fn machine_assignments(&self, machine_id: &str) -> &[JobAssignment] {
        self.assignments
            .get(machine_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Last assignment on a machine.
    pub fn last_assignment(&self, machine_id: &str) -> Option<&JobAssignment> {
        self.machine_assignments(machine_id).last()
    }

    /// All assignments, machine by machine.
    pub fn iter_assignments(&self) -> impl Iterator<Item = &JobAssignment> {
        self.assignments.values().flatten()
    }

    /// Finds the assignment for a job.
    pub fn assignment_for_job(&self, job_id: &str) -> Option<&JobAssignment> {
        self.iter_assignments().find(|a| a.job_id() == job_id)
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.values().map(Vec::len).sum()
    }

    /// Busy minutes (processing + setup) of a machine.
    pub fn busy_minutes(&self, machine_id: &str) -> i64 {
        self.machine_assignments(machine_id)
            .iter()
            .map(JobAssignment::busy_minutes)
            .sum()
    }

    /// Removes a job's assignment from a machine.
    pub fn remove_assignment(&mut self, machine_id: &str, job_id: &str) -> Option<JobAssignment> {
        let seq = self.assignments.get_mut(machine_id)?;
        let pos = seq.iter().position(|a| a.job_id() == job_id)?;
        let removed = seq.remove(pos);
        if seq.is_empty() {
            self.assignments.remove(machine_id);
        }
        Some(removed)
    }

    /// Recomputes `setup_minutes_before` along a machine's sequence.
    pub fn recompute_setups(&mut self, machine_id: &str, constraint: &Constraint) {
        let Some(seq) = self.assignments.get_mut(machine_id) else {
            return;
        };
        let mut previous: Option<String> = None;
        for a in seq.iter_mut() {
            a.setup_minutes_before = constraint.setup_before(previous.as_deref(), a.product_type());
            previous = Some(a.product_type().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SetupMatrix;
    use chrono::{NaiveDate, NaiveTime};

    fn job(id: &str, product: &str, minutes: i64) -> Arc<Job> {
        let due = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        Arc::new(Job::new(id, product, minutes, due).with_machine("M1"))
    }

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.add_assignment(JobAssignment::placed(job("J2", "P_B", 60), "M1", 600, 10));
        s.add_assignment(JobAssignment::placed(job("J1", "P_A", 60), "M1", 480, 0));
        s.add_assignment(JobAssignment::placed(job("J3", "P_A", 30), "M2", 480, 0));
        s
    }

    #[test]
    fn test_assignments_kept_in_start_order() {
        let s = sample_schedule();
        let ids: Vec<&str> = s.machine_assignments("M1").iter().map(|a| a.job_id()).collect();
        assert_eq!(ids, vec!["J1", "J2"]);
        assert_eq!(s.assignment_count(), 3);
        assert_eq!(s.machine_assignments("M9").len(), 0);
    }

    #[test]
    fn test_placed_assignment_interval() {
        let a = JobAssignment::placed(job("J1", "P_A", 45), "M1", 500, 5);
        assert_eq!(a.end_time, 545);
        assert_eq!(a.busy_minutes(), 50);
        assert_eq!(a.window(), TimeWindow::new(500, 545));
    }

    #[test]
    fn test_tardiness() {
        let on_time = JobAssignment::placed(job("J1", "P_A", 60), "M1", 600, 0);
        assert_eq!(on_time.tardiness(), 0); // ends 11:00, due 12:00
        let late = JobAssignment::placed(job("J2", "P_A", 60), "M1", 690, 0);
        assert_eq!(late.tardiness(), 30);
    }

    #[test]
    fn test_queries() {
        let s = sample_schedule();
        assert_eq!(s.busy_minutes("M1"), 130);
        assert_eq!(s.assignment_for_job("J3").unwrap().end_time, 510);
        assert!(s.assignment_for_job("J9").is_none());
        assert_eq!(s.last_assignment("M1").unwrap().job_id(), "J2");
    }

    #[test]
    fn test_remove_and_recompute_setups() {
        let mut s = sample_schedule();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let constraint = crate::models::Constraint::new(
            date,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        )
        .unwrap()
        .with_setup_times(SetupMatrix::new().with("P_A", "P_B", 10));

        let removed = s.remove_assignment("M1", "J1").unwrap();
        assert_eq!(removed.job_id(), "J1");
        s.recompute_setups("M1", &constraint);
        assert_eq!(s.machine_assignments("M1")[0].setup_minutes_before, 0);

        s.remove_assignment("M2", "J3");
        assert!(!s.assignments.contains_key("M2"));
        assert!(s.remove_assignment("M2", "J3").is_none());
    }

    #[test]
    fn test_unscheduled() {
        let mut s = Schedule::new();
        s.mark_unscheduled("J7", "no compatible machine");
        assert_eq!(s.unscheduled[0].job_id, "J7");
        assert!(s.assignment_for_job("J7").is_none());
        assert_eq!(s.assignment_count(), 0);
    }

    #[test]
    fn test_schedule_serde_roundtrip() {
        let s = sample_schedule();
        let json = serde_json::to_string(&s).unwrap();
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
