//! Load rebalancing local search.
//!
//! # Algorithm
//!
//! Starting from a copy of an existing schedule, repeat:
//!
//! 1. Compute each machine's busy minutes (processing + setup).
//! 2. Take the most loaded machine as the source and walk its
//!    assignments from the latest-ending backwards.
//! 3. For the first assignment whose job may run on a less loaded
//!    machine (listed in its options, capable of its product) and fits
//!    at that machine's tail, move it there if the destination ends up
//!    strictly below the source's current load.
//! 4. Recompute setups on both machines.
//!
//! Stops when no improving move exists or the iteration cap is reached.
//! Each move strictly lowers the larger of the two loads involved, so
//! an already balanced schedule is returned unchanged with no moves.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 5.3: load balancing on parallel machines

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::timeline::{MachineTimeline, Slot};
use crate::models::{format_minute, overlaps, Constraint, JobAssignment, Machine, Schedule, TimeWindow};

/// Rebalancer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Upper bound on moves per run.
    pub max_iterations: usize,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
        }
    }
}

impl RebalanceConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// One job moved between machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceMove {
    pub job_id: String,
    pub from: String,
    pub to: String,
    /// New processing start on `to` (minutes).
    pub start: i64,
    /// New processing end on `to` (minutes).
    pub end: i64,
}

/// Rebalanced schedule and the moves that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceOutcome {
    pub schedule: Schedule,
    pub moves: Vec<RebalanceMove>,
}

impl RebalanceOutcome {
    /// Whether the input was returned unchanged.
    pub fn is_noop(&self) -> bool {
        self.moves.is_empty()
    }
}

struct PlannedMove {
    job_id: String,
    from: usize,
    to: usize,
    slot: Slot,
}

/// Moves tail jobs off the most loaded machine.
#[derive(Debug, Clone, Default)]
pub struct Rebalancer {
    config: RebalanceConfig,
}

impl Rebalancer {
    pub fn new(config: RebalanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RebalanceConfig {
        &self.config
    }

    /// Rebalances a copy of `schedule`. The input is left untouched.
    pub fn rebalance(
        &self,
        schedule: &Schedule,
        machines: &[Machine],
        constraint: &Constraint,
    ) -> RebalanceOutcome {
        let mut current = schedule.clone();
        let mut moves = Vec::new();

        for _ in 0..self.config.max_iterations {
            let Some(planned) = find_move(&current, machines, constraint) else {
                break;
            };
            let from = &machines[planned.from].machine_id;
            let to = &machines[planned.to].machine_id;
            let Some(removed) = current.remove_assignment(from, &planned.job_id) else {
                break;
            };
            current.recompute_setups(from, constraint);
            current.add_assignment(JobAssignment::placed(
                removed.job,
                to.as_str(),
                planned.slot.start,
                planned.slot.setup,
            ));
            current.recompute_setups(to, constraint);

            debug!(
                job_id = %planned.job_id,
                from = %from,
                to = %to,
                start = %format_minute(planned.slot.start),
                end = %format_minute(planned.slot.end),
                "rebalance move"
            );
            moves.push(RebalanceMove {
                job_id: planned.job_id,
                from: from.clone(),
                to: to.clone(),
                start: planned.slot.start,
                end: planned.slot.end,
            });
        }

        if moves.len() == self.config.max_iterations && self.config.max_iterations > 0 {
            debug!(cap = self.config.max_iterations, "rebalance iteration cap reached");
        }

        RebalanceOutcome {
            schedule: current,
            moves,
        }
    }

    /// Short summary of a rebalancing run.
    pub fn explain(&self, outcome: &RebalanceOutcome) -> String {
        if outcome.moves.is_empty() {
            return "Bottleneck rebalancing: load already balanced, no moves.".to_string();
        }
        let moved: Vec<String> = outcome
            .moves
            .iter()
            .map(|m| format!("{} {}->{}", m.job_id, m.from, m.to))
            .collect();
        format!(
            "Bottleneck rebalancing: {} move(s) off the most loaded machine ({}).",
            outcome.moves.len(),
            moved.join(", ")
        )
    }
}

fn find_move(schedule: &Schedule, machines: &[Machine], constraint: &Constraint) -> Option<PlannedMove> {
    let loads: Vec<i64> = machines
        .iter()
        .map(|m| schedule.busy_minutes(&m.machine_id))
        .collect();
    let (source_idx, &source_busy) = loads
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.cmp(b).then_with(|| ib.cmp(ia)))?;
    if source_busy == 0 {
        return None;
    }

    let seq = schedule.machine_assignments(&machines[source_idx].machine_id);
    let blocked = machines[source_idx].blocked_windows(constraint.planning_date);
    let mut latest_first: Vec<usize> = (0..seq.len()).collect();
    latest_first.sort_by(|&a, &b| seq[b].end_time.cmp(&seq[a].end_time));

    // Stable sort: equal loads keep machine order.
    let mut destinations: Vec<usize> = (0..machines.len()).filter(|&i| i != source_idx).collect();
    destinations.sort_by_key(|&i| loads[i]);

    for idx in latest_first {
        let assignment = &seq[idx];
        match busy_after_removal(seq, idx, constraint, &blocked) {
            Some(remaining) if remaining < source_busy => {}
            _ => continue,
        }

        for &dest_idx in &destinations {
            let dest = &machines[dest_idx];
            if !assignment.job.allows_machine(&dest.machine_id)
                || !dest.can_produce(assignment.product_type())
            {
                continue;
            }
            let Some(slot) = MachineTimeline::after(dest, constraint, schedule).earliest_slot(&assignment.job) else {
                continue;
            };
            let moved = assignment.job.processing_time + slot.setup;
            if loads[dest_idx] + moved < source_busy {
                return Some(PlannedMove {
                    job_id: assignment.job_id().to_string(),
                    from: source_idx,
                    to: dest_idx,
                    slot,
                });
            }
        }
    }
    None
}

/// Source load after removing `seq[idx]`, or `None` if the successor's
/// new setup would no longer fit before its start or would run into
/// downtime.
fn busy_after_removal(
    seq: &[JobAssignment],
    idx: usize,
    constraint: &Constraint,
    blocked: &[TimeWindow],
) -> Option<i64> {
    let removed = &seq[idx];
    let mut busy: i64 = seq.iter().map(JobAssignment::busy_minutes).sum::<i64>() - removed.busy_minutes();

    if let Some(next) = seq.get(idx + 1) {
        let prev = idx.checked_sub(1).map(|i| &seq[i]);
        let setup = constraint.setup_before(prev.map(JobAssignment::product_type), next.product_type());
        let floor = prev.map_or(constraint.shift_start_minute(), |p| p.end_time);
        let setup_start = next.start_time - setup;
        if setup_start < floor {
            return None;
        }
        if setup > 0
            && blocked
                .iter()
                .any(|w| overlaps(setup_start, next.start_time, w.start, w.end))
        {
            return None;
        }
        busy += setup - next.setup_minutes_before;
    }
    Some(busy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Job, SetupMatrix};
    use crate::scheduler::{BaselineScheduler, Kpi};
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn constraint() -> Constraint {
        Constraint::new(date(), t(8, 0), t(16, 0))
            .unwrap()
            .with_overtime(30)
            .with_setup_times(SetupMatrix::new().with_symmetric("P_A", "P_B", 10))
    }

    fn job(id: &str, product: &str, minutes: i64, options: &[&str]) -> Arc<Job> {
        Arc::new(Job::new(id, product, minutes, t(16, 0)).with_machine_options(options.iter().copied()))
    }

    fn two_machines() -> Vec<Machine> {
        vec![
            Machine::new("M1").with_capability("P_A"),
            Machine::new("M2").with_capability("P_A"),
        ]
    }

    fn stacked_on_m1(options: &[&str]) -> Schedule {
        let jobs: Vec<Arc<Job>> = (1..=4)
            .map(|i| job(&format!("J{i}"), "P_A", 60, options))
            .collect();
        BaselineScheduler::new().schedule(&jobs, &two_machines(), &constraint())
    }

    #[test]
    fn test_moves_tail_jobs_to_idle_machine() {
        let machines = two_machines();
        let c = constraint();
        let before = stacked_on_m1(&["M1", "M2"]);
        assert_eq!(before.machine_assignments("M1").len(), 4);

        let out = Rebalancer::default().rebalance(&before, &machines, &c);
        assert_eq!(out.moves.len(), 2);
        assert_eq!(out.moves[0].job_id, "J4");
        assert_eq!((out.moves[0].start, out.moves[0].end), (480, 540));
        assert_eq!(out.moves[1].job_id, "J3");
        assert_eq!(out.schedule.busy_minutes("M1"), 120);
        assert_eq!(out.schedule.busy_minutes("M2"), 120);

        let kpi = Kpi::calculate(&out.schedule, &machines, &c);
        assert!((kpi.utilization_imbalance - 0.0).abs() < 1e-10);
    }

    #[test]
    fn test_idempotent_when_balanced() {
        let machines = two_machines();
        let c = constraint();
        let first = Rebalancer::default().rebalance(&stacked_on_m1(&["M1", "M2"]), &machines, &c);
        let second = Rebalancer::default().rebalance(&first.schedule, &machines, &c);
        assert!(second.is_noop());
        assert_eq!(second.schedule, first.schedule);
    }

    #[test]
    fn test_input_schedule_not_mutated() {
        let before = stacked_on_m1(&["M1", "M2"]);
        let snapshot = before.clone();
        let _ = Rebalancer::default().rebalance(&before, &two_machines(), &constraint());
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_respects_machine_options() {
        let before = stacked_on_m1(&["M1"]);
        let out = Rebalancer::default().rebalance(&before, &two_machines(), &constraint());
        assert!(out.is_noop());
        assert_eq!(out.schedule, before);
    }

    #[test]
    fn test_respects_capability() {
        let machines = vec![
            Machine::new("M1").with_capability("P_A"),
            Machine::new("M2").with_capability("P_B"),
        ];
        let before = stacked_on_m1(&["M1", "M2"]);
        let out = Rebalancer::default().rebalance(&before, &machines, &constraint());
        assert!(out.is_noop());
    }

    #[test]
    fn test_skips_destination_without_room() {
        let machines = vec![
            Machine::new("M1").with_capability("P_A"),
            Machine::new("M2")
                .with_capability("P_A")
                .with_downtime(
                    date().and_hms_opt(8, 0, 0).unwrap(),
                    date().and_hms_opt(16, 30, 0).unwrap(),
                    "Overhaul",
                )
                .unwrap(),
        ];
        let before = stacked_on_m1(&["M1", "M2"]);
        let out = Rebalancer::default().rebalance(&before, &machines, &constraint());
        assert!(out.is_noop());
    }

    #[test]
    fn test_removal_rejected_when_successor_setup_hits_downtime() {
        let c = Constraint::new(date(), t(8, 0), t(16, 0)).unwrap().with_setup_times(
            SetupMatrix::new()
                .with("P_A", "P_B", 10)
                .with("P_B", "P_C", 5)
                .with("P_A", "P_C", 15),
        );
        let opts = ["M1", "M2"];
        let seq = vec![
            JobAssignment::placed(job("A1", "P_A", 60, &opts), "M1", 480, 0),
            JobAssignment::placed(job("B1", "P_B", 30, &opts), "M1", 550, 10),
            JobAssignment::placed(job("C1", "P_C", 60, &opts), "M1", 600, 5),
        ];
        // C1 would need a 15 min changeover from 09:45, inside 09:45-09:55
        let blocked = [TimeWindow::new(585, 595)];
        assert_eq!(busy_after_removal(&seq, 1, &c, &blocked), None);
        assert_eq!(busy_after_removal(&seq, 1, &c, &[]), Some(60 + 75));
    }

    #[test]
    fn test_iteration_cap() {
        let rebalancer = Rebalancer::new(RebalanceConfig::default().with_max_iterations(1));
        let out = rebalancer.rebalance(&stacked_on_m1(&["M1", "M2"]), &two_machines(), &constraint());
        assert_eq!(out.moves.len(), 1);
    }

    #[test]
    fn test_setups_recomputed_after_move() {
        let machines = vec![
            Machine::new("M1").with_capabilities(["P_A", "P_B"]),
            Machine::new("M2").with_capabilities(["P_A", "P_B"]),
        ];
        let c = constraint();
        let mut before = Schedule::new();
        let opts = ["M1", "M2"];
        before.add_assignment(JobAssignment::placed(job("J1", "P_A", 60, &opts), "M1", 480, 0));
        before.add_assignment(JobAssignment::placed(job("J2", "P_A", 60, &opts), "M1", 540, 0));
        before.add_assignment(JobAssignment::placed(job("J3", "P_B", 60, &opts), "M1", 610, 10));
        before.add_assignment(JobAssignment::placed(job("J4", "P_A", 60, &opts), "M2", 480, 0));

        let out = Rebalancer::default().rebalance(&before, &machines, &c);
        assert_eq!(out.moves.len(), 1);
        let moved = out.schedule.assignment_for_job("J3").unwrap();
        assert_eq!(moved.machine_id, "M2");
        assert_eq!(moved.setup_minutes_before, 10);
        assert_eq!((moved.start_time, moved.end_time), (550, 610));
        assert_eq!(out.schedule.busy_minutes("M1"), 120);
        assert_eq!(out.schedule.busy_minutes("M2"), 130);
    }

    #[test]
    fn test_empty_schedule() {
        let out = Rebalancer::default().rebalance(&Schedule::new(), &two_machines(), &constraint());
        assert!(out.is_noop());
        let none = Rebalancer::default().rebalance(&Schedule::new(), &[], &constraint());
        assert!(none.is_noop());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: RebalanceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_iterations, 100);
    }
}
