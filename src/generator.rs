//! Random demo data.
//!
//! Produces jobs whose deadlines fall in the first half of the shift, so
//! that ordering and batching decisions actually matter, plus single
//! random downtime events for re-optimization scenarios. All functions
//! take the RNG explicitly; seed it for reproducible data.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use rand::prelude::IndexedRandom;
use rand::Rng;
use std::collections::BTreeSet;
use tracing::info;

use crate::models::{Constraint, DowntimeWindow, Job, Machine, Priority};

const DUE_MINUTES: [u32; 4] = [0, 15, 30, 45];
const PROCESSING_TIMES: [i64; 4] = [30, 45, 60, 90];
const DOWNTIME_LENGTHS: [i64; 5] = [30, 45, 60, 90, 120];
const RANDOM_DOWNTIME_REASON: &str = "Random downtime";

/// Generates `count` jobs (`J001`, `J002`, ...) over the products the
/// machines can make.
///
/// Each job may run on every machine capable of its product. Returns no
/// jobs when no machine has a capability.
pub fn generate_jobs<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    rush_probability: f64,
    machines: &[Machine],
    constraint: &Constraint,
) -> Vec<Job> {
    let products: Vec<&str> = machines
        .iter()
        .flat_map(|m| m.capabilities.iter().map(String::as_str))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if products.is_empty() {
        return Vec::new();
    }

    let start_hour = constraint.shift_start.hour();
    let end_hour = constraint.shift_end.hour().max(start_hour);
    let first_due = (start_hour + 1).min(23);
    let last_due = (start_hour + (end_hour - start_hour) / 2 + 1).clamp(first_due, 23);
    let rush_probability = rush_probability.max(0.0).min(1.0);

    let mut jobs = Vec::with_capacity(count);
    for i in 0..count {
        let Some(&product) = products.choose(rng) else {
            break;
        };
        let priority = if rng.random_bool(rush_probability) {
            Priority::Rush
        } else {
            Priority::Normal
        };
        let hour = rng.random_range(first_due..=last_due);
        let minute = DUE_MINUTES.choose(rng).copied().unwrap_or(0);
        let due = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(constraint.shift_end);
        let duration = PROCESSING_TIMES.choose(rng).copied().unwrap_or(60);
        let options = machines
            .iter()
            .filter(|m| m.can_produce(product))
            .map(|m| m.machine_id.clone());

        jobs.push(
            Job::new(format!("J{:03}", i + 1), product, duration, due)
                .with_priority(priority)
                .with_machine_options(options),
        );
    }
    jobs
}

/// Adds one random downtime window to a random machine.
///
/// The window starts 10% to 70% into the shift on the planning date and
/// lasts 30 to 120 minutes, cut at shift end. Returns the machine id and
/// the window added, or `None` without machines.
pub fn inject_random_downtime<R: Rng + ?Sized>(
    rng: &mut R,
    machines: &mut [Machine],
    constraint: &Constraint,
) -> Option<(String, DowntimeWindow)> {
    if machines.is_empty() {
        return None;
    }
    let index = rng.random_range(0..machines.len());

    let shift_start = constraint.shift_start_minute();
    let shift_end = constraint.shift_end_minute();
    let length = shift_end - shift_start;
    let start = rng.random_range(shift_start + length / 10..=shift_start + length * 7 / 10);
    let duration = DOWNTIME_LENGTHS.choose(rng).copied().unwrap_or(60);
    let end = (start + duration).min(shift_end);
    if end <= start {
        return None;
    }

    let midnight = constraint.planning_date.and_time(NaiveTime::MIN);
    let at = |minute: i64| -> NaiveDateTime { midnight + Duration::minutes(minute) };
    let window = DowntimeWindow::new(
        &machines[index].machine_id,
        at(start),
        at(end),
        RANDOM_DOWNTIME_REASON,
    )
    .ok()?;

    let machine = &mut machines[index];
    machine
        .add_downtime(window.start, window.end, window.reason.clone())
        .ok()?;
    info!(
        machine_id = %machine.machine_id,
        window = %window.describe_on(constraint.planning_date),
        "injected random downtime"
    );
    Some((machine.machine_id.clone(), window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use chrono::NaiveDate;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn demo() -> OptimizerConfig {
        OptimizerConfig::demo(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    #[test]
    fn test_generate_jobs_shape() {
        let config = demo();
        let mut rng = SmallRng::seed_from_u64(42);
        let jobs = generate_jobs(&mut rng, 25, 0.3, &config.machines, &config.constraint);

        assert_eq!(jobs.len(), 25);
        assert_eq!(jobs[0].job_id, "J001");
        assert_eq!(jobs[24].job_id, "J025");
        for job in &jobs {
            assert!(["P_A", "P_B", "P_C"].contains(&job.product_type.as_str()));
            assert!(PROCESSING_TIMES.contains(&job.processing_time));
            assert!((9..=13).contains(&job.due_time.hour()));
            assert!(DUE_MINUTES.contains(&job.due_time.minute()));
            assert_eq!(job.machine_options.len(), 2);
            for m in &job.machine_options {
                let machine = config.machines.iter().find(|x| &x.machine_id == m).unwrap();
                assert!(machine.can_produce(&job.product_type));
            }
        }
    }

    #[test]
    fn test_generate_jobs_is_seeded() {
        let config = demo();
        let a = generate_jobs(&mut SmallRng::seed_from_u64(7), 10, 0.5, &config.machines, &config.constraint);
        let b = generate_jobs(&mut SmallRng::seed_from_u64(7), 10, 0.5, &config.machines, &config.constraint);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rush_probability_extremes() {
        let config = demo();
        let mut rng = SmallRng::seed_from_u64(1);
        let none = generate_jobs(&mut rng, 20, 0.0, &config.machines, &config.constraint);
        assert!(none.iter().all(|j| !j.is_rush()));
        let all = generate_jobs(&mut rng, 20, 1.0, &config.machines, &config.constraint);
        assert!(all.iter().all(Job::is_rush));
    }

    #[test]
    fn test_no_capabilities_no_jobs() {
        let config = demo();
        let mut rng = SmallRng::seed_from_u64(1);
        let machines = vec![Machine::new("M1")];
        assert!(generate_jobs(&mut rng, 5, 0.2, &machines, &config.constraint).is_empty());
    }

    #[test]
    fn test_inject_random_downtime() {
        let mut config = demo();
        let date = config.constraint.planning_date;
        for seed in 0..20 {
            let mut machines = config.machines.clone();
            let mut rng = SmallRng::seed_from_u64(seed);
            let (id, window) =
                inject_random_downtime(&mut rng, &mut machines, &config.constraint).unwrap();

            let w = window.window_on(date);
            assert!(w.start >= 8 * 60 + 48 && w.start <= 8 * 60 + 336);
            assert!(w.end <= 16 * 60);
            assert!(w.duration() > 0 && w.duration() <= 120);
            assert_eq!(window.reason, RANDOM_DOWNTIME_REASON);

            let machine = machines.iter().find(|m| m.machine_id == id).unwrap();
            assert_eq!(machine.downtime_windows, vec![window]);
            let total: usize = machines.iter().map(|m| m.downtime_windows.len()).sum();
            assert_eq!(total, 1);
        }
        config.machines.clear();
        let mut rng = SmallRng::seed_from_u64(0);
        assert!(inject_random_downtime(&mut rng, &mut config.machines, &config.constraint).is_none());
    }
}
