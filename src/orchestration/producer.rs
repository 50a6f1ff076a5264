//! Candidate producers.
//!
//! A producer turns the run inputs (and, for refinement producers, a
//! seed schedule) into a proposal: a schedule plus a free-text
//! explanation. The pipeline never interprets the explanation and always
//! re-validates the schedule, so external producers can be plugged into
//! any slot.

use std::fmt::Debug;
use std::sync::Arc;

use super::CandidateKind;
use crate::models::{Constraint, Job, Machine, Schedule};
use crate::scheduler::{BaselineScheduler, BatchingScheduler, RebalanceConfig, Rebalancer};

/// Read-only inputs handed to a producer.
#[derive(Debug, Clone, Copy)]
pub struct ProducerInput<'a> {
    pub jobs: &'a [Arc<Job>],
    pub machines: &'a [Machine],
    pub constraint: &'a Constraint,
    /// Schedule to refine, for producers that start from another candidate.
    pub seed: Option<&'a Schedule>,
}

/// A produced schedule and its rationale.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub schedule: Schedule,
    pub explanation: String,
}

/// A producer could not return a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// The request has no machines.
    NoMachines,
    /// A refinement producer ran without the candidate it starts from.
    MissingSeed(CandidateKind),
    /// Any other producer-side failure.
    Failed(String),
}

impl std::fmt::Display for ProducerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMachines => f.write_str("no machines available"),
            Self::MissingSeed(kind) => write!(f, "missing {kind} schedule to start from"),
            Self::Failed(msg) => write!(f, "producer failed: {msg}"),
        }
    }
}

impl std::error::Error for ProducerError {}

/// A source of candidate schedules.
///
/// Implementations must not mutate their inputs.
pub trait ScheduleProducer: Send + Sync + Debug {
    /// Producer name (e.g., "baseline").
    fn name(&self) -> &'static str;

    /// Builds a proposal from the inputs.
    fn produce(&self, input: &ProducerInput<'_>) -> Result<Proposal, ProducerError>;
}

fn require_machines(input: &ProducerInput<'_>) -> Result<(), ProducerError> {
    if input.machines.is_empty() {
        Err(ProducerError::NoMachines)
    } else {
        Ok(())
    }
}

/// [`BaselineScheduler`] as a producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineProducer {
    scheduler: BaselineScheduler,
}

impl ScheduleProducer for BaselineProducer {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn produce(&self, input: &ProducerInput<'_>) -> Result<Proposal, ProducerError> {
        require_machines(input)?;
        let schedule = self
            .scheduler
            .schedule(input.jobs, input.machines, input.constraint);
        let explanation = self.scheduler.explain(&schedule);
        Ok(Proposal {
            schedule,
            explanation,
        })
    }
}

/// [`BatchingScheduler`] as a producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchingProducer {
    scheduler: BatchingScheduler,
}

impl ScheduleProducer for BatchingProducer {
    fn name(&self) -> &'static str {
        "batching"
    }

    fn produce(&self, input: &ProducerInput<'_>) -> Result<Proposal, ProducerError> {
        require_machines(input)?;
        let schedule = self
            .scheduler
            .schedule(input.jobs, input.machines, input.constraint);
        let explanation = self.scheduler.explain(&schedule);
        Ok(Proposal {
            schedule,
            explanation,
        })
    }
}

/// [`Rebalancer`] applied to the batching candidate.
#[derive(Debug, Clone, Default)]
pub struct BottleneckProducer {
    rebalancer: Rebalancer,
}

impl BottleneckProducer {
    pub fn new(config: RebalanceConfig) -> Self {
        Self {
            rebalancer: Rebalancer::new(config),
        }
    }
}

impl ScheduleProducer for BottleneckProducer {
    fn name(&self) -> &'static str {
        "bottleneck"
    }

    fn produce(&self, input: &ProducerInput<'_>) -> Result<Proposal, ProducerError> {
        require_machines(input)?;
        let seed = input
            .seed
            .ok_or(ProducerError::MissingSeed(CandidateKind::Batching))?;
        let outcome = self
            .rebalancer
            .rebalance(seed, input.machines, input.constraint);
        let explanation = self.rebalancer.explain(&outcome);
        Ok(Proposal {
            schedule: outcome.schedule,
            explanation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn constraint() -> Constraint {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Constraint::new(
            date,
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn jobs() -> Vec<Arc<Job>> {
        let due = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        vec![
            Arc::new(Job::new("J1", "P_A", 60, due).with_machine_options(["M1", "M2"])),
            Arc::new(Job::new("J2", "P_A", 60, due).with_machine_options(["M1", "M2"])),
        ]
    }

    #[test]
    fn test_builtin_producers_explain() {
        let machines = vec![
            Machine::new("M1").with_capability("P_A"),
            Machine::new("M2").with_capability("P_A"),
        ];
        let c = constraint();
        let jobs = jobs();
        let input = ProducerInput {
            jobs: &jobs,
            machines: &machines,
            constraint: &c,
            seed: None,
        };

        let baseline = BaselineProducer::default().produce(&input).unwrap();
        assert_eq!(baseline.schedule.assignment_count(), 2);
        assert!(baseline.explanation.starts_with("Baseline FIFO"));

        let batching = BatchingProducer::default().produce(&input).unwrap();
        let seeded = ProducerInput {
            seed: Some(&batching.schedule),
            ..input
        };
        let bottleneck = BottleneckProducer::default().produce(&seeded).unwrap();
        assert!(bottleneck.explanation.starts_with("Bottleneck rebalancing"));
        assert_eq!(bottleneck.schedule.machine_assignments("M2").len(), 1);
    }

    #[test]
    fn test_no_machines() {
        let c = constraint();
        let jobs = jobs();
        let input = ProducerInput {
            jobs: &jobs,
            machines: &[],
            constraint: &c,
            seed: None,
        };
        assert_eq!(
            BaselineProducer::default().produce(&input),
            Err(ProducerError::NoMachines)
        );
        assert_eq!(
            BatchingProducer::default().produce(&input),
            Err(ProducerError::NoMachines)
        );
    }

    #[test]
    fn test_bottleneck_requires_seed() {
        let machines = vec![Machine::new("M1").with_capability("P_A")];
        let c = constraint();
        let jobs = jobs();
        let input = ProducerInput {
            jobs: &jobs,
            machines: &machines,
            constraint: &c,
            seed: None,
        };
        let err = BottleneckProducer::default().produce(&input).unwrap_err();
        assert_eq!(err, ProducerError::MissingSeed(CandidateKind::Batching));
        assert_eq!(err.to_string(), "missing batching schedule to start from");
    }
}
