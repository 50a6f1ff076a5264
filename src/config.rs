//! Optimizer configuration.
//!
//! A configuration bundles the machine fleet, the shift constraint, and
//! the rebalancer tuning. It loads from JSON:
//!
//! ```json
//! {
//!   "machines": [{ "machine_id": "M1", "capabilities": ["P_A"] }],
//!   "constraint": {
//!     "planning_date": "2024-03-01",
//!     "shift_start": "08:00:00",
//!     "shift_end": "16:00:00",
//!     "max_overtime_minutes": 30,
//!     "setup_times": { "P_A->P_B": 10 }
//!   },
//!   "rebalance": { "max_iterations": 100 }
//! }
//! ```
//!
//! `rebalance`, overtime, setup times, downtime, and ranking weights are
//! optional.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Constraint, Machine, ModelError, SetupMatrix};
use crate::orchestration::Optimizer;
use crate::scheduler::RebalanceConfig;

/// Configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// Malformed JSON or wrong field types.
    Parse(serde_json::Error),
    /// Well-formed but violates a model invariant.
    Invalid(ModelError),
    /// Two machines share an id.
    DuplicateMachine(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "invalid configuration: {e}"),
            Self::Invalid(e) => write!(f, "invalid configuration: {e}"),
            Self::DuplicateMachine(id) => write!(f, "invalid configuration: duplicate machine {id}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Invalid(e) => Some(e),
            Self::DuplicateMachine(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<ModelError> for ConfigError {
    fn from(e: ModelError) -> Self {
        Self::Invalid(e)
    }
}

/// Machines, shift constraint, and tuning for one planning context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub machines: Vec<Machine>,
    pub constraint: Constraint,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
}

impl OptimizerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the constraint, every machine's downtime, and machine id uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.constraint.validate()?;
        let mut seen = HashSet::new();
        for machine in &self.machines {
            machine.validate()?;
            if !seen.insert(machine.machine_id.as_str()) {
                return Err(ConfigError::DuplicateMachine(machine.machine_id.clone()));
            }
        }
        Ok(())
    }

    /// Three-machine demo plant with an 08:00-16:00 shift.
    ///
    /// M1 makes P_A/P_B, M2 makes P_A/P_C, M3 makes P_B/P_C. Overtime is
    /// 30 minutes; changeovers cost A-B 10, A-C 15, B-C 12 in either
    /// direction.
    pub fn demo(planning_date: NaiveDate) -> Self {
        let machines = vec![
            Machine::new("M1").with_capabilities(["P_A", "P_B"]),
            Machine::new("M2").with_capabilities(["P_A", "P_C"]),
            Machine::new("M3").with_capabilities(["P_B", "P_C"]),
        ];
        let setups = SetupMatrix::new()
            .with_symmetric("P_A", "P_B", 10)
            .with_symmetric("P_A", "P_C", 15)
            .with_symmetric("P_B", "P_C", 12);
        let constraint = Constraint {
            planning_date,
            shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            shift_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            max_overtime_minutes: 30,
            setup_times: setups,
            tardiness_weight: 1.0,
            setup_weight: 0.5,
            utilization_weight: 0.3,
        };
        Self {
            machines,
            constraint,
            rebalance: RebalanceConfig::default(),
        }
    }

    /// An optimizer with the built-in producers tuned by this configuration.
    pub fn optimizer(&self) -> Optimizer {
        Optimizer::new().with_rebalance_config(self.rebalance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_demo() {
        let config = OptimizerConfig::demo(date());
        assert!(config.validate().is_ok());
        assert_eq!(config.machines.len(), 3);
        assert_eq!(config.constraint.shift_duration(), 480);
        assert_eq!(config.constraint.setup_before(Some("P_C"), "P_A"), 15);
        assert_eq!(config.constraint.setup_before(Some("P_B"), "P_C"), 12);
        assert_eq!(config.constraint.setup_before(None, "P_B"), 0);
        assert_eq!(config.rebalance.max_iterations, 100);
    }

    #[test]
    fn test_from_json_minimal() {
        let json = r#"{
            "machines": [
                { "machine_id": "M1", "capabilities": ["P_A"] },
                {
                    "machine_id": "M2",
                    "capabilities": ["P_A", "P_B"],
                    "downtime_windows": [
                        { "start": "2024-03-01T10:00:00", "end": "2024-03-01T11:00:00", "reason": "PM" }
                    ]
                }
            ],
            "constraint": {
                "planning_date": "2024-03-01",
                "shift_start": "08:00:00",
                "shift_end": "16:00:00",
                "setup_times": { "P_A->P_B": 10 }
            }
        }"#;
        let config = OptimizerConfig::from_json(json).unwrap();
        assert_eq!(config.constraint.max_overtime_minutes, 0);
        assert_eq!(config.constraint.setup_before(Some("P_A"), "P_B"), 10);
        assert_eq!(config.constraint.setup_before(Some("P_B"), "P_A"), 0);
        assert_eq!(config.constraint.tardiness_weight, 1.0);
        assert_eq!(config.machines[1].downtime_windows.len(), 1);
        assert_eq!(config.rebalance, RebalanceConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = OptimizerConfig::demo(date());
        let back = OptimizerConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_rejects_invalid() {
        let mut config = OptimizerConfig::demo(date());
        config.constraint.shift_end = config.constraint.shift_start;
        let err = OptimizerConfig::from_json(&config.to_json().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ModelError::InvalidShift { .. })));

        let mut config = OptimizerConfig::demo(date());
        config.machines.push(Machine::new("M1"));
        let err = OptimizerConfig::from_json(&config.to_json().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: duplicate machine M1");

        let mut config = OptimizerConfig::demo(date());
        config.machines[0].downtime_windows.push(crate::models::DowntimeWindow {
            start: date().and_hms_opt(12, 0, 0).unwrap(),
            end: date().and_hms_opt(11, 0, 0).unwrap(),
            reason: "bad".into(),
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let err = OptimizerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_optimizer_uses_rebalance_tuning() {
        let mut config = OptimizerConfig::demo(date());
        config.rebalance = RebalanceConfig::default().with_max_iterations(0);
        let jobs = vec![crate::models::Job::new("J1", "P_A", 60, NaiveTime::from_hms_opt(12, 0, 0).unwrap())
            .with_machine_options(["M1", "M2"])];
        let result = config.optimizer().optimize(crate::orchestration::OptimizationRequest::from_jobs(
            jobs,
            &config.machines,
            config.constraint.clone(),
        ));
        assert!(result.success);
    }
}
