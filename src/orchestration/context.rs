//! Run-scoped pipeline state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{CandidateKind, ProducerError, Stage};
use crate::models::{Constraint, Job, Machine, Schedule};
use crate::scheduler::Kpi;
use crate::validation::{validate_input, ValidationOutcome};

/// Deterministic summary of a request, computed before any producer runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestAnalysis {
    pub job_count: usize,
    pub rush_count: usize,
    pub machine_count: usize,
    /// Jobs per product type.
    pub products: BTreeMap<String, usize>,
    /// Sum of processing times (minutes).
    pub total_demand_minutes: i64,
    /// Machines x regular shift minutes.
    pub shift_capacity_minutes: i64,
    /// Machines x (shift + overtime) minutes.
    pub horizon_capacity_minutes: i64,
    /// Input integrity findings (see [`validate_input`]).
    pub input_findings: Vec<String>,
}

impl RequestAnalysis {
    pub fn analyze(jobs: &[Arc<Job>], machines: &[Machine], constraint: &Constraint) -> Self {
        let mut products: BTreeMap<String, usize> = BTreeMap::new();
        for job in jobs {
            *products.entry(job.product_type.clone()).or_default() += 1;
        }
        let n = machines.len() as i64;
        let horizon = constraint.horizon_end_minute() - constraint.shift_start_minute();

        Self {
            job_count: jobs.len(),
            rush_count: jobs.iter().filter(|j| j.is_rush()).count(),
            machine_count: machines.len(),
            products,
            total_demand_minutes: jobs.iter().map(|j| j.processing_time.max(0)).sum(),
            shift_capacity_minutes: n * constraint.shift_duration(),
            horizon_capacity_minutes: n * horizon,
            input_findings: validate_input(jobs, machines)
                .err()
                .unwrap_or_default()
                .into_iter()
                .map(|e| e.message)
                .collect(),
        }
    }

    /// Demand as a fraction of regular shift capacity (0 without capacity).
    pub fn load_factor(&self) -> f64 {
        if self.shift_capacity_minutes > 0 {
            self.total_demand_minutes as f64 / self.shift_capacity_minutes as f64
        } else {
            0.0
        }
    }

    /// Whether processing demand alone exceeds shift + overtime capacity.
    pub fn is_overloaded(&self) -> bool {
        self.total_demand_minutes > self.horizon_capacity_minutes
    }

    pub fn summary(&self) -> String {
        let products: Vec<String> = self
            .products
            .iter()
            .map(|(p, n)| format!("{p}: {n}"))
            .collect();
        let mut text = format!(
            "{} jobs ({} rush) on {} machines; products [{}]; demand {} min vs {} min shift capacity ({:.0}%).",
            self.job_count,
            self.rush_count,
            self.machine_count,
            products.join(", "),
            self.total_demand_minutes,
            self.shift_capacity_minutes,
            self.load_factor() * 100.0
        );
        if self.is_overloaded() {
            text.push_str(" Demand exceeds capacity including overtime; some jobs cannot be placed.");
        }
        if !self.input_findings.is_empty() {
            text.push_str(&format!(" {} input issue(s).", self.input_findings.len()));
        }
        text
    }
}

/// One candidate slot as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub schedule: Option<Schedule>,
    pub explanation: Option<String>,
    pub failure: Option<ProducerError>,
    pub validation: Option<ValidationOutcome>,
    pub kpi: Option<Kpi>,
    pub score: Option<f64>,
}

impl Candidate {
    pub(crate) fn new(kind: CandidateKind) -> Self {
        Self {
            kind,
            schedule: None,
            explanation: None,
            failure: None,
            validation: None,
            kpi: None,
            score: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.schedule.is_some() && self.validation.as_ref().is_some_and(|v| v.is_valid)
    }

    /// The producer broke a data-model invariant.
    pub fn is_contract_failure(&self) -> bool {
        self.validation.as_ref().is_some_and(ValidationOutcome::has_structural)
    }

    /// Violation count used for best-effort ranking; contract failures rank last.
    pub fn effective_violations(&self) -> usize {
        if self.is_contract_failure() {
            usize::MAX
        } else {
            self.validation
                .as_ref()
                .map_or(0, ValidationOutcome::violation_count)
        }
    }
}

/// State shared by the stages of one run, keyed by run id.
///
/// Owns a snapshot of the request inputs, so changes to the caller's
/// machines after the run starts are never observed.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: u64,
    pub stage: Stage,
    pub jobs: Vec<Arc<Job>>,
    pub machines: Vec<Machine>,
    pub constraint: Constraint,
    pub analysis: Option<RequestAnalysis>,
    pub candidates: BTreeMap<CandidateKind, Candidate>,
}

impl RunContext {
    pub fn new(run_id: u64, jobs: Vec<Arc<Job>>, machines: Vec<Machine>, constraint: Constraint) -> Self {
        let candidates = CandidateKind::PRIORITY
            .into_iter()
            .map(|k| (k, Candidate::new(k)))
            .collect();
        Self {
            run_id,
            stage: Stage::AnalyzeRequest,
            jobs,
            machines,
            constraint,
            analysis: None,
            candidates,
        }
    }

    pub fn candidate(&self, kind: CandidateKind) -> Option<&Candidate> {
        self.candidates.get(&kind)
    }

    pub fn candidate_mut(&mut self, kind: CandidateKind) -> &mut Candidate {
        self.candidates
            .entry(kind)
            .or_insert_with(|| Candidate::new(kind))
    }

    /// Candidates in selection priority order.
    pub fn iter_candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.values()
    }
}
