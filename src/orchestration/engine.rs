//! Optimizer: drives the stage machine and applies the selection policy.
//!
//! # Selection
//!
//! 1. Valid candidates (no violations) are ranked by
//!    `tardiness_weight * tardiness + setup_weight * setup + utilization_weight * imbalance`;
//!    the lowest score wins.
//! 2. Otherwise the candidate with the fewest violations is returned as
//!    best-effort. Structurally broken candidates rank last.
//! 3. Ties in either path go to [`CandidateKind::PRIORITY`] order.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::context::{Candidate, RequestAnalysis, RunContext};
use super::producer::{
    BaselineProducer, BatchingProducer, BottleneckProducer, ProducerInput, ScheduleProducer,
};
use super::{CandidateKind, Stage};
use crate::models::{Constraint, Job, Machine, Schedule};
use crate::scheduler::{Kpi, RebalanceConfig};
use crate::validation::{validate_schedule, ValidationOutcome};

const SCORE_EPSILON: f64 = 1e-9;

/// Inputs of one optimization run.
///
/// Machines are cloned on construction; later changes to the caller's
/// machines (e.g. injected downtime) do not affect this request.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub jobs: Vec<Arc<Job>>,
    pub machines: Vec<Machine>,
    pub constraint: Constraint,
}

impl OptimizationRequest {
    pub fn new(jobs: Vec<Arc<Job>>, machines: &[Machine], constraint: Constraint) -> Self {
        Self {
            jobs,
            machines: machines.to_vec(),
            constraint,
        }
    }

    /// Wraps owned jobs.
    pub fn from_jobs(jobs: Vec<Job>, machines: &[Machine], constraint: Constraint) -> Self {
        Self::new(jobs.into_iter().map(Arc::new).collect(), machines, constraint)
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// A fully valid candidate was selected.
    Completed,
    /// No candidate was valid; the least violating one was selected.
    BestEffort,
    /// No candidate schedule could be produced.
    Failed,
}

impl RunStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::BestEffort => "best-effort",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which policy path produced the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPath {
    Scored,
    BestEffort,
}

/// The selected candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub kind: CandidateKind,
    pub path: SelectionPath,
}

/// Per-candidate overview included in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub kind: CandidateKind,
    pub produced: bool,
    pub valid: bool,
    pub contract_failure: bool,
    pub violation_count: usize,
    pub kpi: Option<Kpi>,
    pub score: Option<f64>,
    pub failure: Option<String>,
}

impl CandidateSummary {
    fn of(candidate: &Candidate) -> Self {
        Self {
            kind: candidate.kind,
            produced: candidate.schedule.is_some(),
            valid: candidate.is_valid(),
            contract_failure: candidate.is_contract_failure(),
            violation_count: candidate
                .validation
                .as_ref()
                .map_or(0, ValidationOutcome::violation_count),
            kpi: candidate.kpi.clone(),
            score: candidate.score,
            failure: candidate.failure.as_ref().map(ToString::to_string),
        }
    }
}

/// Result of [`Optimizer::optimize`].
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub run_id: u64,
    /// True for completed and best-effort runs.
    pub success: bool,
    pub status: RunStatus,
    pub selected: Option<CandidateKind>,
    pub schedule: Option<Schedule>,
    pub kpi: Option<Kpi>,
    pub explanation: String,
    /// Violations of the selected schedule, verbatim.
    pub violations: Vec<String>,
    pub validation: Option<ValidationOutcome>,
    pub analysis: RequestAnalysis,
    pub candidates: Vec<CandidateSummary>,
    pub batching_schedule: Option<Schedule>,
    pub bottleneck_schedule: Option<Schedule>,
    pub elapsed: Duration,
}

/// Applies the selection policy to validated candidates.
///
/// `candidates` must be in [`CandidateKind::PRIORITY`] order.
pub fn select<'a, I>(candidates: I) -> Option<Selection>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let produced: Vec<&Candidate> = candidates
        .into_iter()
        .filter(|c| c.schedule.is_some())
        .collect();

    let mut best_valid: Option<(&Candidate, f64)> = None;
    for c in produced.iter().copied().filter(|c| c.is_valid()) {
        let score = c.score.unwrap_or(f64::INFINITY);
        match best_valid {
            Some((_, best)) if score >= best - SCORE_EPSILON => {}
            _ => best_valid = Some((c, score)),
        }
    }
    if let Some((c, _)) = best_valid {
        return Some(Selection {
            kind: c.kind,
            path: SelectionPath::Scored,
        });
    }

    let mut fewest: Option<&Candidate> = None;
    for c in produced {
        match fewest {
            Some(best) if c.effective_violations() >= best.effective_violations() => {}
            _ => fewest = Some(c),
        }
    }
    fewest.map(|c| Selection {
        kind: c.kind,
        path: SelectionPath::BestEffort,
    })
}

/// Runs the candidate pipeline.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use shift_optimizer::config::OptimizerConfig;
/// use shift_optimizer::generator::generate_jobs;
/// use shift_optimizer::orchestration::{OptimizationRequest, Optimizer};
/// use rand::SeedableRng;
///
/// let config = OptimizerConfig::demo(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
/// let mut rng = rand::rngs::SmallRng::seed_from_u64(7);
/// let jobs = generate_jobs(&mut rng, 10, 0.2, &config.machines, &config.constraint);
///
/// let optimizer = Optimizer::new();
/// let result = optimizer.optimize(OptimizationRequest::from_jobs(jobs, &config.machines, config.constraint));
/// assert!(result.success);
/// ```
#[derive(Debug)]
pub struct Optimizer {
    baseline: Arc<dyn ScheduleProducer>,
    batching: Arc<dyn ScheduleProducer>,
    bottleneck: Arc<dyn ScheduleProducer>,
    next_run_id: AtomicU64,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Optimizer with the built-in producers.
    pub fn new() -> Self {
        Self {
            baseline: Arc::new(BaselineProducer::default()),
            batching: Arc::new(BatchingProducer::default()),
            bottleneck: Arc::new(BottleneckProducer::default()),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// Sets the rebalancer tuning of the built-in bottleneck producer.
    pub fn with_rebalance_config(mut self, config: RebalanceConfig) -> Self {
        self.bottleneck = Arc::new(BottleneckProducer::new(config));
        self
    }

    /// Replaces the producer of one candidate slot.
    ///
    /// The bottleneck slot receives the batching candidate as its seed.
    pub fn with_producer<P: ScheduleProducer + 'static>(mut self, kind: CandidateKind, producer: P) -> Self {
        let producer: Arc<dyn ScheduleProducer> = Arc::new(producer);
        match kind {
            CandidateKind::Baseline => self.baseline = producer,
            CandidateKind::Batching => self.batching = producer,
            CandidateKind::Bottleneck => self.bottleneck = producer,
        }
        self
    }

    /// Runs one optimization. Never panics on constraint-violating schedules.
    pub fn optimize(&self, request: OptimizationRequest) -> OptimizationResult {
        let started = Instant::now();
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let OptimizationRequest {
            jobs,
            machines,
            constraint,
        } = request;
        info!(run_id, jobs = jobs.len(), machines = machines.len(), "optimization started");

        let mut ctx = RunContext::new(run_id, jobs, machines, constraint);
        let mut selection = None;
        while ctx.stage != Stage::Done {
            let stage = ctx.stage;
            debug!(run_id, stage = %stage, "stage");
            match stage {
                Stage::AnalyzeRequest => {
                    let analysis = RequestAnalysis::analyze(&ctx.jobs, &ctx.machines, &ctx.constraint);
                    debug!(run_id, summary = %analysis.summary(), "request analyzed");
                    ctx.analysis = Some(analysis);
                }
                Stage::BuildBaseline => self.build(&mut ctx, CandidateKind::Baseline),
                Stage::BuildBatching => self.build(&mut ctx, CandidateKind::Batching),
                Stage::BuildBottleneck => self.build(&mut ctx, CandidateKind::Bottleneck),
                Stage::ValidateAll => validate_all(&mut ctx),
                Stage::SelectBest => selection = select(ctx.iter_candidates()),
                Stage::Done => {}
            }
            ctx.stage = stage.next();
        }

        let result = finish(ctx, selection, started.elapsed());
        info!(
            run_id,
            status = %result.status,
            selected = ?result.selected,
            violations = result.violations.len(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "optimization finished"
        );
        result
    }

    fn producer(&self, kind: CandidateKind) -> &dyn ScheduleProducer {
        match kind {
            CandidateKind::Baseline => self.baseline.as_ref(),
            CandidateKind::Batching => self.batching.as_ref(),
            CandidateKind::Bottleneck => self.bottleneck.as_ref(),
        }
    }

    fn build(&self, ctx: &mut RunContext, kind: CandidateKind) {
        let seed = match kind {
            CandidateKind::Bottleneck => ctx
                .candidate(CandidateKind::Batching)
                .and_then(|c| c.schedule.as_ref()),
            _ => None,
        };
        let input = ProducerInput {
            jobs: &ctx.jobs,
            machines: &ctx.machines,
            constraint: &ctx.constraint,
            seed,
        };
        let producer = self.producer(kind);
        let produced = producer.produce(&input);

        let run_id = ctx.run_id;
        let slot = ctx.candidate_mut(kind);
        match produced {
            Ok(proposal) => {
                debug!(
                    run_id,
                    candidate = %kind,
                    producer = producer.name(),
                    assignments = proposal.schedule.assignment_count(),
                    unscheduled = proposal.schedule.unscheduled.len(),
                    "candidate built"
                );
                slot.schedule = Some(proposal.schedule);
                slot.explanation = Some(proposal.explanation);
            }
            Err(e) => {
                warn!(run_id, candidate = %kind, producer = producer.name(), error = %e, "producer failed");
                slot.failure = Some(e);
            }
        }
    }
}

fn validate_all(ctx: &mut RunContext) {
    let run_id = ctx.run_id;
    for candidate in ctx.candidates.values_mut() {
        let Some(schedule) = candidate.schedule.as_ref() else {
            continue;
        };
        let outcome = validate_schedule(schedule, &ctx.jobs, &ctx.machines, &ctx.constraint);
        let kpi = Kpi::calculate(schedule, &ctx.machines, &ctx.constraint);
        if outcome.has_structural() {
            warn!(
                run_id,
                candidate = %candidate.kind,
                structural = outcome.report.structural_violations,
                "producer returned a structurally invalid schedule"
            );
        }
        debug!(
            run_id,
            candidate = %candidate.kind,
            valid = outcome.is_valid,
            violations = outcome.violation_count(),
            "candidate validated"
        );
        candidate.score = Some(kpi.weighted_score(&ctx.constraint));
        candidate.kpi = Some(kpi);
        candidate.validation = Some(outcome);
    }
}

fn finish(mut ctx: RunContext, selection: Option<Selection>, elapsed: Duration) -> OptimizationResult {
    let candidates: Vec<CandidateSummary> = ctx.iter_candidates().map(CandidateSummary::of).collect();
    let analysis = ctx.analysis.take().unwrap_or_default();
    let batching_schedule = ctx.candidate(CandidateKind::Batching).and_then(|c| c.schedule.clone());
    let bottleneck_schedule = ctx
        .candidate(CandidateKind::Bottleneck)
        .and_then(|c| c.schedule.clone());

    let chosen = selection.and_then(|s| ctx.candidates.remove(&s.kind).map(|c| (s, c)));
    let Some((selection, chosen)) = chosen else {
        let reasons: Vec<String> = candidates
            .iter()
            .filter_map(|c| c.failure.as_ref().map(|f| format!("- {}: {f}", c.kind)))
            .collect();
        let mut explanation = "No candidate schedule could be constructed.".to_string();
        if !reasons.is_empty() {
            explanation.push('\n');
            explanation.push_str(&reasons.join("\n"));
        }
        warn!(run_id = ctx.run_id, "no candidate schedule");
        return OptimizationResult {
            run_id: ctx.run_id,
            success: false,
            status: RunStatus::Failed,
            selected: None,
            schedule: None,
            kpi: None,
            explanation,
            violations: Vec::new(),
            validation: None,
            analysis,
            candidates,
            batching_schedule,
            bottleneck_schedule,
            elapsed,
        };
    };

    let violations = chosen
        .validation
        .as_ref()
        .map(ValidationOutcome::messages)
        .unwrap_or_default();
    let (status, explanation) = match selection.path {
        SelectionPath::Scored => (
            RunStatus::Completed,
            scored_explanation(&chosen, &candidates, &ctx.constraint),
        ),
        SelectionPath::BestEffort => {
            warn!(
                run_id = ctx.run_id,
                candidate = %chosen.kind,
                violations = violations.len(),
                "no valid candidate, falling back to best effort"
            );
            (RunStatus::BestEffort, best_effort_explanation(&chosen, &violations))
        }
    };

    OptimizationResult {
        run_id: ctx.run_id,
        success: true,
        status,
        selected: Some(chosen.kind),
        schedule: chosen.schedule,
        kpi: chosen.kpi,
        explanation,
        violations,
        validation: chosen.validation,
        analysis,
        candidates,
        batching_schedule,
        bottleneck_schedule,
        elapsed,
    }
}

fn scored_explanation(chosen: &Candidate, all: &[CandidateSummary], constraint: &Constraint) -> String {
    let mut text = format!("Selected: {}", chosen.kind.label());
    if let Some(kpi) = &chosen.kpi {
        text.push_str(&format!(
            "\nScore {:.2} = tardiness {} min x {} + setup {} min x {} + imbalance {:.1}% x {}",
            kpi.weighted_score(constraint),
            kpi.total_tardiness,
            constraint.tardiness_weight,
            kpi.total_setup_time,
            constraint.setup_weight,
            kpi.utilization_imbalance,
            constraint.utilization_weight
        ));
    }
    if let Some(why) = &chosen.explanation {
        text.push('\n');
        text.push_str(why);
    }
    let others: Vec<String> = all
        .iter()
        .filter(|c| c.kind != chosen.kind)
        .map(|c| match (c.valid, c.score, &c.failure) {
            (true, Some(score), _) => format!("{} {score:.2}", c.kind),
            (_, _, Some(failure)) => format!("{} failed ({failure})", c.kind),
            _ => format!("{} invalid ({} violations)", c.kind, c.violation_count),
        })
        .collect();
    if !others.is_empty() {
        text.push_str(&format!("\nAlternatives: {}", others.join(", ")));
    }
    text
}

fn best_effort_explanation(chosen: &Candidate, violations: &[String]) -> String {
    let count = if chosen.is_contract_failure() {
        format!("{} (structurally invalid)", violations.len())
    } else {
        violations.len().to_string()
    };
    let listed: Vec<String> = violations.iter().map(|v| format!("- {v}")).collect();
    format!(
        "BEST-EFFORT SCHEDULE: {}\n\n\
         No candidate meets every constraint. Selected the one with the fewest violations ({count}).\n\n\
         VIOLATIONS:\n{}\n\n\
         RECOMMENDATIONS:\n\
         - Some constraints may not be satisfiable together\n\
         - Extend the shift or overtime allowance, reduce the job count, or relax rush deadlines\n\
         - Review machine downtime for conflicts with the shift",
        chosen.kind.label(),
        listed.join("\n")
    )
}
