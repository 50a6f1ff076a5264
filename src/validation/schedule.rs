//! Schedule constraint validation.
//!
//! Re-checks a candidate schedule against the jobs, machines and shift it
//! was built for. Every check runs on every item, so one pass reports
//! every violation. Violations are data: a schedule that breaks
//! constraints is never an error.
//!
//! # Checks
//! 1. Assignments are filed under their own machine and have a
//!    well-formed interval (`end = start + processing_time`).
//! 2. Each assigned job is known and appears once.
//! 3. The machine exists, is in the job's options and can produce it.
//! 4. Setup and processing avoid the machine's downtime.
//! 5. The interval lies within `[shift_start, shift_end + overtime]`.
//! 6. No two assignments on one machine overlap, and no setup reaches
//!    back into the previous job.
//! 7. Every job is either assigned or listed as unscheduled.
//!
//! Messages carry the job id, the machine id and a fixed phrase per kind
//! (`"overlaps with downtime"`, `"outside shift window"`, ...), so they can
//! be matched textually.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::models::{format_minute, overlaps, Constraint, Job, JobAssignment, Machine, Schedule};

/// Violation severity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationClass {
    /// The schedule breaks a data-model invariant. Fatal to the candidate.
    Structural,
    /// A shop-floor constraint is broken (downtime, capability, shift).
    Feasibility,
    /// A job could not be placed at all.
    Unschedulable,
}

/// Kinds of violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A job is neither assigned nor listed as unscheduled.
    MissingJob,
    /// A job is assigned more than once.
    DuplicateAssignment,
    /// A job is both assigned and listed as unscheduled.
    ConflictingStatus,
    /// The schedule references a job that is not in the job list.
    UnknownJob,
    /// An assignment names a machine that doesn't exist.
    UnknownMachine,
    /// An assignment is filed under a different machine than it names.
    MachineMismatch,
    /// An assignment's interval is empty, inverted, or not processing-time long.
    MalformedInterval,
    /// Two assignments on one machine overlap.
    JobOverlap,
    /// The machine is not in the job's machine options.
    NotInMachineOptions,
    /// The machine cannot produce the job's product.
    CapabilityMismatch,
    /// The job overlaps a downtime window.
    DowntimeOverlap,
    /// The job runs outside shift + overtime.
    OutsideShift,
    /// The job was explicitly reported as unscheduled.
    Unscheduled,
}

impl ViolationKind {
    pub fn class(self) -> ViolationClass {
        match self {
            Self::MissingJob
            | Self::DuplicateAssignment
            | Self::ConflictingStatus
            | Self::UnknownJob
            | Self::UnknownMachine
            | Self::MachineMismatch
            | Self::MalformedInterval
            | Self::JobOverlap
            | Self::NotInMachineOptions => ViolationClass::Structural,
            Self::CapabilityMismatch | Self::DowntimeOverlap | Self::OutsideShift => {
                ViolationClass::Feasibility
            }
            Self::Unscheduled => ViolationClass::Unschedulable,
        }
    }
}

/// A single constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub job_id: Option<String>,
    pub machine_id: Option<String>,
    /// Stable, human-readable description.
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, job_id: &str, machine_id: Option<&str>, message: String) -> Self {
        Self {
            kind,
            job_id: Some(job_id.to_string()),
            machine_id: machine_id.map(str::to_string),
            message,
        }
    }

    #[inline]
    pub fn class(&self) -> ViolationClass {
        self.kind.class()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A job finishing after its due time. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateJob {
    pub job_id: String,
    pub machine_id: String,
    pub minutes_late: i64,
}

/// Structured detail accompanying the violation list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_jobs: usize,
    pub scheduled_jobs: usize,
    pub unscheduled_jobs: usize,
    pub structural_violations: usize,
    pub feasibility_violations: usize,
    pub unschedulable_violations: usize,
    /// Deadline misses, in job-list order.
    pub late_jobs: Vec<LateJob>,
}

/// Result of validating one schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// True iff `violations` is empty.
    pub is_valid: bool,
    pub violations: Vec<Violation>,
    pub report: ValidationReport,
}

impl ValidationOutcome {
    /// Violation messages in report order.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }

    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Whether any violation breaks a data-model invariant.
    pub fn has_structural(&self) -> bool {
        self.report.structural_violations > 0
    }
}

/// Validates `schedule` against the jobs, machines and constraint.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{NaiveDate, NaiveTime};
/// use shift_optimizer::models::{Constraint, Job, JobAssignment, Machine, Schedule};
/// use shift_optimizer::validation::validate_schedule;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
/// let constraint = Constraint::new(date, hm(8, 0), hm(16, 0)).unwrap();
/// let machine = Machine::new("M1")
///     .with_capability("P_A")
///     .with_downtime(date.and_hms_opt(10, 0, 0).unwrap(), date.and_hms_opt(12, 0, 0).unwrap(), "PM")
///     .unwrap();
/// let job = Arc::new(Job::new("J1", "P_A", 60, hm(16, 0)).with_machine("M1"));
///
/// let mut schedule = Schedule::new();
/// schedule.add_assignment(JobAssignment::placed(Arc::clone(&job), "M1", 630, 0));
/// let outcome = validate_schedule(&schedule, &[job], &[machine], &constraint);
/// assert!(!outcome.is_valid);
/// assert!(outcome.violations[0].message.contains("overlaps with downtime"));
/// ```
pub fn validate_schedule(
    schedule: &Schedule,
    jobs: &[Arc<Job>],
    machines: &[Machine],
    constraint: &Constraint,
) -> ValidationOutcome {
    let job_index: HashMap<&str, &Job> = jobs.iter().map(|j| (j.job_id.as_str(), j.as_ref())).collect();
    let machine_index: HashMap<&str, &Machine> = machines.iter().map(|m| (m.machine_id.as_str(), m)).collect();
    let mut violations = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (key, seq) in &schedule.assignments {
        for a in seq {
            let job = job_index.get(a.job_id()).copied();
            check_assignment(
                a,
                key,
                job,
                machine_index.get(a.machine_id.as_str()).copied(),
                constraint,
                !seen.insert(a.job_id()),
                &mut violations,
            );
        }
        check_machine_overlaps(key, seq, &mut violations);
    }

    let mut late_jobs = Vec::new();
    let mut scheduled_jobs = 0;
    let mut unscheduled_jobs = 0;
    for job in jobs {
        let assigned = schedule.assignment_for_job(&job.job_id);
        let unscheduled = schedule.unscheduled.iter().find(|u| u.job_id == job.job_id);
        match (assigned, unscheduled) {
            (Some(a), None) => {
                scheduled_jobs += 1;
                let minutes_late = a.end_time - job.due_minute();
                if minutes_late > 0 {
                    late_jobs.push(LateJob {
                        job_id: job.job_id.clone(),
                        machine_id: a.machine_id.clone(),
                        minutes_late,
                    });
                }
            }
            (Some(a), Some(_)) => {
                scheduled_jobs += 1;
                violations.push(Violation::new(
                    ViolationKind::ConflictingStatus,
                    &job.job_id,
                    Some(&a.machine_id),
                    format!(
                        "Job {} is both assigned to machine {} and listed as unscheduled",
                        job.job_id, a.machine_id
                    ),
                ));
            }
            (None, Some(u)) => {
                unscheduled_jobs += 1;
                violations.push(Violation::new(
                    ViolationKind::Unscheduled,
                    &job.job_id,
                    None,
                    format!("Job {} is unscheduled: {}", job.job_id, u.reason),
                ));
            }
            (None, None) => {
                violations.push(Violation::new(
                    ViolationKind::MissingJob,
                    &job.job_id,
                    None,
                    format!("Job {} is missing from schedule", job.job_id),
                ));
            }
        }
    }

    for u in &schedule.unscheduled {
        if !job_index.contains_key(u.job_id.as_str()) {
            violations.push(Violation::new(
                ViolationKind::UnknownJob,
                &u.job_id,
                None,
                format!("Unscheduled job {} is not in the job list", u.job_id),
            ));
        }
    }

    let count = |class: ViolationClass| violations.iter().filter(|v| v.class() == class).count();
    let report = ValidationReport {
        total_jobs: jobs.len(),
        scheduled_jobs,
        unscheduled_jobs,
        structural_violations: count(ViolationClass::Structural),
        feasibility_violations: count(ViolationClass::Feasibility),
        unschedulable_violations: count(ViolationClass::Unschedulable),
        late_jobs,
    };

    ValidationOutcome {
        is_valid: violations.is_empty(),
        violations,
        report,
    }
}

fn check_assignment(
    a: &JobAssignment,
    key: &str,
    known: Option<&Job>,
    machine: Option<&Machine>,
    constraint: &Constraint,
    duplicate: bool,
    out: &mut Vec<Violation>,
) {
    let j = a.job_id();
    let m = a.machine_id.as_str();
    let span = format!("{}-{}", format_minute(a.start_time), format_minute(a.end_time));

    if key != m {
        out.push(Violation::new(
            ViolationKind::MachineMismatch,
            j,
            Some(m),
            format!("Job {j} is filed under machine {key} but assigned to machine {m}"),
        ));
    }
    if known.is_none() {
        out.push(Violation::new(
            ViolationKind::UnknownJob,
            j,
            Some(m),
            format!("Job {j} on machine {m} is not in the job list"),
        ));
    }
    if duplicate {
        out.push(Violation::new(
            ViolationKind::DuplicateAssignment,
            j,
            Some(m),
            format!("Job {j} is assigned more than once (again on machine {m})"),
        ));
    }

    let job = known.unwrap_or(a.job.as_ref());
    if a.end_time <= a.start_time
        || a.end_time - a.start_time != job.processing_time
        || a.setup_minutes_before < 0
    {
        out.push(Violation::new(
            ViolationKind::MalformedInterval,
            j,
            Some(m),
            format!(
                "Job {j} on machine {m} has malformed interval {span} (processing time {} min)",
                job.processing_time
            ),
        ));
    }

    let Some(machine) = machine else {
        out.push(Violation::new(
            ViolationKind::UnknownMachine,
            j,
            Some(m),
            format!("Job {j} assigned to unknown machine {m}"),
        ));
        return;
    };

    if !job.allows_machine(m) {
        out.push(Violation::new(
            ViolationKind::NotInMachineOptions,
            j,
            Some(m),
            format!("Job {j} assigned to machine {m} which is not in its machine options"),
        ));
    }
    if !machine.can_produce(&job.product_type) {
        out.push(Violation::new(
            ViolationKind::CapabilityMismatch,
            j,
            Some(m),
            format!("Machine {m} cannot produce {} for job {j}", job.product_type),
        ));
    }

    // Changeover minutes count as machine time too
    let date = constraint.planning_date;
    let setup_start = a.start_time - a.setup_minutes_before.max(0);
    for w in machine
        .downtime_windows
        .iter()
        .filter(|w| w.overlaps_with(setup_start, a.end_time, date))
    {
        let what = if w.overlaps_with(a.start_time, a.end_time, date) {
            format!("Job {j} on machine {m} ({span})")
        } else {
            format!(
                "Setup of job {j} on machine {m} ({}-{})",
                format_minute(setup_start),
                format_minute(a.start_time)
            )
        };
        out.push(Violation::new(
            ViolationKind::DowntimeOverlap,
            j,
            Some(m),
            format!(
                "{what} overlaps with downtime {} ({})",
                w.describe_on(date),
                w.reason
            ),
        ));
    }

    if !constraint.feasible_window().encloses(&a.window()) {
        out.push(Violation::new(
            ViolationKind::OutsideShift,
            j,
            Some(m),
            format!(
                "Job {j} on machine {m} ({span}) is outside shift window {}",
                constraint.feasible_window()
            ),
        ));
    }
}

fn check_machine_overlaps(machine_id: &str, seq: &[JobAssignment], out: &mut Vec<Violation>) {
    let mut ordered: Vec<&JobAssignment> = seq.iter().collect();
    ordered.sort_by_key(|a| (a.start_time, a.end_time));

    for (i, a) in ordered.iter().enumerate() {
        for b in ordered[i + 1..].iter().take_while(|b| b.start_time < a.end_time) {
            if overlaps(a.start_time, a.end_time, b.start_time, b.end_time) {
                out.push(Violation::new(
                    ViolationKind::JobOverlap,
                    a.job_id(),
                    Some(machine_id),
                    format!(
                        "Job {} overlaps with job {} on machine {machine_id}",
                        a.job_id(),
                        b.job_id()
                    ),
                ));
            }
        }
    }

    // Setup runs right before start, so it must not reach into the previous job
    for pair in ordered.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let setup_start = next.start_time - next.setup_minutes_before;
        if next.start_time >= prev.end_time && setup_start < prev.end_time {
            out.push(Violation::new(
                ViolationKind::MalformedInterval,
                next.job_id(),
                Some(machine_id),
                format!(
                    "Job {} on machine {machine_id} needs setup from {} but job {} runs until {}",
                    next.job_id(),
                    format_minute(setup_start),
                    prev.job_id(),
                    format_minute(prev.end_time)
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SetupMatrix;
    use crate::scheduler::{BaselineScheduler, BatchingScheduler, Rebalancer};
    use chrono::{NaiveDate, NaiveTime};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

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

    fn m1_with_downtime() -> Machine {
        Machine::new("M1")
            .with_capability("P_A")
            .with_downtime(
                date().and_hms_opt(10, 0, 0).unwrap(),
                date().and_hms_opt(12, 0, 0).unwrap(),
                "Maintenance",
            )
            .unwrap()
    }

    fn j1() -> Arc<Job> {
        Arc::new(Job::new("J1", "P_A", 60, t(16, 0)).with_machine("M1"))
    }

    fn single(job: &Arc<Job>, machine: &str, start: i64) -> Schedule {
        let mut s = Schedule::new();
        s.add_assignment(JobAssignment::placed(Arc::clone(job), machine, start, 0));
        s
    }

    fn kinds(outcome: &ValidationOutcome) -> Vec<ViolationKind> {
        outcome.violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_downtime_overlap_reported() {
        let job = j1();
        let s = single(&job, "M1", 630); // 10:30-11:30
        let out = validate_schedule(&s, &[job], &[m1_with_downtime()], &constraint());
        assert!(!out.is_valid);
        assert_eq!(out.violations.len(), 1);
        let v = &out.violations[0];
        assert!(v.message.contains("overlaps with downtime"));
        assert!(v.message.contains("J1"));
        assert!(v.message.contains("M1"));
        assert!(v.message.contains("Maintenance"));
        assert_eq!(v.class(), ViolationClass::Feasibility);
    }

    #[test]
    fn test_clear_of_downtime_is_valid() {
        let job = j1();
        let s = single(&job, "M1", 480); // 08:00-09:00
        let out = validate_schedule(&s, &[job], &[m1_with_downtime()], &constraint());
        assert!(out.is_valid);
        assert!(out.violations.is_empty());
        assert_eq!(out.report.scheduled_jobs, 1);
    }

    #[test]
    fn test_touching_downtime_is_valid() {
        let job = j1();
        for start in [540, 720] {
            let s = single(&job, "M1", start);
            let out = validate_schedule(&s, &[Arc::clone(&job)], &[m1_with_downtime()], &constraint());
            assert!(out.is_valid, "start {start}: {:?}", out.messages());
        }
    }

    #[test]
    fn test_all_checks_reported_in_one_pass() {
        let machines = vec![Machine::new("M1").with_capability("P_A"), Machine::new("M2")];
        let job = Arc::new(Job::new("J1", "P_A", 60, t(16, 0)).with_machine("M1"));
        let s = single(&job, "M2", 1000); // wrong machine, incapable, past horizon
        let out = validate_schedule(&s, &[job], &machines, &constraint());
        assert_eq!(
            kinds(&out),
            vec![
                ViolationKind::NotInMachineOptions,
                ViolationKind::CapabilityMismatch,
                ViolationKind::OutsideShift,
            ]
        );
        assert!(out.violations[2].message.contains("outside shift window"));
        assert!(out.has_structural());
    }

    #[test]
    fn test_missing_and_unscheduled_jobs() {
        let machines = vec![Machine::new("M1").with_capability("P_A")];
        let a = j1();
        let b = Arc::new(Job::new("J2", "P_A", 30, t(16, 0)).with_machine("M1"));
        let mut s = Schedule::new();
        s.mark_unscheduled("J2", "no compatible machine");

        let out = validate_schedule(&s, &[a, b], &machines, &constraint());
        assert_eq!(kinds(&out), vec![ViolationKind::MissingJob, ViolationKind::Unscheduled]);
        assert_eq!(out.messages()[0], "Job J1 is missing from schedule");
        assert_eq!(out.messages()[1], "Job J2 is unscheduled: no compatible machine");
        assert_eq!(out.report.unscheduled_jobs, 1);
        assert_eq!(out.report.unschedulable_violations, 1);
        assert_eq!(out.report.structural_violations, 1);
    }

    #[test]
    fn test_job_overlap_on_machine() {
        let machines = vec![Machine::new("M1").with_capability("P_A")];
        let a = Arc::new(Job::new("J1", "P_A", 120, t(16, 0)).with_machine("M1"));
        let b = Arc::new(Job::new("J2", "P_A", 30, t(16, 0)).with_machine("M1"));
        let c = Arc::new(Job::new("J3", "P_A", 30, t(16, 0)).with_machine("M1"));
        let mut s = Schedule::new();
        s.add_assignment(JobAssignment::placed(Arc::clone(&a), "M1", 480, 0));
        s.add_assignment(JobAssignment::placed(Arc::clone(&b), "M1", 500, 0));
        s.add_assignment(JobAssignment::placed(Arc::clone(&c), "M1", 540, 0));

        let out = validate_schedule(&s, &[a, b, c], &machines, &constraint());
        let msgs = out.messages();
        assert_eq!(msgs.len(), 2);
        assert!(msgs.contains(&"Job J1 overlaps with job J2 on machine M1".to_string()));
        assert!(msgs.contains(&"Job J1 overlaps with job J3 on machine M1".to_string()));
    }

    #[test]
    fn test_setup_reaching_into_previous_job() {
        let machines = vec![Machine::new("M1").with_capabilities(["P_A", "P_B"])];
        let a = j1();
        let b = Arc::new(Job::new("J2", "P_B", 30, t(16, 0)).with_machine("M1"));
        let mut s = Schedule::new();
        s.add_assignment(JobAssignment::placed(Arc::clone(&a), "M1", 480, 0));
        s.add_assignment(JobAssignment::placed(Arc::clone(&b), "M1", 540, 10));

        let out = validate_schedule(&s, &[Arc::clone(&a), Arc::clone(&b)], &machines, &constraint());
        assert_eq!(kinds(&out), vec![ViolationKind::MalformedInterval]);
        assert_eq!(
            out.messages()[0],
            "Job J2 on machine M1 needs setup from 08:50 but job J1 runs until 09:00"
        );
        assert!(out.has_structural());

        let mut fixed = Schedule::new();
        fixed.add_assignment(JobAssignment::placed(Arc::clone(&a), "M1", 480, 0));
        fixed.add_assignment(JobAssignment::placed(Arc::clone(&b), "M1", 550, 10));
        assert!(validate_schedule(&fixed, &[a, b], &machines, &constraint()).is_valid);
    }

    #[test]
    fn test_setup_inside_downtime_reported() {
        let machines = vec![m1_with_downtime().with_capability("P_B")];
        let job = Arc::new(Job::new("J1", "P_B", 60, t(16, 0)).with_machine("M1"));
        let mut s = Schedule::new();
        s.add_assignment(JobAssignment::placed(Arc::clone(&job), "M1", 720, 10)); // setup 11:50-12:00
        let out = validate_schedule(&s, &[job], &machines, &constraint());
        assert_eq!(kinds(&out), vec![ViolationKind::DowntimeOverlap]);
        assert_eq!(
            out.messages()[0],
            "Setup of job J1 on machine M1 (11:50-12:00) overlaps with downtime 10:00-12:00 (Maintenance)"
        );
    }

    #[test]
    fn test_structural_defects() {
        let machines = vec![Machine::new("M1").with_capability("P_A")];
        let job = j1();
        let stranger = Arc::new(Job::new("J9", "P_A", 30, t(16, 0)).with_machine("M1"));
        let mut s = Schedule::new();
        s.add_assignment(JobAssignment::placed(Arc::clone(&job), "M1", 480, 0));
        s.add_assignment(JobAssignment::placed(Arc::clone(&job), "M1", 600, 0));
        s.add_assignment(JobAssignment::new(Arc::clone(&stranger), "M1", 700, 690));
        s.add_assignment(JobAssignment::placed(Arc::clone(&job), "M404", 480, 0));

        let out = validate_schedule(&s, &[job], &machines, &constraint());
        let k = kinds(&out);
        assert!(k.contains(&ViolationKind::DuplicateAssignment));
        assert!(k.contains(&ViolationKind::UnknownJob));
        assert!(k.contains(&ViolationKind::MalformedInterval));
        assert!(k.contains(&ViolationKind::UnknownMachine));
        assert!(out
            .messages()
            .contains(&"Job J1 assigned to unknown machine M404".to_string()));
    }

    #[test]
    fn test_misfiled_assignment() {
        let machines = vec![Machine::new("M1").with_capability("P_A")];
        let job = j1();
        let mut s = Schedule::new();
        s.assignments
            .entry("M2".to_string())
            .or_default()
            .push(JobAssignment::placed(Arc::clone(&job), "M1", 480, 0));
        let out = validate_schedule(&s, &[job], &machines, &constraint());
        assert_eq!(kinds(&out), vec![ViolationKind::MachineMismatch]);
    }

    #[test]
    fn test_late_jobs_are_informational() {
        let machines = vec![Machine::new("M1").with_capability("P_A")];
        let job = Arc::new(Job::new("J1", "P_A", 60, t(8, 30)).with_machine("M1"));
        let s = single(&job, "M1", 480);
        let out = validate_schedule(&s, &[job], &machines, &constraint());
        assert!(out.is_valid);
        assert_eq!(
            out.report.late_jobs,
            vec![LateJob {
                job_id: "J1".into(),
                machine_id: "M1".into(),
                minutes_late: 30
            }]
        );
    }

    #[test]
    fn test_producers_yield_no_structural_violations() {
        let mut rng = SmallRng::seed_from_u64(42);
        let machines = vec![
            Machine::new("M1").with_capabilities(["P_A", "P_B"]),
            Machine::new("M2").with_capabilities(["P_A"]),
            m1_with_downtime().with_capability("P_B"),
        ];
        let machines: Vec<Machine> = machines
            .into_iter()
            .enumerate()
            .map(|(i, mut m)| {
                m.machine_id = format!("M{}", i + 1);
                m
            })
            .collect();
        let c = constraint();

        for _ in 0..20 {
            let jobs: Vec<Arc<Job>> = (0..rng.random_range(1..15))
                .map(|i| {
                    let product = if rng.random_bool(0.5) { "P_A" } else { "P_B" };
                    let minutes = [30, 45, 60, 90][rng.random_range(0..4)];
                    let due = t(rng.random_range(8..16), 0);
                    let options = ["M1", "M2", "M3"]
                        .into_iter()
                        .filter(|_| rng.random_bool(0.7))
                        .collect::<Vec<_>>();
                    Arc::new(Job::new(format!("J{i:03}"), product, minutes, due).with_machine_options(options))
                })
                .collect();

            let baseline = BaselineScheduler::new().schedule(&jobs, &machines, &c);
            let batching = BatchingScheduler::new().schedule(&jobs, &machines, &c);
            let rebalanced = Rebalancer::default().rebalance(&batching, &machines, &c).schedule;

            for s in [&baseline, &batching, &rebalanced] {
                let out = validate_schedule(s, &jobs, &machines, &c);
                assert_eq!(out.report.structural_violations, 0, "{:?}", out.messages());
                assert_eq!(out.report.feasibility_violations, 0, "{:?}", out.messages());
                assert_eq!(out.report.scheduled_jobs + out.report.unscheduled_jobs, jobs.len());
                if out.is_valid {
                    for seq in s.assignments.values() {
                        for pair in seq.windows(2) {
                            assert!(!overlaps(
                                pair[0].start_time,
                                pair[0].end_time,
                                pair[1].start_time,
                                pair[1].end_time
                            ));
                        }
                    }
                }
            }
        }
    }
}
