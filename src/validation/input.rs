//! Input validation for scheduling requests.
//!
//! Checks structural integrity of jobs and machines before scheduling.
//! Detects:
//! - Duplicate IDs
//! - Jobs without machine options
//! - Machine options naming machines that don't exist
//! - Non-positive processing times
//! - Products no listed machine can produce
//! - Inverted downtime windows
//!
//! None of these abort a run: producers report affected jobs as
//! unscheduled. The findings feed the request analysis.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{Job, Machine};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A job lists no machines.
    EmptyMachineOptions,
    /// A job references a machine that doesn't exist.
    InvalidMachineReference,
    /// A job has zero or negative processing time.
    NonPositiveProcessingTime,
    /// None of a job's listed machines can produce its product.
    NoCapableMachine,
    /// A downtime window does not start before it ends.
    InvalidDowntime,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates the input data for a scheduling request.
///
/// Checks:
/// 1. No duplicate machine IDs
/// 2. No duplicate job IDs
/// 3. Every job lists at least one machine
/// 4. Every listed machine exists
/// 5. Every processing time is positive
/// 6. At least one listed, existing machine can produce the job's product
/// 7. Every downtime window starts before it ends
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(jobs: &[Arc<Job>], machines: &[Machine]) -> ValidationResult {
    let mut errors = Vec::new();

    // Collect machine IDs, check downtime
    let mut machine_ids = HashSet::new();
    for m in machines {
        if !machine_ids.insert(m.machine_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate machine ID: {}", m.machine_id),
            ));
        }
        if let Err(e) = m.validate() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDowntime,
                e.to_string(),
            ));
        }
    }

    // Check jobs
    let mut job_ids = HashSet::new();
    for job in jobs {
        if !job_ids.insert(job.job_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate job ID: {}", job.job_id),
            ));
        }

        if job.processing_time <= 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveProcessingTime,
                format!(
                    "Job '{}' has non-positive processing time ({} min)",
                    job.job_id, job.processing_time
                ),
            ));
        }

        if job.machine_options.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyMachineOptions,
                format!("Job '{}' has no machine options", job.job_id),
            ));
            continue;
        }

        // Check machine references
        for option in &job.machine_options {
            if !machine_ids.contains(option.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidMachineReference,
                    format!("Job '{}' references unknown machine '{}'", job.job_id, option),
                ));
            }
        }

        // At least one listed machine must make the product
        let capable = machines
            .iter()
            .any(|m| job.allows_machine(&m.machine_id) && m.can_produce(&job.product_type));
        if !capable {
            errors.push(ValidationError::new(
                ValidationErrorKind::NoCapableMachine,
                format!(
                    "Job '{}': no listed machine can produce {}",
                    job.job_id, job.product_type
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
