//! Input validation for job-shop instances.
//!
//! Checks structural integrity before any model is built. Detects:
//! - Empty job lists and empty jobs
//! - Non-positive durations, and durations whose sum overflows `i64`
//! - Negative or non-contiguous machine ids
//! - Duplicate task ids within a job
//!
//! All problems are collected in one pass so a caller sees the full list.

use std::collections::HashSet;

use crate::models::ProblemInstance;

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
    /// The instance has no jobs.
    EmptyJobList,
    /// A job has no tasks.
    EmptyJob,
    /// A task has a duration of zero or less.
    NonPositiveDuration,
    /// The summed durations do not fit in `i64`.
    DurationOverflow,
    /// A task references a negative machine id.
    NegativeMachine,
    /// Machine ids do not cover `0..n` without gaps.
    NonContiguousMachines,
    /// Two tasks of one job share a task id.
    DuplicateTaskId,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a problem instance.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_instance(instance: &ProblemInstance) -> ValidationResult {
    let mut errors = Vec::new();

    if instance.jobs.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyJobList,
            "instance has no jobs",
        ));
    }

    for (j, job) in instance.jobs.iter().enumerate() {
        if job.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyJob,
                format!("job {j} has no tasks"),
            ));
        }

        let mut ids = HashSet::new();
        for (p, task) in job.tasks.iter().enumerate() {
            if task.duration <= 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NonPositiveDuration,
                    format!("job {j} task {p} ({task}) has non-positive duration"),
                ));
            }
            if task.machine < 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NegativeMachine,
                    format!("job {j} task {p} ({task}) references a negative machine"),
                ));
            }
            if !ids.insert(task.task_id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateTaskId,
                    format!("job {j} repeats task id {}", task.task_id),
                ));
            }
        }
    }

    if instance.derived_horizon().is_none() {
        errors.push(ValidationError::new(
            ValidationErrorKind::DurationOverflow,
            "summed task durations overflow a 64-bit horizon",
        ));
    }

    // Sorted, distinct: contiguous iff the i-th id is i.
    let machines: Vec<i64> = instance.machines().into_iter().filter(|&m| m >= 0).collect();
    let first_gap = machines
        .iter()
        .zip(0i64..)
        .find(|&(&m, i)| m != i)
        .map(|(_, i)| i);
    if let (Some(gap), Some(max)) = (first_gap, machines.last()) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NonContiguousMachines,
            format!("machine {gap} has no tasks but ids run up to {max}"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Joins validation errors into one message.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Job, Task};
    use crate::test_support::three_job_instance;

    fn kinds(instance: &ProblemInstance) -> Vec<ValidationErrorKind> {
        validate_instance(instance)
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_valid_instance() {
        assert!(validate_instance(&three_job_instance()).is_ok());
    }

    #[test]
    fn test_empty_job_list() {
        let instance = ProblemInstance::new(vec![]);
        assert_eq!(kinds(&instance), vec![ValidationErrorKind::EmptyJobList]);
    }

    #[test]
    fn test_empty_job() {
        let instance = ProblemInstance::new(vec![Job::new(vec![Task::new(0, 2, 1)]), Job::default()]);
        assert_eq!(kinds(&instance), vec![ValidationErrorKind::EmptyJob]);
    }

    #[test]
    fn test_non_positive_duration() {
        let instance = ProblemInstance::from_triples(vec![vec![(0, 0, 1), (0, -3, 2)]]);
        let found = kinds(&instance);
        assert_eq!(
            found
                .iter()
                .filter(|k| **k == ValidationErrorKind::NonPositiveDuration)
                .count(),
            2
        );
    }

    #[test]
    fn test_negative_machine() {
        let instance = ProblemInstance::from_triples(vec![vec![(-1, 2, 1)]]);
        assert!(kinds(&instance).contains(&ValidationErrorKind::NegativeMachine));
    }

    #[test]
    fn test_non_contiguous_machines() {
        let instance = ProblemInstance::from_triples(vec![vec![(0, 2, 1), (2, 2, 2)]]);
        let errors = validate_instance(&instance).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::NonContiguousMachines);
        assert_eq!(errors[0].message, "machine 1 has no tasks but ids run up to 2");
    }

    #[test]
    fn test_huge_machine_ids_do_not_overflow() {
        for machine in [i64::MAX, 4_000_000_000] {
            let instance = ProblemInstance::from_triples(vec![vec![(0, 2, 1), (machine, 2, 2)]]);
            let errors = validate_instance(&instance).unwrap_err();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind, ValidationErrorKind::NonContiguousMachines);
            assert!(errors[0].message.starts_with("machine 1 has no tasks"));
        }

        let instance = ProblemInstance::from_triples(vec![vec![(i64::MAX, 2, 1)]]);
        assert_eq!(kinds(&instance), vec![ValidationErrorKind::NonContiguousMachines]);
        assert!(validate_instance(&instance).unwrap_err()[0]
            .message
            .starts_with("machine 0 has no tasks"));
    }

    #[test]
    fn test_duration_overflow() {
        let instance = ProblemInstance::from_triples(vec![vec![(0, i64::MAX, 1), (0, 2, 2)]]);
        assert_eq!(kinds(&instance), vec![ValidationErrorKind::DurationOverflow]);

        let across_jobs =
            ProblemInstance::from_triples(vec![vec![(0, i64::MAX, 1)], vec![(0, 1, 1)]]);
        assert_eq!(kinds(&across_jobs), vec![ValidationErrorKind::DurationOverflow]);
    }

    #[test]
    fn test_duplicate_task_id() {
        let instance = ProblemInstance::from_triples(vec![vec![(0, 2, 1), (1, 2, 1)]]);
        assert_eq!(kinds(&instance), vec![ValidationErrorKind::DuplicateTaskId]);
    }

    #[test]
    fn test_multiple_errors_are_described_together() {
        let instance = ProblemInstance::from_triples(vec![vec![(0, 0, 1), (0, 2, 1)], vec![]]);
        let errors = validate_instance(&instance).unwrap_err();
        assert!(errors.len() >= 3);
        let message = describe(&errors);
        assert!(message.contains("non-positive duration"));
        assert!(message.contains("job 1 has no tasks"));
    }
}
