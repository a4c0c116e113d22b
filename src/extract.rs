//! Solution extraction.
//!
//! Reads task start times out of a [`SolveResult`] through the
//! [`TaskLayout`] of the built model and normalizes them into a
//! [`Schedule`]: grouped by machine, machines ascending, each machine's
//! tasks ordered by start time, then duration, then job and task id.
//!
//! The extractor is a pure function of its inputs, so extracting the same
//! result twice yields identical schedules.

use log::warn;

use crate::builder::TaskLayout;
use crate::error::{JsspError, Result};
use crate::models::{AssignedTask, ProblemInstance, Schedule};
use crate::solver::SolveResult;

/// Values closer than this to an integer are taken as that integer.
const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Turns solver results into schedules for one built model.
#[derive(Debug, Clone, Copy)]
pub struct SolutionExtractor<'a> {
    instance: &'a ProblemInstance,
    layout: &'a TaskLayout,
}

impl<'a> SolutionExtractor<'a> {
    /// Creates an extractor for the instance the layout was built from.
    pub fn new(instance: &'a ProblemInstance, layout: &'a TaskLayout) -> Self {
        Self { instance, layout }
    }

    /// Extracts the schedule.
    ///
    /// # Errors
    /// - [`JsspError::Solver`] if the result carries no solution
    /// - [`JsspError::MissingAssignment`] if a start-time variable has no value
    pub fn extract(&self, result: &SolveResult) -> Result<Schedule> {
        if !result.has_solution() {
            return Err(JsspError::Solver(format!(
                "cannot extract a schedule from a {} result",
                result.status
            )));
        }

        let mut assignments = Vec::with_capacity(self.instance.num_tasks());
        for (at, task) in self.instance.tasks() {
            let value = self.layout.start(at).evaluate(&result.values).map_err(|var| {
                JsspError::MissingAssignment {
                    variable: format!("{var} (start of job {} task {})", at.job, at.position + 1),
                }
            })?;
            let start = value.round();
            if (value - start).abs() > INTEGRALITY_TOLERANCE {
                warn!(
                    "start of job {} task {} is fractional ({value}), rounded to {start}",
                    at.job,
                    at.position + 1
                );
            }
            assignments.push(AssignedTask::new(
                at.job,
                at.position + 1,
                task.machine,
                start as i64,
                task.duration,
            ));
        }

        Ok(Schedule::from_assignments(assignments))
    }

    /// Reads the makespan variable, rounded.
    pub fn makespan(&self, result: &SolveResult) -> Result<i64> {
        let var = self.layout.makespan();
        result
            .values
            .get(&var)
            .map(|v| v.round() as i64)
            .ok_or_else(|| JsspError::MissingAssignment {
                variable: format!("{var} (makespan)"),
            })
    }
}
