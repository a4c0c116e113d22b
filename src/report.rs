//! Per-pair reports.
//!
//! One [`PairReport`] per (encoding, backend) pair, rendered as a single
//! self-contained text block:
//!
//! ```text
//! ########### good_lp/microlp | big-m ###########
//! Elapsed time: 12 ms
//! Solve status: Optimal
//! Optimal Schedule Length: 11
//!
//! Machine 0: job_0_task_1   job_1_task_1
//!            [0,3]          [3,5]
//! ...
//! Statistics
//!   model    : 16 variables (7 binary), 27 linear, 0 intervals, 0 disjunctive
//!   columns  : 16
//!   rows     : 27
//!   nodes    : n/a
//!   conflicts: n/a
//!   wall time: 0.012s
//! ####################################
//! ```

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::encoding::Encoding;
use crate::error::JsspError;
use crate::model::ModelSize;
use crate::models::Schedule;
use crate::solver::{SolveStats, SolveStatus};

/// How a pair's pipeline ended.
#[derive(Debug)]
pub enum PairOutcome {
    /// A schedule was extracted.
    Solved {
        /// Normalized timetable.
        schedule: Schedule,
        /// Objective value reported by the solver.
        objective: f64,
    },
    /// The solver finished without a solution (infeasible, timeout, engine error).
    NoSolution {
        /// Adapter explanation, if any.
        reason: Option<String>,
    },
    /// Building, extraction, or the pipeline thread itself failed.
    Failed(JsspError),
}

/// Result of one (encoding, backend) pair.
#[derive(Debug)]
pub struct PairReport {
    /// Adapter name.
    pub backend: String,
    /// Encoding used.
    pub encoding: Encoding,
    /// Wall time of the solve call, excluding model building.
    pub elapsed: Duration,
    /// Solve status. `Error` when the pipeline failed before or after solving.
    pub status: SolveStatus,
    /// Size of the built model, if building succeeded.
    pub model_size: Option<ModelSize>,
    /// Engine statistics, if the solver ran.
    pub stats: Option<SolveStats>,
    /// Final outcome.
    pub outcome: PairOutcome,
}

/// Serializable summary of a report, for machine-readable output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Adapter name.
    pub backend: String,
    /// Encoding used.
    pub encoding: Encoding,
    /// Wall time of the solve call in milliseconds.
    pub elapsed_ms: u128,
    /// Solve status.
    pub status: SolveStatus,
    /// Makespan of the extracted schedule, if any.
    pub makespan: Option<i64>,
    /// `kind: message` of the pipeline error, if the pipeline failed.
    pub error: Option<String>,
}

impl PairReport {
    /// Report of a pipeline that failed before producing a solver result.
    pub fn failed(backend: impl Into<String>, encoding: Encoding, error: JsspError) -> Self {
        Self {
            backend: backend.into(),
            encoding,
            elapsed: Duration::ZERO,
            status: SolveStatus::Error,
            model_size: None,
            stats: None,
            outcome: PairOutcome::Failed(error),
        }
    }

    /// `backend | encoding`, as used in the header.
    pub fn label(&self) -> String {
        format!("{} | {}", self.backend, self.encoding)
    }

    /// The extracted schedule, if any.
    pub fn schedule(&self) -> Option<&Schedule> {
        match &self.outcome {
            PairOutcome::Solved { schedule, .. } => Some(schedule),
            _ => None,
        }
    }

    /// Makespan of the extracted schedule, if any.
    pub fn makespan(&self) -> Option<i64> {
        self.schedule().map(Schedule::makespan)
    }

    /// The pipeline error, if the pipeline failed.
    pub fn error(&self) -> Option<&JsspError> {
        match &self.outcome {
            PairOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Serializable summary.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            backend: self.backend.clone(),
            encoding: self.encoding,
            elapsed_ms: self.elapsed.as_millis(),
            status: self.status,
            makespan: self.makespan(),
            error: self.error().map(|e| format!("{}: {e}", e.kind())),
        }
    }
}

impl fmt::Display for PairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "########### {} ###########", self.label())?;
        writeln!(f, "Elapsed time: {} ms", self.elapsed.as_millis())?;
        writeln!(f, "Solve status: {}", self.status)?;

        match &self.outcome {
            PairOutcome::Solved {
                schedule,
                objective,
            } => {
                let label = if self.status == SolveStatus::Optimal {
                    "Optimal Schedule Length"
                } else {
                    "Best Schedule Length"
                };
                let rounded = objective.round();
                if (objective - rounded).abs() < 1e-6 {
                    writeln!(f, "{label}: {rounded}")?;
                } else {
                    writeln!(f, "{label}: {objective}")?;
                }
                writeln!(f)?;
                write!(f, "{}", schedule.render())?;
            }
            PairOutcome::NoSolution { reason } => {
                writeln!(f, "No solution found.")?;
                if let Some(reason) = reason {
                    writeln!(f, "Reason: {reason}")?;
                }
            }
            PairOutcome::Failed(e) => {
                writeln!(f, "No solution found.")?;
                writeln!(f, "Error ({}): {e}", e.kind())?;
            }
        }

        if self.model_size.is_some() || self.stats.is_some() {
            writeln!(f, "Statistics")?;
            if let Some(size) = &self.model_size {
                writeln!(f, "  model    : {size}")?;
            }
            if let Some(stats) = &self.stats {
                writeln!(f, "  columns  : {}", stats.variables)?;
                writeln!(f, "  rows     : {}", stats.constraints)?;
                match stats.nodes {
                    Some(n) => writeln!(f, "  nodes    : {n}")?,
                    None => writeln!(f, "  nodes    : n/a")?,
                }
                match stats.conflicts {
                    Some(n) => writeln!(f, "  conflicts: {n}")?,
                    None => writeln!(f, "  conflicts: n/a")?,
                }
                writeln!(f, "  wall time: {:.3}s", stats.wall_time.as_secs_f64())?;
            }
        }
        writeln!(f, "####################################")
    }
}
