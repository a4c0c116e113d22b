//! Solver adapters.
//!
//! A [`SolverAdapter`] maps a [`ConstraintModel`] onto one solving engine
//! and reports a uniform [`SolveResult`]. Adapters are stateless between
//! calls and shared across threads, so one adapter value can serve every
//! encoding concurrently.
//!
//! # Status mapping
//!
//! | Status | Meaning | Values |
//! |--------|---------|--------|
//! | `Optimal` | proven optimal | complete |
//! | `Feasible` | solution found, optimality not proven | complete |
//! | `Infeasible` | proven infeasible | empty |
//! | `Unknown` | stopped without a solution (e.g. timeout) | empty |
//! | `Error` | the engine failed | empty |

mod cp;
mod milp;

pub use cp::CpAdapter;
pub use milp::{MilpAdapter, MilpEngine};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::model::{ConstraintModel, Values, VarId};

/// Outcome category of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal solution.
    Optimal,
    /// A solution without an optimality proof.
    Feasible,
    /// The model has no solution.
    Infeasible,
    /// Stopped without a solution or a proof.
    Unknown,
    /// The engine failed.
    Error,
}

impl SolveStatus {
    /// Whether variable values are available.
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Feasible => "Feasible",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unknown => "Unknown",
            SolveStatus::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Engine-side statistics of one solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Time spent inside the adapter.
    pub wall_time: Duration,
    /// Branch-and-bound nodes or search decisions, if the engine reports them.
    pub nodes: Option<u64>,
    /// Conflicts met during search, if the engine reports them.
    pub conflicts: Option<u64>,
    /// Columns handed to the engine, including lowering auxiliaries.
    pub variables: usize,
    /// Rows handed to the engine, including lowering auxiliaries.
    pub constraints: usize,
}

impl SolveStats {
    /// Stats carrying only a wall time.
    pub fn timed(wall_time: Duration) -> Self {
        Self {
            wall_time,
            ..Self::default()
        }
    }
}

/// Uniform result of [`SolverAdapter::solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Outcome category.
    pub status: SolveStatus,
    /// Values of the model's variables. Complete iff `status.has_solution()`.
    pub values: Values,
    /// Objective value, when a solution exists.
    pub objective: Option<f64>,
    /// Engine statistics.
    pub stats: SolveStats,
    /// Explanation for `Unknown` and `Error`.
    pub message: Option<String>,
}

impl SolveResult {
    /// A result with a solution.
    pub fn solved(status: SolveStatus, values: Values, objective: f64, stats: SolveStats) -> Self {
        Self {
            status,
            values,
            objective: Some(objective),
            stats,
            message: None,
        }
    }

    /// A result without values.
    pub fn without_solution(
        status: SolveStatus,
        message: Option<String>,
        stats: SolveStats,
    ) -> Self {
        Self {
            status,
            values: Values::new(),
            objective: None,
            stats,
            message,
        }
    }

    /// `Unknown` with a reason, e.g. a timeout.
    pub fn unknown(reason: impl Into<String>, stats: SolveStats) -> Self {
        Self::without_solution(SolveStatus::Unknown, Some(reason.into()), stats)
    }

    /// `Error` with the engine's message.
    pub fn error(message: impl Into<String>, stats: SolveStats) -> Self {
        Self::without_solution(SolveStatus::Error, Some(message.into()), stats)
    }

    /// Whether variable values are available.
    pub fn has_solution(&self) -> bool {
        self.status.has_solution()
    }
}

/// Objective value of `values` under `model`'s objective; `0` without one.
pub(crate) fn objective_value(model: &ConstraintModel, values: &Values) -> Result<f64, VarId> {
    model
        .objective()
        .map(|o| o.expr.evaluate(values))
        .transpose()
        .map(|v| v.unwrap_or(0.0))
}

/// One solving engine behind a uniform interface.
///
/// Implementations must not keep state between `solve` calls: the same
/// adapter is invoked concurrently for different models.
pub trait SolverAdapter: Send + Sync {
    /// Display name used in reports.
    fn name(&self) -> &str;

    /// Solves a model. Engine failures are reported as
    /// [`SolveStatus::Error`], never as a panic.
    fn solve(&self, model: &ConstraintModel) -> SolveResult;
}
