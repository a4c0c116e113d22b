//! MILP adapter on top of `good_lp`.
//!
//! Translates a [`ConstraintModel`] into a `good_lp` problem:
//!
//! - integer / binary / continuous variables map to columns with bounds;
//! - linear constraints map one-to-one to rows;
//! - every disjunctive constraint is lowered to the pairwise big-M
//!   formulation with adapter-local `precedes` binaries and `M = horizon`.
//!
//! Lowering keeps the interval encoding usable on engines without a native
//! no-overlap constraint. Adapter-local columns are not reported back in
//! [`SolveResult::values`].
//!
//! The pure-Rust `microlp` engine is always available; `highs` and
//! `coin_cbc` are behind the cargo features of the same names.

use good_lp::solvers::Solver;
use good_lp::{
    constraint, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::{objective_value, SolveResult, SolveStats, SolveStatus, SolverAdapter};
use crate::model::{
    ConstraintModel, LinearExpr, ObjectiveSense, Sense, Values, VarId, VarKind,
};

/// MILP engines reachable through `good_lp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilpEngine {
    /// Pure-Rust branch and bound.
    MicroLp,
    /// HiGHS.
    #[cfg(feature = "highs")]
    Highs,
    /// COIN-OR CBC.
    #[cfg(feature = "coin_cbc")]
    CoinCbc,
}

impl MilpEngine {
    /// Engines compiled into this build.
    pub fn available() -> Vec<MilpEngine> {
        let mut engines = vec![MilpEngine::MicroLp];
        #[cfg(feature = "highs")]
        engines.push(MilpEngine::Highs);
        #[cfg(feature = "coin_cbc")]
        engines.push(MilpEngine::CoinCbc);
        engines
    }

    /// Short engine name.
    pub fn name(self) -> &'static str {
        match self {
            MilpEngine::MicroLp => "microlp",
            #[cfg(feature = "highs")]
            MilpEngine::Highs => "highs",
            #[cfg(feature = "coin_cbc")]
            MilpEngine::CoinCbc => "coin_cbc",
        }
    }
}

impl fmt::Display for MilpEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Solver adapter for MILP engines.
///
/// # Example
/// ```no_run
/// use u_jobshop::builder::ModelBuilder;
/// use u_jobshop::encoding::Encoding;
/// use u_jobshop::models::ProblemInstance;
/// use u_jobshop::solver::{MilpAdapter, SolverAdapter};
///
/// let instance = ProblemInstance::from_triples(vec![vec![(0, 3, 1)], vec![(0, 2, 1)]]);
/// let built = ModelBuilder::new(&instance, Encoding::Interval).build().unwrap();
/// let result = MilpAdapter::microlp().solve(&built.model);
/// assert!(result.has_solution());
/// ```
#[derive(Debug, Clone)]
pub struct MilpAdapter {
    engine: MilpEngine,
    name: String,
}

impl MilpAdapter {
    /// Creates an adapter for the given engine.
    pub fn new(engine: MilpEngine) -> Self {
        Self {
            engine,
            name: format!("good_lp/{engine}"),
        }
    }

    /// Adapter for the bundled `microlp` engine.
    pub fn microlp() -> Self {
        Self::new(MilpEngine::MicroLp)
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The engine in use.
    pub fn engine(&self) -> MilpEngine {
        self.engine
    }
}

impl Default for MilpAdapter {
    fn default() -> Self {
        Self::microlp()
    }
}

impl SolverAdapter for MilpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn solve(&self, model: &ConstraintModel) -> SolveResult {
        let started = Instant::now();
        let translation = match Translation::new(model) {
            Ok(t) => t,
            Err(message) => {
                return SolveResult::error(message, SolveStats::timed(started.elapsed()));
            }
        };
        let (variables, constraints) = (translation.columns(), translation.rows());
        debug!(
            "{}: {} -> {variables} columns ({} lowered), {constraints} rows",
            self.name,
            model.name(),
            translation.lowered
        );

        let outcome = match self.engine {
            MilpEngine::MicroLp => translation.solve_with(good_lp::solvers::microlp::microlp),
            #[cfg(feature = "highs")]
            MilpEngine::Highs => translation.solve_with(good_lp::solvers::highs::highs),
            #[cfg(feature = "coin_cbc")]
            MilpEngine::CoinCbc => translation.solve_with(good_lp::solvers::coin_cbc::coin_cbc),
        };

        let stats = SolveStats {
            wall_time: started.elapsed(),
            nodes: None,
            conflicts: None,
            variables,
            constraints,
        };

        match outcome {
            Ok(column_values) => {
                let values: Values = column_values
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (VarId::new(i), v))
                    .collect();
                match objective_value(model, &values) {
                    Ok(objective) => {
                        SolveResult::solved(SolveStatus::Optimal, values, objective, stats)
                    }
                    Err(var) => SolveResult::error(
                        format!("objective references unknown variable {var}"),
                        stats,
                    ),
                }
            }
            Err(ResolutionError::Infeasible) => {
                SolveResult::without_solution(SolveStatus::Infeasible, None, stats)
            }
            Err(ResolutionError::Unbounded) => {
                warn!("{}: {} is unbounded", self.name, model.name());
                SolveResult::error("model is unbounded", stats)
            }
            Err(e) => SolveResult::error(e.to_string(), stats),
        }
    }
}

/// A model translated into `good_lp` objects, ready for an engine.
struct Translation {
    problem: ProblemVariables,
    /// One column per model variable, in [`VarId`] order.
    columns: Vec<Variable>,
    rows: Vec<Constraint>,
    objective: Expression,
    sense: ObjectiveSense,
    /// Adapter-local binaries introduced by disjunctive lowering.
    lowered: usize,
}

impl Translation {
    fn new(model: &ConstraintModel) -> Result<Self, String> {
        let mut problem = ProblemVariables::new();
        let columns: Vec<Variable> = model
            .variables()
            .iter()
            .map(|v| {
                let definition = match v.kind {
                    VarKind::Binary => variable().binary(),
                    VarKind::Integer => variable()
                        .integer()
                        .min(v.lower as f64)
                        .max(v.upper as f64),
                    VarKind::Continuous => variable().min(v.lower as f64).max(v.upper as f64),
                };
                problem.add(definition.name(v.name.clone()))
            })
            .collect();

        let expression = |expr: &LinearExpr| -> Result<Expression, String> {
            let mut out = Expression::from(expr.offset() as f64);
            for &(var, coeff) in expr.terms() {
                let column = columns
                    .get(var.index())
                    .ok_or_else(|| format!("constraint references unknown variable {var}"))?;
                out += coeff as f64 * *column;
            }
            Ok(out)
        };

        let mut rows = Vec::with_capacity(model.linear_constraints().len());
        for c in model.linear_constraints() {
            let lhs = expression(&c.expr)?;
            let rhs = c.rhs as f64;
            rows.push(match c.sense {
                Sense::LessEq => constraint!(lhs <= rhs),
                Sense::GreaterEq => constraint!(lhs >= rhs),
                Sense::Equal => constraint!(lhs == rhs),
            });
        }

        let (objective, sense) = match model.objective() {
            Some(o) => (expression(&o.expr)?, o.sense),
            None => (Expression::from(0.0), ObjectiveSense::Minimize),
        };

        let big_m = model.horizon() as f64;
        let mut lowered = 0;
        for d in model.disjunctive_constraints() {
            for (i, &a) in d.intervals.iter().enumerate() {
                for &b in &d.intervals[i + 1..] {
                    let (a, b) = (model.interval(a), model.interval(b));
                    let (sa, sb) = match (columns.get(a.start.index()), columns.get(b.start.index())) {
                        (Some(&sa), Some(&sb)) => (sa, sb),
                        _ => return Err(format!("disjunctive on machine {} references an unknown start", d.machine)),
                    };
                    let precedes = problem.add(
                        variable()
                            .binary()
                            .name(format!("m{}_{}_precedes_{}", d.machine, a.task, b.task)),
                    );
                    lowered += 1;

                    // start(a) + dur(a) - M·(1 - y) <= start(b)
                    let first: Expression = sa - sb + big_m * precedes;
                    let first_rhs = big_m - a.duration as f64;
                    rows.push(constraint!(first <= first_rhs));
                    // start(b) + dur(b) - M·y <= start(a)
                    let second: Expression = sb - sa - big_m * precedes;
                    let second_rhs = -(b.duration as f64);
                    rows.push(constraint!(second <= second_rhs));
                }
            }
        }

        Ok(Self {
            problem,
            columns,
            rows,
            objective,
            sense,
            lowered,
        })
    }

    fn columns(&self) -> usize {
        self.columns.len() + self.lowered
    }

    fn rows(&self) -> usize {
        self.rows.len()
    }

    /// Solves with `solver` and returns the value of every model column.
    fn solve_with<S>(self, solver: S) -> Result<Vec<f64>, ResolutionError>
    where
        S: Solver,
        S::Model: SolverModel<Error = ResolutionError>,
    {
        let Translation {
            problem,
            columns,
            rows,
            objective,
            sense,
            ..
        } = self;

        let unsolved = match sense {
            ObjectiveSense::Minimize => problem.minimise(objective),
            ObjectiveSense::Maximize => problem.maximise(objective),
        };
        let mut engine = unsolved.using(solver);
        for row in rows {
            engine = engine.with(row);
        }
        let solution = engine.solve()?;
        Ok(columns.iter().map(|&c| solution.value(c)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ModelBuilder;
    use crate::encoding::Encoding;
    use crate::model::{ConstraintTag, LinearConstraint, ModelSink, Objective};
    use crate::models::{ProblemInstance, TaskRef};
    use crate::test_support::{single_task_instance, three_job_instance, two_by_two_instance};

    fn solve(instance: &ProblemInstance, encoding: Encoding) -> SolveResult {
        let built = ModelBuilder::new(instance, encoding).build().unwrap();
        let result = MilpAdapter::microlp().solve(&built.model);
        if result.has_solution() {
            assert_eq!(built.model.violations(&result.values), Ok(vec![]));
        }
        result
    }

    #[test]
    fn test_name() {
        assert_eq!(MilpAdapter::microlp().name(), "good_lp/microlp");
        assert_eq!(MilpAdapter::default().engine(), MilpEngine::MicroLp);
        assert_eq!(MilpAdapter::microlp().with_name("mip").name(), "mip");
        assert!(MilpEngine::available().contains(&MilpEngine::MicroLp));
    }

    #[test]
    fn test_big_m_three_jobs() {
        let result = solve(&three_job_instance(), Encoding::BigMDisjunctive);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.objective.unwrap() - 11.0).abs() < 1e-6);
    }

    #[test]
    fn test_interval_three_jobs_via_lowering() {
        let instance = three_job_instance();
        let built = ModelBuilder::new(&instance, Encoding::Interval).build().unwrap();
        let result = MilpAdapter::microlp().solve(&built.model);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.objective.unwrap() - 11.0).abs() < 1e-6);
        // lowered binaries are counted but not reported
        assert_eq!(result.values.len(), built.model.variables().len());
        assert_eq!(result.stats.variables, built.model.variables().len() + 7);
        assert_eq!(built.model.violations(&result.values), Ok(vec![]));
    }

    #[test]
    fn test_time_indexed_two_by_two() {
        let result = solve(&two_by_two_instance(), Encoding::TimeIndexed);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.objective.unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_task() {
        for encoding in Encoding::ALL {
            let result = solve(&single_task_instance(), encoding);
            assert_eq!(result.status, SolveStatus::Optimal, "{encoding}");
            assert!((result.objective.unwrap() - 4.0).abs() < 1e-6, "{encoding}");
        }
    }

    #[test]
    fn test_infeasible_horizon() {
        // Job 0 alone needs 7 time units.
        let instance = three_job_instance().with_horizon(6);
        let result = solve(&instance, Encoding::BigMDisjunctive);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.values.is_empty());
        assert_eq!(result.objective, None);
    }

    #[test]
    fn test_plain_linear_model() {
        let mut model = ConstraintModel::new("lp", 10);
        let x = model.new_variable("x".into(), VarKind::Integer, 0, 10);
        let y = model.new_variable("y".into(), VarKind::Integer, 0, 10);
        let tag = ConstraintTag::Makespan(TaskRef::new(0, 0));
        model.add_linear(LinearConstraint::greater_eq(LinearExpr::from(x), 3, tag));
        model.add_linear(LinearConstraint::greater_eq(
            LinearExpr::from(y) - LinearExpr::from(x),
            2,
            tag,
        ));
        model.set_objective(Objective::minimize(y));

        let result = MilpAdapter::microlp().solve(&model);
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.values[&x] - 3.0).abs() < 1e-6);
        assert!((result.values[&y] - 5.0).abs() < 1e-6);
        assert_eq!(result.stats.constraints, 2);
    }
}
