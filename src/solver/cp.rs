//! Constraint-programming adapter on top of Pumpkin.
//!
//! Translates a [`ConstraintModel`] into a lazy clause generation model:
//!
//! - integer and binary variables map to bounded integer domains;
//! - linear constraints map to `less_than_or_equals`, `greater_than_or_equals`
//!   or `equals` over scaled views;
//! - every disjunctive constraint maps to a native `cumulative` with unit
//!   demands and capacity one, so interval models keep their no-overlap
//!   reasoning instead of being linearized.
//!
//! The objective is optimised with linear SAT-UNSAT search. Decisions and
//! conflicts are counted by a forwarding brancher and reported in
//! [`SolveStats`].
//!
//! Pumpkin domains are 32-bit. A model whose bounds or coefficients do not
//! fit is reported as an engine error.
//!
//! # Reference
//! Schutt, Feydy, Stuckey & Wallace (2011), "Explaining the cumulative
//! propagator", Constraints 16(3)

use log::debug;
use pumpkin_conflict_resolvers::resolvers::ResolutionResolver;
use pumpkin_constraints::{cumulative, equals, greater_than_or_equals, less_than_or_equals};
use pumpkin_core::branching::{Brancher, BrancherEvent, SelectionContext};
use pumpkin_core::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_core::optimisation::OptimisationDirection;
use pumpkin_core::predicates::Predicate;
use pumpkin_core::results::{OptimisationResult, ProblemSolution, SolutionReference};
use pumpkin_core::statistics::StatisticLogger;
use pumpkin_core::termination::{Indefinite, TerminationCondition, TimeBudget};
use pumpkin_core::variables::{AffineView, DomainId, TransformableVariable};
use pumpkin_core::{DefaultBrancher, Solver};
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use super::{objective_value, SolveResult, SolveStats, SolveStatus, SolverAdapter};
use crate::model::{ConstraintModel, LinearExpr, ObjectiveSense, Sense, Values, VarId, VarKind};

/// Solver adapter for the Pumpkin CP engine.
///
/// # Example
/// ```no_run
/// use u_jobshop::builder::ModelBuilder;
/// use u_jobshop::encoding::Encoding;
/// use u_jobshop::models::ProblemInstance;
/// use u_jobshop::solver::{CpAdapter, SolverAdapter};
///
/// let instance = ProblemInstance::from_triples(vec![vec![(0, 3, 1)], vec![(0, 2, 1)]]);
/// let built = ModelBuilder::new(&instance, Encoding::Interval).build().unwrap();
/// let result = CpAdapter::new().solve(&built.model);
/// assert!(result.has_solution());
/// ```
#[derive(Debug, Clone)]
pub struct CpAdapter {
    name: String,
    time_limit: Option<Duration>,
}

impl CpAdapter {
    /// Creates an adapter that searches until optimality is proven.
    pub fn new() -> Self {
        Self {
            name: "pumpkin/cp".to_string(),
            time_limit: None,
        }
    }

    /// Overrides the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stops the search after `limit`, keeping the best solution found.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// The engine-side time limit, if any.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

impl Default for CpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverAdapter for CpAdapter {
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
        debug!(
            "{}: {} -> {} domains, {} constraints",
            self.name,
            model.name(),
            translation.columns,
            translation.rows
        );

        let Translation {
            mut solver,
            domains,
            objective,
            direction,
            columns,
            rows,
            infeasible,
        } = translation;

        let mut stats = SolveStats {
            wall_time: Duration::ZERO,
            nodes: Some(0),
            conflicts: Some(0),
            variables: columns,
            constraints: rows,
        };

        if infeasible || solver.is_inconsistent() {
            debug!("{}: {} is infeasible at the root", self.name, model.name());
            stats.wall_time = started.elapsed();
            return SolveResult::without_solution(SolveStatus::Infeasible, None, stats);
        }

        let search = match self.time_limit {
            Some(limit) => optimise(
                &mut solver,
                objective,
                direction,
                &mut TimeBudget::starting_now(limit),
            ),
            None => optimise(&mut solver, objective, direction, &mut Indefinite),
        };
        stats.wall_time = started.elapsed();
        stats.nodes = Some(search.decisions);
        stats.conflicts = Some(search.conflicts);

        let (status, solution) = match search.result {
            OptimisationResult::Optimal(solution) => (SolveStatus::Optimal, solution),
            OptimisationResult::Satisfiable(solution)
            | OptimisationResult::Stopped(solution, _) => (SolveStatus::Feasible, solution),
            OptimisationResult::Unsatisfiable => {
                return SolveResult::without_solution(SolveStatus::Infeasible, None, stats);
            }
            OptimisationResult::Unknown => {
                return SolveResult::unknown("search stopped before a solution was found", stats);
            }
        };

        let values: Values = domains
            .iter()
            .enumerate()
            .map(|(i, &domain)| (VarId::new(i), f64::from(solution.get_integer_value(domain))))
            .collect();
        match objective_value(model, &values) {
            Ok(objective) => SolveResult::solved(status, values, objective, stats),
            Err(var) => SolveResult::error(
                format!("objective references unknown variable {var}"),
                stats,
            ),
        }
    }
}

/// A model translated into a Pumpkin solver, ready for search.
struct Translation {
    solver: Solver,
    /// One domain per model variable, in [`VarId`] order.
    domains: Vec<DomainId>,
    objective: DomainId,
    direction: OptimisationDirection,
    columns: usize,
    rows: usize,
    /// A constant row of the model is violated.
    infeasible: bool,
}

impl Translation {
    fn new(model: &ConstraintModel) -> Result<Self, String> {
        let mut solver = Solver::default();
        let tag = solver.new_constraint_tag();

        let mut domains = Vec::with_capacity(model.variables().len());
        for v in model.variables() {
            if v.kind == VarKind::Continuous {
                return Err(format!("continuous variable {} is not supported", v.name));
            }
            let lower = narrow(v.lower, &v.name)?;
            let upper = narrow(v.upper, &v.name)?;
            domains.push(solver.new_named_bounded_integer(lower, upper, v.name.clone()));
        }
        let mut columns = domains.len();
        let mut rows = 0;

        // Domains are created before any constraint is posted: a solver that
        // turns inconsistent while posting accepts no new variables.
        let mut link = None;
        let (objective, direction) = match model.objective() {
            Some(o) => {
                let direction = match o.sense {
                    ObjectiveSense::Minimize => OptimisationDirection::Minimise,
                    ObjectiveSense::Maximize => OptimisationDirection::Maximise,
                };
                match single_variable(&o.expr) {
                    Some(var) => {
                        let domain = domains.get(var.index()).copied().ok_or_else(|| {
                            format!("objective references unknown variable {var}")
                        })?;
                        (domain, direction)
                    }
                    None => {
                        let (domain, terms, rhs) =
                            objective_domain(&mut solver, model, &domains, &o.expr)?;
                        link = Some((terms, rhs));
                        columns += 1;
                        (domain, direction)
                    }
                }
            }
            None => {
                columns += 1;
                let domain = solver.new_named_bounded_integer(0, 0, "objective");
                (domain, OptimisationDirection::Minimise)
            }
        };

        let mut infeasible = false;
        for c in model.linear_constraints() {
            let terms = views(&domains, &c.expr)?;
            let rhs = c.rhs - c.expr.offset();
            if terms.is_empty() {
                let holds = match c.sense {
                    Sense::LessEq => 0 <= rhs,
                    Sense::GreaterEq => 0 >= rhs,
                    Sense::Equal => rhs == 0,
                };
                if !holds {
                    debug!("{}: constant row {} is violated", model.name(), c.tag);
                    infeasible = true;
                }
                continue;
            }
            let rhs = narrow(rhs, "right-hand side")?;
            match c.sense {
                Sense::LessEq => solver
                    .add_constraint(less_than_or_equals(terms, rhs, tag))
                    .post(),
                Sense::GreaterEq => solver
                    .add_constraint(greater_than_or_equals(terms, rhs, tag))
                    .post(),
                Sense::Equal => solver.add_constraint(equals(terms, rhs, tag)).post(),
            }
            rows += 1;
        }

        for d in model.disjunctive_constraints() {
            let mut starts = Vec::with_capacity(d.intervals.len());
            let mut durations = Vec::with_capacity(d.intervals.len());
            for &id in &d.intervals {
                let interval = model.interval(id);
                let start = domains.get(interval.start.index()).copied().ok_or_else(|| {
                    format!(
                        "disjunctive on machine {} references an unknown start",
                        d.machine
                    )
                })?;
                starts.push(start);
                durations.push(narrow(interval.duration, "duration")?);
            }
            let demands = vec![1; starts.len()];
            solver
                .add_constraint(cumulative(starts, durations, demands, 1, tag))
                .post();
            rows += 1;
        }

        if let Some((terms, rhs)) = link {
            solver.add_constraint(equals(terms, rhs, tag)).post();
            rows += 1;
        }

        Ok(Self {
            solver,
            domains,
            objective,
            direction,
            columns,
            rows,
            infeasible,
        })
    }
}

/// `value` as an engine integer.
fn narrow(value: i64, what: &str) -> Result<i32, String> {
    i32::try_from(value)
        .map_err(|_| format!("{what} value {value} exceeds the 32-bit range of the engine"))
}

/// Scaled views of the terms of `expr`, duplicate variables merged and
/// cancelled terms dropped.
fn views(domains: &[DomainId], expr: &LinearExpr) -> Result<Vec<AffineView<DomainId>>, String> {
    let mut merged: BTreeMap<VarId, i64> = BTreeMap::new();
    for &(var, coeff) in expr.terms() {
        *merged.entry(var).or_default() += coeff;
    }
    merged
        .into_iter()
        .filter(|&(_, coeff)| coeff != 0)
        .map(|(var, coeff)| {
            let domain = domains
                .get(var.index())
                .ok_or_else(|| format!("constraint references unknown variable {var}"))?;
            Ok(domain.scaled(narrow(coeff, "coefficient")?))
        })
        .collect()
}

/// The variable of a plain `1·x` expression.
fn single_variable(expr: &LinearExpr) -> Option<VarId> {
    match expr.terms() {
        [(var, 1)] if expr.offset() == 0 => Some(*var),
        _ => None,
    }
}

/// An auxiliary domain bounded by the extremes of `expr`, with the terms and
/// right-hand side of the row `expr - objective = 0` that links the two.
fn objective_domain(
    solver: &mut Solver,
    model: &ConstraintModel,
    domains: &[DomainId],
    expr: &LinearExpr,
) -> Result<(DomainId, Vec<AffineView<DomainId>>, i32), String> {
    let (mut lower, mut upper) = (expr.offset(), expr.offset());
    for &(var, coeff) in expr.terms() {
        let v = model
            .variables()
            .get(var.index())
            .ok_or_else(|| format!("objective references unknown variable {var}"))?;
        let (a, b) = (coeff.saturating_mul(v.lower), coeff.saturating_mul(v.upper));
        lower = lower.saturating_add(a.min(b));
        upper = upper.saturating_add(a.max(b));
    }
    let mut terms = views(domains, expr)?;
    let rhs = narrow(-expr.offset(), "objective offset")?;
    let objective = solver.new_named_bounded_integer(
        narrow(lower, "objective bound")?,
        narrow(upper, "objective bound")?,
        "objective",
    );
    terms.push(objective.scaled(-1));
    Ok((objective, terms, rhs))
}

/// Outcome of one search, with the counters of the brancher that drove it.
struct Search {
    result: OptimisationResult<()>,
    decisions: u64,
    conflicts: u64,
}

fn optimise<T: TerminationCondition>(
    solver: &mut Solver,
    objective: DomainId,
    direction: OptimisationDirection,
    termination: &mut T,
) -> Search {
    let mut brancher = CountingBrancher::new(solver.default_brancher());
    let mut resolver = ResolutionResolver::default();
    let callback = |_: &Solver,
                    _: SolutionReference,
                    _: &CountingBrancher<DefaultBrancher>,
                    _: &ResolutionResolver|
     -> ControlFlow<()> { ControlFlow::Continue(()) };

    let result = solver.optimise(
        &mut brancher,
        termination,
        &mut resolver,
        LinearSatUnsat::new(direction, objective, callback),
    );
    Search {
        result,
        decisions: brancher.decisions,
        conflicts: brancher.conflicts,
    }
}

/// Forwards every event to `inner` and counts decisions and conflicts.
#[derive(Debug)]
struct CountingBrancher<B> {
    inner: B,
    decisions: u64,
    conflicts: u64,
}

impl<B> CountingBrancher<B> {
    fn new(inner: B) -> Self {
        Self {
            inner,
            decisions: 0,
            conflicts: 0,
        }
    }
}

impl<B: Brancher> Brancher for CountingBrancher<B> {
    fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.inner.log_statistics(statistic_logger);
    }

    fn next_decision(&mut self, context: &mut SelectionContext) -> Option<Predicate> {
        let decision = self.inner.next_decision(context);
        if decision.is_some() {
            self.decisions += 1;
        }
        decision
    }

    fn on_conflict(&mut self) {
        self.conflicts += 1;
        self.inner.on_conflict();
    }

    fn on_backtrack(&mut self) {
        self.inner.on_backtrack();
    }

    fn on_solution(&mut self, solution: SolutionReference) {
        self.inner.on_solution(solution);
    }

    fn on_unassign_integer(&mut self, variable: DomainId, value: i32) {
        self.inner.on_unassign_integer(variable, value);
    }

    fn on_appearance_in_conflict_predicate(&mut self, predicate: Predicate) {
        self.inner.on_appearance_in_conflict_predicate(predicate);
    }

    fn on_restart(&mut self) {
        self.inner.on_restart();
    }

    fn synchronise(&mut self, context: &mut SelectionContext) {
        self.inner.synchronise(context);
    }

    fn is_restart_pointless(&mut self) -> bool {
        self.inner.is_restart_pointless()
    }

    fn subscribe_to_events(&self) -> Vec<BrancherEvent> {
        self.inner.subscribe_to_events()
    }
}
