//! Backend-agnostic constraint model and the emission interface encodings
//! write into.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::expr::{LinearExpr, Values, VarId};
use crate::models::TaskRef;

/// Domain type of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    /// Integer in `[lower, upper]`.
    Integer,
    /// 0/1 variable.
    Binary,
    /// Real in `[lower, upper]`.
    Continuous,
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Unique, human-readable name.
    pub name: String,
    /// Domain type.
    pub kind: VarKind,
    /// Lower bound.
    pub lower: i64,
    /// Upper bound.
    pub upper: i64,
}

/// Comparison of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    /// `expr <= rhs`
    LessEq,
    /// `expr >= rhs`
    GreaterEq,
    /// `expr == rhs`
    Equal,
}

/// Which constraint family a linear constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintTag {
    /// Task `position + 1` of `job` starts after task `position` ends.
    Precedence { job: usize, position: usize },
    /// One of the two big-M inequalities ordering `first` and `second`.
    NonOverlap {
        machine: i64,
        first: TaskRef,
        second: TaskRef,
    },
    /// At most one task occupies `machine` during `slot`.
    MachineSlot { machine: i64, slot: i64 },
    /// A time-indexed task starts in exactly one slot.
    StartOnce(TaskRef),
    /// The makespan variable bounds the task's completion.
    Makespan(TaskRef),
}

impl fmt::Display for ConstraintTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precedence { job, position } => {
                write!(f, "precedence_{job}_{position}")
            }
            Self::NonOverlap {
                machine,
                first,
                second,
            } => write!(f, "non_overlap_m{machine}_{first}_{second}"),
            Self::MachineSlot { machine, slot } => write!(f, "slot_m{machine}_t{slot}"),
            Self::StartOnce(task) => write!(f, "start_once_{task}"),
            Self::Makespan(task) => write!(f, "makespan_{task}"),
        }
    }
}

/// `expr (sense) rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    /// Left-hand side.
    pub expr: LinearExpr,
    /// Comparison.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: i64,
    /// Constraint family.
    pub tag: ConstraintTag,
}

impl LinearConstraint {
    /// Creates a constraint. A constant part of `expr` is moved to `rhs`.
    pub fn new(expr: LinearExpr, sense: Sense, rhs: i64, tag: ConstraintTag) -> Self {
        let offset = expr.offset();
        Self {
            expr: expr.with_constant(-offset),
            sense,
            rhs: rhs - offset,
            tag,
        }
    }

    /// `expr <= rhs`
    pub fn less_eq(expr: LinearExpr, rhs: i64, tag: ConstraintTag) -> Self {
        Self::new(expr, Sense::LessEq, rhs, tag)
    }

    /// `expr >= rhs`
    pub fn greater_eq(expr: LinearExpr, rhs: i64, tag: ConstraintTag) -> Self {
        Self::new(expr, Sense::GreaterEq, rhs, tag)
    }

    /// `expr == rhs`
    pub fn equal(expr: LinearExpr, rhs: i64, tag: ConstraintTag) -> Self {
        Self::new(expr, Sense::Equal, rhs, tag)
    }

    /// Whether `values` satisfy the constraint, within `1e-6`.
    pub fn is_satisfied(&self, values: &Values) -> Result<bool, VarId> {
        const EPS: f64 = 1e-6;
        let lhs = self.expr.evaluate(values)?;
        let rhs = self.rhs as f64;
        Ok(match self.sense {
            Sense::LessEq => lhs <= rhs + EPS,
            Sense::GreaterEq => lhs >= rhs - EPS,
            Sense::Equal => (lhs - rhs).abs() <= EPS,
        })
    }
}

/// Handle to an interval variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalId(usize);

impl IntervalId {
    /// Position of the interval in the model's interval list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A fixed-size interval `[start, start + duration)` for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalVar {
    /// Task the interval represents.
    pub task: TaskRef,
    /// Start variable.
    pub start: VarId,
    /// Fixed length.
    pub duration: i64,
}

/// No two member intervals may overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disjunctive {
    /// Machine the intervals share.
    pub machine: i64,
    /// Member intervals.
    pub intervals: Vec<IntervalId>,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveSense {
    /// Minimize the expression.
    Minimize,
    /// Maximize the expression.
    Maximize,
}

/// Objective function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Objective {
    /// Direction.
    pub sense: ObjectiveSense,
    /// Expression to optimize.
    pub expr: LinearExpr,
}

impl Objective {
    /// Minimize `expr`.
    pub fn minimize(expr: impl Into<LinearExpr>) -> Self {
        Self {
            sense: ObjectiveSense::Minimize,
            expr: expr.into(),
        }
    }
}

/// The constraint-emission capability encodings are written against.
///
/// [`ConstraintModel`] records everything emitted; solver adapters then map
/// the recorded model onto their engine's native API.
pub trait ModelSink {
    /// Declares a decision variable.
    fn new_variable(&mut self, name: String, kind: VarKind, lower: i64, upper: i64) -> VarId;

    /// Declares a fixed-size interval over an existing start variable.
    fn new_interval(&mut self, task: TaskRef, start: VarId, duration: i64) -> IntervalId;

    /// Adds a linear constraint.
    fn add_linear(&mut self, constraint: LinearConstraint);

    /// Requires the given intervals to be pairwise disjoint.
    fn add_disjunctive(&mut self, machine: i64, intervals: Vec<IntervalId>);

    /// Sets (or replaces) the objective.
    fn set_objective(&mut self, objective: Objective);

    /// Declares a 0/1 variable.
    fn new_binary(&mut self, name: String) -> VarId {
        self.new_variable(name, VarKind::Binary, 0, 1)
    }
}

/// Size summary of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSize {
    /// All decision variables.
    pub variables: usize,
    /// Binary variables among them.
    pub binaries: usize,
    /// Linear constraints.
    pub linear: usize,
    /// Interval variables.
    pub intervals: usize,
    /// Disjunctive constraints.
    pub disjunctive: usize,
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} variables ({} binary), {} linear, {} intervals, {} disjunctive",
            self.variables, self.binaries, self.linear, self.intervals, self.disjunctive
        )
    }
}

/// A complete, backend-agnostic constraint model.
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    name: String,
    horizon: i64,
    variables: Vec<Variable>,
    intervals: Vec<IntervalVar>,
    linear: Vec<LinearConstraint>,
    disjunctive: Vec<Disjunctive>,
    objective: Option<Objective>,
}

impl ConstraintModel {
    /// Creates an empty model over `[0, horizon]`.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            variables: Vec::new(),
            intervals: Vec::new(),
            linear: Vec::new(),
            disjunctive: Vec::new(),
            objective: None,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time horizon. Also the big-M constant for linearized disjunctions.
    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    /// All variables, indexed by [`VarId::index`].
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variable by handle.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    /// All intervals, indexed by [`IntervalId::index`].
    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    /// Interval by handle.
    pub fn interval(&self, id: IntervalId) -> &IntervalVar {
        &self.intervals[id.index()]
    }

    /// All linear constraints.
    pub fn linear_constraints(&self) -> &[LinearConstraint] {
        &self.linear
    }

    /// All disjunctive constraints.
    pub fn disjunctive_constraints(&self) -> &[Disjunctive] {
        &self.disjunctive
    }

    /// The objective, if set.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Linear constraints whose tag matches `predicate`.
    pub fn constraints_where<'a>(
        &'a self,
        predicate: impl Fn(&ConstraintTag) -> bool + 'a,
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.linear.iter().filter(move |c| predicate(&c.tag))
    }

    /// Size summary.
    pub fn size(&self) -> ModelSize {
        ModelSize {
            variables: self.variables.len(),
            binaries: self
                .variables
                .iter()
                .filter(|v| v.kind == VarKind::Binary)
                .count(),
            linear: self.linear.len(),
            intervals: self.intervals.len(),
            disjunctive: self.disjunctive.len(),
        }
    }

    /// Linear constraints violated by `values`, plus overlapping members of
    /// disjunctive constraints.
    ///
    /// A variable without a value is reported as the error.
    pub fn violations(&self, values: &Values) -> Result<Vec<String>, VarId> {
        let mut violated = Vec::new();
        for c in &self.linear {
            if !c.is_satisfied(values)? {
                violated.push(c.tag.to_string());
            }
        }
        for d in &self.disjunctive {
            for (i, &a) in d.intervals.iter().enumerate() {
                for &b in &d.intervals[i + 1..] {
                    let (a, b) = (self.interval(a), self.interval(b));
                    let sa = LinearExpr::from(a.start).evaluate(values)?;
                    let sb = LinearExpr::from(b.start).evaluate(values)?;
                    let disjoint = sa + a.duration as f64 <= sb + 1e-6
                        || sb + b.duration as f64 <= sa + 1e-6;
                    if !disjoint {
                        violated.push(format!("disjunctive_m{}_{}_{}", d.machine, a.task, b.task));
                    }
                }
            }
        }
        Ok(violated)
    }
}

impl ModelSink for ConstraintModel {
    fn new_variable(&mut self, name: String, kind: VarKind, lower: i64, upper: i64) -> VarId {
        let id = VarId::new(self.variables.len());
        self.variables.push(Variable {
            name,
            kind,
            lower,
            upper,
        });
        id
    }

    fn new_interval(&mut self, task: TaskRef, start: VarId, duration: i64) -> IntervalId {
        let id = IntervalId(self.intervals.len());
        self.intervals.push(IntervalVar {
            task,
            start,
            duration,
        });
        id
    }

    fn add_linear(&mut self, constraint: LinearConstraint) {
        self.linear.push(constraint);
    }

    fn add_disjunctive(&mut self, machine: i64, intervals: Vec<IntervalId>) {
        self.disjunctive.push(Disjunctive { machine, intervals });
    }

    fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> (ConstraintModel, VarId, VarId) {
        let mut model = ConstraintModel::new("tiny", 10);
        let a = model.new_variable("a".into(), VarKind::Integer, 0, 10);
        let b = model.new_variable("b".into(), VarKind::Integer, 0, 10);
        model.add_linear(LinearConstraint::greater_eq(
            LinearExpr::from(b) - LinearExpr::from(a),
            3,
            ConstraintTag::Precedence {
                job: 0,
                position: 0,
            },
        ));
        let ia = model.new_interval(TaskRef::new(0, 0), a, 3);
        let ib = model.new_interval(TaskRef::new(1, 0), b, 2);
        model.add_disjunctive(0, vec![ia, ib]);
        model.set_objective(Objective::minimize(b));
        (model, a, b)
    }

    #[test]
    fn test_emission_and_size() {
        let (mut model, _, _) = tiny_model();
        let flag = model.new_binary("flag".into());
        assert_eq!(model.variable(flag).kind, VarKind::Binary);

        let size = model.size();
        assert_eq!(size.variables, 3);
        assert_eq!(size.binaries, 1);
        assert_eq!(size.linear, 1);
        assert_eq!(size.intervals, 2);
        assert_eq!(size.disjunctive, 1);
        assert_eq!(model.horizon(), 10);
        assert!(model.objective().is_some());
    }

    #[test]
    fn test_constant_moves_to_rhs() {
        let mut model = ConstraintModel::new("m", 5);
        let x = model.new_variable("x".into(), VarKind::Integer, 0, 5);
        let c = LinearConstraint::less_eq(
            LinearExpr::from(x) + 2,
            4,
            ConstraintTag::Makespan(TaskRef::new(0, 0)),
        );
        assert_eq!(c.expr.offset(), 0);
        assert_eq!(c.rhs, 2);
    }

    #[test]
    fn test_violations() {
        let (model, a, b) = tiny_model();

        let ok: Values = [(a, 0.0), (b, 3.0)].into_iter().collect();
        assert_eq!(model.violations(&ok), Ok(vec![]));

        let bad: Values = [(a, 0.0), (b, 1.0)].into_iter().collect();
        let violated = model.violations(&bad).unwrap();
        assert!(violated.contains(&"precedence_0_0".to_string()));
        assert!(violated.iter().any(|v| v.starts_with("disjunctive_m0")));

        let missing: Values = [(a, 0.0)].into_iter().collect();
        assert_eq!(model.violations(&missing), Err(b));
    }

    #[test]
    fn test_constraints_where() {
        let (model, _, _) = tiny_model();
        assert_eq!(
            model
                .constraints_where(|t| matches!(t, ConstraintTag::Precedence { .. }))
                .count(),
            1
        );
        assert_eq!(
            model
                .constraints_where(|t| matches!(t, ConstraintTag::Makespan(_)))
                .count(),
            0
        );
    }

    #[test]
    fn test_tag_names() {
        let tag = ConstraintTag::NonOverlap {
            machine: 2,
            first: TaskRef::new(0, 1),
            second: TaskRef::new(1, 0),
        };
        assert_eq!(tag.to_string(), "non_overlap_m2_0_1_1_0");
        assert_eq!(
            ConstraintTag::MachineSlot { machine: 0, slot: 4 }.to_string(),
            "slot_m0_t4"
        );
    }
}
