//! Model builder.
//!
//! Turns a [`ProblemInstance`] and an [`Encoding`] into a complete
//! [`ConstraintModel`]: the encoding declares start times and machine
//! exclusivity, the builder adds job precedence, the makespan variable,
//! and the objective.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Ku & Beck (2016), "Mixed Integer Programming models for job shop
//!   scheduling: A computational analysis"

use log::debug;

use crate::encoding::{Encoding, StartExprs};
use crate::error::{JsspError, Result};
use crate::model::{
    ConstraintModel, ConstraintTag, LinearConstraint, LinearExpr, ModelSink, Objective, VarId,
    VarKind,
};
use crate::models::{ProblemInstance, TaskRef};
use crate::validation::{describe, validate_instance};

/// Where each task's start time and the makespan live in a built model.
///
/// Handed to the solution extractor together with the solver result.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLayout {
    starts: StartExprs,
    makespan: VarId,
}

impl TaskLayout {
    /// Start-time expression of a task.
    ///
    /// # Panics
    /// Panics if the reference does not belong to the built instance.
    pub fn start(&self, at: TaskRef) -> &LinearExpr {
        &self.starts[at.job][at.position]
    }

    /// Start expressions indexed `[job][position]`.
    pub fn starts(&self) -> &StartExprs {
        &self.starts
    }

    /// The makespan variable.
    pub fn makespan(&self) -> VarId {
        self.makespan
    }
}

/// A built model plus its task layout.
#[derive(Debug, Clone)]
pub struct BuiltModel {
    /// The constraint model to hand to a solver adapter.
    pub model: ConstraintModel,
    /// Task start expressions and the makespan variable.
    pub layout: TaskLayout,
}

/// Builds job-shop models.
///
/// # Example
/// ```no_run
/// use u_jobshop::builder::ModelBuilder;
/// use u_jobshop::encoding::Encoding;
/// use u_jobshop::models::ProblemInstance;
///
/// let instance = ProblemInstance::from_triples(vec![
///     vec![(0, 3, 1), (1, 2, 2)],
///     vec![(1, 4, 1), (0, 1, 2)],
/// ]);
/// let built = ModelBuilder::new(&instance, Encoding::BigMDisjunctive)
///     .build()
///     .unwrap();
/// println!("{}", built.model.size());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModelBuilder<'a> {
    instance: &'a ProblemInstance,
    encoding: Encoding,
}

impl<'a> ModelBuilder<'a> {
    /// Creates a builder for one (instance, encoding) combination.
    pub fn new(instance: &'a ProblemInstance, encoding: Encoding) -> Self {
        Self { instance, encoding }
    }

    /// The encoding this builder uses.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Builds the model.
    ///
    /// Creates:
    /// - start representation and machine exclusivity, per the encoding
    /// - `start(t[i+1]) - start(t[i]) >= dur(t[i])` within every job
    /// - an integer `makespan` in `[0, horizon]` with
    ///   `makespan - start(t) >= dur(t)` for every task
    /// - the objective `minimize makespan`
    ///
    /// # Errors
    /// - [`JsspError::InvalidInstance`] if validation fails
    /// - [`JsspError::UnboundedHorizon`] if the horizon is not positive
    /// - [`JsspError::HorizonTooShort`] and [`JsspError::ModelTooLarge`] from
    ///   the time-indexed encoding
    pub fn build(&self) -> Result<BuiltModel> {
        let instance = self.instance;
        validate_instance(instance).map_err(|errors| JsspError::InvalidInstance(describe(&errors)))?;

        let horizon = instance.horizon()?;
        if horizon <= 0 {
            return Err(JsspError::UnboundedHorizon { horizon });
        }

        let mut model = ConstraintModel::new(format!("jobshop_{}", self.encoding), horizon);
        let starts = self.encoding.strategy().encode(instance, &mut model)?;

        // Intra-job precedence: task[i] before task[i+1]
        for (j, job) in instance.jobs.iter().enumerate() {
            for (i, before, _) in job.consecutive_pairs() {
                model.add_linear(LinearConstraint::greater_eq(
                    starts[j][i + 1].clone() - starts[j][i].clone(),
                    before.duration,
                    ConstraintTag::Precedence {
                        job: j,
                        position: i,
                    },
                ));
            }
        }

        // Makespan bounds every completion time
        let makespan = model.new_variable("makespan".to_string(), VarKind::Integer, 0, horizon);
        for (at, task) in instance.tasks() {
            model.add_linear(LinearConstraint::greater_eq(
                LinearExpr::from(makespan) - starts[at.job][at.position].clone(),
                task.duration,
                ConstraintTag::Makespan(at),
            ));
        }
        model.set_objective(Objective::minimize(makespan));

        debug!("built {}: {}", model.name(), model.size());

        Ok(BuiltModel {
            model,
            layout: TaskLayout { starts, makespan },
        })
    }
}
