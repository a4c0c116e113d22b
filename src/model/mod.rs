//! Backend-agnostic constraint model.
//!
//! Encodings emit variables, constraints, and an objective through the
//! [`ModelSink`] interface; [`ConstraintModel`] records them so that any
//! solver adapter can translate the same model into its own engine's API.
//!
//! # Vocabulary
//!
//! | Primitive | Used by |
//! |-----------|---------|
//! | Integer / binary variable | all encodings |
//! | Linear constraint | all encodings |
//! | Interval + disjunctive | interval encoding |
//!
//! # Reference
//! Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

mod constraint_model;
mod expr;

pub use constraint_model::{
    ConstraintModel, ConstraintTag, Disjunctive, IntervalId, IntervalVar, LinearConstraint,
    ModelSink, ModelSize, Objective, ObjectiveSense, Sense, VarKind, Variable,
};
pub use expr::{LinearExpr, Values, VarId};
