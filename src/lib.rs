//! Job-shop scheduling formulations for the U-Engine ecosystem.
//!
//! Builds one job-shop instance into constraint models under several
//! encodings, solves every (encoding, backend) pair concurrently, and
//! reports a normalized per-machine schedule for each pair.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `Job`, `ProblemInstance`, `Schedule`
//! - **`validation`**: Input integrity checks (empty jobs, durations, machine ids)
//! - **`model`**: Backend-agnostic constraint model and the `ModelSink` interface
//! - **`encoding`**: Interval, big-M disjunctive, and time-indexed encodings
//! - **`builder`**: `ModelBuilder`, adding precedence, makespan, and objective
//! - **`solver`**: `SolverAdapter` trait, the `good_lp` MILP adapter, and the Pumpkin CP adapter
//! - **`extract`**: Solver values back to a `Schedule`
//! - **`report`**: Per-pair text blocks and summaries
//! - **`orchestrator`**: Concurrent, failure-isolated pair execution
//!
//! # Pipeline
//!
//! ```text
//! ProblemInstance ─▶ ModelBuilder(encoding) ─▶ ConstraintModel
//!        │                                         │
//!        │                                  SolverAdapter::solve
//!        ▼                                         ▼
//!   Schedule ◀──── SolutionExtractor ◀──── SolveResult
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Ku & Beck (2016), "Mixed Integer Programming models for job shop scheduling"
//! - Manne (1960), "On the Job-Shop Scheduling Problem"

pub mod builder;
pub mod encoding;
pub mod error;
pub mod extract;
pub mod model;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod solver;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use builder::{BuiltModel, ModelBuilder, TaskLayout};
pub use encoding::Encoding;
pub use error::{JsspError, Result};
pub use extract::SolutionExtractor;
pub use models::{ProblemInstance, Schedule};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, SolvePair};
pub use report::PairReport;
pub use solver::{CpAdapter, MilpAdapter, SolveResult, SolveStatus, SolverAdapter};
