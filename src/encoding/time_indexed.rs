//! Time-indexed encoding.
//!
//! One binary `x[t][s]` per task `t` and admissible start slot `s`:
//!
//! - `Σ_s x[t][s] = 1` for every task;
//! - `start(t) = Σ_s s·x[t][s]`, an expression, not a variable;
//! - for every machine and slot `τ`, the binaries whose interval
//!   `[s, s + dur)` covers `τ` sum to at most one.
//!
//! Admissible starts of a task run from its head (summed durations of its
//! job predecessors) to `horizon - tail` (tail = its own duration plus its
//! successors'). Every other start is infeasible anyway, so the window
//! drops those binaries without losing solutions. A job that does not fit
//! the horizon at all is reported as [`JsspError::HorizonTooShort`].
//!
//! Model size is `O(tasks · horizon)`: use it for small instances only.
//! The number of slot terms, `Σ_t window(t) · dur(t)`, is checked against
//! [`MAX_SLOT_TERMS`] before anything is emitted; larger models fail with
//! [`JsspError::ModelTooLarge`].
//!
//! # Reference
//! Bowman (1959), "The schedule-sequencing problem", Operations Research 7(5)

use log::debug;
use std::collections::BTreeMap;

use super::{Encoding, EncodingStrategy, StartExprs};
use crate::error::{JsspError, Result};
use crate::model::{ConstraintTag, LinearConstraint, LinearExpr, ModelSink, VarId};
use crate::models::{ProblemInstance, TaskRef};

/// Largest number of (binary, covered slot) terms a time-indexed model may
/// carry. Bounds both the binaries created and the memory of the
/// machine-slot rows.
pub const MAX_SLOT_TERMS: u64 = 5_000_000;

/// One binary per (task, start slot).
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeIndexedEncoding;

/// Admissible start slots `earliest..=latest` of a task.
fn start_window(instance: &ProblemInstance, horizon: i64, at: TaskRef) -> Result<(i64, i64)> {
    let earliest = instance.head(at);
    let latest = horizon.saturating_sub(instance.tail(at));
    if latest < earliest {
        return Err(JsspError::HorizonTooShort {
            job: at.job,
            required: instance.tail(TaskRef::new(at.job, 0)),
            horizon,
        });
    }
    Ok((earliest, latest))
}

/// Slot terms the model would carry, saturating at `u64::MAX`.
fn slot_terms(instance: &ProblemInstance, windows: &[(i64, i64)]) -> u64 {
    instance
        .tasks()
        .zip(windows)
        .fold(0u64, |acc, ((_, task), &(earliest, latest))| {
            let starts = (latest - earliest) as u64 + 1;
            acc.saturating_add(starts.saturating_mul(task.duration.max(0) as u64))
        })
}

impl EncodingStrategy for TimeIndexedEncoding {
    fn encoding(&self) -> Encoding {
        Encoding::TimeIndexed
    }

    fn encode(&self, instance: &ProblemInstance, sink: &mut dyn ModelSink) -> Result<StartExprs> {
        let horizon = instance.horizon()?;

        // Fail before emitting anything.
        let windows = instance
            .tasks()
            .map(|(at, _)| start_window(instance, horizon, at))
            .collect::<Result<Vec<_>>>()?;
        let terms = slot_terms(instance, &windows);
        if terms > MAX_SLOT_TERMS {
            return Err(JsspError::ModelTooLarge {
                terms,
                limit: MAX_SLOT_TERMS,
            });
        }

        // (machine, slot) -> (task, binary) pairs covering the slot
        let mut occupancy: BTreeMap<(i64, i64), Vec<(TaskRef, VarId)>> = BTreeMap::new();
        let mut starts: StartExprs = instance
            .jobs
            .iter()
            .map(|job| Vec::with_capacity(job.len()))
            .collect();

        for ((at, task), (earliest, latest)) in instance.tasks().zip(windows) {
            let mut once = LinearExpr::default();
            let mut start = LinearExpr::default();
            for s in earliest..=latest {
                let x = sink.new_binary(format!("x_{at}_t{s}"));
                once = once.with_term(x, 1);
                start = start.with_term(x, s);
                // s + dur <= horizon - tail + dur <= horizon
                for tau in s..s + task.duration {
                    occupancy.entry((task.machine, tau)).or_default().push((at, x));
                }
            }
            sink.add_linear(LinearConstraint::equal(once, 1, ConstraintTag::StartOnce(at)));
            starts[at.job].push(start);
        }

        let mut slot_constraints = 0usize;
        for ((machine, slot), covering) in occupancy {
            // Binaries of one task are already exclusive via StartOnce.
            let distinct_tasks = covering
                .first()
                .is_some_and(|(first, _)| covering.iter().any(|(t, _)| t != first));
            if !distinct_tasks {
                continue;
            }
            let load = covering
                .into_iter()
                .fold(LinearExpr::default(), |e, (_, x)| e.with_term(x, 1));
            sink.add_linear(LinearConstraint::less_eq(
                load,
                1,
                ConstraintTag::MachineSlot { machine, slot },
            ));
            slot_constraints += 1;
        }
        debug!(
            "time-indexed: {} tasks over horizon {horizon}, {terms} slot terms, \
             {slot_constraints} slot constraints",
            instance.num_tasks()
        );

        Ok(starts)
    }
}
