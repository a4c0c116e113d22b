//! Interval encoding.
//!
//! Each task gets an integer start variable and a fixed-size interval over
//! it; every machine gets one disjunctive constraint over the intervals of
//! its tasks. Engines with a native no-overlap propagator consume the
//! disjunctive directly, MILP adapters lower it.
//!
//! # Reference
//! Baptiste, Le Pape & Nuijten (2001), "Constraint-Based Scheduling", Ch. 2

use std::collections::BTreeMap;

use super::{declare_start_vars, Encoding, EncodingStrategy, StartExprs};
use crate::error::Result;
use crate::model::{IntervalId, LinearExpr, ModelSink};
use crate::models::ProblemInstance;

/// Interval variables plus one disjunctive per machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalEncoding;

impl EncodingStrategy for IntervalEncoding {
    fn encoding(&self) -> Encoding {
        Encoding::Interval
    }

    fn encode(&self, instance: &ProblemInstance, sink: &mut dyn ModelSink) -> Result<StartExprs> {
        let start_vars = declare_start_vars(instance, sink)?;

        let mut per_machine: BTreeMap<i64, Vec<IntervalId>> = BTreeMap::new();
        for (at, task) in instance.tasks() {
            let interval = sink.new_interval(at, start_vars[at.job][at.position], task.duration);
            per_machine.entry(task.machine).or_default().push(interval);
        }

        // A machine with a single task needs no exclusivity constraint.
        for (machine, intervals) in per_machine {
            if intervals.len() > 1 {
                sink.add_disjunctive(machine, intervals);
            }
        }

        Ok(start_vars
            .into_iter()
            .map(|job| job.into_iter().map(LinearExpr::from).collect())
            .collect())
    }
}
