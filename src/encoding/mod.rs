//! Encoding strategies.
//!
//! An encoding decides how task start times are represented and how
//! machine exclusivity is expressed. The model builder adds the
//! precedence and makespan families on top of whatever start expressions
//! the encoding returns, so every encoding realizes all three families.
//!
//! # Trade-offs
//!
//! | Encoding | Variables | Machine exclusivity | Needs |
//! |----------|-----------|---------------------|-------|
//! | Interval | one start per task | one disjunctive per machine | native no-overlap (or adapter lowering) |
//! | Big-M | start per task + `O(k²)` binaries per machine | two big-M inequalities per pair | any MILP engine |
//! | Time-indexed | one binary per (task, start slot) | one sum ≤ 1 per (machine, slot) | small horizons |
//!
//! The time-indexed model is pseudo-polynomial in the horizon and is meant
//! for small instances and cross-checking. Interval and big-M scale better.
//!
//! # Reference
//! Ku & Beck (2016), "Mixed Integer Programming models for job shop
//! scheduling: A computational analysis"

mod big_m;
mod interval;
mod time_indexed;

pub use big_m::BigMEncoding;
pub use interval::IntervalEncoding;
pub use time_indexed::TimeIndexedEncoding;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::model::{LinearExpr, ModelSink, VarId, VarKind};
use crate::models::{ProblemInstance, TaskRef};

/// Start-time expression of every task, indexed `[job][position]`.
pub type StartExprs = Vec<Vec<LinearExpr>>;

/// A pluggable variable/constraint encoding.
pub trait EncodingStrategy: Sync {
    /// Which encoding this is.
    fn encoding(&self) -> Encoding;

    /// Declares the decision variables and the machine non-overlap family.
    ///
    /// Returns each task's start time as a linear expression over the
    /// declared variables.
    fn encode(&self, instance: &ProblemInstance, sink: &mut dyn ModelSink) -> Result<StartExprs>;
}

/// The available encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// Interval variables with one disjunctive constraint per machine.
    Interval,
    /// Pairwise `precedes` binaries with big-M inequalities.
    BigMDisjunctive,
    /// One binary per (task, start slot).
    TimeIndexed,
}

static INTERVAL: IntervalEncoding = IntervalEncoding;
static BIG_M: BigMEncoding = BigMEncoding;
static TIME_INDEXED: TimeIndexedEncoding = TimeIndexedEncoding;

impl Encoding {
    /// All encodings.
    pub const ALL: [Encoding; 3] = [
        Encoding::Interval,
        Encoding::BigMDisjunctive,
        Encoding::TimeIndexed,
    ];

    /// The strategy implementing this encoding.
    pub fn strategy(self) -> &'static dyn EncodingStrategy {
        match self {
            Encoding::Interval => &INTERVAL,
            Encoding::BigMDisjunctive => &BIG_M,
            Encoding::TimeIndexed => &TIME_INDEXED,
        }
    }

    /// Short name used in reports and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Interval => "interval",
            Encoding::BigMDisjunctive => "big-m",
            Encoding::TimeIndexed => "time-indexed",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Encoding::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown encoding '{s}'"))
    }
}

/// Declares one integer start variable in `[0, horizon]` per task.
pub(crate) fn declare_start_vars(
    instance: &ProblemInstance,
    sink: &mut dyn ModelSink,
) -> Result<Vec<Vec<VarId>>> {
    let horizon = instance.horizon()?;
    Ok(instance
        .jobs
        .iter()
        .enumerate()
        .map(|(j, job)| {
            (0..job.len())
                .map(|p| {
                    sink.new_variable(
                        format!("start_{}", TaskRef::new(j, p)),
                        VarKind::Integer,
                        0,
                        horizon,
                    )
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for encoding in Encoding::ALL {
            assert_eq!(encoding.name().parse::<Encoding>(), Ok(encoding));
            assert_eq!(encoding.strategy().encoding(), encoding);
        }
        assert_eq!("BIG-M".parse::<Encoding>(), Ok(Encoding::BigMDisjunctive));
        assert!("simplex".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Encoding::BigMDisjunctive).unwrap();
        assert_eq!(json, "\"big-m-disjunctive\"");
        let back: Encoding = serde_json::from_str("\"time-indexed\"").unwrap();
        assert_eq!(back, Encoding::TimeIndexed);
    }
}
