//! Big-M disjunctive encoding.
//!
//! For every unordered pair `(a, b)` of tasks on one machine a binary
//! `y = 1` means "a precedes b". The pair is then ordered by
//!
//! ```text
//! start(a) + dur(a) - M·(1 - y) <= start(b)
//! start(b) + dur(b) - M·y       <= start(a)
//! ```
//!
//! With `M` equal to the horizon exactly one of the two inequalities is
//! binding for either value of `y`. A tighter `M` would strengthen the LP
//! relaxation but is not needed for correctness.
//!
//! # Reference
//! Manne (1960), "On the Job-Shop Scheduling Problem", Operations Research 8(2)

use log::trace;

use super::{declare_start_vars, Encoding, EncodingStrategy, StartExprs};
use crate::error::Result;
use crate::model::{ConstraintTag, LinearConstraint, LinearExpr, ModelSink};
use crate::models::ProblemInstance;

/// Pairwise `precedes` binaries with big-M inequalities.
#[derive(Debug, Clone, Copy, Default)]
pub struct BigMEncoding;

impl EncodingStrategy for BigMEncoding {
    fn encoding(&self) -> Encoding {
        Encoding::BigMDisjunctive
    }

    fn encode(&self, instance: &ProblemInstance, sink: &mut dyn ModelSink) -> Result<StartExprs> {
        let start_vars = declare_start_vars(instance, sink)?;
        let big_m = instance.horizon()?;

        for (machine, a, b) in instance.machine_pairs() {
            let sa = start_vars[a.job][a.position];
            let sb = start_vars[b.job][b.position];
            let precedes = sink.new_binary(format!("{a}_precedes_{b}"));
            let tag = ConstraintTag::NonOverlap {
                machine,
                first: a,
                second: b,
            };

            // sa - sb + M·y <= M - dur(a)
            sink.add_linear(LinearConstraint::less_eq(
                LinearExpr::from(sa) - LinearExpr::from(sb) + LinearExpr::term(precedes, big_m),
                big_m - instance.task(a).duration,
                tag,
            ));
            // sb - sa - M·y <= -dur(b)
            sink.add_linear(LinearConstraint::less_eq(
                LinearExpr::from(sb) - LinearExpr::from(sa) - LinearExpr::term(precedes, big_m),
                -instance.task(b).duration,
                tag,
            ));
            trace!("machine {machine}: ordered {a} / {b}");
        }

        Ok(start_vars
            .into_iter()
            .map(|job| job.into_iter().map(LinearExpr::from).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintModel, Values, VarKind};
    use crate::models::TaskRef;
    use crate::test_support::{three_job_instance, two_by_two_instance};

    #[test]
    fn test_one_binary_per_machine_pair() {
        let instance = three_job_instance();
        let mut model = ConstraintModel::new("big-m", instance.horizon().unwrap());
        BigMEncoding.encode(&instance, &mut model).unwrap();

        let size = model.size();
        assert_eq!(size.binaries, instance.machine_pairs().len());
        assert_eq!(size.variables, 8 + 7);
        assert_eq!(size.linear, 2 * 7);
        assert_eq!(size.intervals, 0);
        assert_eq!(size.disjunctive, 0);

        for (machine, a, b) in instance.machine_pairs() {
            let tagged = model
                .constraints_where(|t| {
                    *t == ConstraintTag::NonOverlap {
                        machine,
                        first: a,
                        second: b,
                    }
                })
                .count();
            assert_eq!(tagged, 2);
        }
    }

    #[test]
    fn test_binary_names() {
        let instance = two_by_two_instance();
        let mut model = ConstraintModel::new("big-m", instance.horizon().unwrap());
        BigMEncoding.encode(&instance, &mut model).unwrap();

        let names: Vec<&str> = model
            .variables()
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["0_0_precedes_1_1", "0_1_precedes_1_0"]);
    }

    #[test]
    fn test_either_order_is_feasible_overlap_is_not() {
        let instance = two_by_two_instance();
        let mut model = ConstraintModel::new("big-m", instance.horizon().unwrap());
        let starts = BigMEncoding.encode(&instance, &mut model).unwrap();

        let var = |at: TaskRef| starts[at.job][at.position].terms()[0].0;
        let binary = |name: &str| {
            model
                .variables()
                .iter()
                .position(|v| v.name == name)
                .map(crate::model::VarId::new)
                .unwrap()
        };
        let y0 = binary("0_0_precedes_1_1");
        let y1 = binary("0_1_precedes_1_0");
        let assign = |s00: f64, s01: f64, s10: f64, s11: f64, b0: f64, b1: f64| -> Values {
            [
                (var(TaskRef::new(0, 0)), s00),
                (var(TaskRef::new(0, 1)), s01),
                (var(TaskRef::new(1, 0)), s10),
                (var(TaskRef::new(1, 1)), s11),
                (y0, b0),
                (y1, b1),
            ]
            .into_iter()
            .collect()
        };

        // m0: job0 task0 [0,2) before job1 task1 [2,5); m1: job1 task0 [0,2) before job0 task1 [2,3)
        let ordered = assign(0.0, 2.0, 0.0, 2.0, 1.0, 0.0);
        assert!(model.violations(&ordered).unwrap().is_empty());

        // Same starts but the m0 binary claims the reverse order.
        let wrong_binary = assign(0.0, 2.0, 0.0, 2.0, 0.0, 0.0);
        assert!(!model.violations(&wrong_binary).unwrap().is_empty());

        // Overlap on m0 is infeasible for both binary values.
        for b in [0.0, 1.0] {
            let overlap = assign(0.0, 2.0, 0.0, 1.0, b, 0.0);
            assert!(!model.violations(&overlap).unwrap().is_empty());
        }
    }
}
