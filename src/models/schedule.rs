//! Schedule (solution) model.
//!
//! A schedule is the normalized per-machine timetable extracted from a
//! solver result. It is the only artifact kept once a solve attempt ends.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::ProblemInstance;

/// Minimum column width of the rendered timetable.
pub const MIN_COLUMN_WIDTH: usize = 15;

/// A task placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignedTask {
    /// Job index.
    pub job_id: usize,
    /// 1-based position of the task within its job.
    pub task_id: usize,
    /// Machine the task runs on.
    pub machine: i64,
    /// Start time.
    pub start: i64,
    /// Processing time.
    pub duration: i64,
}

impl AssignedTask {
    /// Creates an assigned task.
    pub fn new(job_id: usize, task_id: usize, machine: i64, start: i64, duration: i64) -> Self {
        Self {
            job_id,
            task_id,
            machine,
            start,
            duration,
        }
    }

    /// Completion time.
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }

    /// Column header, e.g. `job_0_task_1`.
    pub fn name(&self) -> String {
        format!("job_{}_task_{}", self.job_id, self.task_id)
    }

    /// Column body, e.g. `[0,3]`.
    pub fn span(&self) -> String {
        format!("[{},{}]", self.start, self.end())
    }

    /// Timeline order: start ascending, then shorter duration first.
    ///
    /// Job id and task id break the remaining ties so the order is total.
    pub fn timeline_cmp(&self, other: &Self) -> Ordering {
        (self.start, self.duration, self.job_id, self.task_id).cmp(&(
            other.start,
            other.duration,
            other.job_id,
            other.task_id,
        ))
    }

    /// Whether the half-open intervals `[start, end)` intersect.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// A feasibility problem found in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Human-readable description.
    pub message: String,
}

/// Classification of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Two tasks on one machine run at the same time.
    Overlap,
    /// A task starts before its job predecessor finished.
    PrecedenceViolation,
    /// A task of the instance has no assignment.
    MissingTask,
    /// Assignment disagrees with the instance on machine or duration.
    Mismatch,
    /// A task starts before time zero.
    NegativeStart,
}

impl Violation {
    fn new(violation_type: ViolationType, message: impl Into<String>) -> Self {
        Self {
            violation_type,
            message: message.into(),
        }
    }
}

/// Per-machine timetable.
///
/// Machines are kept in ascending id order; each machine's tasks are kept
/// in [`AssignedTask::timeline_cmp`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Assigned tasks by machine.
    pub machines: BTreeMap<i64, Vec<AssignedTask>>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups assignments by machine and sorts every machine's timeline.
    pub fn from_assignments(assignments: impl IntoIterator<Item = AssignedTask>) -> Self {
        let mut machines: BTreeMap<i64, Vec<AssignedTask>> = BTreeMap::new();
        for a in assignments {
            machines.entry(a.machine).or_default().push(a);
        }
        for tasks in machines.values_mut() {
            tasks.sort_by(AssignedTask::timeline_cmp);
        }
        Self { machines }
    }

    /// Timeline of one machine. Empty if the machine has no tasks.
    pub fn machine(&self, machine: i64) -> &[AssignedTask] {
        self.machines.get(&machine).map_or(&[], Vec::as_slice)
    }

    /// All assignments, machine by machine.
    pub fn assignments(&self) -> impl Iterator<Item = &AssignedTask> + '_ {
        self.machines.values().flatten()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.machines.values().map(Vec::len).sum()
    }

    /// Latest end time across all assignments.
    pub fn makespan(&self) -> i64 {
        self.assignments().map(AssignedTask::end).max().unwrap_or(0)
    }

    /// Finds the assignment of task `task_id` (1-based) of job `job_id`.
    pub fn assignment_for(&self, job_id: usize, task_id: usize) -> Option<&AssignedTask> {
        self.assignments()
            .find(|a| a.job_id == job_id && a.task_id == task_id)
    }

    /// Checks the schedule against the instance.
    ///
    /// Returns every violation found; an empty list means the schedule is
    /// feasible.
    pub fn verify(&self, instance: &ProblemInstance) -> Vec<Violation> {
        let mut violations = Vec::new();

        let by_task: HashMap<(usize, usize), &AssignedTask> = self
            .assignments()
            .map(|a| ((a.job_id, a.task_id), a))
            .collect();

        for (at, task) in instance.tasks() {
            match by_task.get(&(at.job, at.position + 1)) {
                None => violations.push(Violation::new(
                    ViolationType::MissingTask,
                    format!("job {} task {} is not scheduled", at.job, at.position + 1),
                )),
                Some(a) if a.machine != task.machine || a.duration != task.duration => {
                    violations.push(Violation::new(
                        ViolationType::Mismatch,
                        format!(
                            "{} placed on machine {} for {} units, expected {task}",
                            a.name(),
                            a.machine,
                            a.duration
                        ),
                    ))
                }
                Some(_) => {}
            }
        }

        for a in self.assignments().filter(|a| a.start < 0) {
            violations.push(Violation::new(
                ViolationType::NegativeStart,
                format!("{} starts at {}", a.name(), a.start),
            ));
        }

        for (j, job) in instance.jobs.iter().enumerate() {
            for (i, _, _) in job.consecutive_pairs() {
                let (Some(pred), Some(succ)) =
                    (by_task.get(&(j, i + 1)), by_task.get(&(j, i + 2)))
                else {
                    continue;
                };
                if succ.start < pred.end() {
                    violations.push(Violation::new(
                        ViolationType::PrecedenceViolation,
                        format!(
                            "{} starts at {} before {} ends at {}",
                            succ.name(),
                            succ.start,
                            pred.name(),
                            pred.end()
                        ),
                    ));
                }
            }
        }

        for (machine, tasks) in &self.machines {
            for (i, a) in tasks.iter().enumerate() {
                for b in &tasks[i + 1..] {
                    if a.overlaps(b) {
                        violations.push(Violation::new(
                            ViolationType::Overlap,
                            format!(
                                "machine {machine}: {} {} overlaps {} {}",
                                a.name(),
                                a.span(),
                                b.name(),
                                b.span()
                            ),
                        ));
                    }
                }
            }
        }

        violations
    }

    /// Renders the two-line-per-machine timetable.
    ///
    /// ```text
    /// Machine 0: job_0_task_1   job_1_task_1
    ///            [0,3]          [3,5]
    /// ```
    ///
    /// Each column is padded to at least [`MIN_COLUMN_WIDTH`] and both lines
    /// of a machine share the same column widths.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (machine, tasks) in &self.machines {
            let label = format!("Machine {machine}: ");
            let mut names = label.clone();
            let mut spans = " ".repeat(label.len());
            for task in tasks {
                let name = task.name();
                let span = task.span();
                let width = MIN_COLUMN_WIDTH.max(name.len().max(span.len()) + 1);
                names.push_str(&format!("{name:<width$}"));
                spans.push_str(&format!("{span:<width$}"));
            }
            out.push_str(&names);
            out.push('\n');
            out.push_str(&spans);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::three_job_instance;

    /// A known optimal schedule (makespan 11) of the three-job instance.
    fn optimal_schedule() -> Schedule {
        Schedule::from_assignments(vec![
            AssignedTask::new(0, 1, 0, 0, 3),
            AssignedTask::new(1, 1, 0, 3, 2),
            AssignedTask::new(2, 1, 1, 0, 4),
            AssignedTask::new(0, 2, 1, 4, 2),
            AssignedTask::new(1, 3, 1, 6, 4),
            AssignedTask::new(1, 2, 2, 5, 1),
            AssignedTask::new(2, 2, 2, 6, 3),
            AssignedTask::new(0, 3, 2, 9, 2),
        ])
    }

    #[test]
    fn test_makespan_and_counts() {
        let s = optimal_schedule();
        assert_eq!(s.makespan(), 11);
        assert_eq!(s.assignment_count(), 8);
        assert_eq!(s.machine(1).len(), 3);
        assert!(s.machine(7).is_empty());
        assert_eq!(s.assignment_for(1, 3).map(|a| a.start), Some(6));
        assert!(s.assignment_for(5, 1).is_none());
    }

    #[test]
    fn test_verify_feasible() {
        let s = optimal_schedule();
        assert!(s.verify(&three_job_instance()).is_empty());
    }

    #[test]
    fn test_verify_detects_overlap_and_precedence() {
        let mut s = optimal_schedule();
        // Pull job 1's first task onto [2,4]: overlaps job 0 on m0, and job 1
        // task 2 at 5 still respects it.
        for tasks in s.machines.values_mut() {
            for t in tasks.iter_mut() {
                if t.job_id == 1 && t.task_id == 1 {
                    t.start = 2;
                }
                if t.job_id == 0 && t.task_id == 2 {
                    t.start = 1;
                }
            }
        }
        let violations = s.verify(&three_job_instance());
        let kinds: Vec<_> = violations.iter().map(|v| v.violation_type).collect();
        assert!(kinds.contains(&ViolationType::Overlap));
        assert!(kinds.contains(&ViolationType::PrecedenceViolation));
    }

    #[test]
    fn test_verify_detects_missing_task() {
        let s = Schedule::from_assignments(vec![AssignedTask::new(0, 1, 0, 0, 3)]);
        let violations = s.verify(&three_job_instance());
        assert_eq!(
            violations
                .iter()
                .filter(|v| v.violation_type == ViolationType::MissingTask)
                .count(),
            7
        );
    }

    #[test]
    fn test_timeline_order_breaks_ties_by_duration() {
        let s = Schedule::from_assignments(vec![
            AssignedTask::new(0, 1, 0, 5, 4),
            AssignedTask::new(1, 1, 0, 5, 2),
            AssignedTask::new(2, 1, 0, 0, 9),
            AssignedTask::new(3, 1, 0, 5, 2),
        ]);
        let order: Vec<_> = s.machine(0).iter().map(|a| a.job_id).collect();
        assert_eq!(order, vec![2, 1, 3, 0]);

        for pair in s.machine(0).windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.start < b.start || (a.start == b.start && a.duration <= b.duration));
        }
    }

    #[test]
    fn test_render_aligns_columns() {
        let text = optimal_schedule().render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("Machine 0: job_0_task_1   job_1_task_1"));
        assert!(lines[1].starts_with("           [0,3]          [3,5]"));

        for pair in lines.chunks(2) {
            let header_cols: Vec<usize> = column_starts(pair[0]);
            let span_cols: Vec<usize> = column_starts(pair[1]);
            // skip the "Machine" and "0:" words of the label
            assert_eq!(header_cols[2..], span_cols[..]);
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let s = optimal_schedule();
        assert_eq!(s.render(), s.render());
    }

    fn column_starts(line: &str) -> Vec<usize> {
        let bytes = line.as_bytes();
        (0..bytes.len())
            .filter(|&i| bytes[i] != b' ' && (i == 0 || bytes[i - 1] == b' '))
            .collect()
    }
}
