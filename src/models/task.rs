//! Task and job model.
//!
//! A job is an ordered chain of tasks; each task runs on exactly one
//! machine for a fixed duration. Task `i + 1` of a job may not start
//! before task `i` finishes.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2.2 (Job Shops)

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single machine-bound operation of a job.
///
/// Fields are signed so that malformed input survives deserialization and
/// is rejected by [`crate::validation`] with a precise message instead of a
/// parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    /// Machine the task must run on.
    pub machine: i64,
    /// Processing time in time units. Must be positive.
    pub duration: i64,
    /// Identifier unique within the job. Used for naming only, never for ordering.
    pub task_id: i64,
}

impl Task {
    /// Creates a new task.
    pub fn new(machine: i64, duration: i64, task_id: i64) -> Self {
        Self {
            machine,
            duration,
            task_id,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Machine_{}_Duration_{}_TaskId_{}",
            self.machine, self.duration, self.task_id
        )
    }
}

/// An ordered sequence of tasks forming a precedence chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Job {
    /// Tasks in execution order.
    pub tasks: Vec<Task>,
}

impl Job {
    /// Creates a job from its tasks in execution order.
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Appends a task to the end of the chain.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the job has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Sum of all task durations, `None` if it overflows `i64`.
    pub fn total_duration(&self) -> Option<i64> {
        self.tasks
            .iter()
            .try_fold(0i64, |acc, t| acc.checked_add(t.duration))
    }

    /// Consecutive `(position, predecessor, successor)` triples.
    pub fn consecutive_pairs(&self) -> impl Iterator<Item = (usize, &Task, &Task)> + '_ {
        self.tasks
            .windows(2)
            .enumerate()
            .map(|(i, pair)| (i, &pair[0], &pair[1]))
    }
}

impl From<Vec<Task>> for Job {
    fn from(tasks: Vec<Task>) -> Self {
        Self::new(tasks)
    }
}

/// Position of a task inside a problem instance.
///
/// `position` is the 0-based index within the job; reports use the
/// 1-based form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskRef {
    /// Job index.
    pub job: usize,
    /// 0-based index within the job.
    pub position: usize,
}

impl TaskRef {
    /// Creates a task reference.
    pub fn new(job: usize, position: usize) -> Self {
        Self { job, position }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.job, self.position)
    }
}
