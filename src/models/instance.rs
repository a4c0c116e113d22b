//! Problem instance: jobs plus derived horizon and machine set.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::{Job, Task, TaskRef};
use crate::error::{JsspError, Result};

/// A job-shop problem instance.
///
/// Immutable once built; shared read-only by every concurrently running
/// (encoding, backend) pair.
///
/// # Horizon
/// By default the horizon is the sum of all task durations: a safe,
/// non-tight upper bound on the makespan. [`ProblemInstance::with_horizon`]
/// overrides it, which mainly matters for the time-indexed encoding whose
/// size grows with the horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemInstance {
    /// Jobs in input order. The index is the job id.
    pub jobs: Vec<Job>,
    /// Explicit horizon. `None` = derived from durations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon: Option<i64>,
}

impl ProblemInstance {
    /// Creates an instance from its jobs. No validation happens here;
    /// the model builder rejects malformed instances.
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            horizon: None,
        }
    }

    /// Creates an instance from `(machine, duration, task_id)` triples.
    pub fn from_triples(jobs: Vec<Vec<(i64, i64, i64)>>) -> Self {
        Self::new(
            jobs.into_iter()
                .map(|job| {
                    Job::new(
                        job.into_iter()
                            .map(|(m, d, id)| Task::new(m, d, id))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Overrides the derived horizon.
    pub fn with_horizon(mut self, horizon: i64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Parses an instance from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads and parses a JSON instance file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Generates a random instance where every job visits every machine
    /// exactly once, in shuffled order, with durations in `1..=max_duration`.
    ///
    /// Task ids are 1-based positions, matching hand-written instances.
    pub fn random<R: Rng + ?Sized>(
        num_jobs: usize,
        num_machines: usize,
        max_duration: i64,
        rng: &mut R,
    ) -> Self {
        let max_duration = max_duration.max(1);
        let jobs = (0..num_jobs)
            .map(|_| {
                let mut route: Vec<i64> = (0..num_machines as i64).collect();
                route.shuffle(rng);
                Job::new(
                    route
                        .into_iter()
                        .enumerate()
                        .map(|(i, machine)| {
                            Task::new(machine, rng.random_range(1..=max_duration), i as i64 + 1)
                        })
                        .collect(),
                )
            })
            .collect();
        Self::new(jobs)
    }

    /// Number of jobs.
    pub fn num_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Total number of tasks across all jobs.
    pub fn num_tasks(&self) -> usize {
        self.jobs.iter().map(Job::len).sum()
    }

    /// Whether the instance has no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// The three-job, three-machine instance solved when no input is given.
    /// Its optimal makespan is 11.
    pub fn three_job_example() -> Self {
        Self::from_triples(vec![
            vec![(0, 3, 1), (1, 2, 2), (2, 2, 3)],
            vec![(0, 2, 1), (2, 1, 2), (1, 4, 3)],
            vec![(1, 4, 1), (2, 3, 2)],
        ])
    }

    /// Sum of all task durations, `None` if it overflows `i64`.
    pub fn derived_horizon(&self) -> Option<i64> {
        self.jobs
            .iter()
            .try_fold(0i64, |acc, job| acc.checked_add(job.total_duration()?))
    }

    /// Effective horizon: the override if set, otherwise the derived one.
    ///
    /// # Errors
    /// [`JsspError::InvalidInstance`] if no override is set and the summed
    /// durations overflow `i64`.
    pub fn horizon(&self) -> Result<i64> {
        match self.horizon {
            Some(horizon) => Ok(horizon),
            None => self.derived_horizon().ok_or_else(|| {
                JsspError::InvalidInstance("summed task durations overflow the horizon".into())
            }),
        }
    }

    /// Distinct machine ids in ascending order.
    pub fn machines(&self) -> Vec<i64> {
        self.jobs
            .iter()
            .flat_map(|j| j.tasks.iter().map(|t| t.machine))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of distinct machine ids.
    pub fn num_machines(&self) -> usize {
        self.machines().len()
    }

    /// Task at the given position.
    ///
    /// # Panics
    /// Panics if the reference does not belong to this instance.
    pub fn task(&self, at: TaskRef) -> &Task {
        &self.jobs[at.job].tasks[at.position]
    }

    /// All tasks with their references, job by job.
    pub fn tasks(&self) -> impl Iterator<Item = (TaskRef, &Task)> + '_ {
        self.jobs.iter().enumerate().flat_map(|(j, job)| {
            job.tasks
                .iter()
                .enumerate()
                .map(move |(p, task)| (TaskRef::new(j, p), task))
        })
    }

    /// Task references grouped by machine, machines ascending, tasks in
    /// instance order within each machine.
    pub fn machine_groups(&self) -> BTreeMap<i64, Vec<TaskRef>> {
        let mut groups: BTreeMap<i64, Vec<TaskRef>> = BTreeMap::new();
        for (at, task) in self.tasks() {
            groups.entry(task.machine).or_default().push(at);
        }
        groups
    }

    /// Unordered pairs of tasks sharing a machine.
    pub fn machine_pairs(&self) -> Vec<(i64, TaskRef, TaskRef)> {
        let mut pairs = Vec::new();
        for (machine, refs) in self.machine_groups() {
            for (i, &a) in refs.iter().enumerate() {
                for &b in &refs[i + 1..] {
                    pairs.push((machine, a, b));
                }
            }
        }
        pairs
    }

    /// Summed duration of the task's job predecessors: its earliest start.
    /// Saturates at `i64::MAX`.
    pub fn head(&self, at: TaskRef) -> i64 {
        self.jobs[at.job].tasks[..at.position]
            .iter()
            .fold(0i64, |acc, t| acc.saturating_add(t.duration))
    }

    /// Summed duration of the task and its job successors.
    /// Saturates at `i64::MAX`.
    pub fn tail(&self, at: TaskRef) -> i64 {
        self.jobs[at.job].tasks[at.position..]
            .iter()
            .fold(0i64, |acc, t| acc.saturating_add(t.duration))
    }
}
