//! Shared test fixtures.

use crate::models::ProblemInstance;

/// The classic three-job, three-machine instance. Optimal makespan is 11.
pub(crate) fn three_job_instance() -> ProblemInstance {
    ProblemInstance::three_job_example()
}

/// Two jobs of two tasks on two machines. Optimal makespan is 5.
pub(crate) fn two_by_two_instance() -> ProblemInstance {
    ProblemInstance::from_triples(vec![
        vec![(0, 2, 1), (1, 1, 2)],
        vec![(1, 2, 1), (0, 3, 2)],
    ])
}

/// A single job with a single task.
pub(crate) fn single_task_instance() -> ProblemInstance {
    ProblemInstance::from_triples(vec![vec![(0, 4, 1)]])
}
