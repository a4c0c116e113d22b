//! Concurrent orchestration of (encoding, backend) pairs.
//!
//! Every pair runs the full pipeline on its own thread:
//! build the model, solve it, extract and verify the schedule, render the
//! report. Pairs share only the read-only [`ProblemInstance`] and their
//! adapters; models, results, and schedules stay thread-local.
//!
//! # Failure isolation
//! - A build or extraction error ends that pair with a failed report.
//! - A panicking pipeline thread is caught at `join` and reported as a
//!   failure of that pair only.
//! - With a timeout, the solve call runs on a detached thread; a solve that
//!   does not answer in time yields [`SolveStatus::Unknown`]. The detached
//!   thread keeps running until the engine returns, its result is dropped.
//!
//! # Output
//! Each report is rendered into one string and written to the sink under a
//! mutex, so blocks from different pairs never interleave.
//!
//! # Reference
//! Gomes & Selman (2001), "Algorithm portfolios", Artificial Intelligence 126

use log::{debug, error, info, warn};
use std::any::Any;
use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::builder::{BuiltModel, ModelBuilder};
use crate::encoding::Encoding;
use crate::error::JsspError;
use crate::extract::SolutionExtractor;
use crate::model::ConstraintModel;
use crate::models::ProblemInstance;
use crate::report::{PairOutcome, PairReport};
use crate::solver::{SolveResult, SolveStats, SolveStatus, SolverAdapter};

/// One (encoding, backend) combination.
#[derive(Clone)]
pub struct SolvePair {
    /// Encoding used to build the model.
    pub encoding: Encoding,
    /// Adapter solving the model.
    pub adapter: Arc<dyn SolverAdapter>,
}

impl SolvePair {
    /// Creates a pair.
    pub fn new(encoding: Encoding, adapter: Arc<dyn SolverAdapter>) -> Self {
        Self { encoding, adapter }
    }

    /// `backend | encoding`.
    pub fn label(&self) -> String {
        format!("{} | {}", self.adapter.name(), self.encoding)
    }
}

impl std::fmt::Debug for SolvePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolvePair")
            .field("encoding", &self.encoding)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

/// Runs every configured pair concurrently on one instance.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    pairs: Vec<SolvePair>,
    timeout: Option<Duration>,
}

impl Orchestrator {
    /// Starts a builder.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Configured pairs, in report order.
    pub fn pairs(&self) -> &[SolvePair] {
        &self.pairs
    }

    /// Per-pair solve timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs all pairs and returns their reports in configuration order.
    pub fn run(&self, instance: &ProblemInstance) -> Vec<PairReport> {
        self.run_pairs(instance, None::<&Mutex<std::io::Sink>>)
    }

    /// Runs all pairs, writing each report to `sink` as soon as its pair
    /// finishes. Returns the reports in configuration order.
    pub fn run_with_sink<W: Write + Send>(
        &self,
        instance: &ProblemInstance,
        sink: W,
    ) -> Vec<PairReport> {
        let sink = Mutex::new(sink);
        self.run_pairs(instance, Some(&sink))
    }

    fn run_pairs<W: Write + Send>(
        &self,
        instance: &ProblemInstance,
        sink: Option<&Mutex<W>>,
    ) -> Vec<PairReport> {
        info!(
            "running {} pairs on {} jobs / {} tasks",
            self.pairs.len(),
            instance.num_jobs(),
            instance.num_tasks()
        );
        let timeout = self.timeout;
        let mut reports = Vec::with_capacity(self.pairs.len());

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.pairs.len());
            for pair in &self.pairs {
                let handle = thread::Builder::new()
                    .name(format!("pair-{}", pair.encoding))
                    .spawn_scoped(scope, move || {
                        let report = run_pair(pair, instance, timeout);
                        if let Some(sink) = sink {
                            emit(sink, &report);
                        }
                        report
                    });
                handles.push((pair, handle));
            }

            for (pair, handle) in handles {
                let report = match handle {
                    Ok(handle) => match handle.join() {
                        Ok(report) => report,
                        Err(payload) => {
                            let report = PairReport::failed(
                                pair.adapter.name(),
                                pair.encoding,
                                JsspError::Solver(format!(
                                    "pipeline panicked: {}",
                                    panic_message(payload.as_ref())
                                )),
                            );
                            error!("{}: pipeline panicked", pair.label());
                            if let Some(sink) = sink {
                                emit(sink, &report);
                            }
                            report
                        }
                    },
                    Err(e) => {
                        let report = PairReport::failed(
                            pair.adapter.name(),
                            pair.encoding,
                            JsspError::Solver(format!("failed to spawn pipeline thread: {e}")),
                        );
                        if let Some(sink) = sink {
                            emit(sink, &report);
                        }
                        report
                    }
                };
                reports.push(report);
            }
        });

        reports
    }
}

/// Builder for [`Orchestrator`].
#[derive(Debug, Clone, Default)]
pub struct OrchestratorBuilder {
    pairs: Vec<SolvePair>,
    timeout: Option<Duration>,
}

impl OrchestratorBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one (encoding, adapter) pair.
    pub fn add_pair<A>(mut self, encoding: Encoding, adapter: A) -> Self
    where
        A: SolverAdapter + 'static,
    {
        self.pairs.push(SolvePair::new(encoding, Arc::new(adapter)));
        self
    }

    /// Adds a pair with an adapter shared with other pairs.
    pub fn add_shared_pair(mut self, encoding: Encoding, adapter: Arc<dyn SolverAdapter>) -> Self {
        self.pairs.push(SolvePair::new(encoding, adapter));
        self
    }

    /// Adds one pair per encoding, all sharing `adapter`.
    pub fn add_encodings(
        mut self,
        encodings: impl IntoIterator<Item = Encoding>,
        adapter: Arc<dyn SolverAdapter>,
    ) -> Self {
        for encoding in encodings {
            self.pairs.push(SolvePair::new(encoding, Arc::clone(&adapter)));
        }
        self
    }

    /// Sets the per-pair solve timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the orchestrator.
    pub fn build(self) -> Orchestrator {
        Orchestrator {
            pairs: self.pairs,
            timeout: self.timeout,
        }
    }
}

/// Full pipeline of one pair.
fn run_pair(pair: &SolvePair, instance: &ProblemInstance, timeout: Option<Duration>) -> PairReport {
    let backend = pair.adapter.name();

    let BuiltModel { model, layout } = match ModelBuilder::new(instance, pair.encoding).build() {
        Ok(built) => built,
        Err(e) => {
            warn!("{}: model building failed: {e}", pair.label());
            return PairReport::failed(backend, pair.encoding, e);
        }
    };
    let model_size = model.size();
    debug!("{}: {model_size}", pair.label());

    let started = Instant::now();
    let result = match timeout {
        None => pair.adapter.solve(&model),
        Some(limit) => solve_with_timeout(Arc::clone(&pair.adapter), model, limit),
    };
    let elapsed = started.elapsed();
    info!("{}: {} in {} ms", pair.label(), result.status, elapsed.as_millis());

    let SolveResult {
        status,
        stats,
        message,
        ..
    } = &result;
    let mut report = PairReport {
        backend: backend.to_string(),
        encoding: pair.encoding,
        elapsed,
        status: *status,
        model_size: Some(model_size),
        stats: Some(stats.clone()),
        outcome: PairOutcome::NoSolution {
            reason: message.clone(),
        },
    };
    if !result.has_solution() {
        return report;
    }

    let extractor = SolutionExtractor::new(instance, &layout);
    report.outcome = match extractor.extract(&result) {
        Ok(schedule) => {
            let violations = schedule.verify(instance);
            if !violations.is_empty() {
                warn!(
                    "{}: extracted schedule has {} violations, first: {}",
                    pair.label(),
                    violations.len(),
                    violations[0].message
                );
            }
            PairOutcome::Solved {
                objective: result
                    .objective
                    .unwrap_or_else(|| schedule.makespan() as f64),
                schedule,
            }
        }
        Err(e) => {
            error!("{}: extraction failed: {e}", pair.label());
            report.status = SolveStatus::Error;
            PairOutcome::Failed(e)
        }
    };
    report
}

/// Runs `adapter.solve` on a detached thread and waits at most `limit`.
fn solve_with_timeout(
    adapter: Arc<dyn SolverAdapter>,
    model: ConstraintModel,
    limit: Duration,
) -> SolveResult {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("solve-{}", model.name()))
        .spawn(move || {
            // The receiver is gone once the caller timed out.
            let _ = tx.send(adapter.solve(&model));
        });
    if let Err(e) = spawned {
        return SolveResult::error(format!("failed to spawn solver thread: {e}"), SolveStats::default());
    }

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("solver gave no answer within {} ms", limit.as_millis());
            SolveResult::unknown(
                format!("timed out after {} ms", limit.as_millis()),
                SolveStats::timed(limit),
            )
        }
        Err(RecvTimeoutError::Disconnected) => {
            SolveResult::error("solver thread ended without a result", SolveStats::default())
        }
    }
}

/// Writes one rendered report under the sink lock.
fn emit<W: Write>(sink: &Mutex<W>, report: &PairReport) {
    let text = report.to_string();
    let mut out = sink.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        warn!("failed to write report for {}: {e}", report.label());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{CpAdapter, MilpAdapter};
    use crate::test_support::{single_task_instance, three_job_instance, two_by_two_instance};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Adapter that panics inside `solve`.
    struct PanickingAdapter;

    impl SolverAdapter for PanickingAdapter {
        fn name(&self) -> &str {
            "panicking"
        }

        fn solve(&self, _model: &ConstraintModel) -> SolveResult {
            panic!("engine crashed");
        }
    }

    /// Adapter that sleeps before reporting `Unknown`.
    struct SlowAdapter(Duration);

    impl SolverAdapter for SlowAdapter {
        fn name(&self) -> &str {
            "slow"
        }

        fn solve(&self, _model: &ConstraintModel) -> SolveResult {
            thread::sleep(self.0);
            SolveResult::unknown("finished late", SolveStats::default())
        }
    }

    fn all_encodings() -> Orchestrator {
        Orchestrator::builder()
            .add_encodings(Encoding::ALL, Arc::new(MilpAdapter::microlp()))
            .build()
    }

    #[test]
    fn test_all_pairs_agree_on_optimum() {
        let instance = two_by_two_instance();
        let reports = all_encodings().run(&instance);

        assert_eq!(reports.len(), 3);
        for (report, encoding) in reports.iter().zip(Encoding::ALL) {
            assert_eq!(report.encoding, encoding);
            assert_eq!(report.status, SolveStatus::Optimal, "{}", report.label());
            assert_eq!(report.makespan(), Some(5), "{}", report.label());
            let schedule = report.schedule().unwrap();
            assert!(schedule.verify(&instance).is_empty());
        }
    }

    #[test]
    fn test_three_jobs_interval_and_big_m() {
        let instance = three_job_instance();
        let reports = Orchestrator::builder()
            .add_pair(Encoding::Interval, MilpAdapter::microlp())
            .add_pair(Encoding::BigMDisjunctive, MilpAdapter::microlp())
            .build()
            .run(&instance);

        for report in &reports {
            assert_eq!(report.makespan(), Some(11), "{}", report.label());
            assert!(report.to_string().contains("Optimal Schedule Length: 11"));
        }
    }

    #[test]
    fn test_single_task_starts_at_zero_on_every_pair() {
        let instance = single_task_instance();
        let reports = Orchestrator::builder()
            .add_encodings(Encoding::ALL, Arc::new(MilpAdapter::microlp()))
            .add_encodings(Encoding::ALL, Arc::new(CpAdapter::new()))
            .build()
            .run(&instance);

        assert_eq!(reports.len(), 6);
        for report in &reports {
            assert_eq!(report.status, SolveStatus::Optimal, "{}", report.label());
            assert_eq!(report.makespan(), Some(4), "{}", report.label());
            let schedule = report.schedule().unwrap();
            assert_eq!(schedule.assignment_count(), 1);
            let task = &schedule.machine(0)[0];
            assert_eq!((task.start, task.duration), (0, 4), "{}", report.label());
            assert_eq!(task.name(), "job_0_task_1");
        }
    }

    #[test]
    fn test_cp_and_milp_backends_agree() {
        let instance = three_job_instance();
        let reports = Orchestrator::builder()
            .add_encodings(
                [Encoding::Interval, Encoding::BigMDisjunctive],
                Arc::new(MilpAdapter::microlp()),
            )
            .add_encodings(
                [Encoding::Interval, Encoding::BigMDisjunctive],
                Arc::new(CpAdapter::new()),
            )
            .build()
            .run(&instance);

        assert_eq!(reports.len(), 4);
        for report in &reports {
            assert_eq!(report.status, SolveStatus::Optimal, "{}", report.label());
            assert_eq!(report.makespan(), Some(11), "{}", report.label());
            assert!(report.schedule().unwrap().verify(&instance).is_empty());
        }
        let cp = &reports[2];
        assert_eq!(cp.backend, "pumpkin/cp");
        assert!(cp.stats.as_ref().and_then(|s| s.conflicts).is_some());
        assert!(cp.to_string().contains("  conflicts: "));
    }

    #[test]
    fn test_random_instance_schedules_are_feasible_and_sorted() {
        let mut rng = SmallRng::seed_from_u64(7);
        let instance = ProblemInstance::random(3, 3, 5, &mut rng);
        let reports = Orchestrator::builder()
            .add_pair(Encoding::Interval, MilpAdapter::microlp())
            .add_pair(Encoding::BigMDisjunctive, MilpAdapter::microlp())
            .build()
            .run(&instance);

        assert!(reports[0].makespan().is_some());
        assert_eq!(reports[0].makespan(), reports[1].makespan());
        for report in &reports {
            let schedule = report.schedule().unwrap();
            assert!(schedule.verify(&instance).is_empty(), "{}", report.label());
            for tasks in schedule.machines.values() {
                for w in tasks.windows(2) {
                    assert!(
                        w[0].start < w[1].start
                            || (w[0].start == w[1].start && w[0].duration <= w[1].duration)
                    );
                }
            }
        }
    }

    #[test]
    fn test_invalid_instance_fails_every_pair() {
        let empty = ProblemInstance::new(vec![]);
        let reports = all_encodings().run(&empty);
        assert_eq!(reports.len(), 3);
        for report in &reports {
            assert_eq!(report.status, SolveStatus::Error);
            assert_eq!(report.error().map(JsspError::kind), Some("InvalidInstance"));
        }
    }

    #[test]
    fn test_one_failing_pair_does_not_affect_others() {
        // Job 0 needs 7 units: time-indexed fails to build, the others
        // solve and prove infeasibility.
        let instance = three_job_instance().with_horizon(6);
        let reports = all_encodings().run(&instance);

        assert_eq!(reports[0].status, SolveStatus::Infeasible);
        assert_eq!(reports[1].status, SolveStatus::Infeasible);
        assert_eq!(
            reports[2].error().map(JsspError::kind),
            Some("HorizonTooShort")
        );
    }

    #[test]
    fn test_panicking_adapter_is_isolated() {
        let instance = two_by_two_instance();
        let reports = Orchestrator::builder()
            .add_pair(Encoding::BigMDisjunctive, PanickingAdapter)
            .add_pair(Encoding::BigMDisjunctive, MilpAdapter::microlp())
            .build()
            .run(&instance);

        assert_eq!(reports[0].status, SolveStatus::Error);
        let message = reports[0].error().unwrap().to_string();
        assert!(message.contains("engine crashed"), "{message}");
        assert_eq!(reports[1].makespan(), Some(5));
    }

    #[test]
    fn test_timeout_yields_unknown() {
        let instance = two_by_two_instance();
        let reports = Orchestrator::builder()
            .add_pair(Encoding::Interval, SlowAdapter(Duration::from_secs(2)))
            .add_pair(Encoding::Interval, MilpAdapter::microlp())
            .with_timeout(Duration::from_millis(100))
            .build()
            .run(&instance);

        assert_eq!(reports[0].status, SolveStatus::Unknown);
        assert!(reports[0].to_string().contains("timed out after 100 ms"));
        assert_eq!(reports[1].makespan(), Some(5));
    }

    #[test]
    fn test_panic_under_timeout_is_an_error_result() {
        let instance = two_by_two_instance();
        let reports = Orchestrator::builder()
            .add_pair(Encoding::Interval, PanickingAdapter)
            .with_timeout(Duration::from_secs(5))
            .build()
            .run(&instance);
        assert_eq!(reports[0].status, SolveStatus::Error);
        assert!(reports[0].schedule().is_none());
    }

    #[test]
    fn test_sink_blocks_do_not_interleave() {
        let instance = two_by_two_instance();
        let mut out = Vec::new();
        let reports = all_encodings().run_with_sink(&instance, &mut out);
        let text = String::from_utf8(out).unwrap();

        let blocks: Vec<&str> = text
            .split_inclusive("####################################\n")
            .collect();
        assert_eq!(blocks.len(), reports.len());
        for block in blocks {
            assert!(block.starts_with("########### good_lp/microlp | "));
            assert_eq!(block.matches("Solve status:").count(), 1);
        }
    }
}
