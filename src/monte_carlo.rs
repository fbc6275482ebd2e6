use crate::corpus::{Corpus, RunResult};
use crate::errors::{CoolsimError, EmptyBatchError, RunError};
use crate::statistics::{summarize, AggregateStatistics};
#[cfg(feature = "indicatif")]
use indicatif::ParallelProgressIterator;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Shared flag requesting that a batch stops issuing and finishing runs.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Batch-level stop condition: explicit cancellation or an elapsed deadline.
#[derive(Clone, Debug)]
pub struct StopSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new(token: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            token,
            deadline: timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    pub fn should_stop(&self) -> bool {
        self.token.is_cancelled()
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    pub n_runs: usize,
    pub seed: u64,
    /// size of the worker pool; the global rayon pool is used when not set
    pub threads: Option<usize>,
    pub timeout: Option<Duration>,
    pub cancellation: CancellationToken,
    /// incremented as each run finishes, successfully or not
    pub completed_runs: Option<Arc<AtomicUsize>>,
}

impl BatchOptions {
    pub fn for_corpus(corpus: &Corpus) -> Self {
        Self {
            n_runs: corpus.n_runs(),
            seed: corpus.request.seed,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunFailure {
    pub run_index: usize,
    pub seed: u64,
    pub error: RunError,
}

/// Everything a batch produced: successful runs in run-index order, failed runs, and the number
/// of runs skipped because the batch was stopped.
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<RunResult>,
    pub failures: Vec<RunFailure>,
    pub skipped: usize,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn cost_samples(&self) -> Vec<f64> {
        self.results.iter().map(|result| result.total_cost).collect()
    }

    pub fn summarize(
        &self,
        histogram_bins: usize,
    ) -> Result<AggregateStatistics, EmptyBatchError> {
        summarize(&self.results, histogram_bins)
    }
}

/// Seed of a run's random stream, independent of the order runs execute in.
pub fn run_seed(batch_seed: u64, run_index: usize) -> u64 {
    batch_seed ^ run_index as u64
}

pub fn run_batch(corpus: &Corpus, options: &BatchOptions) -> Result<BatchOutcome, CoolsimError> {
    let stop = StopSignal::new(options.cancellation.clone(), options.timeout);
    info!(
        n_runs = options.n_runs,
        seed = options.seed,
        policy = %corpus.policy.kind(),
        equipment = corpus.equipment_id.as_str(),
        "starting batch"
    );

    let execute = || -> Vec<Option<Result<RunResult, RunError>>> {
        let runs = (0..options.n_runs).into_par_iter();
        #[cfg(feature = "indicatif")]
        let runs = runs.progress_count(options.n_runs as u64);

        runs.map(|run_index| {
            if stop.should_stop() {
                return None;
            }
            let seed = run_seed(options.seed, run_index);
            let outcome = corpus.run_single(run_index, seed, &stop);
            if let Some(counter) = &options.completed_runs {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Some(outcome)
        })
        .collect()
    };
    let outcomes = match options.threads {
        Some(threads) => ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(execute),
        None => execute(),
    };

    let mut batch = BatchOutcome::default();
    for (run_index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Some(Ok(result)) => batch.results.push(result),
            None | Some(Err(RunError::Cancelled)) => batch.skipped += 1,
            Some(Err(error)) => {
                warn!(run_index, %error, "run failed");
                batch.failures.push(RunFailure {
                    run_index,
                    seed: run_seed(options.seed, run_index),
                    error,
                });
            }
        }
    }
    batch.cancelled = batch.skipped > 0 || options.cancellation.is_cancelled();

    info!(
        succeeded = batch.results.len(),
        failed = batch.failures.len(),
        skipped = batch.skipped,
        cancelled = batch.cancelled,
        "batch finished"
    );

    if batch.results.is_empty() {
        if let Some(first) = batch.failures.first() {
            return Err(CoolsimError::AllRunsFailed {
                attempted: batch.failures.len(),
                first_failure: first.error.clone(),
            });
        }
    }

    Ok(batch)
}

#[derive(Clone, Debug)]
pub enum BatchStatus {
    NotStarted,
    Running { completed: usize, total: usize },
    Done(Arc<BatchOutcome>),
    Failed(String),
}

#[derive(Debug)]
enum BatchPhase {
    NotStarted,
    Running,
    Done(Arc<BatchOutcome>),
    Failed(String),
}

/// A batch running on a background thread whose progress can be polled.
#[derive(Debug)]
pub struct BatchHandle {
    phase: Arc<Mutex<BatchPhase>>,
    completed: Arc<AtomicUsize>,
    total: usize,
    cancellation: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl BatchHandle {
    pub fn spawn(corpus: Arc<Corpus>, mut options: BatchOptions) -> Self {
        let phase = Arc::new(Mutex::new(BatchPhase::NotStarted));
        let completed = Arc::new(AtomicUsize::new(0));
        options.completed_runs = Some(completed.clone());
        let cancellation = options.cancellation.clone();
        let total = options.n_runs;

        let thread = {
            let phase = phase.clone();
            std::thread::spawn(move || {
                *phase.lock() = BatchPhase::Running;
                let finished = match run_batch(&corpus, &options) {
                    Ok(outcome) => BatchPhase::Done(Arc::new(outcome)),
                    Err(err) => BatchPhase::Failed(err.to_string()),
                };
                *phase.lock() = finished;
            })
        };

        Self {
            phase,
            completed,
            total,
            cancellation,
            thread: Some(thread),
        }
    }

    pub fn status(&self) -> BatchStatus {
        match &*self.phase.lock() {
            BatchPhase::NotStarted => BatchStatus::NotStarted,
            BatchPhase::Running => BatchStatus::Running {
                completed: self.completed.load(Ordering::Relaxed),
                total: self.total,
            },
            BatchPhase::Done(outcome) => BatchStatus::Done(outcome.clone()),
            BatchPhase::Failed(reason) => BatchStatus::Failed(reason.clone()),
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Block until the batch finishes and return its final status.
    pub fn wait(mut self) -> BatchStatus {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                return BatchStatus::Failed("batch thread panicked".to_string());
            }
        }
        self.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    fn should_derive_distinct_seeds_per_run() {
        assert_eq!(run_seed(42, 0), 42);
        assert_eq!(run_seed(42, 1), 43);
        assert_ne!(run_seed(42, 2), run_seed(42, 3));
    }

    #[rstest]
    fn should_stop_once_cancelled() {
        let token = CancellationToken::new();
        let stop = StopSignal::new(token.clone(), None);
        assert!(!stop.should_stop());
        token.cancel();
        assert!(stop.should_stop());
    }

    #[rstest]
    fn should_stop_after_deadline() {
        let stop = StopSignal::new(CancellationToken::new(), Some(Duration::ZERO));
        assert!(stop.should_stop());
        assert!(!StopSignal::never().should_stop());
    }
}
