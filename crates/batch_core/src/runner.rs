//! Runs an [`ItemProcessor`] over a selection, tolerating per-item failure.

use crate::error::ProcessingError;
use crate::processor::ItemProcessor;
use crate::record::Record;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared flag checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One item that could not be processed.
#[derive(Debug)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: ProcessingError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful records in input order.
    pub records: Vec<Record>,
    /// Failed items in input order.
    pub failures: Vec<ItemFailure>,
    /// Length of the input selection.
    pub total: usize,
    /// Stopped early; items never started are absent from both lists.
    pub cancelled: bool,
}

impl BatchOutcome {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }

    fn push(&mut self, path: &Path, result: Result<Record, ProcessingError>) {
        match result {
            Ok(record) => {
                tracing::debug!("processed {}", path.display());
                self.records.push(record);
            }
            Err(error) => {
                tracing::warn!("processing failed for {}: {error}", path.display());
                self.failures.push(ItemFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
}

/// Per-item notifications emitted while a batch runs.
///
/// `index` on `Finished` counts completed items and runs 1..=total.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    Started {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    Finished {
        index: usize,
        total: usize,
        path: &'a Path,
        error: Option<&'a ProcessingError>,
    },
}

/// Sequential run in input order. `progress(current, total)` fires once per
/// attempted item, after the attempt.
pub fn run<F>(
    paths: &[PathBuf],
    processor: &dyn ItemProcessor,
    mut progress: F,
    cancel: &CancelFlag,
) -> BatchOutcome
where
    F: FnMut(usize, usize),
{
    run_with_events(
        paths,
        processor,
        |event| {
            if let RunEvent::Finished { index, total, .. } = event {
                progress(index, total);
            }
        },
        cancel,
    )
}

pub fn run_with_events<F>(
    paths: &[PathBuf],
    processor: &dyn ItemProcessor,
    mut on_event: F,
    cancel: &CancelFlag,
) -> BatchOutcome
where
    F: FnMut(RunEvent<'_>),
{
    let total = paths.len();
    let mut outcome = BatchOutcome::new(total);
    tracing::info!("processing {total} item(s) with {}", processor.name());

    for (idx, path) in paths.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!("batch cancelled after {idx}/{total}");
            outcome.cancelled = true;
            break;
        }
        let index = idx + 1;
        let path = path.as_path();
        on_event(RunEvent::Started { index, total, path });
        let result = processor.process(path);
        on_event(RunEvent::Finished {
            index,
            total,
            path,
            error: result.as_ref().err(),
        });
        outcome.push(path, result);
    }

    tracing::info!(
        "batch done: {} ok, {} failed",
        outcome.succeeded(),
        outcome.failed()
    );
    outcome
}

/// Processes items on a pool of `workers` threads.
///
/// Completion events are serialised so `index` still increases by one per
/// item; records and failures come back in input order. Only `Finished`
/// events are emitted. `workers <= 1` runs sequentially.
pub fn run_parallel<F>(
    paths: &[PathBuf],
    processor: &dyn ItemProcessor,
    workers: usize,
    on_event: F,
    cancel: &CancelFlag,
) -> BatchOutcome
where
    F: FnMut(RunEvent<'_>) + Send,
{
    if workers <= 1 {
        return run_with_events(paths, processor, on_event, cancel);
    }
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("worker pool unavailable ({e}), processing sequentially");
            return run_with_events(paths, processor, on_event, cancel);
        }
    };

    let total = paths.len();
    tracing::info!(
        "processing {total} item(s) with {} on {workers} workers",
        processor.name()
    );
    let completion = Mutex::new((0usize, on_event));
    let results: Vec<Option<Result<Record, ProcessingError>>> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                if cancel.is_cancelled() {
                    return None;
                }
                let result = processor.process(path);
                let mut guard = completion.lock().unwrap_or_else(PoisonError::into_inner);
                let (done, on_event) = &mut *guard;
                *done += 1;
                on_event(RunEvent::Finished {
                    index: *done,
                    total,
                    path: path.as_path(),
                    error: result.as_ref().err(),
                });
                Some(result)
            })
            .collect()
    });

    let mut outcome = BatchOutcome::new(total);
    for (path, result) in paths.iter().zip(results) {
        match result {
            Some(result) => outcome.push(path, result),
            None => outcome.cancelled = true,
        }
    }
    tracing::info!(
        "batch done: {} ok, {} failed",
        outcome.succeeded(),
        outcome.failed()
    );
    outcome
}
