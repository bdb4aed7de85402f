//! Select → process → export state machine, independent of any widget toolkit.

use crate::config::{MAX_WORKERS, PipelineConfig};
use crate::error::ExportError;
use crate::export;
use crate::processor::ItemProcessor;
use crate::record::Record;
use crate::runner::{self, BatchOutcome, CancelFlag, RunEvent};
use crate::validate::{self, Selection};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControllerState {
    #[default]
    Idle,
    Selected,
    Processed,
}

/// Everything the pipeline reports to whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// User-facing warning; nothing failed internally.
    Warning { title: String, message: String },
    Selected { count: usize, skipped: usize },
    ProcessingStarted { total: usize },
    ItemStarted {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Progress { current: usize, total: usize },
    ItemFailed { path: PathBuf, message: String },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        cancelled: bool,
    },
    /// Batch failed the schema check; nothing was written.
    InvalidData { message: String },
    Exported { path: PathBuf },
    ExportFailed { message: String },
}

impl Notification {
    fn warning(title: &str, message: impl Into<String>) -> Self {
        Notification::Warning {
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// Receives [`Notification`]s. `Send` so a batch can run off the UI thread.
pub trait Notifier: Send {
    fn notify(&mut self, notification: Notification);
}

impl Notifier for Vec<Notification> {
    fn notify(&mut self, notification: Notification) {
        self.push(notification);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    NothingToExport,
}

pub struct Controller {
    state: ControllerState,
    selection: Vec<PathBuf>,
    batch: Vec<Record>,
    processor: Arc<dyn ItemProcessor>,
    workers: usize,
}

impl Controller {
    pub fn new(processor: Arc<dyn ItemProcessor>) -> Self {
        Self {
            state: ControllerState::Idle,
            selection: Vec::new(),
            batch: Vec::new(),
            processor,
            workers: 1,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(cfg.processor.build(cfg)).with_workers(cfg.workers)
    }

    /// Applies new settings. Takes effect on the next `process`.
    pub fn reconfigure(&mut self, cfg: &PipelineConfig) {
        self.processor = cfg.processor.build(cfg);
        self.workers = cfg.workers.clamp(1, MAX_WORKERS);
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn selection(&self) -> &[PathBuf] {
        &self.selection
    }

    pub fn batch(&self) -> &[Record] {
        &self.batch
    }

    pub fn can_select(&self) -> bool {
        true
    }

    pub fn can_process(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn can_export(&self) -> bool {
        self.state == ControllerState::Processed && !self.batch.is_empty()
    }

    /// Replaces the selection with the valid subset of `paths`.
    ///
    /// An empty `paths` (dialog dismissed) changes nothing and reports nothing.
    pub fn select<I, P>(&mut self, paths: I, notifier: &mut dyn Notifier) -> Selection
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let selection = validate::filter_valid(paths);
        if selection.valid.is_empty() && selection.skipped.is_empty() {
            return selection;
        }

        if !selection.skipped.is_empty() {
            tracing::warn!("{} selected file(s) skipped", selection.skipped.len());
            notifier.notify(Notification::warning(
                "Invalid Files",
                format!(
                    "{} file(s) were skipped (not valid image files)",
                    selection.skipped.len()
                ),
            ));
        }

        if selection.valid.is_empty() {
            notifier.notify(Notification::warning(
                "No Valid Files",
                "No valid image files were selected.",
            ));
            return selection;
        }

        self.selection = selection.valid.clone();
        self.batch.clear();
        self.state = ControllerState::Selected;
        tracing::info!("{} file(s) selected", self.selection.len());
        notifier.notify(Notification::Selected {
            count: self.selection.len(),
            skipped: selection.skipped.len(),
        });
        selection
    }

    /// Runs the current processor over the selection, blocking until done or
    /// cancelled. Returns `None` when there is nothing selected.
    pub fn process(
        &mut self,
        notifier: &mut dyn Notifier,
        cancel: &CancelFlag,
    ) -> Option<BatchOutcome> {
        if self.selection.is_empty() {
            notifier.notify(Notification::warning(
                "No Files",
                "Please select files first.",
            ));
            return None;
        }

        self.batch.clear();
        self.state = ControllerState::Selected;
        notifier.notify(Notification::ProcessingStarted {
            total: self.selection.len(),
        });

        let mut outcome = runner::run_parallel(
            &self.selection,
            self.processor.as_ref(),
            self.workers,
            |event| forward(notifier, event),
            cancel,
        );

        notifier.notify(Notification::BatchFinished {
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
            cancelled: outcome.cancelled,
        });

        if outcome.records.is_empty() {
            if !outcome.cancelled {
                    notifier.notify(Notification::warning(
                    "Processing Failed",
                    "Processing failed - no data extracted.",
                ));
            }
        } else {
            self.batch = std::mem::take(&mut outcome.records);
            self.state = ControllerState::Processed;
        }
        Some(outcome)
    }

    /// Checks the batch before a destination is chosen.
    ///
    /// Reports "No Data" for an empty batch and `InvalidData` for a mixed
    /// schema; returns true when an export can proceed.
    pub fn ready_to_export(&self, notifier: &mut dyn Notifier) -> bool {
        if self.batch.is_empty() {
            notifier.notify(Notification::warning(
                "No Data",
                "Please process images first.",
            ));
            return false;
        }
        if !export::validate(&self.batch) {
            notifier.notify(Notification::InvalidData {
                message: "Processed data is not in valid format for export.".to_string(),
            });
            return false;
        }
        true
    }

    /// Validates and writes the current batch. Never changes state.
    pub fn export(
        &self,
        dest: impl AsRef<Path>,
        notifier: &mut dyn Notifier,
    ) -> Result<ExportOutcome, ExportError> {
        let dest = dest.as_ref();
        if self.batch.is_empty() {
            notifier.notify(Notification::warning(
                "No Data",
                "Please process images first.",
            ));
            return Ok(ExportOutcome::NothingToExport);
        }

        if let Err(e) = export::check_schema(&self.batch) {
            notifier.notify(Notification::InvalidData {
                message: "Processed data is not in valid format for export.".to_string(),
            });
            return Err(e.into());
        }

        match export::export_csv(&self.batch, dest) {
            Ok(()) => {
                notifier.notify(Notification::Exported {
                    path: dest.to_path_buf(),
                });
                Ok(ExportOutcome::Written(dest.to_path_buf()))
            }
            Err(e) => {
                tracing::warn!("export to {} failed: {e}", dest.display());
                notifier.notify(Notification::ExportFailed {
                    message: format!("Failed to export data: {e}"),
                });
                Err(e)
            }
        }
    }
}

fn forward(notifier: &mut dyn Notifier, event: RunEvent<'_>) {
    match event {
        RunEvent::Started { index, total, path } => notifier.notify(Notification::ItemStarted {
            index,
            total,
            path: path.to_path_buf(),
        }),
        RunEvent::Finished {
            index,
            total,
            path,
            error,
        } => {
            if let Some(error) = error {
                notifier.notify(Notification::ItemFailed {
                    path: path.to_path_buf(),
                    message: error.to_string(),
                });
            }
            notifier.notify(Notification::Progress {
                current: index,
                total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use anyhow::Result;
    use std::fs::File;
    use tempfile::{TempDir, tempdir};

    /// Schema depends on the file name so mixed batches can be provoked.
    struct ByName;

    impl ItemProcessor for ByName {
        fn name(&self) -> &str {
            "by-name"
        }

        fn process(&self, path: &Path) -> Result<Record, ProcessingError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if name.starts_with("fail") {
                return Err(ProcessingError::other("boom"));
            }
            let record = Record::new().with("filename", name.clone());
            Ok(if name.starts_with("odd") {
                record.with("extra", 1i64)
            } else {
                record
            })
        }
    }

    fn files(dir: &TempDir, names: &[&str]) -> Result<Vec<PathBuf>> {
        names
            .iter()
            .map(|n| -> Result<PathBuf> {
                let p = dir.path().join(n);
                File::create(&p)?;
                Ok(p)
            })
            .collect()
    }

    fn controller() -> Controller {
        Controller::new(Arc::new(ByName))
    }

    #[test]
    fn starts_idle_with_only_select_available() {
        let c = controller();
        assert_eq!(c.state(), ControllerState::Idle);
        assert!(c.can_select());
        assert!(!c.can_process());
        assert!(!c.can_export());
    }

    #[test]
    fn all_invalid_selection_keeps_state_and_warns() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let good = files(&dir, &["a.png"])?;
        let mut log: Vec<Notification> = Vec::new();
        c.select(good.clone(), &mut log);
        c.process(&mut log, &CancelFlag::new());
        assert_eq!(c.state(), ControllerState::Processed);

        let bad = files(&dir, &["notes.txt"])?;
        let mut log: Vec<Notification> = Vec::new();
        c.select(bad, &mut log);
        assert_eq!(c.state(), ControllerState::Processed);
        assert_eq!(c.selection(), good.as_slice());
        assert_eq!(c.batch().len(), 1);
        assert!(log.contains(&Notification::warning(
            "No Valid Files",
            "No valid image files were selected."
        )));
        Ok(())
    }

    #[test]
    fn dismissed_dialog_is_silent() {
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(Vec::<PathBuf>::new(), &mut log);
        assert!(log.is_empty());
        assert_eq!(c.state(), ControllerState::Idle);
    }

    #[test]
    fn new_selection_discards_processed_batch() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(files(&dir, &["a.png"])?, &mut log);
        c.process(&mut log, &CancelFlag::new());
        assert!(c.can_export());

        c.select(files(&dir, &["b.jpg", "c.jpeg"])?, &mut log);
        assert_eq!(c.state(), ControllerState::Selected);
        assert!(c.batch().is_empty());
        assert!(!c.can_export());
        assert_eq!(c.selection().len(), 2);
        Ok(())
    }

    #[test]
    fn process_without_selection_warns() {
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        assert!(c.process(&mut log, &CancelFlag::new()).is_none());
        assert_eq!(
            log,
            vec![Notification::warning("No Files", "Please select files first.")]
        );
    }

    #[test]
    fn zero_successes_stay_selected_and_allow_retry() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(files(&dir, &["fail1.png", "fail2.png"])?, &mut log);
        let outcome = c.process(&mut log, &CancelFlag::new()).unwrap();

        assert_eq!(outcome.failed(), 2);
        assert_eq!(c.state(), ControllerState::Selected);
        assert!(c.can_process());
        assert!(!c.can_export());
        assert!(matches!(
            log.last(),
            Some(Notification::Warning { title, .. }) if title == "Processing Failed"
        ));
        Ok(())
    }

    #[test]
    fn export_without_batch_is_a_warning_not_an_error() -> Result<()> {
        let dir = tempdir()?;
        let c = controller();
        let mut log: Vec<Notification> = Vec::new();
        let dest = dir.path().join("out.csv");
        assert_eq!(c.export(&dest, &mut log)?, ExportOutcome::NothingToExport);
        assert!(!dest.exists());
        assert!(matches!(&log[0], Notification::Warning { title, .. } if title == "No Data"));
        Ok(())
    }

    #[test]
    fn mixed_schema_batch_aborts_export_before_writing() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(files(&dir, &["a.png", "odd.png"])?, &mut log);
        c.process(&mut log, &CancelFlag::new());
        assert_eq!(c.state(), ControllerState::Processed);

        let dest = dir.path().join("out.csv");
        let mut log: Vec<Notification> = Vec::new();
        let err = c.export(&dest, &mut log).unwrap_err();
        assert!(matches!(err, ExportError::Validation(_)));
        assert!(!dest.exists());
        assert!(matches!(&log[0], Notification::InvalidData { .. }));

        let mut log: Vec<Notification> = Vec::new();
        assert!(!c.ready_to_export(&mut log));
        assert!(matches!(&log[..], [Notification::InvalidData { .. }]));
        assert_eq!(c.state(), ControllerState::Processed);
        Ok(())
    }

    #[test]
    fn export_success_reports_path() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(files(&dir, &["a.png", "b.png"])?, &mut log);
        c.process(&mut log, &CancelFlag::new());

        let dest = dir.path().join("out.csv");
        let mut log: Vec<Notification> = Vec::new();
        assert_eq!(
            c.export(&dest, &mut log)?,
            ExportOutcome::Written(dest.clone())
        );
        assert_eq!(log, vec![Notification::Exported { path: dest.clone() }]);
        assert!(dest.exists());
        Ok(())
    }

    #[test]
    fn ready_to_export_checks_before_a_destination_exists() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        assert!(!c.ready_to_export(&mut log));
        assert!(matches!(&log[0], Notification::Warning { title, .. } if title == "No Data"));

        c.select(files(&dir, &["a.png"])?, &mut log);
        c.process(&mut log, &CancelFlag::new());
        let mut log: Vec<Notification> = Vec::new();
        assert!(c.ready_to_export(&mut log));
        assert!(log.is_empty());
        Ok(())
    }

    #[test]
    fn export_write_failure_is_reported_and_returned() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(files(&dir, &["a.png"])?, &mut log);
        c.process(&mut log, &CancelFlag::new());

        let dest = dir.path().join("missing-dir").join("out.csv");
        let mut log: Vec<Notification> = Vec::new();
        let err = c.export(&dest, &mut log).unwrap_err();
        assert!(matches!(err, ExportError::Csv(_)));
        match &log[..] {
            [Notification::ExportFailed { message }] => {
                assert!(message.starts_with("Failed to export data:"))
            }
            other => panic!("unexpected notifications: {other:?}"),
        }
        assert_eq!(c.state(), ControllerState::Processed);
        Ok(())
    }

    #[test]
    fn cancelled_before_start_does_not_warn_about_failure() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller();
        let mut log: Vec<Notification> = Vec::new();
        c.select(files(&dir, &["a.png", "b.png"])?, &mut log);

        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut log: Vec<Notification> = Vec::new();
        let outcome = c.process(&mut log, &cancel).unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempted(), 0);
        assert_eq!(c.state(), ControllerState::Selected);
        assert!(!log.iter().any(|n| matches!(n, Notification::Warning { .. })));
        assert_eq!(
            log.last(),
            Some(&Notification::BatchFinished {
                succeeded: 0,
                failed: 0,
                cancelled: true
            })
        );
        Ok(())
    }

    #[test]
    fn worker_count_is_clamped_from_config() {
        let cfg = PipelineConfig {
            workers: 10_000,
            ..PipelineConfig::default()
        };
        let mut c = Controller::from_config(&cfg);
        assert_eq!(c.workers(), MAX_WORKERS);

        c.reconfigure(&PipelineConfig {
            workers: 0,
            ..PipelineConfig::default()
        });
        assert_eq!(c.workers(), 1);
        assert_eq!(controller().with_workers(1_000).workers(), MAX_WORKERS);
    }

    #[test]
    fn parallel_controller_emits_one_progress_per_item() -> Result<()> {
        let dir = tempdir()?;
        let mut c = controller().with_workers(3);
        let mut log: Vec<Notification> = Vec::new();
        c.select(
            files(&dir, &["a.png", "fail.png", "b.png", "c.png", "d.png"])?,
            &mut log,
        );
        let outcome = c.process(&mut log, &CancelFlag::new()).unwrap();

        let progress: Vec<usize> = log
            .iter()
            .filter_map(|n| match n {
                Notification::Progress { current, .. } => Some(*current),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3, 4, 5]);
        assert_eq!(outcome.succeeded(), 4);
        let names: Vec<String> = c
            .batch()
            .iter()
            .map(|r| r.get("filename").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png", "d.png"]);
        Ok(())
    }
}
