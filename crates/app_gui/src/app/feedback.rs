//! Maps pipeline notifications to status lines and dialogs.

use batch_core::Notification;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

impl Dialog {
    fn new(kind: DialogKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// What the window should change in response to one notification.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Feedback {
    pub status: Option<String>,
    pub dialog: Option<Dialog>,
    pub progress: Option<(usize, usize)>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn feedback_for(notification: &Notification) -> Feedback {
    let mut fb = Feedback::default();
    match notification {
        Notification::Warning { title, message } => {
            fb.dialog = Some(Dialog::new(DialogKind::Warning, title, message));
        }
        Notification::Selected { count, .. } => {
            fb.status = Some(format!("{count} files selected"));
            fb.progress = Some((0, *count));
        }
        Notification::ProcessingStarted { total } => {
            fb.progress = Some((0, *total));
        }
        Notification::ItemStarted { index, total, path } => {
            fb.status = Some(format!("Processing {index}/{total}: {}", file_name(path)));
        }
        Notification::Progress { current, total } => {
            fb.progress = Some((*current, *total));
        }
        Notification::ItemFailed { path, message } => {
            fb.dialog = Some(Dialog::new(
                DialogKind::Error,
                "Processing Error",
                format!("Error processing {}:\n{message}", file_name(path)),
            ));
        }
        Notification::BatchFinished {
            succeeded,
            failed,
            cancelled,
        } => {
            if *cancelled {
                fb.status = Some(format!(
                    "Processing cancelled: {succeeded} processed, {failed} failed."
                ));
            } else if *succeeded > 0 {
                fb.status = Some(format!(
                    "Processing complete! {succeeded} images processed."
                ));
                fb.dialog = Some(Dialog::new(
                    DialogKind::Info,
                    "Success",
                    format!("Successfully processed {succeeded} images!"),
                ));
            } else {
                fb.status = Some("Processing failed - no data extracted.".to_string());
            }
        }
        Notification::InvalidData { message } => {
            fb.dialog = Some(Dialog::new(DialogKind::Error, "Invalid Data", message));
        }
        Notification::Exported { path } => {
            fb.status = Some(format!("Data exported to {}", file_name(path)));
            fb.dialog = Some(Dialog::new(
                DialogKind::Info,
                "Success",
                format!("Data successfully exported to:\n{}", path.display()),
            ));
        }
        Notification::ExportFailed { message } => {
            fb.dialog = Some(Dialog::new(DialogKind::Error, "Export Error", message));
        }
    }
    fb
}
