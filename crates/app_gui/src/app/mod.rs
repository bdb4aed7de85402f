//! Main window: renders controller state and runs batches off the UI thread.

mod feedback;
mod settings;

use batch_core::{
    ACCEPTED_EXTENSIONS, CancelFlag, Controller, Notification, Notifier, PipelineConfig,
    ScanOptions, scan_folder,
};
use eframe::{App, Frame, egui};
use egui_extras::{Column, TableBuilder};
use feedback::{Dialog, DialogKind, feedback_for};
use rfd::FileDialog;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Files,
    Results,
    Settings,
}

/// Forwards notifications from the worker thread and wakes the UI.
struct ChannelNotifier {
    tx: Sender<Notification>,
    ctx: egui::Context,
}

impl Notifier for ChannelNotifier {
    fn notify(&mut self, notification: Notification) {
        if self.tx.send(notification).is_ok() {
            self.ctx.request_repaint();
        }
    }
}

struct Worker {
    handle: JoinHandle<Controller>,
    events: Receiver<Notification>,
    cancel: CancelFlag,
}

pub struct UiApp {
    /// `None` while a worker owns it.
    controller: Option<Controller>,
    worker: Option<Worker>,
    /// Copy of the selection for rendering while processing.
    selection: Vec<PathBuf>,
    config: PipelineConfig,
    pending_config: PipelineConfig,
    config_path: Option<PathBuf>,
    recursive_scan: bool,
    panel: Panel,
    status: String,
    progress: (usize, usize),
    dialogs: VecDeque<Dialog>,
    app_version: &'static str,
}

fn config_path() -> Option<PathBuf> {
    directories_next::ProjectDirs::from("org", "imagebatch", "ImageBatch")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl UiApp {
    /// Builds the window state from the persisted settings, if any.
    pub fn load() -> Self {
        let config_path = config_path();
        let config = match &config_path {
            Some(path) => PipelineConfig::load(path).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable settings: {e}");
                PipelineConfig::default()
            }),
            None => PipelineConfig::default(),
        };
        Self {
            controller: Some(Controller::from_config(&config)),
            worker: None,
            selection: Vec::new(),
            pending_config: config.clone(),
            config,
            config_path,
            recursive_scan: false,
            panel: Panel::Files,
            status: "Ready".to_string(),
            progress: (0, 0),
            dialogs: VecDeque::new(),
            app_version: env!("IMAGEBATCH_VERSION"),
        }
    }

    fn busy(&self) -> bool {
        self.worker.is_some()
    }

    fn apply(&mut self, notification: &Notification) {
        let fb = feedback_for(notification);
        if let Some(status) = fb.status {
            self.status = status;
        }
        if let Some(progress) = fb.progress {
            self.progress = progress;
        }
        if let Some(dialog) = fb.dialog {
            self.dialogs.push_back(dialog);
        }
    }

    fn apply_all(&mut self, notifications: Vec<Notification>) {
        for n in &notifications {
            self.apply(n);
        }
    }

    fn select_paths(&mut self, paths: Vec<PathBuf>) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let mut log: Vec<Notification> = Vec::new();
        controller.select(paths, &mut log);
        self.selection = controller.selection().to_vec();
        if !log.is_empty() {
            self.panel = Panel::Files;
        }
        self.apply_all(log);
    }

    fn pick_files(&mut self) {
        if let Some(paths) = FileDialog::new()
            .add_filter("Images", &ACCEPTED_EXTENSIONS)
            .set_directory(".")
            .pick_files()
        {
            self.select_paths(paths);
        }
    }

    fn pick_folder(&mut self) {
        let Some(dir) = FileDialog::new().set_directory(".").pick_folder() else {
            return;
        };
        let opts = ScanOptions {
            recursive: self.recursive_scan,
        };
        match scan_folder(&dir, opts) {
            Ok(paths) if paths.is_empty() => self.dialogs.push_back(Dialog {
                kind: DialogKind::Warning,
                title: "No Valid Files".to_string(),
                message: format!("No images found in {}", dir.display()),
            }),
            Ok(paths) => self.select_paths(paths),
            Err(e) => self.dialogs.push_back(Dialog {
                kind: DialogKind::Error,
                title: "Folder Error".to_string(),
                message: format!("{e:#}"),
            }),
        }
    }

    fn start_processing(&mut self, ctx: &egui::Context) {
        let Some(mut controller) = self.controller.take() else {
            return;
        };
        let (tx, rx) = mpsc::channel();
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();
        let mut notifier = ChannelNotifier {
            tx,
            ctx: ctx.clone(),
        };

        let spawned = std::thread::Builder::new()
            .name("batch-worker".into())
            .spawn(move || {
                controller.process(&mut notifier, &worker_cancel);
                notifier.ctx.request_repaint();
                controller
            });
        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    handle,
                    events: rx,
                    cancel,
                });
            }
            Err(e) => {
                tracing::error!("cannot start worker thread: {e}");
                self.restore_controller();
                self.dialogs.push_back(Dialog {
                    kind: DialogKind::Error,
                    title: "Processing Error".to_string(),
                    message: format!("Could not start processing: {e}"),
                });
            }
        }
    }

    /// Fresh controller carrying over the current selection.
    fn restore_controller(&mut self) {
        let mut controller = Controller::from_config(&self.config);
        let mut log: Vec<Notification> = Vec::new();
        controller.select(self.selection.clone(), &mut log);
        self.controller = Some(controller);
    }

    fn poll_worker(&mut self) {
        let events: Vec<Notification> = match &self.worker {
            Some(worker) => worker.events.try_iter().collect(),
            None => return,
        };
        self.apply_all(events);

        let finished = self
            .worker
            .as_ref()
            .is_some_and(|w| w.handle.is_finished());
        if !finished {
            return;
        }
        let Some(worker) = self.worker.take() else {
            return;
        };
        let rest: Vec<Notification> = worker.events.try_iter().collect();
        self.apply_all(rest);
        match worker.handle.join() {
            Ok(controller) => {
                if controller.can_export() {
                    self.panel = Panel::Results;
                }
                self.controller = Some(controller);
            }
            Err(_) => {
                tracing::error!("batch worker panicked");
                self.restore_controller();
                self.status = "Processing failed.".to_string();
            }
        }
    }

    fn export(&mut self) {
        let Some(controller) = self.controller.as_ref() else {
            return;
        };
        let mut checks: Vec<Notification> = Vec::new();
        if !controller.ready_to_export(&mut checks) {
            self.apply_all(checks);
            return;
        }
        let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name(&self.config.default_export_name)
            .save_file()
        else {
            return;
        };
        let mut log: Vec<Notification> = Vec::new();
        if let Err(e) = controller.export(&path, &mut log) {
            tracing::warn!("export failed: {e}");
        }
        self.apply_all(log);
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let busy = self.busy();
        let (can_select, can_process, can_export) = match &self.controller {
            Some(c) => (c.can_select(), c.can_process(), c.can_export()),
            None => (false, false, false),
        };

        ui.horizontal(|ui| {
            if ui
                .add_enabled(can_select && !busy, egui::Button::new("Select Images..."))
                .clicked()
            {
                self.pick_files();
            }
            if ui
                .add_enabled(can_select && !busy, egui::Button::new("Choose Folder..."))
                .clicked()
            {
                self.pick_folder();
            }
            ui.checkbox(&mut self.recursive_scan, "Include subfolders");

            ui.separator();
            if ui
                .add_enabled(can_process && !busy, egui::Button::new("Process Images"))
                .clicked()
            {
                self.start_processing(ctx);
            }
            if let Some(worker) = &self.worker
                && ui.button("Cancel").clicked()
            {
                worker.cancel.cancel();
                self.status = "Cancelling...".to_string();
            }
            if ui
                .add_enabled(can_export && !busy, egui::Button::new("Export to CSV"))
                .clicked()
            {
                self.export();
            }
        });

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.panel, Panel::Files, "Files");
            ui.selectable_value(&mut self.panel, Panel::Results, "Results");
            ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
        });
    }

    fn render_files(&self, ui: &mut egui::Ui) {
        if self.selection.is_empty() {
            ui.label("No files selected");
            return;
        }
        ui.label(format!("{} files selected", self.selection.len()));
        ui.add_space(6.0);
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                for path in &self.selection {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    ui.label(name).on_hover_text(path.display().to_string());
                }
            });
    }

    fn render_results(&self, ui: &mut egui::Ui) {
        let Some(controller) = &self.controller else {
            ui.label("Processing...");
            return;
        };
        let batch = controller.batch();
        let Some(first) = batch.first() else {
            ui.label("No processed data yet");
            return;
        };
        let header: Vec<&str> = first.keys().collect();

        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .columns(Column::auto().at_least(60.0), header.len())
                .header(20.0, |mut row| {
                    for key in &header {
                        row.col(|ui| {
                            ui.strong(*key);
                        });
                    }
                })
                .body(|mut body| {
                    for record in batch {
                        body.row(18.0, |mut row| {
                            for key in &header {
                                row.col(|ui| {
                                    let text =
                                        record.get(key).map(|v| v.to_string()).unwrap_or_default();
                                    ui.label(text);
                                });
                            }
                        });
                    }
                });
        });
    }

    fn render_dialog(&mut self, ctx: &egui::Context) {
        let Some(dialog) = self.dialogs.front() else {
            return;
        };
        let prefix = match dialog.kind {
            DialogKind::Info => "",
            DialogKind::Warning => "⚠ ",
            DialogKind::Error => "✖ ",
        };
        let mut close = false;
        egui::Window::new(format!("{prefix}{}", dialog.title))
            .id(egui::Id::new("message-dialog"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&dialog.message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.dialogs.pop_front();
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_worker();

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            self.render_toolbar(ui, ctx);
        });

        egui::TopBottomPanel::bottom("progress").show(ctx, |ui| {
            let (current, total) = self.progress;
            let fraction = if total == 0 {
                0.0
            } else {
                current as f32 / total as f32
            };
            ui.add(egui::ProgressBar::new(fraction).text(format!("{current}/{total}")));
            ui.label(&self.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.panel {
            Panel::Files => self.render_files(ui),
            Panel::Results => self.render_results(ui),
            Panel::Settings => self.render_settings_panel(ui),
        });

        self.render_dialog(ctx);
    }
}
