//! Settings panel rendering for the processing strategy and export defaults.

use super::{Panel, UiApp};
use batch_core::ProcessorKind;
use batch_core::config::MAX_WORKERS;
use eframe::egui;

impl UiApp {
    /// Renders the settings screen; changes apply on "Save".
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Processing strategy");
            egui::ComboBox::from_id_salt("processor-select")
                .selected_text(self.pending_config.processor.label())
                .show_ui(ui, |ui| {
                    for kind in ProcessorKind::ALL {
                        ui.selectable_value(&mut self.pending_config.processor, kind, kind.label());
                    }
                });
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Mock delay (ms)");
            ui.add_enabled(
                self.pending_config.processor == ProcessorKind::Mock,
                egui::DragValue::new(&mut self.pending_config.mock_delay_ms)
                    .range(0..=10_000)
                    .speed(10),
            );
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Workers");
            ui.add(
                egui::DragValue::new(&mut self.pending_config.workers)
                    .range(1..=MAX_WORKERS)
                    .speed(1),
            );
            if self.pending_config.workers == 1 {
                ui.label("(sequential)");
            }
        });
        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Default export file name");
            ui.text_edit_singleline(&mut self.pending_config.default_export_name);
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            let changed = self.pending_config != self.config;
            if ui
                .add_enabled(changed && !self.busy(), egui::Button::new("Save"))
                .clicked()
            {
                self.apply_settings();
                self.panel = Panel::Files;
            }
            if ui.add_enabled(changed, egui::Button::new("Revert")).clicked() {
                self.pending_config = self.config.clone();
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", self.app_version));
        if let Some(path) = &self.config_path {
            ui.label(format!("Settings file: {}", path.display()));
        }
    }

    fn apply_settings(&mut self) {
        if self.pending_config.default_export_name.trim().is_empty() {
            self.pending_config.default_export_name = batch_core::DEFAULT_EXPORT_NAME.to_string();
        }
        self.config = self.pending_config.clone();
        if let Some(controller) = self.controller.as_mut() {
            controller.reconfigure(&self.config);
        }
        self.status = match &self.config_path {
            Some(path) => match self.config.save(path) {
                Ok(()) => "Settings saved.".to_string(),
                Err(e) => {
                    tracing::warn!("cannot save settings: {e}");
                    format!("Settings applied but not saved: {e}")
                }
            },
            None => "Settings applied for this session.".to_string(),
        };
    }
}
