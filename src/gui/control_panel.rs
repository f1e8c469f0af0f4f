//! Control Panel Widget
//! Left side panel: data source, region and population filters, summary
//! metrics and export.

use crate::data::{format_number, DatasetSchema, FilterState};
use crate::stats::SummaryStats;
use crate::view::DashboardView;
use egui::{Color32, RichText, ScrollArea};
use std::path::Path;

/// Left side control panel with the sidebar filters.
pub struct ControlPanel {
    pub progress: f32,
    pub status: String,
    pub exporting: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            progress: 0.0,
            status: "Ready".to_string(),
            exporting: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the control panel. Filter edits are written straight into `filter`.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        file_path: Option<&Path>,
        schema: Option<&DatasetSchema>,
        filter: Option<&mut FilterState>,
        view: Option<&DashboardView>,
    ) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🎓 Student Dashboard")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                let path_text = file_path
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "No file loaded".to_string());
                ui.label(RichText::new(path_text).size(12.0));

                ui.horizontal(|ui| {
                    if ui.button("🔄 Reload").clicked() {
                        action = ControlPanelAction::Reload;
                    }
                    if ui.button("📂 Open CSV").clicked() {
                        action = ControlPanelAction::OpenCsv;
                    }
                });
            });

        let (Some(schema), Some(filter)) = (schema, filter) else {
            ui.add_space(10.0);
            ui.label(RichText::new("No dataset loaded.").color(Color32::GRAY));
            self.progress_section(ui);
            return action;
        };

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Region Filter =====
        ui.label(
            RichText::new(format!(
                "🗺 Regions ({}/{})",
                filter.regions.len(),
                schema.regions.len()
            ))
            .size(14.0)
            .strong(),
        );
        ui.add_space(5.0);
        ui.horizontal(|ui| {
            if ui.small_button("All").clicked() {
                filter.select_all(schema);
            }
            if ui.small_button("None").clicked() {
                filter.select_none();
            }
        });

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt("region_filter")
                    .max_height(220.0)
                    .show(ui, |ui| {
                        for region in &schema.regions {
                            let mut checked = filter.regions.contains(region);
                            if ui.checkbox(&mut checked, region).changed() {
                                filter.toggle_region(region);
                            }
                        }
                    });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Population Range =====
        ui.label(RichText::new("👥 Current Student Population").size(14.0).strong());
        ui.add_space(5.0);

        let (lo, hi) = schema.population_bounds;
        if ui
            .add(egui::Slider::new(&mut filter.min_population, lo..=hi).text("min"))
            .changed()
        {
            filter.clamp_bounds(schema, true);
        }
        if ui
            .add(egui::Slider::new(&mut filter.max_population, lo..=hi).text("max"))
            .changed()
        {
            filter.clamp_bounds(schema, false);
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Summary =====
        ui.label(RichText::new("📈 Summary").size(14.0).strong());
        ui.add_space(5.0);
        if let Some(view) = view {
            ui.label(format!("Regions shown: {}", view.region_count));
            Self::stats_grid(ui, "summary_population", "Student population", view.population.as_ref());
            ui.add_space(5.0);
            Self::stats_grid(ui, "summary_est_grads", "Est. 2024 graduates", view.est_grads.as_ref());
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(!self.exporting, |ui| {
                let button = egui::Button::new(RichText::new("🖼 Export charts").size(14.0))
                    .min_size(egui::vec2(180.0, 30.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::ExportCharts;
                }
            });
        });

        self.progress_section(ui);
        action
    }

    fn stats_grid(ui: &mut egui::Ui, id: &str, title: &str, stats: Option<&SummaryStats>) {
        ui.label(RichText::new(title).size(12.0).strong());
        let value = |f: fn(&SummaryStats) -> f64| {
            stats.map_or_else(|| "–".to_string(), |s| format_number(f(s)))
        };

        egui::Grid::new(id)
            .num_columns(2)
            .spacing([20.0, 2.0])
            .show(ui, |ui| {
                ui.label("Rows");
                ui.label(stats.map_or_else(|| "–".to_string(), |s| s.count.to_string()));
                ui.end_row();
                ui.label("Total");
                ui.label(value(|s| s.total));
                ui.end_row();
                ui.label("Mean");
                ui.label(value(|s| s.mean));
                ui.end_row();
                ui.label("Median");
                ui.label(value(|s| s.median));
                ui.end_row();
                ui.label("Std. dev.");
                ui.label(value(|s| s.std));
                ui.end_row();
                ui.label("Min / Max");
                ui.label(format!("{} / {}", value(|s| s.min), value(|s| s.max)));
                ui.end_row();
            });
    }

    fn progress_section(&self, ui: &mut egui::Ui) {
        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);

        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.exporting),
        );

        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Complete") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    Reload,
    OpenCsv,
    ExportCharts,
}
