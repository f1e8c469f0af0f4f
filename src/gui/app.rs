//! Student Dashboard Main Application
//! Main window with the filter sidebar, the data grid and the chart viewer.

use crate::charts::{export_charts, export_jobs, ChartSet};
use crate::config::DashboardConfig;
use crate::data::{DataLoader, FilterState};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction, DataGrid};
use crate::view::DashboardView;
use anyhow::Context;
use egui::{Color32, RichText, SidePanel};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

/// Export result from background thread
enum ExportResult {
    Progress(f32, String),
    Complete { folder: PathBuf, count: usize },
    Error(String),
}

/// Outcome of draining the export channel once.
#[derive(Debug, PartialEq)]
enum ExportPoll {
    Pending,
    /// The export ended; carries the folder on success.
    Finished(Option<PathBuf>),
}

/// Apply every queued export message to the panel.
fn poll_export(rx: &Receiver<ExportResult>, panel: &mut ControlPanel) -> ExportPoll {
    loop {
        match rx.try_recv() {
            Ok(ExportResult::Progress(progress, status)) => panel.set_progress(progress, &status),
            Ok(ExportResult::Complete { folder, count }) => {
                panel.set_progress(100.0, &format!("Complete! {} charts exported", count));
                panel.exporting = false;
                return ExportPoll::Finished(Some(folder));
            }
            Ok(ExportResult::Error(e)) => {
                error!("Export failed: {}", e);
                panel.set_progress(0.0, &format!("Error: {}", e));
                panel.exporting = false;
                return ExportPoll::Finished(None);
            }
            Err(TryRecvError::Empty) => return ExportPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                error!("Export thread stopped without reporting a result");
                panel.set_progress(0.0, "Error: export thread stopped");
                panel.exporting = false;
                return ExportPoll::Finished(None);
            }
        }
    }
}

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    loader: DataLoader,
    load_error: Option<String>,

    /// Current sidebar selection, edited in place by the control panel.
    filter: Option<FilterState>,
    /// Selection the current view was derived from.
    applied_filter: Option<FilterState>,
    view: Option<DashboardView>,
    view_error: Option<String>,

    control_panel: ControlPanel,
    data_grid: DataGrid,
    chart_viewer: ChartViewer,

    // Async export
    export_rx: Option<Receiver<ExportResult>>,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let mut app = Self {
            loader: DataLoader::new(),
            load_error: None,
            filter: None,
            applied_filter: None,
            view: None,
            view_error: None,
            control_panel: ControlPanel::new(),
            data_grid: DataGrid::new(config.page_size, config.grid_height),
            chart_viewer: ChartViewer::new(),
            export_rx: None,
            config,
        };
        let path = app.config.data_path.clone();
        app.load_dataset(&path);
        app
    }

    /// Drop everything derived from the previous file.
    fn clear_derived(&mut self) {
        self.filter = None;
        self.applied_filter = None;
        self.view = None;
        self.view_error = None;
        self.data_grid.reset();
    }

    /// Load `path` and reset filters to their defaults.
    fn load_dataset(&mut self, path: &Path) {
        self.clear_derived();
        let result = self
            .loader
            .load_csv(path)
            .map(|_| ())
            .with_context(|| format!("Failed to load {}", path.display()));
        self.finish_load(result);
    }

    fn finish_load(&mut self, result: anyhow::Result<()>) {
        match result {
            Ok(()) => {
                self.load_error = None;
                self.filter = self.loader.get_schema().map(FilterState::defaults);
                self.control_panel.set_progress(
                    0.0,
                    &format!(
                        "Loaded {} rows, {} columns",
                        self.loader.get_row_count(),
                        self.loader.get_columns().len()
                    ),
                );
            }
            Err(e) => {
                error!("{:#}", e);
                self.load_error = Some(format!("{:#}", e));
                self.control_panel.set_progress(0.0, "Error: dataset not loaded");
            }
        }
    }

    fn handle_reload(&mut self) {
        if self.loader.get_file_path().is_none() {
            let path = self.config.data_path.clone();
            self.load_dataset(&path);
            return;
        }

        info!("Reloading dataset");
        self.clear_derived();
        let result = self
            .loader
            .reload()
            .map(|_| ())
            .context("Failed to reload the dataset");
        self.finish_load(result);
    }

    fn handle_open_csv(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.load_dataset(&path);
        }
    }

    /// Re-derive the view when the selection differs from the one it was built from.
    fn refresh_view(&mut self) {
        let (Some(filter), Some(df), Some(schema)) = (
            self.filter.as_ref(),
            self.loader.get_dataframe(),
            self.loader.get_schema(),
        ) else {
            return;
        };
        if self.applied_filter.as_ref() == Some(filter) {
            return;
        }

        self.data_grid.invalidate();
        match DashboardView::derive(df, schema, filter, &self.config) {
            Ok(view) => {
                self.view = Some(view);
                self.view_error = None;
            }
            Err(e) => {
                error!("{:#}", e);
                self.view = None;
                self.view_error = Some(format!("{:#}", e));
            }
        }
        self.applied_filter = Some(filter.clone());
    }

    /// Start PNG export of the current charts in a background thread
    fn handle_export_charts(&mut self) {
        if self.control_panel.exporting {
            return;
        }
        let Some(view) = &self.view else {
            self.control_panel.set_progress(0.0, "No charts to export");
            return;
        };

        let Some(folder) = rfd::FileDialog::new()
            .set_title("Choose export folder")
            .pick_folder()
        else {
            return; // User cancelled
        };

        let charts: Arc<ChartSet> = Arc::clone(&view.charts);
        let (width, height) = (self.config.export_width, self.config.export_height);
        let (tx, rx) = channel();
        self.export_rx = Some(rx);
        self.control_panel.exporting = true;
        self.control_panel.set_progress(5.0, "Rendering charts...");

        thread::spawn(move || {
            let jobs = export_jobs(&charts);
            let result = export_charts(&jobs, &folder, width, height, |done, total| {
                let progress = 10.0 + 90.0 * done as f32 / total as f32;
                let _ = tx.send(ExportResult::Progress(
                    progress,
                    format!("Writing chart {}/{}...", done, total),
                ));
            });

            let message = match result {
                Ok(files) => ExportResult::Complete {
                    folder,
                    count: files.len(),
                },
                Err(e) => ExportResult::Error(e.to_string()),
            };
            let _ = tx.send(message);
        });
    }

    /// Check for export results
    fn check_export_results(&mut self) {
        let Some(rx) = self.export_rx.take() else {
            return;
        };

        match poll_export(&rx, &mut self.control_panel) {
            ExportPoll::Pending => self.export_rx = Some(rx),
            ExportPoll::Finished(Some(folder)) => {
                if let Err(e) = open::that(&folder) {
                    warn!("Could not open {}: {}", folder.display(), e);
                }
            }
            ExportPoll::Finished(None) => {}
        }
    }

    fn show_main(&mut self, ui: &mut egui::Ui) {
        ui.heading(RichText::new("📊 Student Data by Region").size(26.0).strong());
        ui.add_space(8.0);

        for message in [&self.load_error, &self.view_error].into_iter().flatten() {
            ui.label(
                RichText::new(format!("⚠ {message}"))
                    .size(14.0)
                    .color(Color32::from_rgb(220, 53, 69)),
            );
        }

        if let Some(view) = &self.view {
            ui.add_space(8.0);
            ui.label(RichText::new("📋 Filtered Data Table").size(18.0).strong());
            self.data_grid.show(ui, &view.filtered);

            ui.add_space(16.0);
            ui.label(RichText::new("📈 Visual Analytics").size(18.0).strong());
            ui.add_space(8.0);
            self.chart_viewer.show(ui, &view.charts);
        }

        ui.add_space(10.0);
        ui.separator();
        ui.label(
            RichText::new("Dashboard built with ❤ using egui and polars")
                .size(11.0)
                .color(Color32::GRAY),
        );
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_export_results();

        if self.control_panel.exporting {
            ctx.request_repaint();
        }

        // Left panel - filters
        let mut action = ControlPanelAction::None;
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    action = self.control_panel.show(
                        ui,
                        self.loader.get_file_path().map(|p| p.as_path()),
                        self.loader.get_schema(),
                        self.filter.as_mut(),
                        self.view.as_ref(),
                    );
                });
            });

        match action {
            ControlPanelAction::Reload => self.handle_reload(),
            ControlPanelAction::OpenCsv => self.handle_open_csv(),
            ControlPanelAction::ExportCharts => self.handle_export_charts(),
            ControlPanelAction::None => {}
        }

        // Filters changed above are applied before the main area is painted
        self.refresh_view();

        // Central panel - grid and charts
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| self.show_main(ui));
        });
    }
}
