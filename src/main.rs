//! Student Data Dashboard
//!
//! Interactive dashboard over a CSV of student statistics by region.

mod charts;
mod config;
mod data;
mod gui;
mod stats;
mod view;

use config::{DashboardConfig, CONFIG_FILE};
use eframe::egui;
use gui::DashboardApp;
use std::path::Path;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = DashboardConfig::load_or_default(Path::new(CONFIG_FILE));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 650.0])
            .with_title("Student Data Dashboard"),
        ..Default::default()
    };

    eframe::run_native(
        "Student Data Dashboard",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
}
