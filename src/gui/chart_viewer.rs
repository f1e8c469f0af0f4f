//! Chart Viewer Widget
//! The five dashboard charts in fixed order, each in its own card.

use crate::charts::{ChartPlotter, ChartSet, Derived, CHART_HEIGHT, PIE_SIZE};
use egui::{Color32, RichText};

const CARD_SPACING: f32 = 15.0;

#[derive(Default)]
pub struct ChartViewer;

impl ChartViewer {
    pub fn new() -> Self {
        Self
    }

    pub fn show(&self, ui: &mut egui::Ui, charts: &ChartSet) {
        Self::card(ui, "Graduates vs Entrants by Region", &charts.graduates_vs_entrants, |ui, view| {
            ChartPlotter::draw_bar_chart(ui, "graduates_vs_entrants", view);
        });

        Self::card(ui, "Preschool Duration Distribution", &charts.preschool, |ui, view| {
            ChartPlotter::draw_bar_chart(ui, "preschool_duration", view);
        });

        Self::card(ui, "Gender Distribution", &charts.gender, |ui, pies| {
            if pies.is_empty() {
                ChartPlotter::draw_placeholder(ui, "No data", CHART_HEIGHT / 2.0);
                return;
            }
            ui.horizontal_wrapped(|ui| {
                for (i, pie) in pies.iter().enumerate() {
                    ui.vertical(|ui| {
                        ui.set_width(PIE_SIZE + 20.0);
                        ui.label(RichText::new(&pie.title).size(13.0).strong());
                        ChartPlotter::draw_pie(ui, &format!("gender_pie_{i}"), pie);
                    });
                    ui.add_space(CARD_SPACING);
                }
            });
        });

        Self::card(ui, "Grade-wise Student Numbers", &charts.grades, |ui, view| {
            ChartPlotter::draw_line_chart(ui, "grade_students", view);
        });

        Self::card(
            ui,
            "Distribution of Estimated 2024 Graduates",
            &charts.est_grads,
            |ui, view| {
                ChartPlotter::draw_histogram(ui, "est_2024_grads", view);
            },
        );
    }

    /// Titled frame around one chart; a failed derivation shows its error instead.
    fn card<T>(
        ui: &mut egui::Ui,
        title: &str,
        view: &Derived<T>,
        draw: impl FnOnce(&mut egui::Ui, &T),
    ) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_gray(90)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(title).size(16.0).strong());
                ui.add_space(6.0);
                match view {
                    Ok(view) => draw(ui, view),
                    Err(message) => ChartPlotter::draw_error(ui, message),
                }
            });
        ui.add_space(CARD_SPACING);
    }
}
