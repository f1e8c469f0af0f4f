//! Chart Plotter Module
//! Draws the dashboard chart views interactively using egui_plot.

use crate::charts::views::{BarChartView, BarMode, HistogramView, LineChartView, PieView};
use crate::data::format_number;
use egui::{Color32, RichText};
use egui_plot::{
    Bar, BarChart, GridMark, Legend, Line, MarkerShape, Plot, PlotPoint, PlotPoints, Points,
    Polygon, Text,
};

/// Qualitative palette, one color per series.
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(99, 110, 250),  // Blue
    Color32::from_rgb(239, 85, 59),   // Red
    Color32::from_rgb(0, 204, 150),   // Green
    Color32::from_rgb(171, 99, 250),  // Purple
    Color32::from_rgb(255, 161, 90),  // Orange
    Color32::from_rgb(25, 211, 243),  // Cyan
    Color32::from_rgb(255, 102, 146), // Pink
    Color32::from_rgb(182, 232, 128), // Lime
    Color32::from_rgb(255, 151, 255), // Magenta
    Color32::from_rgb(254, 203, 82),  // Yellow
];

pub const CHART_HEIGHT: f32 = 320.0;
pub const PIE_SIZE: f32 = 220.0;

/// Segments used to approximate a full circle.
const PIE_SEGMENTS: usize = 96;

/// Creates the dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn series_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Grid marks at every category index so labels line up with bars.
    fn category_marks(count: usize) -> Vec<GridMark> {
        (0..count)
            .map(|i| GridMark {
                value: i as f64,
                step_size: 1.0,
            })
            .collect()
    }

    fn category_label(labels: &[String], value: f64) -> String {
        let idx = value.round();
        if (value - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        labels.get(idx as usize).cloned().unwrap_or_default()
    }

    fn bar_tooltip(bar: &Bar, _chart: &BarChart) -> String {
        bar.name.clone()
    }

    /// Centered "No data" message in place of a chart.
    pub fn draw_placeholder(ui: &mut egui::Ui, message: &str, height: f32) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .show(ui, |ui| {
                ui.set_height(height);
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new(message).size(14.0).color(Color32::GRAY));
                });
            });
    }

    pub fn draw_error(ui: &mut egui::Ui, message: &str) {
        ui.label(
            RichText::new(format!("⚠ {message}"))
                .size(13.0)
                .color(Color32::from_rgb(220, 53, 69)),
        );
    }

    /// Grouped or stacked bar chart with region categories on the x axis.
    pub fn draw_bar_chart(ui: &mut egui::Ui, id: &str, view: &BarChartView) {
        if view.categories.is_empty() {
            Self::draw_placeholder(ui, "No data", CHART_HEIGHT);
            return;
        }

        let labels = view.categories.clone();
        let n_categories = view.categories.len();
        let n_series = view.series.len().max(1);

        // Grouped bars split the category slot; stacked bars share it
        let slot = 0.8;
        let bar_width = match view.mode {
            BarMode::Group => slot / n_series as f64,
            BarMode::Stack => slot,
        };

        Plot::new(id)
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label(view.x_title.clone())
            .y_axis_label(view.y_title.clone())
            .include_y(0.0)
            .x_grid_spacer(move |_input| Self::category_marks(n_categories))
            .x_axis_formatter(move |mark, _range| Self::category_label(&labels, mark.value))
            .show(ui, |plot_ui| {
                // Running top of each stacked column
                let mut bases = vec![0.0; n_categories];

                for (s, series) in view.series.iter().enumerate() {
                    let color = Self::series_color(s);
                    let offset = match view.mode {
                        BarMode::Group => -slot / 2.0 + bar_width * (s as f64 + 0.5),
                        BarMode::Stack => 0.0,
                    };

                    let bars: Vec<Bar> = series
                        .values
                        .iter()
                        .enumerate()
                        .map(|(i, &v)| {
                            let v = if v.is_nan() { 0.0 } else { v };
                            let mut bar = Bar::new(i as f64 + offset, v)
                                .width(bar_width)
                                .name(format!(
                                    "{}\n{}: {}",
                                    view.categories[i],
                                    series.name,
                                    format_number(v)
                                ));
                            if view.mode == BarMode::Stack {
                                bar = bar.base_offset(bases[i]);
                                bases[i] += v;
                            }
                            bar
                        })
                        .collect();

                    plot_ui.bar_chart(
                        BarChart::new(bars)
                            .name(&series.name)
                            .color(color)
                            .width(bar_width)
                            .element_formatter(Box::new(Self::bar_tooltip)),
                    );
                }
            });
    }

    /// Multi-series line chart with markers over categorical x labels.
    pub fn draw_line_chart(ui: &mut egui::Ui, id: &str, view: &LineChartView) {
        if view.series.is_empty() || view.x_labels.is_empty() {
            Self::draw_placeholder(ui, "No data", CHART_HEIGHT);
            return;
        }

        let labels = view.x_labels.clone();
        let n_labels = view.x_labels.len();

        Plot::new(id)
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label(view.x_title.clone())
            .y_axis_label(view.y_title.clone())
            .x_grid_spacer(move |_input| Self::category_marks(n_labels))
            .x_axis_formatter(move |mark, _range| Self::category_label(&labels, mark.value))
            .show(ui, |plot_ui| {
                for (s, series) in view.series.iter().enumerate() {
                    let color = Self::series_color(s);
                    let points: Vec<[f64; 2]> = series
                        .values
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| !v.is_nan())
                        .map(|(i, &v)| [i as f64, v])
                        .collect();

                    plot_ui.line(
                        Line::new(PlotPoints::from_iter(points.iter().copied()))
                            .color(color)
                            .width(2.0)
                            .name(&series.name),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter(points.iter().copied()))
                            .shape(MarkerShape::Circle)
                            .radius(4.0)
                            .color(color)
                            .name(&series.name),
                    );
                }
            });
    }

    /// Histogram bars spanning each bin.
    pub fn draw_histogram(ui: &mut egui::Ui, id: &str, view: &HistogramView) {
        if view.bins.is_empty() {
            Self::draw_placeholder(ui, "No data", CHART_HEIGHT);
            return;
        }

        let color = Self::series_color(0);
        let bars: Vec<Bar> = view
            .bins
            .iter()
            .map(|bin| {
                Bar::new(bin.center(), bin.count as f64)
                    .width(bin.width())
                    .name(format!(
                        "{} - {}\ncount: {}",
                        format_number(bin.start),
                        format_number(bin.end),
                        bin.count
                    ))
            })
            .collect();

        Plot::new(id)
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label(view.x_title.clone())
            .y_axis_label("count")
            .include_y(0.0)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .color(color)
                        .element_formatter(Box::new(Self::bar_tooltip)),
                );
            });
    }

    /// Pie drawn as filled wedge polygons on an equal-aspect plot.
    pub fn draw_pie(ui: &mut egui::Ui, id: &str, view: &PieView) {
        let slices = view.drawable_slices();
        let total: f64 = slices.iter().map(|(_, v)| v).sum();

        if total <= 0.0 {
            Self::draw_placeholder(ui, "No population", PIE_SIZE);
        } else {
            Plot::new(id)
                .height(PIE_SIZE)
                .width(PIE_SIZE)
                .data_aspect(1.0)
                .show_axes(false)
                .show_grid(false)
                .show_x(false)
                .show_y(false)
                .allow_zoom(false)
                .allow_drag(false)
                .allow_scroll(false)
                .allow_boxed_zoom(false)
                .include_x(-1.1)
                .include_x(1.1)
                .include_y(-1.1)
                .include_y(1.1)
                .show(ui, |plot_ui| {
                    let mut start = std::f64::consts::FRAC_PI_2;
                    for &(idx, value) in &slices {
                        let fraction = value / total;
                        let sweep = fraction * std::f64::consts::TAU;
                        let color = Self::series_color(idx);

                        plot_ui.polygon(
                            Polygon::new(PlotPoints::new(Self::wedge(start, sweep)))
                                .fill_color(color)
                                .stroke(egui::Stroke::new(1.0, Color32::WHITE))
                                .name(&view.slices[idx].0),
                        );

                        let mid = start - sweep / 2.0;
                        plot_ui.text(Text::new(
                            PlotPoint::new(0.6 * mid.cos(), 0.6 * mid.sin()),
                            RichText::new(format!("{:.1}%", fraction * 100.0))
                                .color(Color32::WHITE)
                                .strong(),
                        ));

                        start -= sweep;
                    }
                });
        }

        // Legend lists raw values, including slices too small or negative to draw
        ui.horizontal_wrapped(|ui| {
            for (i, (name, value)) in view.slices.iter().enumerate() {
                let (rect, _) =
                    ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 2.0, Self::series_color(i));
                ui.label(RichText::new(format!("{name}: {}", format_number(*value))).size(12.0));
                ui.add_space(6.0);
            }
        });
    }

    /// Closed wedge outline, clockwise from `start` (radians).
    fn wedge(start: f64, sweep: f64) -> Vec<[f64; 2]> {
        let steps = ((sweep / std::f64::consts::TAU) * PIE_SEGMENTS as f64)
            .ceil()
            .max(1.0) as usize;
        let mut points = Vec::with_capacity(steps + 2);
        points.push([0.0, 0.0]);
        for i in 0..=steps {
            let angle = start - sweep * i as f64 / steps as f64;
            points.push([angle.cos(), angle.sin()]);
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_label_only_on_integers() {
        let labels = vec!["North".to_string(), "South".to_string()];
        assert_eq!(ChartPlotter::category_label(&labels, 1.0), "South");
        assert_eq!(ChartPlotter::category_label(&labels, 0.5), "");
        assert_eq!(ChartPlotter::category_label(&labels, 2.0), "");
        assert_eq!(ChartPlotter::category_label(&labels, -1.0), "");
    }

    #[test]
    fn test_wedge_starts_at_center_and_spans_sweep() {
        let points = ChartPlotter::wedge(0.0, std::f64::consts::PI);
        assert_eq!(points[0], [0.0, 0.0]);
        let first = points[1];
        let last = points[points.len() - 1];
        assert!((first[0] - 1.0).abs() < 1e-9);
        assert!((last[0] + 1.0).abs() < 1e-9);
    }
}
