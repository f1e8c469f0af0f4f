//! Static Chart Renderer
//! Renders the dashboard chart views off screen with plotters and encodes
//! them as PNG bytes for export.
//!
//! Layout of every image:
//! 1. Title centered at the top
//! 2. Plot area with axis titles
//! 3. Legend in the upper-right corner (bar/line charts) or beside the pie

use crate::charts::views::{BarChartView, BarMode, HistogramView, LineChartView, PieView};
use crate::config::{MAX_EXPORT_SIDE, MIN_EXPORT_SIDE};
use crate::data::format_number;
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Image buffer has the wrong size")]
    Buffer,
    #[error("Image size {width}x{height} is outside {MIN_EXPORT_SIDE}..={MAX_EXPORT_SIDE} pixels per side")]
    Size { width: u32, height: u32 },
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

// Same palette as the on-screen plotter
const PALETTE: [RGBColor; 10] = [
    RGBColor(99, 110, 250),
    RGBColor(239, 85, 59),
    RGBColor(0, 204, 150),
    RGBColor(171, 99, 250),
    RGBColor(255, 161, 90),
    RGBColor(25, 211, 243),
    RGBColor(255, 102, 146),
    RGBColor(182, 232, 128),
    RGBColor(255, 151, 255),
    RGBColor(254, 203, 82),
];

const FONT: &str = "sans-serif";

fn color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render into an RGB buffer and encode it as PNG.
    fn render_png<F>(width: u32, height: u32, draw: F) -> Result<Vec<u8>, RenderError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend, Shift>) -> Result<(), RenderError>,
    {
        let sides = MIN_EXPORT_SIDE..=MAX_EXPORT_SIDE;
        if !sides.contains(&width) || !sides.contains(&height) {
            return Err(RenderError::Size { width, height });
        }

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            draw(&root)?;
            root.present().map_err(draw_err)?;
        }

        let img = RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer)?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn draw_no_data(
        root: &DrawingArea<BitMapBackend, Shift>,
        title: &str,
    ) -> Result<(), RenderError> {
        let (w, h) = root.dim_in_pixel();
        root.draw(&Text::new(
            title.to_string(),
            (20, 20),
            (FONT, 26).into_font(),
        ))
        .map_err(draw_err)?;
        root.draw(&Text::new(
            "No data".to_string(),
            (w as i32 / 2 - 40, h as i32 / 2),
            (FONT, 22).into_font().color(&RGBColor(150, 150, 150)),
        ))
        .map_err(draw_err)?;
        Ok(())
    }

    /// Upper bound of the y axis with a little headroom.
    fn y_max(values: impl Iterator<Item = f64>) -> f64 {
        let max = values.filter(|v| v.is_finite()).fold(0.0, f64::max);
        if max <= 0.0 {
            1.0
        } else {
            max * 1.08
        }
    }

    pub fn render_bar_chart(view: &BarChartView, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        Self::render_png(width, height, |root| {
            if view.categories.is_empty() {
                return Self::draw_no_data(root, &view.title);
            }

            let n = view.categories.len();
            let y_max = match view.mode {
                BarMode::Group => Self::y_max(view.series.iter().flat_map(|s| s.values.iter().copied())),
                BarMode::Stack => Self::y_max((0..n).map(|i| {
                    view.series
                        .iter()
                        .map(|s| s.values[i])
                        .filter(|v| v.is_finite())
                        .sum::<f64>()
                })),
            };

            let labels = view.categories.clone();
            let mut chart = ChartBuilder::on(root)
                .caption(&view.title, (FONT, 26))
                .margin(20)
                .x_label_area_size(60)
                .y_label_area_size(70)
                .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(n + 1)
                .x_label_formatter(&|x| category_label(&labels, *x))
                .x_desc(view.x_title.as_str())
                .y_desc(view.y_title.as_str())
                .draw()
                .map_err(draw_err)?;

            let slot = 0.8;
            let n_series = view.series.len().max(1);
            let bar_width = match view.mode {
                BarMode::Group => slot / n_series as f64,
                BarMode::Stack => slot,
            };
            let mut bases = vec![0.0; n];

            for (s, series) in view.series.iter().enumerate() {
                let c = color(s);
                let offset = match view.mode {
                    BarMode::Group => -slot / 2.0 + bar_width * s as f64,
                    BarMode::Stack => -slot / 2.0,
                };

                let rects: Vec<Rectangle<(f64, f64)>> = series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let v = if v.is_finite() { v } else { 0.0 };
                        let base = if view.mode == BarMode::Stack { bases[i] } else { 0.0 };
                        if view.mode == BarMode::Stack {
                            bases[i] += v;
                        }
                        let x0 = i as f64 + offset;
                        Rectangle::new([(x0, base), (x0 + bar_width, base + v)], c.filled())
                    })
                    .collect();

                chart
                    .draw_series(rects)
                    .map_err(draw_err)?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], c.filled()));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;
            Ok(())
        })
    }

    pub fn render_line_chart(view: &LineChartView, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        Self::render_png(width, height, |root| {
            if view.series.is_empty() || view.x_labels.is_empty() {
                return Self::draw_no_data(root, &view.title);
            }

            let n = view.x_labels.len();
            let y_max = Self::y_max(view.series.iter().flat_map(|s| s.values.iter().copied()));
            let labels = view.x_labels.clone();

            let mut chart = ChartBuilder::on(root)
                .caption(&view.title, (FONT, 26))
                .margin(20)
                .x_label_area_size(60)
                .y_label_area_size(70)
                .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_labels(n + 1)
                .x_label_formatter(&|x| category_label(&labels, *x))
                .x_desc(view.x_title.as_str())
                .y_desc(view.y_title.as_str())
                .draw()
                .map_err(draw_err)?;

            for (s, series) in view.series.iter().enumerate() {
                let c = color(s);
                let points: Vec<(f64, f64)> = series
                    .values
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.is_finite())
                    .map(|(i, &v)| (i as f64, v))
                    .collect();

                chart
                    .draw_series(LineSeries::new(points.clone(), c.stroke_width(2)))
                    .map_err(draw_err)?
                    .label(series.name.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], c.stroke_width(2)));

                chart
                    .draw_series(points.into_iter().map(|p| Circle::new(p, 4, c.filled())))
                    .map_err(draw_err)?;
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.85))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;
            Ok(())
        })
    }

    pub fn render_histogram(view: &HistogramView, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        Self::render_png(width, height, |root| {
            let (Some(first), Some(last)) = (view.bins.first(), view.bins.last()) else {
                return Self::draw_no_data(root, &view.title);
            };

            let y_max = Self::y_max(view.bins.iter().map(|b| b.count as f64));
            let mut chart = ChartBuilder::on(root)
                .caption(&view.title, (FONT, 26))
                .margin(20)
                .x_label_area_size(60)
                .y_label_area_size(70)
                .build_cartesian_2d(first.start..last.end, 0f64..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_label_formatter(&|x| format_number(x.round()))
                .x_desc(view.x_title.as_str())
                .y_desc("count")
                .draw()
                .map_err(draw_err)?;

            let c = color(0);
            chart
                .draw_series(view.bins.iter().map(|bin| {
                    Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], c.filled())
                }))
                .map_err(draw_err)?;
            chart
                .draw_series(view.bins.iter().map(|bin| {
                    Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], WHITE.stroke_width(1))
                }))
                .map_err(draw_err)?;
            Ok(())
        })
    }

    pub fn render_pie(view: &PieView, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        Self::render_png(width, height, |root| {
            let slices = view.drawable_slices();
            if slices.is_empty() {
                return Self::draw_no_data(root, &view.title);
            }

            let (w, h) = root.dim_in_pixel();
            root.draw(&Text::new(view.title.clone(), (20, 20), (FONT, 26).into_font()))
                .map_err(draw_err)?;

            let center = (w as i32 / 2, h as i32 / 2 + 20);
            let radius = (w.min(h) as f64) * 0.35;
            let sizes: Vec<f64> = slices.iter().map(|(_, v)| *v).collect();
            let colors: Vec<RGBColor> = slices.iter().map(|(i, _)| color(*i)).collect();
            let labels: Vec<String> = slices
                .iter()
                .map(|(i, _)| view.slices[*i].0.clone())
                .collect();

            let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
            pie.start_angle(-90.0);
            pie.label_style((FONT, 20).into_font().color(&BLACK));
            pie.percentages((FONT, 18).into_font().color(&WHITE));
            root.draw(&pie).map_err(draw_err)?;

            // Raw values, including anything not drawn as a wedge
            for (i, (name, value)) in view.slices.iter().enumerate() {
                let y = 70 + i as i32 * 30;
                root.draw(&Rectangle::new([(20, y), (36, y + 16)], color(i).filled()))
                    .map_err(draw_err)?;
                root.draw(&Text::new(
                    format!("{name}: {}", format_number(*value)),
                    (44, y),
                    (FONT, 18).into_font(),
                ))
                .map_err(draw_err)?;
            }
            Ok(())
        })
    }
}

fn category_label(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}
