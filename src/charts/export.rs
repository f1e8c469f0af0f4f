//! Chart Export
//! Turns the current chart set into numbered PNG files in a folder.

use crate::charts::renderer::{RenderError, StaticChartRenderer};
use crate::charts::views::{BarChartView, ChartSet, HistogramView, LineChartView, PieView};
use log::{info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to render {file}: {source}")]
    Render {
        file: String,
        #[source]
        source: RenderError,
    },
    #[error("No charts to export")]
    Empty,
}

/// One chart snapshot owned by the export thread.
#[derive(Debug, Clone)]
pub enum ExportChart {
    Bar(BarChartView),
    Line(LineChartView),
    Pie(PieView),
    Histogram(HistogramView),
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    pub file_name: String,
    pub chart: ExportChart,
}

impl ExportJob {
    fn render(&self, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        match &self.chart {
            ExportChart::Bar(view) => StaticChartRenderer::render_bar_chart(view, width, height),
            ExportChart::Line(view) => StaticChartRenderer::render_line_chart(view, width, height),
            ExportChart::Pie(view) => StaticChartRenderer::render_pie(view, width, height),
            ExportChart::Histogram(view) => {
                StaticChartRenderer::render_histogram(view, width, height)
            }
        }
    }
}

/// Lowercase file-name fragment: alphanumerics kept, runs of anything else become `_`.
pub fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "region".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Jobs for every chart that derived successfully, in dashboard order.
pub fn export_jobs(charts: &ChartSet) -> Vec<ExportJob> {
    let mut jobs = Vec::new();

    match &charts.graduates_vs_entrants {
        Ok(view) => jobs.push(ExportJob {
            file_name: "01_graduates_vs_entrants.png".to_string(),
            chart: ExportChart::Bar(view.clone()),
        }),
        Err(e) => warn!("Skipping graduates chart: {}", e),
    }
    match &charts.preschool {
        Ok(view) => jobs.push(ExportJob {
            file_name: "02_preschool_duration.png".to_string(),
            chart: ExportChart::Bar(view.clone()),
        }),
        Err(e) => warn!("Skipping preschool chart: {}", e),
    }
    match &charts.gender {
        Ok(pies) => {
            let mut used: Vec<String> = Vec::new();
            for pie in pies {
                // Repeated regions get a numeric suffix
                let base = format!("03_gender_{}", slug(&pie.region));
                let mut name = base.clone();
                let mut n = 2;
                while used.contains(&name) {
                    name = format!("{base}_{n}");
                    n += 1;
                }
                used.push(name.clone());
                jobs.push(ExportJob {
                    file_name: format!("{name}.png"),
                    chart: ExportChart::Pie(pie.clone()),
                });
            }
        }
        Err(e) => warn!("Skipping gender charts: {}", e),
    }
    match &charts.grades {
        Ok(view) => jobs.push(ExportJob {
            file_name: "04_grade_students.png".to_string(),
            chart: ExportChart::Line(view.clone()),
        }),
        Err(e) => warn!("Skipping grade chart: {}", e),
    }
    match &charts.est_grads {
        Ok(view) => jobs.push(ExportJob {
            file_name: "05_est_2024_grads.png".to_string(),
            chart: ExportChart::Histogram(view.clone()),
        }),
        Err(e) => warn!("Skipping histogram: {}", e),
    }

    jobs
}

/// Render all jobs in parallel, then write them to `folder`.
/// `on_written` is called after each file with (written, total).
pub fn export_charts(
    jobs: &[ExportJob],
    folder: &Path,
    width: u32,
    height: u32,
    mut on_written: impl FnMut(usize, usize),
) -> Result<Vec<PathBuf>, ExportError> {
    if jobs.is_empty() {
        return Err(ExportError::Empty);
    }

    let rendered: Vec<(String, Vec<u8>)> = jobs
        .par_iter()
        .map(|job| {
            job.render(width, height)
                .map(|bytes| (job.file_name.clone(), bytes))
                .map_err(|source| ExportError::Render {
                    file: job.file_name.clone(),
                    source,
                })
        })
        .collect::<Result<_, _>>()?;

    fs::create_dir_all(folder).map_err(|source| ExportError::Io {
        file: folder.to_path_buf(),
        source,
    })?;

    let total = rendered.len();
    let mut written = Vec::with_capacity(total);
    for (file_name, bytes) in rendered {
        let path = folder.join(&file_name);
        fs::write(&path, bytes).map_err(|source| ExportError::Io {
            file: path.clone(),
            source,
        })?;
        written.push(path);
        on_written(written.len(), total);
    }

    info!("Exported {} charts to {}", total, folder.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::views::{BarMode, NamedSeries};

    fn bar(title: &str) -> BarChartView {
        BarChartView {
            title: title.to_string(),
            x_title: "region".to_string(),
            y_title: "value".to_string(),
            categories: vec!["North".to_string()],
            series: vec![NamedSeries {
                name: "graduates".to_string(),
                values: vec![1.0],
            }],
            mode: BarMode::Group,
        }
    }

    fn pie(region: &str) -> PieView {
        PieView {
            title: format!("Gender Ratio in {region}"),
            region: region.to_string(),
            slices: vec![("Female".to_string(), 1.0), ("Male".to_string(), 1.0)],
        }
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("North Kazakhstan"), "north_kazakhstan");
        assert_eq!(slug("  Almaty (city) "), "almaty_city");
        assert_eq!(slug("***"), "region");
    }

    #[test]
    fn test_export_jobs_order_and_names() {
        let set = ChartSet {
            graduates_vs_entrants: Ok(bar("a")),
            preschool: Err("missing column: no_preschool".to_string()),
            gender: Ok(vec![pie("North"), pie("North"), pie("South")]),
            grades: Err("missing".to_string()),
            est_grads: Ok(HistogramView {
                title: "h".to_string(),
                x_title: "est_2024_grads".to_string(),
                bins: Vec::new(),
            }),
        };

        let names: Vec<String> = export_jobs(&set).into_iter().map(|j| j.file_name).collect();
        assert_eq!(
            names,
            vec![
                "01_graduates_vs_entrants.png",
                "03_gender_north.png",
                "03_gender_north_2.png",
                "03_gender_south.png",
                "05_est_2024_grads.png",
            ]
        );
    }

    #[test]
    fn test_export_without_jobs_is_an_error() {
        let result = export_charts(&[], Path::new("unused"), 800, 600, |_, _| {});
        assert!(matches!(result, Err(ExportError::Empty)));
    }

    #[test]
    fn test_export_writes_png_files_with_progress() {
        let folder = std::env::temp_dir().join(format!("student_dashboard_export_{}", std::process::id()));
        let _ = fs::remove_dir_all(&folder);

        let set = ChartSet {
            graduates_vs_entrants: Ok(bar("Graduates vs Entrants")),
            preschool: Ok(bar("Preschool Duration")),
            gender: Ok(vec![pie("North"), pie("South")]),
            grades: Err("missing".to_string()),
            est_grads: Err("missing".to_string()),
        };
        let jobs = export_jobs(&set);
        let mut progress = Vec::new();
        let written = export_charts(&jobs, &folder, 400, 300, |done, total| {
            progress.push((done, total))
        })
        .unwrap();

        assert_eq!(progress, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        let mut names: Vec<String> = fs::read_dir(&folder)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "01_graduates_vs_entrants.png",
                "02_preschool_duration.png",
                "03_gender_north.png",
                "03_gender_south.png",
            ]
        );
        for path in &written {
            let bytes = fs::read(path).unwrap();
            assert_eq!(&bytes[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        }

        fs::remove_dir_all(&folder).unwrap();
    }

    #[test]
    fn test_export_render_failure_writes_nothing() {
        let folder = std::env::temp_dir().join(format!("student_dashboard_oversize_{}", std::process::id()));
        let jobs = vec![ExportJob {
            file_name: "01_graduates_vs_entrants.png".to_string(),
            chart: ExportChart::Bar(bar("a")),
        }];

        let result = export_charts(&jobs, &folder, 40_000, 40_000, |_, _| {});
        assert!(matches!(result, Err(ExportError::Render { .. })));
        assert!(!folder.exists());
    }
}
