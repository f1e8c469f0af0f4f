//! Statistics Calculator Module
//! Descriptive statistics for the sidebar summary of the filtered table.

use statrs::statistics::{Data, Distribution, Max, Median, Min};

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; zero for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics, `None` for an empty input.
    pub fn compute_descriptive_stats(values: &[f64]) -> Option<SummaryStats> {
        let values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let count = values.len();
        if count == 0 {
            return None;
        }

        let total = values.iter().sum::<f64>();
        let data = Data::new(values);

        let mean = data.mean().unwrap_or(total / count as f64);
        let std = if count > 1 {
            data.std_dev().unwrap_or(0.0)
        } else {
            0.0
        };

        Some(SummaryStats {
            count,
            total,
            mean,
            median: data.median(),
            std,
            min: data.min(),
            max: data.max(),
        })
    }
}
