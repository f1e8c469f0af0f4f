//! Dashboard View
//! Everything the window shows for one filter state, derived in one pass from
//! the full table.

use crate::charts::ChartSet;
use crate::config::DashboardConfig;
use crate::data::{
    apply_filter, DataProcessor, DatasetSchema, FilterState, CURR_STU_POP, EST_2024_GRADS,
    REGION,
};
use crate::stats::{StatsCalculator, SummaryStats};
use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct DashboardView {
    /// Source of the grid; the grid snapshots only the page it shows.
    pub filtered: DataFrame,
    /// Shared with the export thread.
    pub charts: Arc<ChartSet>,
    pub region_count: usize,
    pub population: Option<SummaryStats>,
    pub est_grads: Option<SummaryStats>,
}

impl DashboardView {
    pub fn derive(
        full: &DataFrame,
        schema: &DatasetSchema,
        filter: &FilterState,
        config: &DashboardConfig,
    ) -> Result<Self> {
        let filtered = apply_filter(full, filter).context("Failed to filter the dataset")?;
        log::debug!(
            "Derived view: {} of {} rows, {} regions selected, population {}..={}",
            filtered.height(),
            full.height(),
            filter.regions.len(),
            filter.min_population,
            filter.max_population
        );

        let region_count = DataProcessor::text_values(&filtered, REGION)
            .map(|regions| regions.into_iter().collect::<BTreeSet<_>>().len())
            .unwrap_or(0);

        Ok(Self {
            charts: Arc::new(ChartSet::derive(&filtered, schema, config.histogram_bins)),
            region_count,
            population: column_stats(&filtered, CURR_STU_POP),
            est_grads: column_stats(&filtered, EST_2024_GRADS),
            filtered,
        })
    }
}

fn column_stats(df: &DataFrame, column: &str) -> Option<SummaryStats> {
    DataProcessor::float_values(df, column)
        .ok()
        .and_then(|values| StatsCalculator::compute_descriptive_stats(&values))
}
