use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use polars::prelude::*;

use super::loader::{DatasetSchema, CURR_STU_POP, REGION};

// ---------------------------------------------------------------------------
// Filter predicate: selected regions + inclusive population range
// ---------------------------------------------------------------------------

/// Sidebar selection. Compared frame to frame to decide when the view is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub regions: BTreeSet<String>,
    pub min_population: i64,
    pub max_population: i64,
}

impl FilterState {
    /// All regions selected, full population range.
    pub fn defaults(schema: &DatasetSchema) -> Self {
        let (min_population, max_population) = schema.population_bounds;
        Self {
            regions: schema.regions.iter().cloned().collect(),
            min_population,
            max_population,
        }
    }

    pub fn population_range(&self) -> RangeInclusive<i64> {
        self.min_population..=self.max_population
    }

    /// Keep `min <= max`, moving whichever bound the user did not just drag.
    pub fn clamp_bounds(&mut self, schema: &DatasetSchema, moved_min: bool) {
        let (lo, hi) = schema.population_bounds;
        self.min_population = self.min_population.clamp(lo, hi);
        self.max_population = self.max_population.clamp(lo, hi);
        if self.min_population > self.max_population {
            if moved_min {
                self.max_population = self.min_population;
            } else {
                self.min_population = self.max_population;
            }
        }
    }

    pub fn select_all(&mut self, schema: &DatasetSchema) {
        self.regions = schema.regions.iter().cloned().collect();
    }

    pub fn select_none(&mut self) {
        self.regions.clear();
    }

    pub fn toggle_region(&mut self, region: &str) {
        if !self.regions.remove(region) {
            self.regions.insert(region.to_string());
        }
    }
}

/// Return the rows of `df` that pass the filter, in source order.
///
/// A row passes when its region is selected and its `curr_stu_pop` lies in
/// the inclusive range. Rows with a null region or population never pass.
pub fn apply_filter(df: &DataFrame, state: &FilterState) -> PolarsResult<DataFrame> {
    if state.regions.is_empty() {
        return Ok(df.clear());
    }

    let selected: Vec<&str> = state.regions.iter().map(String::as_str).collect();
    let region_predicate = col(REGION).is_in(lit(Series::new("selected".into(), selected)));

    let range = state.population_range();
    let predicate = region_predicate
        .and(col(CURR_STU_POP).gt_eq(lit(*range.start())))
        .and(col(CURR_STU_POP).lt_eq(lit(*range.end())));

    df.clone().lazy().filter(predicate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            REGION => &["North", "South", "East", "West", "North"],
            CURR_STU_POP => &[50i64, 150, 300, 220, 90]
        )
        .unwrap()
    }

    fn sample_schema() -> DatasetSchema {
        DatasetSchema::from_dataframe(&sample_df()).unwrap()
    }

    /// Row-level form of the predicate applied by `apply_filter`.
    fn passes(state: &FilterState, region: &str, population: i64) -> bool {
        state.regions.contains(region) && state.population_range().contains(&population)
    }

    fn rows(df: &DataFrame) -> Vec<(String, i64)> {
        let regions = df.column(REGION).unwrap().str().unwrap();
        let pops = df.column(CURR_STU_POP).unwrap().i64().unwrap();
        regions
            .into_iter()
            .zip(pops.into_iter())
            .map(|(r, p)| (r.unwrap().to_string(), p.unwrap()))
            .collect()
    }

    #[test]
    fn test_defaults_reproduce_full_table() {
        let df = sample_df();
        let state = FilterState::defaults(&sample_schema());
        let filtered = apply_filter(&df, &state).unwrap();
        assert!(filtered.equals(&df));
    }

    #[test]
    fn test_filter_is_sound_and_complete() {
        let df = sample_df();
        let mut state = FilterState::defaults(&sample_schema());
        state.regions = ["North", "West"].iter().map(|s| s.to_string()).collect();
        state.min_population = 60;
        state.max_population = 220;

        let kept = rows(&apply_filter(&df, &state).unwrap());
        let expected: Vec<(String, i64)> = rows(&df)
            .into_iter()
            .filter(|(r, p)| passes(&state, r, *p))
            .collect();
        assert_eq!(kept, expected);
        assert_eq!(
            kept,
            vec![("West".to_string(), 220), ("North".to_string(), 90)]
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let df = sample_df();
        let mut state = FilterState::defaults(&sample_schema());
        state.min_population = 150;
        state.max_population = 300;
        let kept = rows(&apply_filter(&df, &state).unwrap());
        assert_eq!(kept.len(), 3);
        assert!(kept.contains(&("South".to_string(), 150)));
        assert!(kept.contains(&("East".to_string(), 300)));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let df = sample_df();
        let mut state = FilterState::defaults(&sample_schema());
        state.regions.remove("East");
        state.min_population = 80;
        let once = apply_filter(&df, &state).unwrap();
        let twice = apply_filter(&once, &state).unwrap();
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_empty_selection_yields_zero_rows_with_schema() {
        let df = sample_df();
        let mut state = FilterState::defaults(&sample_schema());
        state.select_none();
        let filtered = apply_filter(&df, &state).unwrap();
        assert_eq!(filtered.height(), 0);
        assert_eq!(filtered.width(), df.width());
    }

    #[test]
    fn test_many_regions_and_null_region() {
        let names: Vec<String> = (0..500).map(|i| format!("Region {i:03}")).collect();
        let mut regions: Vec<Option<&str>> = names.iter().map(|n| Some(n.as_str())).collect();
        regions.push(None);
        let pops: Vec<i64> = (0..regions.len() as i64).collect();
        let df = df!(REGION => regions, CURR_STU_POP => pops).unwrap();

        let mut state = FilterState::defaults(&DatasetSchema::from_dataframe(&df).unwrap());
        state.regions = names.iter().step_by(2).cloned().collect();
        state.min_population = 0;
        state.max_population = i64::MAX;

        let filtered = apply_filter(&df, &state).unwrap();
        assert_eq!(filtered.height(), 250);
        let kept = filtered.column(REGION).unwrap().str().unwrap();
        assert_eq!(kept.null_count(), 0);
        assert_eq!(kept.get(1), Some("Region 002"));
    }

    #[test]
    fn test_clamp_bounds_keeps_order() {
        let schema = sample_schema();
        let mut state = FilterState::defaults(&schema);
        state.min_population = 400;
        state.clamp_bounds(&schema, true);
        assert_eq!(state.min_population, 300);
        assert_eq!(state.max_population, 300);

        state.max_population = 10;
        state.clamp_bounds(&schema, false);
        assert_eq!(state.max_population, 50);
        assert_eq!(state.min_population, 50);
    }

    #[test]
    fn test_toggle_region() {
        let mut state = FilterState::defaults(&sample_schema());
        state.toggle_region("North");
        assert!(!state.regions.contains("North"));
        state.toggle_region("North");
        assert!(state.regions.contains("North"));
    }
}
