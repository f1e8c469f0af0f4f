//! Grid Model Module
//! Grid-local operations over the filtered DataFrame: quick filter, sorting
//! and row grouping run as polars queries, and only the rows of the current
//! page are turned into cells.

use polars::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use super::loader::is_numeric_dtype;

/// A single grid cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    fn from_any(value: AnyValue) -> Self {
        match value {
            AnyValue::Null => Cell::Null,
            AnyValue::Int8(v) => Cell::Int(v as i64),
            AnyValue::Int16(v) => Cell::Int(v as i64),
            AnyValue::Int32(v) => Cell::Int(v as i64),
            AnyValue::Int64(v) => Cell::Int(v),
            AnyValue::UInt8(v) => Cell::Int(v as i64),
            AnyValue::UInt16(v) => Cell::Int(v as i64),
            AnyValue::UInt32(v) => Cell::Int(v as i64),
            AnyValue::UInt64(v) => Cell::Int(v as i64),
            AnyValue::Float32(v) => Cell::Float(v as f64),
            AnyValue::Float64(v) => Cell::Float(v),
            AnyValue::String(s) => Cell::Text(s.to_string()),
            AnyValue::StringOwned(s) => Cell::Text(s.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{}", format_number(*v)),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Integers without a trailing `.0`, everything else with two decimals.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

/// Read-only cell snapshot of a (small) DataFrame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableModel {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableModel {
    pub fn from_dataframe(df: &DataFrame) -> Self {
        let mut rows: Vec<Vec<Cell>> = vec![Vec::with_capacity(df.width()); df.height()];
        for column in df.get_columns() {
            let series = column.as_materialized_series().rechunk();
            for (row, value) in rows.iter_mut().zip(series.iter()) {
                row.push(Cell::from_any(value));
            }
        }

        Self {
            columns: column_names(df),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Rows sharing the same value in the row-group column.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub key: String,
    /// Positions in the arranged frame, in display order.
    pub rows: Vec<IdxSize>,
    /// Per-column sum over the group; `None` for non-numeric columns.
    pub sums: Vec<Option<f64>>,
}

/// The settings that change which rows the grid shows and in what order.
#[derive(Debug, Clone, PartialEq)]
pub struct GridQuery {
    quick_filter: String,
    sort: Option<(String, SortOrder)>,
    group_by: Option<String>,
}

const ROW_INDEX: &str = "__grid_row";
const SUM_PREFIX: &str = "__grid_sum_";

/// The filtered frame after the quick filter and sort, with its row groups.
#[derive(Debug, Clone)]
pub struct ArrangedRows {
    frame: DataFrame,
    groups: Option<Vec<RowGroup>>,
}

/// Cell snapshot of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageRows {
    Flat(TableModel),
    Grouped(Vec<(RowGroup, TableModel)>),
}

impl ArrangedRows {
    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    pub fn groups(&self) -> Option<&[RowGroup]> {
        self.groups.as_deref()
    }

    /// Pagination unit: groups when grouping, rows otherwise.
    pub fn item_count(&self) -> usize {
        self.groups.as_ref().map_or(self.row_count(), Vec::len)
    }

    /// Materialize only the items in `range`.
    pub fn page(&self, range: Range<usize>) -> PolarsResult<PageRows> {
        let Some(groups) = &self.groups else {
            let slice = self.frame.slice(range.start as i64, range.len());
            return Ok(PageRows::Flat(TableModel::from_dataframe(&slice)));
        };

        let mut page = Vec::with_capacity(range.len());
        for group in groups.get(range).unwrap_or_default() {
            let idx = IdxCa::from_vec("rows".into(), group.rows.clone());
            let rows = self.frame.take(&idx)?;
            page.push((group.clone(), TableModel::from_dataframe(&rows)));
        }
        Ok(PageRows::Grouped(page))
    }
}

/// Grid-local view settings, independent of the sidebar filters.
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    pub page: usize,
    pub page_size: usize,
    pub sort: Option<(String, SortOrder)>,
    pub group_by: Option<String>,
    pub quick_filter: String,
    pub hidden_columns: BTreeSet<String>,
    pub collapsed_groups: BTreeSet<String>,
}

impl GridState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
            sort: None,
            group_by: None,
            quick_filter: String::new(),
            hidden_columns: BTreeSet::new(),
            collapsed_groups: BTreeSet::new(),
        }
    }

    /// Header click: ascending, then descending, then back to source order.
    pub fn cycle_sort(&mut self, column: &str) {
        self.sort = match self.sort.take() {
            Some((c, SortOrder::Ascending)) if c == column => {
                Some((c, SortOrder::Descending))
            }
            Some((c, SortOrder::Descending)) if c == column => None,
            _ => Some((column.to_string(), SortOrder::Ascending)),
        };
        self.page = 0;
    }

    pub fn query(&self) -> GridQuery {
        GridQuery {
            quick_filter: self.quick_filter.trim().to_lowercase(),
            sort: self.sort.clone(),
            group_by: self.group_by.clone(),
        }
    }

    /// Run the quick filter, sort and grouping over `df`.
    ///
    /// The quick filter keeps rows where any column's text contains the
    /// needle, ignoring case. Sorting is stable with nulls first when
    /// ascending. Groups keep first-appearance order.
    pub fn arrange(&self, df: &DataFrame) -> PolarsResult<ArrangedRows> {
        let query = self.query();
        let columns = column_names(df);
        let mut lf = df.clone().lazy();

        if !query.quick_filter.is_empty() {
            let needle = query.quick_filter.as_str();
            let any_match = columns
                .iter()
                .map(|c| {
                    col(c.as_str())
                        .cast(DataType::String)
                        .str()
                        .to_lowercase()
                        .str()
                        .contains_literal(lit(needle))
                        .fill_null(lit(false))
                })
                .reduce(|acc, e| acc.or(e));
            if let Some(predicate) = any_match {
                lf = lf.filter(predicate);
            }
        }

        if let Some((column, order)) = &query.sort {
            if columns.contains(column) {
                let descending = *order == SortOrder::Descending;
                lf = lf.sort_by_exprs(
                    [col(column.as_str())],
                    SortMultipleOptions {
                        descending: vec![descending],
                        nulls_last: vec![descending],
                        maintain_order: true,
                        ..Default::default()
                    },
                );
            }
        }

        let frame = lf.collect()?;
        let groups = match &query.group_by {
            Some(key) if columns.contains(key) => Some(group_rows(&frame, key)?),
            _ => None,
        };
        Ok(ArrangedRows { frame, groups })
    }

    /// Number of pages for `items` entries; at least one.
    pub fn page_count(&self, items: usize) -> usize {
        items.div_ceil(self.page_size).max(1)
    }

    /// Keep the page index valid after the underlying rows changed.
    pub fn clamp_page(&mut self, items: usize) {
        self.page = self.page.min(self.page_count(items) - 1);
    }

    /// Slice of `items` shown on the current page.
    pub fn page_range(&self, items: usize) -> Range<usize> {
        let start = (self.page * self.page_size).min(items);
        let end = (start + self.page_size).min(items);
        start..end
    }

    /// Drop references to columns the new frame no longer has.
    pub fn retain_columns(&mut self, columns: &[String]) {
        if let Some((column, _)) = &self.sort {
            if !columns.contains(column) {
                self.sort = None;
            }
        }
        if let Some(column) = &self.group_by {
            if !columns.contains(column) {
                self.group_by = None;
            }
        }
        self.hidden_columns.retain(|c| columns.contains(c));
    }

    pub fn visible_columns(&self, columns: &[String]) -> Vec<usize> {
        (0..columns.len())
            .filter(|&i| !self.hidden_columns.contains(&columns[i]))
            .collect()
    }
}

/// One row per distinct `key` value with its row positions and numeric sums.
fn group_rows(frame: &DataFrame, key: &str) -> PolarsResult<Vec<RowGroup>> {
    let numeric: Vec<bool> = frame
        .get_columns()
        .iter()
        .map(|c| is_numeric_dtype(c.dtype()))
        .collect();

    let mut aggs = vec![col(ROW_INDEX)];
    for (i, column) in column_names(frame).iter().enumerate() {
        if numeric[i] {
            aggs.push(
                col(column.as_str())
                    .cast(DataType::Float64)
                    .sum()
                    .alias(format!("{SUM_PREFIX}{i}")),
            );
        }
    }

    let grouped = frame
        .clone()
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .group_by_stable([col(key)])
        .agg(aggs)
        .collect()?;

    let keys = grouped.column(key)?.as_materialized_series();
    let positions = grouped.column(ROW_INDEX)?.as_materialized_series().list()?;
    let mut sums: Vec<Option<Float64Chunked>> = Vec::with_capacity(numeric.len());
    for (i, &is_numeric) in numeric.iter().enumerate() {
        sums.push(if is_numeric {
            let name = format!("{SUM_PREFIX}{i}");
            Some(grouped.column(&name)?.as_materialized_series().f64()?.clone())
        } else {
            None
        });
    }

    let mut groups = Vec::with_capacity(grouped.height());
    for (g, rows) in positions.into_iter().enumerate() {
        let rows = match rows {
            Some(series) => series.idx()?.into_no_null_iter().collect(),
            None => Vec::new(),
        };
        groups.push(RowGroup {
            key: Cell::from_any(keys.get(g)?).to_string(),
            rows,
            sums: sums
                .iter()
                .map(|s| s.as_ref().map(|ca| ca.get(g).unwrap_or(0.0)))
                .collect(),
        });
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "region" => &["North", "South", "East", "North"],
            "kind" => &["urban", "rural", "urban", "rural"],
            "curr_stu_pop" => &[100i64, 50, 300, 20]
        )
        .unwrap()
    }

    fn populations(arranged: &ArrangedRows) -> Vec<i64> {
        arranged
            .frame
            .column("curr_stu_pop")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_model_from_dataframe() {
        let m = TableModel::from_dataframe(&frame());
        assert_eq!(m.columns, vec!["region", "kind", "curr_stu_pop"]);
        assert_eq!(m.rows[2][2], Cell::Int(300));
        assert_eq!(m.rows[0][0], Cell::Text("North".into()));
        assert_eq!(m.row_count(), 4);
    }

    #[test]
    fn test_sort_cycle() {
        let df = frame();
        let mut state = GridState::new(10);

        state.cycle_sort("curr_stu_pop");
        assert_eq!(populations(&state.arrange(&df).unwrap()), vec![20, 50, 100, 300]);

        state.cycle_sort("curr_stu_pop");
        assert_eq!(populations(&state.arrange(&df).unwrap()), vec![300, 100, 50, 20]);

        state.cycle_sort("curr_stu_pop");
        assert_eq!(state.sort, None);
        assert_eq!(populations(&state.arrange(&df).unwrap()), vec![100, 50, 300, 20]);
    }

    #[test]
    fn test_sort_is_stable_with_nulls_first() {
        let df = df!(
            "region" => &["A", "B", "C", "D"],
            "score" => &[Some(2.0), None, Some(1.0), Some(2.0)]
        )
        .unwrap();
        let mut state = GridState::new(10);
        state.cycle_sort("score");

        let arranged = state.arrange(&df).unwrap();
        let regions: Vec<&str> = arranged
            .frame
            .column("region")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(regions, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_quick_filter_case_insensitive() {
        let df = frame();
        let mut state = GridState::new(10);
        state.quick_filter = "URBAN".into();
        assert_eq!(populations(&state.arrange(&df).unwrap()), vec![100, 300]);
        state.quick_filter = " 30 ".into();
        assert_eq!(populations(&state.arrange(&df).unwrap()), vec![300]);
        state.quick_filter = "nowhere".into();
        assert_eq!(state.arrange(&df).unwrap().row_count(), 0);
    }

    #[test]
    fn test_group_sums() {
        let mut state = GridState::new(10);
        state.group_by = Some("region".into());
        let arranged = state.arrange(&frame()).unwrap();
        let groups = arranged.groups().unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(arranged.item_count(), 3);
        assert_eq!(groups[0].key, "North");
        assert_eq!(groups[0].rows, vec![0, 3]);
        assert_eq!(groups[0].sums, vec![None, None, Some(120.0)]);
    }

    #[test]
    fn test_groups_follow_sorted_order() {
        let mut state = GridState::new(10);
        state.group_by = Some("region".into());
        state.sort = Some(("curr_stu_pop".into(), SortOrder::Descending));
        let arranged = state.arrange(&frame()).unwrap();

        let keys: Vec<&str> = arranged.groups().unwrap().iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["East", "North", "South"]);
        assert_eq!(arranged.groups().unwrap()[1].rows, vec![1, 3]);
    }

    #[test]
    fn test_no_grouping_without_column() {
        let mut state = GridState::new(10);
        assert!(state.arrange(&frame()).unwrap().groups().is_none());
        state.group_by = Some("gone".into());
        assert!(state.arrange(&frame()).unwrap().groups().is_none());
    }

    #[test]
    fn test_page_snapshot_holds_only_page_rows() {
        let state = GridState::new(2);
        let arranged = state.arrange(&frame()).unwrap();
        let PageRows::Flat(model) = arranged.page(2..4).unwrap() else {
            panic!("expected flat rows");
        };
        assert_eq!(model.row_count(), 2);
        assert_eq!(model.rows[0][0], Cell::Text("East".into()));
        assert_eq!(model.rows[1][2], Cell::Int(20));
    }

    #[test]
    fn test_grouped_page_snapshot() {
        let mut state = GridState::new(2);
        state.group_by = Some("region".into());
        let arranged = state.arrange(&frame()).unwrap();

        let PageRows::Grouped(page) = arranged.page(0..2).unwrap() else {
            panic!("expected grouped rows");
        };
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].0.key, "North");
        assert_eq!(page[0].1.row_count(), 2);
        assert_eq!(page[0].1.rows[1][2], Cell::Int(20));
        assert_eq!(page[1].0.key, "South");
        assert_eq!(page[1].1.row_count(), 1);
    }

    #[test]
    fn test_pagination() {
        let mut state = GridState::new(3);
        assert_eq!(state.page_count(0), 1);
        assert_eq!(state.page_count(7), 3);

        state.page = 2;
        assert_eq!(state.page_range(7), 6..7);

        state.clamp_page(4);
        assert_eq!(state.page, 1);
        assert_eq!(state.page_range(4), 3..4);

        state.clamp_page(0);
        assert_eq!(state.page, 0);
        assert_eq!(state.page_range(0), 0..0);
    }

    #[test]
    fn test_retain_columns_drops_stale_settings() {
        let columns = column_names(&frame());
        let mut state = GridState::new(10);
        state.sort = Some(("gone".into(), SortOrder::Ascending));
        state.group_by = Some("kind".into());
        state.hidden_columns.insert("gone".into());
        state.hidden_columns.insert("kind".into());

        state.retain_columns(&columns);
        assert_eq!(state.sort, None);
        assert_eq!(state.group_by.as_deref(), Some("kind"));
        assert_eq!(state.visible_columns(&columns), vec![0, 2]);
    }

    #[test]
    fn test_query_ignores_page_and_layout() {
        let mut state = GridState::new(10);
        let before = state.query();
        state.page = 3;
        state.hidden_columns.insert("kind".into());
        state.quick_filter = "  ".into();
        assert_eq!(state.query(), before);
        state.quick_filter = "North".into();
        assert_ne!(state.query(), before);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12.0), "12");
        assert_eq!(format_number(1.5), "1.50");
    }
}
