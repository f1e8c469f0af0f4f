//! Chart View Module
//! Chart-ready data for the five dashboard charts, derived from the
//! filtered table. Views carry no UI types so the on-screen plotter and the
//! static PNG renderer draw from the same data.

use crate::data::{
    DataProcessor, DatasetSchema, GenderSplit, LongRecord, ProcessorError, ENTRANTS,
    EST_2024_GRADS, GRADE_LABEL, GRADE_VALUE, GRADUATES, PRESCHOOL_LABEL, PRESCHOOL_VALUE,
    REGION,
};
use crate::stats::{equal_width_bins, HistogramBin};
use polars::prelude::DataFrame;

/// A chart that failed to derive keeps its error message; the others still render.
pub type Derived<T> = Result<T, String>;

/// Named sequence of y values aligned with a chart's categories.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    pub name: String,
    /// `NaN` marks a missing value.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMode {
    Group,
    Stack,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartView {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub categories: Vec<String>,
    pub series: Vec<NamedSeries>,
    pub mode: BarMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieView {
    pub title: String,
    pub region: String,
    pub slices: Vec<(String, f64)>,
}

impl PieView {
    pub fn from_split(split: &GenderSplit) -> Self {
        Self {
            title: format!("Gender Ratio in {}", split.region),
            region: split.region.clone(),
            slices: vec![
                ("Female".to_string(), split.female as f64),
                ("Male".to_string(), split.male as f64),
            ],
        }
    }

    /// Slices that can be drawn as wedges (positive values only).
    pub fn drawable_slices(&self) -> Vec<(usize, f64)> {
        self.slices
            .iter()
            .enumerate()
            .filter(|(_, (_, v))| *v > 0.0)
            .map(|(i, (_, v))| (i, *v))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChartView {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub x_labels: Vec<String>,
    pub series: Vec<NamedSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramView {
    pub title: String,
    pub x_title: String,
    pub bins: Vec<HistogramBin>,
}

/// All five chart views for one filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSet {
    pub graduates_vs_entrants: Derived<BarChartView>,
    pub preschool: Derived<BarChartView>,
    pub gender: Derived<Vec<PieView>>,
    pub grades: Derived<LineChartView>,
    pub est_grads: Derived<HistogramView>,
}

impl ChartSet {
    pub fn derive(filtered: &DataFrame, schema: &DatasetSchema, histogram_bins: usize) -> Self {
        Self {
            graduates_vs_entrants: graduates_vs_entrants(filtered).map_err(|e| e.to_string()),
            preschool: preschool_distribution(filtered).map_err(|e| e.to_string()),
            gender: gender_pies(filtered).map_err(|e| e.to_string()),
            grades: grade_lines(filtered, &schema.grade_columns).map_err(|e| e.to_string()),
            est_grads: est_grads_histogram(filtered, histogram_bins).map_err(|e| e.to_string()),
        }
    }
}

/// Grouped bars of graduates and entrants per region.
pub fn graduates_vs_entrants(df: &DataFrame) -> Result<BarChartView, ProcessorError> {
    let value_cols = vec![GRADUATES.to_string(), ENTRANTS.to_string()];
    let long = DataProcessor::stack_to_long(df, REGION, &value_cols, "variable", "value")?;
    let records = DataProcessor::long_records(&long, "variable", "value")?;
    let (categories, series) = pivot_by_region(&records, &value_cols);

    Ok(BarChartView {
        title: "Graduates vs Entrants by Region".to_string(),
        x_title: REGION.to_string(),
        y_title: "value".to_string(),
        categories,
        series,
        mode: BarMode::Group,
    })
}

/// Stacked bars of the preschool duration counts per region.
pub fn preschool_distribution(df: &DataFrame) -> Result<BarChartView, ProcessorError> {
    let long = DataProcessor::preschool_long(df)?;
    let records = DataProcessor::long_records(&long, PRESCHOOL_LABEL, PRESCHOOL_VALUE)?;
    let labels = distinct_labels(&records);
    let (categories, series) = pivot_by_region(&records, &labels);

    Ok(BarChartView {
        title: "Preschool Duration Distribution".to_string(),
        x_title: REGION.to_string(),
        y_title: PRESCHOOL_VALUE.to_string(),
        categories,
        series,
        mode: BarMode::Stack,
    })
}

/// One pie per filtered row.
pub fn gender_pies(df: &DataFrame) -> Result<Vec<PieView>, ProcessorError> {
    Ok(DataProcessor::gender_splits(df)?
        .iter()
        .map(PieView::from_split)
        .collect())
}

/// One line per region across the grade columns, in source column order.
pub fn grade_lines(df: &DataFrame, grade_cols: &[String]) -> Result<LineChartView, ProcessorError> {
    let long = DataProcessor::grade_long(df, grade_cols)?;
    let records = DataProcessor::long_records(&long, GRADE_LABEL, GRADE_VALUE)?;
    let (regions, per_grade) = pivot_by_region(&records, grade_cols);

    // pivot gives one series per grade; the line chart wants one per region
    let series = regions
        .iter()
        .enumerate()
        .map(|(r, region)| NamedSeries {
            name: region.clone(),
            values: per_grade.iter().map(|s| s.values[r]).collect(),
        })
        .collect();

    Ok(LineChartView {
        title: "Grade-wise Student Numbers".to_string(),
        x_title: GRADE_LABEL.to_string(),
        y_title: GRADE_VALUE.to_string(),
        x_labels: grade_cols.to_vec(),
        series,
    })
}

pub fn est_grads_histogram(df: &DataFrame, bins: usize) -> Result<HistogramView, ProcessorError> {
    let values = DataProcessor::float_values(df, EST_2024_GRADS)?;
    Ok(HistogramView {
        title: "Distribution of Estimated 2024 Graduates".to_string(),
        x_title: EST_2024_GRADS.to_string(),
        bins: equal_width_bins(&values, bins),
    })
}

fn distinct_labels(records: &[LongRecord]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for record in records {
        if !labels.contains(&record.label) {
            labels.push(record.label.clone());
        }
    }
    labels
}

/// Pivot long records into region categories (first-seen order) and one
/// series per label. Repeated regions are summed; all-null cells stay `NaN`.
fn pivot_by_region(records: &[LongRecord], labels: &[String]) -> (Vec<String>, Vec<NamedSeries>) {
    let mut regions: Vec<String> = Vec::new();
    for record in records {
        if !regions.contains(&record.region) {
            regions.push(record.region.clone());
        }
    }

    let mut series: Vec<NamedSeries> = labels
        .iter()
        .map(|label| NamedSeries {
            name: label.clone(),
            values: vec![f64::NAN; regions.len()],
        })
        .collect();

    for record in records {
        let (Some(s), Some(r), Some(v)) = (
            labels.iter().position(|l| *l == record.label),
            regions.iter().position(|g| *g == record.region),
            record.value,
        ) else {
            continue;
        };
        let cell = &mut series[s].values[r];
        *cell = if cell.is_nan() { v as f64 } else { *cell + v as f64 };
    }

    (regions, series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CURR_STU_POP, FEMALE};
    use polars::prelude::*;

    fn filtered() -> DataFrame {
        df!(
            REGION => &["North", "South"],
            CURR_STU_POP => &[100i64, 80],
            FEMALE => &[45i64, 90],
            GRADUATES => &[10i64, 12],
            ENTRANTS => &[11i64, 9],
            EST_2024_GRADS => &[10i64, 14],
            "no_preschool" => &[10i64, 1],
            "1y_preschool" => &[5i64, 2],
            "2y_preschool" => &[3i64, 3],
            "3y_preschool" => &[2i64, 4],
            "grade10" => &[7i64, 8],
            "grade2" => &[20i64, 21]
        )
        .unwrap()
    }

    fn schema() -> DatasetSchema {
        DatasetSchema::from_dataframe(&filtered()).unwrap()
    }

    #[test]
    fn test_graduates_vs_entrants_grouped() {
        let view = graduates_vs_entrants(&filtered()).unwrap();
        assert_eq!(view.mode, BarMode::Group);
        assert_eq!(view.categories, vec!["North", "South"]);
        assert_eq!(view.series[0].name, GRADUATES);
        assert_eq!(view.series[0].values, vec![10.0, 12.0]);
        assert_eq!(view.series[1].values, vec![11.0, 9.0]);
    }

    #[test]
    fn test_preschool_stacked_by_duration() {
        let view = preschool_distribution(&filtered()).unwrap();
        assert_eq!(view.mode, BarMode::Stack);
        let names: Vec<&str> = view.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["no_preschool", "1y_preschool", "2y_preschool", "3y_preschool"]
        );
        assert_eq!(view.series[3].values, vec![2.0, 4.0]);
    }

    #[test]
    fn test_gender_pie_per_row_with_negative_male() {
        let pies = gender_pies(&filtered()).unwrap();
        assert_eq!(pies.len(), 2);
        assert_eq!(pies[0].title, "Gender Ratio in North");
        assert_eq!(pies[0].slices[1], ("Male".to_string(), 55.0));
        assert_eq!(pies[1].slices[1], ("Male".to_string(), -10.0));
        assert_eq!(pies[1].drawable_slices(), vec![(0, 90.0)]);
    }

    #[test]
    fn test_grade_lines_keep_source_column_order() {
        let view = grade_lines(&filtered(), &schema().grade_columns).unwrap();
        assert_eq!(view.x_labels, vec!["grade10", "grade2"]);
        assert_eq!(view.series.len(), 2);
        assert_eq!(view.series[0].name, "North");
        assert_eq!(view.series[0].values, vec![7.0, 20.0]);
        assert_eq!(view.series[1].values, vec![8.0, 21.0]);
    }

    #[test]
    fn test_histogram_uses_requested_bins() {
        let view = est_grads_histogram(&filtered(), 20).unwrap();
        assert_eq!(view.bins.len(), 20);
        assert_eq!(view.bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_all_views_derive_on_zero_rows() {
        let empty = filtered().clear();
        let set = ChartSet::derive(&empty, &schema(), 20);
        assert!(set.graduates_vs_entrants.unwrap().categories.is_empty());
        assert!(set.preschool.unwrap().categories.is_empty());
        assert!(set.gender.unwrap().is_empty());
        assert!(set.grades.unwrap().series.is_empty());
        assert!(set.est_grads.unwrap().bins.is_empty());
    }

    #[test]
    fn test_missing_column_only_fails_its_chart() {
        let df = filtered().drop(FEMALE).unwrap();
        let set = ChartSet::derive(&df, &schema(), 20);
        assert!(set.gender.is_err());
        assert!(set.graduates_vs_entrants.is_ok());
        assert!(set.est_grads.is_ok());
    }

    #[test]
    fn test_repeated_region_is_summed() {
        let records = vec![
            LongRecord {
                region: "North".into(),
                label: "a".into(),
                value: Some(2),
            },
            LongRecord {
                region: "North".into(),
                label: "a".into(),
                value: Some(3),
            },
        ];
        let (regions, series) = pivot_by_region(&records, &["a".to_string()]);
        assert_eq!(regions, vec!["North"]);
        assert_eq!(series[0].values, vec![5.0]);
    }
}
