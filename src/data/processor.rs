//! Data Processor Module
//! Derives the chart-ready tables from the filtered DataFrame (melt/unpivot
//! and the per-region gender split).

use polars::prelude::*;
use thiserror::Error;

use super::loader::{CURR_STU_POP, FEMALE, PRESCHOOL_COLUMNS, REGION};

pub const PRESCHOOL_LABEL: &str = "Preschool Duration";
pub const PRESCHOOL_VALUE: &str = "Count";
pub const GRADE_LABEL: &str = "Grade";
pub const GRADE_VALUE: &str = "Students";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Missing column '{0}'")]
    MissingColumn(String),
}

/// One row of a wide-to-long reshape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRecord {
    pub region: String,
    pub label: String,
    pub value: Option<i64>,
}

/// Female/male counts for one filtered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenderSplit {
    pub region: String,
    pub female: i64,
    /// Always `curr_stu_pop - female`; negative when the source is inconsistent.
    pub male: i64,
}

/// Derived male count. No validation: `female > population` goes negative.
pub fn male_count(population: i64, female: i64) -> i64 {
    population - female
}

/// Handles data reshaping for the chart views.
pub struct DataProcessor;

impl DataProcessor {
    /// Transform wide columns to long format (melt).
    ///
    /// Output columns: [id_col, var_name, value_name]. Rows are ordered by value
    /// column first, then by source row, and nulls are kept so the output always
    /// has `height * value_cols.len()` rows.
    pub fn stack_to_long(
        df: &DataFrame,
        id_col: &str,
        value_cols: &[String],
        var_name: &str,
        value_name: &str,
    ) -> Result<DataFrame, ProcessorError> {
        let ids = Self::text_values(df, id_col)?;

        let capacity = ids.len() * value_cols.len();
        let mut id_out: Vec<String> = Vec::with_capacity(capacity);
        let mut labels: Vec<String> = Vec::with_capacity(capacity);
        let mut values: Vec<Option<i64>> = Vec::with_capacity(capacity);

        for value_col in value_cols {
            let column_values = Self::int_values(df, value_col)?;
            for (id, value) in ids.iter().zip(column_values) {
                id_out.push(id.clone());
                labels.push(value_col.clone());
                values.push(value);
            }
        }

        let df = DataFrame::new(vec![
            Column::new(id_col.into(), id_out),
            Column::new(var_name.into(), labels),
            Column::new(value_name.into(), values),
        ])?;

        Ok(df)
    }

    /// Preschool duration columns in long form.
    pub fn preschool_long(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let columns: Vec<String> = PRESCHOOL_COLUMNS.iter().map(|c| c.to_string()).collect();
        Self::stack_to_long(df, REGION, &columns, PRESCHOOL_LABEL, PRESCHOOL_VALUE)
    }

    /// Grade columns (as discovered at load time) in long form.
    pub fn grade_long(df: &DataFrame, grade_cols: &[String]) -> Result<DataFrame, ProcessorError> {
        Self::stack_to_long(df, REGION, grade_cols, GRADE_LABEL, GRADE_VALUE)
    }

    /// Read a long-form frame back into records.
    pub fn long_records(
        long: &DataFrame,
        var_name: &str,
        value_name: &str,
    ) -> Result<Vec<LongRecord>, ProcessorError> {
        let regions = Self::text_values(long, REGION)?;
        let labels = Self::text_values(long, var_name)?;
        let values = Self::int_values(long, value_name)?;

        Ok(regions
            .into_iter()
            .zip(labels)
            .zip(values)
            .map(|((region, label), value)| LongRecord {
                region,
                label,
                value,
            })
            .collect())
    }

    /// One split per filtered row. Missing counts are read as zero.
    pub fn gender_splits(df: &DataFrame) -> Result<Vec<GenderSplit>, ProcessorError> {
        let regions = Self::text_values(df, REGION)?;
        let population = Self::int_values(df, CURR_STU_POP)?;
        let female = Self::int_values(df, FEMALE)?;

        Ok(regions
            .into_iter()
            .zip(population)
            .zip(female)
            .map(|((region, pop), female)| {
                let female = female.unwrap_or(0);
                GenderSplit {
                    region,
                    female,
                    male: male_count(pop.unwrap_or(0), female),
                }
            })
            .collect())
    }

    /// Column values cast to Int64.
    pub fn int_values(df: &DataFrame, column: &str) -> Result<Vec<Option<i64>>, ProcessorError> {
        let values = df
            .column(column)
            .map_err(|_| ProcessorError::MissingColumn(column.to_string()))?
            .cast(&DataType::Int64)?;
        Ok(values.i64()?.into_iter().collect())
    }

    /// Column values cast to Float64, nulls skipped.
    pub fn float_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, ProcessorError> {
        let values = df
            .column(column)
            .map_err(|_| ProcessorError::MissingColumn(column.to_string()))?
            .cast(&DataType::Float64)?;
        Ok(values
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }

    /// Column values as text. Nulls become empty strings.
    pub fn text_values(df: &DataFrame, column: &str) -> Result<Vec<String>, ProcessorError> {
        let values = df
            .column(column)
            .map_err(|_| ProcessorError::MissingColumn(column.to_string()))?
            .cast(&DataType::String)?;
        Ok(values
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_df() -> DataFrame {
        df!(
            REGION => &["North", "South"],
            CURR_STU_POP => &[100i64, 100],
            FEMALE => &[45i64, 100],
            "no_preschool" => &[10i64, 7],
            "1y_preschool" => &[5i64, 6],
            "2y_preschool" => &[3i64, 2],
            "3y_preschool" => &[2i64, 1],
            "grade1" => &[30i64, 31],
            "grade2" => &[35i64, 36],
            "grade3" => &[35i64, 33]
        )
        .unwrap()
    }

    fn grade_cols() -> Vec<String> {
        vec!["grade1".into(), "grade2".into(), "grade3".into()]
    }

    #[test]
    fn test_male_count() {
        assert_eq!(male_count(100, 45), 55);
        assert_eq!(male_count(100, 100), 0);
        assert_eq!(male_count(100, 120), -20);
    }

    #[test]
    fn test_gender_splits_one_per_row() {
        let splits = DataProcessor::gender_splits(&region_df()).unwrap();
        assert_eq!(
            splits,
            vec![
                GenderSplit {
                    region: "North".into(),
                    female: 45,
                    male: 55
                },
                GenderSplit {
                    region: "South".into(),
                    female: 100,
                    male: 0
                },
            ]
        );
    }

    #[test]
    fn test_preschool_reshape_single_row() {
        let df = df!(
            REGION => &["North"],
            "no_preschool" => &[10i64],
            "1y_preschool" => &[5i64],
            "2y_preschool" => &[3i64],
            "3y_preschool" => &[2i64]
        )
        .unwrap();

        let long = DataProcessor::preschool_long(&df).unwrap();
        let records =
            DataProcessor::long_records(&long, PRESCHOOL_LABEL, PRESCHOOL_VALUE).unwrap();

        let expected: Vec<LongRecord> = [
            ("no_preschool", 10),
            ("1y_preschool", 5),
            ("2y_preschool", 3),
            ("3y_preschool", 2),
        ]
        .iter()
        .map(|(label, value)| LongRecord {
            region: "North".into(),
            label: label.to_string(),
            value: Some(*value),
        })
        .collect();
        assert_eq!(records, expected);
    }

    #[test]
    fn test_preschool_reshape_melt_order() {
        let long = DataProcessor::preschool_long(&region_df()).unwrap();
        let records =
            DataProcessor::long_records(&long, PRESCHOOL_LABEL, PRESCHOOL_VALUE).unwrap();
        let order: Vec<(&str, &str)> = records
            .iter()
            .take(3)
            .map(|r| (r.region.as_str(), r.label.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("North", "no_preschool"),
                ("South", "no_preschool"),
                ("North", "1y_preschool")
            ]
        );
    }

    #[test]
    fn test_grade_reshape_row_count_and_values() {
        let df = region_df();
        let long = DataProcessor::grade_long(&df, &grade_cols()).unwrap();
        assert_eq!(long.height(), df.height() * grade_cols().len());
        assert_eq!(
            long.get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
            vec![REGION, GRADE_LABEL, GRADE_VALUE]
        );

        let records = DataProcessor::long_records(&long, GRADE_LABEL, GRADE_VALUE).unwrap();
        for record in &records {
            let original = DataProcessor::int_values(&df, &record.label).unwrap();
            let row = if record.region == "North" { 0 } else { 1 };
            assert_eq!(record.value, original[row]);
        }
    }

    #[test]
    fn test_grade_reshape_keeps_nulls() {
        let df = df!(
            REGION => &["North", "South"],
            "grade1" => &[Some(3i64), None]
        )
        .unwrap();
        let long = DataProcessor::grade_long(&df, &["grade1".to_string()]).unwrap();
        assert_eq!(long.height(), 2);
        let records = DataProcessor::long_records(&long, GRADE_LABEL, GRADE_VALUE).unwrap();
        assert_eq!(records[1].value, None);
    }

    #[test]
    fn test_reshape_of_empty_table() {
        let df = region_df().clear();
        let long = DataProcessor::grade_long(&df, &grade_cols()).unwrap();
        assert_eq!(long.height(), 0);
        assert!(DataProcessor::gender_splits(&df).unwrap().is_empty());
    }

    #[test]
    fn test_missing_column_reported() {
        let df = df!(REGION => &["North"]).unwrap();
        let err = DataProcessor::gender_splits(&df).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingColumn(c) if c == CURR_STU_POP));
    }
}
