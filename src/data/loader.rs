//! CSV Data Loader Module
//! Loads the regional student table with Polars and derives its schema.

use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REGION: &str = "region";
pub const CURR_STU_POP: &str = "curr_stu_pop";
pub const FEMALE: &str = "female";
pub const GRADUATES: &str = "graduates";
pub const ENTRANTS: &str = "entrants";
pub const EST_2024_GRADS: &str = "est_2024_grads";
pub const PRESCHOOL_COLUMNS: [&str; 4] =
    ["no_preschool", "1y_preschool", "2y_preschool", "3y_preschool"];
pub const GRADE_PREFIX: &str = "grade";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Data file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("Column '{column}' must be numeric, found {dtype}")]
    NotNumeric {
        column: &'static str,
        dtype: DataType,
    },
    #[error("No data loaded")]
    NoData,
}

/// Facts about the loaded table that every filtered view reuses.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchema {
    pub columns: Vec<String>,
    /// `grade*` columns in source order.
    pub grade_columns: Vec<String>,
    /// Distinct regions in first-seen order.
    pub regions: Vec<String>,
    /// Global (min, max) of `curr_stu_pop`.
    pub population_bounds: (i64, i64),
}

impl DatasetSchema {
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, LoaderError> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let grade_columns = columns
            .iter()
            .filter(|c| c.starts_with(GRADE_PREFIX))
            .cloned()
            .collect();

        Ok(Self {
            columns,
            grade_columns,
            regions: distinct_regions(df)?,
            population_bounds: population_bounds(df)?,
        })
    }
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    df: Option<DataFrame>,
    schema: Option<DatasetSchema>,
    file_path: Option<PathBuf>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            schema: None,
            file_path: None,
        }
    }

    /// Load a CSV file, replacing whatever was loaded before.
    ///
    /// On failure the previous table is dropped, so callers never keep
    /// showing data from a file that no longer loads.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        self.df = None;
        self.schema = None;
        self.file_path = Some(file_path.to_path_buf());

        let df = read_region_csv(file_path)?;
        let schema = DatasetSchema::from_dataframe(&df)?;

        log::info!(
            "Loaded {} rows, {} columns ({} grade columns) from {}",
            df.height(),
            df.width(),
            schema.grade_columns.len(),
            file_path.display()
        );

        self.schema = Some(schema);
        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Re-read the file that was loaded last.
    pub fn reload(&mut self) -> Result<&DataFrame, LoaderError> {
        let path = self.file_path.clone().ok_or(LoaderError::NoData)?;
        self.load_csv(&path)
    }

    /// Get list of column names from loaded DataFrame.
    pub fn get_columns(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .map(|s| s.columns.clone())
            .unwrap_or_default()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    pub fn get_schema(&self) -> Option<&DatasetSchema> {
        self.schema.as_ref()
    }

    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }
}

/// Read a region CSV and trim whitespace around every `region` value.
pub fn read_region_csv(path: &Path) -> Result<DataFrame, LoaderError> {
    if !path.is_file() {
        return Err(LoaderError::NotFound(path.to_path_buf()));
    }

    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .finish()?
        .collect()?;

    // Fail at load time rather than at first use of the filter widgets
    numeric_column(&df, CURR_STU_POP)?;
    normalize_regions(df)
}

/// Replace `region` with its whitespace-trimmed values.
pub fn normalize_regions(mut df: DataFrame) -> Result<DataFrame, LoaderError> {
    let trimmed: Vec<Option<String>> = {
        let regions = df
            .column(REGION)
            .map_err(|_| LoaderError::MissingColumn(REGION))?
            .cast(&DataType::String)?;
        regions
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect()
    };

    df.with_column(Column::new(REGION.into(), trimmed))?;
    Ok(df)
}

/// A required numeric column cast to Int64.
pub fn numeric_column(df: &DataFrame, name: &'static str) -> Result<Column, LoaderError> {
    let column = df
        .column(name)
        .map_err(|_| LoaderError::MissingColumn(name))?;

    if !is_numeric_dtype(column.dtype()) {
        return Err(LoaderError::NotNumeric {
            column: name,
            dtype: column.dtype().clone(),
        });
    }

    Ok(column.cast(&DataType::Int64)?)
}

pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

fn distinct_regions(df: &DataFrame) -> Result<Vec<String>, LoaderError> {
    let column = df
        .column(REGION)
        .map_err(|_| LoaderError::MissingColumn(REGION))?;

    let mut seen = HashSet::new();
    Ok(column
        .str()?
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.to_string()))
        .map(str::to_string)
        .collect())
}

fn population_bounds(df: &DataFrame) -> Result<(i64, i64), LoaderError> {
    let population = numeric_column(df, CURR_STU_POP)?;
    let ca = population.i64()?;
    Ok((ca.min().unwrap_or(0), ca.max().unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const THREE_REGIONS: &str = "tests/fixtures/three_regions.csv";
    const MESSY_REGIONS: &str = "tests/fixtures/messy_regions.csv";

    #[test]
    fn test_load_csv() {
        let mut loader = DataLoader::new();
        let df = loader.load_csv(Path::new(THREE_REGIONS)).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(loader.get_row_count(), 3);
        assert!(loader.get_columns().contains(&CURR_STU_POP.to_string()));
    }

    #[test]
    fn test_regions_are_trimmed() {
        let df = read_region_csv(Path::new(MESSY_REGIONS)).unwrap();
        let regions = df.column(REGION).unwrap().str().unwrap();
        for region in regions.into_iter().flatten() {
            assert_eq!(region, region.trim());
            assert!(!region.is_empty());
        }
    }

    #[test]
    fn test_schema_regions_first_seen_order() {
        let df = read_region_csv(Path::new(MESSY_REGIONS)).unwrap();
        let schema = DatasetSchema::from_dataframe(&df).unwrap();
        assert_eq!(schema.regions, vec!["South", "North", "East"]);
    }

    #[test]
    fn test_schema_grade_columns_in_source_order() {
        let df = read_region_csv(Path::new(THREE_REGIONS)).unwrap();
        let schema = DatasetSchema::from_dataframe(&df).unwrap();
        assert_eq!(schema.grade_columns, vec!["grade1", "grade2", "grade3"]);
    }

    #[test]
    fn test_schema_population_bounds() {
        let df = read_region_csv(Path::new(THREE_REGIONS)).unwrap();
        let schema = DatasetSchema::from_dataframe(&df).unwrap();
        assert_eq!(schema.population_bounds, (50, 300));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let mut loader = DataLoader::new();
        let err = loader
            .load_csv(Path::new("tests/fixtures/nope.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
        assert!(loader.get_dataframe().is_none());
    }

    #[test]
    fn test_missing_population_column() {
        let err = read_region_csv(Path::new("tests/fixtures/no_population.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(CURR_STU_POP)));
    }

    #[test]
    fn test_missing_region_column() {
        let df = df!(
            "name" => &["North"],
            CURR_STU_POP => &[10i64]
        )
        .unwrap();
        let err = normalize_regions(df).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(REGION)));
    }

    #[test]
    fn test_failed_reload_drops_previous_table() {
        let mut loader = DataLoader::new();
        loader.load_csv(Path::new(THREE_REGIONS)).unwrap();
        assert!(loader.load_csv(Path::new("tests/fixtures/nope.csv")).is_err());
        assert!(loader.get_dataframe().is_none());
        assert!(loader.get_schema().is_none());
    }
}
