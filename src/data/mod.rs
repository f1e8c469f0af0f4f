//! Data module - CSV loading, filtering and reshaping

mod filter;
mod loader;
mod processor;
mod table;

pub use filter::{apply_filter, FilterState};
pub use loader::{
    DataLoader, DatasetSchema, CURR_STU_POP, ENTRANTS, EST_2024_GRADS, FEMALE, GRADUATES, REGION,
};
pub use processor::{
    DataProcessor, GenderSplit, LongRecord, ProcessorError, GRADE_LABEL, GRADE_VALUE,
    PRESCHOOL_LABEL, PRESCHOOL_VALUE,
};
pub use table::{
    column_names, format_number, ArrangedRows, GridQuery, GridState, PageRows, SortOrder, TableModel,
};
