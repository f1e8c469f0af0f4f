//! Stats module - Summary statistics and histogram binning

mod calculator;
mod histogram;

pub use calculator::{StatsCalculator, SummaryStats};
pub use histogram::{equal_width_bins, HistogramBin};
