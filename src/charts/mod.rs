//! Charts module - Chart views, on-screen plotting and PNG export

mod export;
mod plotter;
mod renderer;
mod views;

pub use export::{export_charts, export_jobs};
pub use plotter::{ChartPlotter, CHART_HEIGHT, PIE_SIZE};
pub use views::{ChartSet, Derived};
