//! GUI module - User interface components

mod app;
mod chart_viewer;
mod control_panel;
mod data_grid;

pub use app::DashboardApp;
pub use chart_viewer::ChartViewer;
pub use control_panel::{ControlPanel, ControlPanelAction};
pub use data_grid::DataGrid;
