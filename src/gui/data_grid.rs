//! Data Grid Widget
//! Read-only paginated grid over the filtered table, with a tools panel for
//! row grouping, quick filter and column visibility.

use crate::data::{
    column_names, format_number, ArrangedRows, GridQuery, GridState, PageRows, SortOrder,
    TableModel,
};
use egui::{Color32, RichText};
use egui_extras::{Column as GridColumn, TableBuilder, TableRow};
use log::{debug, error};
use polars::prelude::{DataFrame, PolarsResult};
use std::ops::Range;

const ROW_HEIGHT: f32 = 20.0;
const TOOLS_WIDTH: f32 = 220.0;

/// Arranged rows for one query plus the snapshot of the page on screen.
struct GridCache {
    query: GridQuery,
    arranged: ArrangedRows,
    page: Option<(Range<usize>, PageRows)>,
}

pub struct DataGrid {
    pub state: GridState,
    show_tools: bool,
    height: f32,
    cache: Option<GridCache>,
    error: Option<String>,
}

impl DataGrid {
    pub fn new(page_size: usize, height: f32) -> Self {
        Self {
            state: GridState::new(page_size),
            show_tools: false,
            // header plus at least one row
            height: height.max(2.0 * ROW_HEIGHT),
            cache: None,
            error: None,
        }
    }

    /// Forget sort, grouping and hidden columns after a new file is loaded.
    pub fn reset(&mut self) {
        self.state = GridState::new(self.state.page_size);
        self.invalidate();
    }

    /// Drop cached rows after the filtered frame was re-derived.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.error = None;
    }

    /// Re-run the grid query only when it changed, and snapshot the current page.
    fn refresh(&mut self, df: &DataFrame) -> PolarsResult<()> {
        let query = self.state.query();
        if self.cache.as_ref().map_or(true, |c| c.query != query) {
            let arranged = self.state.arrange(df)?;
            debug!(
                "Grid query: {} of {} rows, {} items",
                arranged.row_count(),
                df.height(),
                arranged.item_count()
            );
            self.cache = Some(GridCache {
                query,
                arranged,
                page: None,
            });
        }

        if let Some(cache) = &mut self.cache {
            let items = cache.arranged.item_count();
            self.state.clamp_page(items);
            let range = self.state.page_range(items);
            if cache.page.as_ref().map_or(true, |(r, _)| *r != range) {
                let page = cache.arranged.page(range.clone())?;
                cache.page = Some((range, page));
            }
        }
        Ok(())
    }

    pub fn show(&mut self, ui: &mut egui::Ui, df: &DataFrame) {
        let columns = column_names(df);
        self.state.retain_columns(&columns);

        if let Err(e) = self.refresh(df) {
            error!("Grid query failed: {}", e);
            self.cache = None;
            self.error = Some(e.to_string());
        }
        if let Some(message) = &self.error {
            ui.label(
                RichText::new(format!("⚠ {message}"))
                    .size(12.0)
                    .color(Color32::from_rgb(220, 53, 69)),
            );
        }
        let Some(cache) = self.cache.take() else {
            return;
        };
        let items = cache.arranged.item_count();

        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("{} of {} rows", cache.arranged.row_count(), df.height()))
                    .size(12.0)
                    .color(Color32::GRAY),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.toggle_value(&mut self.show_tools, "☰ Grid tools");
                self.pagination(ui, items);
            });
        });

        ui.horizontal_top(|ui| {
            let table_width = if self.show_tools {
                (ui.available_width() - TOOLS_WIDTH - 10.0).max(200.0)
            } else {
                ui.available_width()
            };

            ui.vertical(|ui| {
                ui.set_width(table_width);
                ui.set_height(self.height);
                match &cache.page {
                    Some((_, page)) if cache.arranged.row_count() > 0 => {
                        ui.push_id("data_grid_table", |ui| {
                            self.table(ui, &columns, page);
                        });
                    }
                    _ => {
                        ui.centered_and_justified(|ui| {
                            ui.label(RichText::new("No rows").size(14.0).color(Color32::GRAY));
                        });
                    }
                }
            });

            if self.show_tools {
                ui.separator();
                ui.vertical(|ui| {
                    ui.set_width(TOOLS_WIDTH);
                    self.tools(ui, &columns);
                });
            }
        });

        self.cache = Some(cache);
    }

    fn pagination(&mut self, ui: &mut egui::Ui, items: usize) {
        let pages = self.state.page_count(items);
        // right-to-left layout: added in reverse
        if ui
            .add_enabled(self.state.page + 1 < pages, egui::Button::new("▶"))
            .clicked()
        {
            self.state.page += 1;
        }
        ui.label(format!("Page {} / {}", self.state.page + 1, pages));
        if ui
            .add_enabled(self.state.page > 0, egui::Button::new("◀"))
            .clicked()
        {
            self.state.page -= 1;
        }
    }

    fn table(&mut self, ui: &mut egui::Ui, names: &[String], page: &PageRows) {
        let columns = self.state.visible_columns(names);
        let mut sort_clicked: Option<String> = None;
        let mut group_toggled: Option<String> = None;

        let builder = TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .columns(GridColumn::auto().at_least(70.0).clip(true), columns.len())
            .min_scrolled_height(0.0)
            .max_scroll_height(self.height - ROW_HEIGHT);

        builder
            .header(ROW_HEIGHT + 4.0, |mut header| {
                for &c in &columns {
                    let name = &names[c];
                    let arrow = match &self.state.sort {
                        Some((col, SortOrder::Ascending)) if col == name => " ⏶",
                        Some((col, SortOrder::Descending)) if col == name => " ⏷",
                        _ => "",
                    };
                    header.col(|ui| {
                        let label = RichText::new(format!("{name}{arrow}")).strong();
                        if ui.add(egui::Button::new(label).frame(false)).clicked() {
                            sort_clicked = Some(name.clone());
                        }
                    });
                }
            })
            .body(|mut body| match page {
                PageRows::Flat(model) => {
                    body.rows(ROW_HEIGHT, model.row_count(), |mut row| {
                        let r = row.index();
                        Self::data_row(&mut row, &columns, model, r);
                    });
                }
                PageRows::Grouped(groups) => {
                    for (group, model) in groups {
                        let collapsed = self.state.collapsed_groups.contains(&group.key);
                        body.row(ROW_HEIGHT, |mut row| {
                            for (i, &c) in columns.iter().enumerate() {
                                row.col(|ui| {
                                    if i == 0 {
                                        let marker = if collapsed { "▶" } else { "▼" };
                                        let label = RichText::new(format!(
                                            "{marker} {} ({})",
                                            group.key,
                                            group.rows.len()
                                        ))
                                        .strong();
                                        if ui.add(egui::Button::new(label).frame(false)).clicked() {
                                            group_toggled = Some(group.key.clone());
                                        }
                                    } else if let Some(sum) = group.sums[c] {
                                        ui.label(
                                            RichText::new(format!("Σ {}", format_number(sum)))
                                                .strong(),
                                        );
                                    }
                                });
                            }
                        });

                        if collapsed {
                            continue;
                        }
                        for r in 0..model.row_count() {
                            body.row(ROW_HEIGHT, |mut row| Self::data_row(&mut row, &columns, model, r));
                        }
                    }
                }
            });

        if let Some(column) = sort_clicked {
            self.state.cycle_sort(&column);
        }
        if let Some(key) = group_toggled {
            if !self.state.collapsed_groups.remove(&key) {
                self.state.collapsed_groups.insert(key);
            }
        }
    }

    fn data_row(row: &mut TableRow<'_, '_>, columns: &[usize], model: &TableModel, r: usize) {
        for &c in columns {
            row.col(|ui| {
                ui.label(model.rows[r][c].to_string());
            });
        }
    }

    fn tools(&mut self, ui: &mut egui::Ui, columns: &[String]) {
        ui.label(RichText::new("Row groups").strong());
        let selected = self.state.group_by.clone().unwrap_or_else(|| "None".to_string());
        egui::ComboBox::from_id_salt("grid_group_by")
            .width(TOOLS_WIDTH - 20.0)
            .selected_text(selected)
            .show_ui(ui, |ui| {
                if ui
                    .selectable_label(self.state.group_by.is_none(), "None")
                    .clicked()
                {
                    self.state.group_by = None;
                    self.state.page = 0;
                }
                for column in columns {
                    let active = self.state.group_by.as_deref() == Some(column.as_str());
                    if ui.selectable_label(active, column).clicked() {
                        self.state.group_by = Some(column.clone());
                        self.state.collapsed_groups.clear();
                        self.state.page = 0;
                    }
                }
            });

        ui.add_space(8.0);
        ui.label(RichText::new("Quick filter").strong());
        if ui
            .add(egui::TextEdit::singleline(&mut self.state.quick_filter).hint_text("Search..."))
            .changed()
        {
            self.state.page = 0;
        }

        ui.add_space(8.0);
        ui.label(RichText::new("Columns").strong());
        egui::ScrollArea::vertical()
            .id_salt("grid_columns")
            .max_height(self.height - 120.0)
            .show(ui, |ui| {
                for column in columns {
                    let mut visible = !self.state.hidden_columns.contains(column);
                    if ui.checkbox(&mut visible, column).changed() {
                        if visible {
                            self.state.hidden_columns.remove(column);
                        } else {
                            self.state.hidden_columns.insert(column.clone());
                        }
                    }
                }
            });
    }
}
