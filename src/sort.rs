// ↕️ Sort Controller - per-column ascending/descending ordering of a grid

use crate::table::Grid;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "▲",
            SortOrder::Descending => "▼",
        }
    }
}

/// Per-column sort state of one rendered grid.
///
/// State lives as long as the grid does: re-rendering a table means
/// attaching a new controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortController {
    orders: Vec<Option<SortOrder>>,
}

impl SortController {
    pub fn attach(grid: &Grid) -> Self {
        SortController {
            orders: vec![None; grid.column_count()],
        }
    }

    /// Current order of a column, `None` until it is first toggled
    pub fn order(&self, column: usize) -> Option<SortOrder> {
        self.orders.get(column).copied().flatten()
    }

    /// Flip the column's order and reorder the body rows by it.
    ///
    /// The first toggle sorts ascending. Other columns keep their state.
    /// Returns `None` (grid untouched) for an out-of-range column.
    pub fn toggle(&mut self, grid: &mut Grid, column: usize) -> Option<SortOrder> {
        let slot = self.orders.get_mut(column)?;
        let order = slot.map_or(SortOrder::Ascending, SortOrder::toggled);
        *slot = Some(order);

        sort_rows(grid, column, order);
        Some(order)
    }
}

/// Reorder body rows by the displayed text of `column`. Stable.
///
/// Numeric comparison when every value of the column parses as a finite
/// number, case-sensitive lexicographic comparison otherwise.
pub fn sort_rows(grid: &mut Grid, column: usize, order: SortOrder) {
    let numeric = column_is_numeric(grid, column);

    grid.body.sort_by(|a, b| {
        let a = cell_text(a, column);
        let b = cell_text(b, column);

        let ordering = if numeric {
            let (x, y) = (parse_finite(a).unwrap_or(0.0), parse_finite(b).unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        } else {
            a.cmp(b)
        };

        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
}

fn cell_text(row: &[String], column: usize) -> &str {
    row.get(column).map(|s| s.trim()).unwrap_or("")
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn column_is_numeric(grid: &Grid, column: usize) -> bool {
    grid.body
        .iter()
        .all(|row| parse_finite(cell_text(row, column)).is_some())
}
