// 🗂️ Table Renderer - tabular input → grid description
// Pure: the caller (TUI, server, CLI) decides how to display the grid

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// One cell of a raw table. Usually a string or a number.
pub type Cell = Value;

/// Header-first array of rows
pub type RawTable = Vec<Vec<Cell>>;

/// Array of objects, columns taken from the first object's key order
pub type Records = Vec<Map<String, Value>>;

// ============================================================================
// INPUT
// ============================================================================

/// TableInput - the two shapes a table can arrive in
#[derive(Debug, Clone, PartialEq)]
pub enum TableInput {
    /// First row is the header
    Rows(RawTable),
    Records(Records),
}

impl TableInput {
    /// Classify a JSON payload. `None` for anything that is not a non-empty
    /// array of arrays or a non-empty array of objects.
    pub fn from_json(value: Value) -> Option<TableInput> {
        let Value::Array(items) = value else {
            return None;
        };

        match items.first() {
            Some(Value::Array(_)) => Some(TableInput::Rows(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Array(row) => row,
                        // a stray scalar row renders as a single cell
                        other => vec![other],
                    })
                    .collect(),
            )),
            Some(Value::Object(_)) => Some(TableInput::Records(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(row, item)| match item {
                        Value::Object(map) => map,
                        other => {
                            // rendered as an empty record, so every column warns
                            warn!(row, "record is not an object: {}", other);
                            Map::new()
                        }
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl From<RawTable> for TableInput {
    fn from(rows: RawTable) -> Self {
        TableInput::Rows(rows)
    }
}

impl From<Records> for TableInput {
    fn from(records: Records) -> Self {
        TableInput::Records(records)
    }
}

// ============================================================================
// GRID
// ============================================================================

/// Something best-effort happened while rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderWarning {
    /// Row index counts the header as row 0
    RowLength { row: usize, expected: usize, found: usize },
    /// Record index is 0-based over the records
    MissingKey { row: usize, key: String },
}

/// Grid - fully rendered table, ready to display
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grid {
    pub header: Vec<String>,
    pub body: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RenderWarning>,
}

impl Grid {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.body.len()
    }

    /// Displayed text of one column, in body order
    pub fn column(&self, index: usize) -> Vec<&str> {
        self.body
            .iter()
            .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
            .collect()
    }
}

// ============================================================================
// RENDERING
// ============================================================================

/// Render a table. Never fails: length mismatches and missing keys are
/// recorded as warnings and the row is still rendered.
pub fn render(input: &TableInput) -> Grid {
    match input {
        TableInput::Rows(rows) => render_rows(rows),
        TableInput::Records(records) => render_records(records),
    }
}

/// Render an arbitrary JSON payload; unrecognized shapes give an empty grid
pub fn render_json(value: Value) -> Grid {
    match TableInput::from_json(value) {
        Some(input) => render(&input),
        None => Grid::default(),
    }
}

fn render_rows(rows: &[Vec<Cell>]) -> Grid {
    let Some((header_row, data)) = rows.split_first() else {
        return Grid::default();
    };

    let header: Vec<String> = header_row.iter().map(display_cell).collect();
    let expected = header.len();
    let mut warnings = Vec::new();

    let body = data
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let row_index = i + 1;
            if row.len() != expected {
                warn!(
                    row = row_index,
                    expected,
                    found = row.len(),
                    "row length does not match header"
                );
                warnings.push(RenderWarning::RowLength {
                    row: row_index,
                    expected,
                    found: row.len(),
                });
            }

            let mut cells: Vec<String> = row.iter().map(display_cell).collect();
            if cells.len() < expected {
                cells.resize(expected, String::new());
            }
            cells
        })
        .collect();

    Grid { header, body, warnings }
}

fn render_records(records: &[Map<String, Value>]) -> Grid {
    let Some(first) = records.first() else {
        return Grid::default();
    };

    let header: Vec<String> = first.keys().cloned().collect();
    let mut warnings = Vec::new();

    let body = records
        .iter()
        .enumerate()
        .map(|(row, record)| {
            header
                .iter()
                .map(|key| match record.get(key) {
                    Some(value) => display_cell(value),
                    None => {
                        warn!(row, key = %key, "record is missing a column");
                        warnings.push(RenderWarning::MissingKey { row, key: key.clone() });
                        String::new()
                    }
                })
                .collect()
        })
        .collect();

    Grid { header, body, warnings }
}

/// Displayed text of a cell.
///
/// `0`, `""` and `false` are shown as themselves; only `null` is blank.
/// Integral floats print without a fractional part (`5.0` → `5`).
pub fn display_cell(cell: &Cell) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())
            } else {
                n.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Shortest form of a float, integral values without ".0"
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
