// Transaction Explorer - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod error;
pub mod config;
pub mod table;       // Table rendering: rows or records -> Grid
pub mod sort;        // Per-column sort toggles
pub mod parser;      // Date / amount extraction from raw rows
pub mod stats;       // The five chart aggregations
pub mod spreadsheet; // xlsx / xls / ods / csv / json decoding
pub mod patterns;    // Mapping patterns for export formats
pub mod standardize; // Raw export -> standardized table
pub mod ranking;     // Professionals ranking ("new table")
pub mod filter;      // Vault filter
pub mod store;       // Standardized datasets on disk
pub mod app;         // Immutable application state

// Re-export commonly used types
pub use error::{ExplorerError, Result};
pub use config::{ExplorerConfig, Locale, TimeBasis};
pub use table::{
    display_cell, render, render_json,
    Cell, Grid, RawTable, Records, RenderWarning, TableInput,
};
pub use sort::{sort_rows, SortController, SortOrder};
pub use parser::{extract_transactions, ParsedRows, RowParser, TransactionRecord};
pub use stats::{
    cumulative_volume, daily_counts, hourly_histogram, weekday_histogram, weekly_average,
    Axis, ChartKey, ChartKind, ChartSpec, Series, StatsReport, TimeUnit,
};
pub use spreadsheet::{read_table, FileKind};
pub use patterns::{AccountType, Pattern, PatternKind, PatternRegistry};
pub use standardize::{standardize_file, standardize_table, StandardizeOutcome};
pub use ranking::{compute_ranking, ranking_records, RankingRow, RANKING_COLUMNS};
pub use filter::VaultFilter;
pub use store::DatasetStore;
pub use app::{load_dataset, select_dataset, AppState, Display, LoadTicket, LoadedDataset, View};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
