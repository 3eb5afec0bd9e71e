// 🧭 Application state - immutable snapshots of what is loaded and shown
//
// Every transition returns a new AppState; dataset payloads are shared
// behind Arc so snapshots stay cheap. Loads carry a generation ticket and a
// completion older than the latest issued ticket is dropped.

use crate::config::{Locale, TimeBasis};
use crate::error::{ExplorerError, Result};
use crate::filter::VaultFilter;
use crate::ranking::ranking_records;
use crate::stats::StatsReport;
use crate::store::DatasetStore;
use crate::table::{render, Grid, RawTable, TableInput};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Raw,
    Standardized,
    New,
    Stats,
}

impl View {
    pub const ALL: [View; 4] = [View::Raw, View::Standardized, View::New, View::Stats];

    pub fn next(&self) -> Self {
        match self {
            View::Raw => View::Standardized,
            View::Standardized => View::New,
            View::New => View::Stats,
            View::Stats => View::Raw,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            View::Raw => View::Stats,
            View::Standardized => View::Raw,
            View::New => View::Standardized,
            View::Stats => View::New,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            View::Raw => "Raw import",
            View::Standardized => "Standardized",
            View::New => "Ranking",
            View::Stats => "Statistics",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            View::Raw => "raw",
            View::Standardized => "standardized",
            View::New => "new",
            View::Stats => "stats",
        }
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.name() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown view: {}", s))
    }
}

/// What a view resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum Display {
    Table(Grid),
    Stats(StatsReport),
    /// Nothing loaded yet: show this text instead
    Placeholder(String),
}

// ============================================================================
// LOADS
// ============================================================================

/// Proof that a load was started at a given generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// Result of a completed dataset load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub name: String,
    pub standardized: RawTable,
    /// `None` when the ranking could not be computed for this dataset
    pub new_table: Option<TableInput>,
}

/// Read a standardized dataset and derive its ranking table
pub fn load_dataset(store: &DatasetStore, name: &str) -> Result<LoadedDataset> {
    let standardized = store.load(name)?;
    let new_table = match ranking_records(&standardized) {
        Ok(records) => Some(TableInput::Records(records)),
        Err(e) => {
            warn!(dataset = name, "no ranking table: {}", e);
            None
        }
    };

    Ok(LoadedDataset {
        name: name.to_string(),
        standardized,
        new_table,
    })
}

/// Resolve a 1-based menu choice against the dataset list
pub fn select_dataset(datasets: &[String], input: &str) -> Result<String> {
    if datasets.is_empty() {
        return Err(ExplorerError::missing_data("dataset list"));
    }

    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| datasets.get(i))
        .cloned()
        .ok_or_else(|| ExplorerError::InvalidSelection {
            input: input.to_string(),
            available: datasets.len(),
        })
}

// ============================================================================
// APP STATE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AppState {
    raw: Option<Arc<RawTable>>,
    standardized: Option<Arc<RawTable>>,
    filtered: Option<Arc<RawTable>>,
    new_table: Option<Arc<TableInput>>,
    filter: VaultFilter,
    dataset: Option<String>,
    generation: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn filter(&self) -> VaultFilter {
        self.filter
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn raw(&self) -> Option<&RawTable> {
        self.raw.as_deref()
    }

    /// Filtered standardized table when a filter is applied, else the original
    pub fn current_standardized(&self) -> Option<&RawTable> {
        self.filtered.as_deref().or(self.standardized.as_deref())
    }

    pub fn new_table(&self) -> Option<&TableInput> {
        self.new_table.as_deref()
    }

    /// Locally imported spreadsheet for the raw view
    pub fn with_raw(&self, table: RawTable) -> AppState {
        AppState {
            raw: Some(Arc::new(table)),
            ..self.clone()
        }
    }

    /// Issue a ticket for a load about to start
    pub fn begin_load(&self) -> (AppState, LoadTicket) {
        let generation = self.generation + 1;
        let next = AppState {
            generation,
            ..self.clone()
        };
        (next, LoadTicket { generation })
    }

    /// Apply a finished load. Stale tickets leave the state unchanged.
    pub fn complete_load(&self, ticket: LoadTicket, loaded: LoadedDataset) -> AppState {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                dataset = %loaded.name,
                "dropping stale load"
            );
            return self.clone();
        }

        self.with_standardized(loaded)
    }

    /// Replace the dataset. A new dataset starts unfiltered.
    pub fn with_standardized(&self, loaded: LoadedDataset) -> AppState {
        info!(dataset = %loaded.name, rows = loaded.standardized.len(), "dataset loaded");
        AppState {
            standardized: Some(Arc::new(loaded.standardized)),
            filtered: None,
            filter: VaultFilter::default(),
            new_table: loaded.new_table.map(Arc::new),
            dataset: Some(loaded.name),
            ..self.clone()
        }
    }

    /// Apply the vault filter to the standardized table
    pub fn with_filter(&self, filter: VaultFilter) -> Result<AppState> {
        let standardized = self
            .standardized
            .as_ref()
            .ok_or_else(|| ExplorerError::missing_data("standardized"))?;

        let filtered = filter.is_active().then(|| Arc::new(filter.apply(standardized)));
        Ok(AppState {
            filtered,
            filter,
            ..self.clone()
        })
    }

    /// Resolve a view into something displayable
    pub fn display(&self, view: View, basis: TimeBasis, locale: Locale) -> Display {
        let placeholder = || Display::Placeholder(ExplorerError::missing_data(view.name()).to_string());

        match view {
            View::Raw => match self.raw() {
                Some(table) => Display::Table(render(&TableInput::Rows(table.clone()))),
                None => placeholder(),
            },
            View::Standardized => match self.current_standardized() {
                Some(table) => Display::Table(render(&TableInput::Rows(table.clone()))),
                None => placeholder(),
            },
            View::New => match self.new_table() {
                Some(input) => Display::Table(render(input)),
                None => placeholder(),
            },
            View::Stats => match self.current_standardized() {
                Some(table) => Display::Stats(StatsReport::compute(table, basis, locale)),
                None => placeholder(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::ChartKey;
    use serde_json::json;

    fn standardized() -> RawTable {
        serde_json::from_value(json!([
            ["Date", "Montant", "Expéditeur", "Destinataire", "Type_Expéditeur", "Type_Destinataire"],
            ["2024-01-01T10:00", "5", "a", "Shop", "C", "P"],
            ["2024-01-08T10:00", "7", "b", "Shop", "U", "P"]
        ]))
        .unwrap()
    }

    fn loaded(name: &str) -> LoadedDataset {
        LoadedDataset {
            name: name.to_string(),
            standardized: standardized(),
            new_table: ranking_records(&standardized()).ok().map(TableInput::Records),
        }
    }

    #[test]
    fn test_select_dataset() {
        let list = vec!["a.json".to_string(), "b.json".to_string()];
        assert_eq!(select_dataset(&list, "2").unwrap(), "b.json");
        assert_eq!(select_dataset(&list, " 1 ").unwrap(), "a.json");

        for bad in ["0", "3", "x", "", "-1"] {
            assert!(
                matches!(select_dataset(&list, bad), Err(ExplorerError::InvalidSelection { .. })),
                "{bad}"
            );
        }
        assert!(matches!(select_dataset(&[], "1"), Err(ExplorerError::MissingData { .. })));
    }

    #[test]
    fn test_placeholders_when_nothing_loaded() {
        let state = AppState::new();
        for view in View::ALL {
            assert!(
                matches!(state.display(view, TimeBasis::Utc, Locale::En), Display::Placeholder(_)),
                "{view:?}"
            );
        }
    }

    #[test]
    fn test_load_then_display() {
        let (state, ticket) = AppState::new().begin_load();
        let state = state.complete_load(ticket, loaded("x.json"));

        assert_eq!(state.dataset(), Some("x.json"));
        match state.display(View::Stats, TimeBasis::Utc, Locale::En) {
            Display::Stats(report) => {
                assert_eq!(report.series(ChartKey::Cumulative).unwrap().values, vec![5.0, 12.0]);
            }
            other => panic!("unexpected: {other:?}"),
        }
        match state.display(View::New, TimeBasis::Utc, Locale::En) {
            Display::Table(grid) => assert_eq!(grid.body[0][0], "Shop"),
            other => panic!("unexpected: {other:?}"),
        }
        // raw view is independent of dataset loads
        assert!(matches!(state.display(View::Raw, TimeBasis::Utc, Locale::En), Display::Placeholder(_)));
    }

    #[test]
    fn test_stale_load_is_dropped() {
        let (state, first) = AppState::new().begin_load();
        let (state, second) = state.begin_load();

        let state = state.complete_load(second, loaded("new.json"));
        let state = state.complete_load(first, loaded("old.json"));

        assert_eq!(state.dataset(), Some("new.json"));
    }

    #[test]
    fn test_filter_creates_variant_and_reload_clears_it() {
        let (state, ticket) = AppState::new().begin_load();
        let state = state.complete_load(ticket, loaded("x.json"));

        let filtered = state
            .with_filter(VaultFilter { ignore_sender: true, ignore_recipient: false })
            .unwrap();
        assert_eq!(filtered.current_standardized().unwrap().len(), 2);
        // previous snapshot untouched
        assert_eq!(state.current_standardized().unwrap().len(), 3);

        let (reloading, ticket) = filtered.begin_load();
        let reloaded = reloading.complete_load(ticket, loaded("y.json"));
        assert_eq!(reloaded.current_standardized().unwrap().len(), 3);
        assert!(!reloaded.filter().is_active());
    }

    #[test]
    fn test_filter_without_data_is_missing_data() {
        let result = AppState::new().with_filter(VaultFilter::default());
        assert!(matches!(result, Err(ExplorerError::MissingData { .. })));
    }

    #[test]
    fn test_load_dataset_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path());
        store.save("x.json", &standardized()).unwrap();

        let loaded = load_dataset(&store, "x.json").unwrap();
        assert_eq!(loaded.standardized.len(), 3);
        assert!(loaded.new_table.is_some());

        let plain: RawTable = serde_json::from_value(json!([["date", "amount"], ["2024-01-01", 5]])).unwrap();
        store.save("plain.json", &plain).unwrap();
        assert!(load_dataset(&store, "plain.json").unwrap().new_table.is_none());
    }

    #[test]
    fn test_view_cycle_and_parse() {
        assert_eq!(View::Stats.next(), View::Raw);
        assert_eq!(View::Raw.previous(), View::Stats);
        assert_eq!("Stats".parse::<View>().unwrap(), View::Stats);
        assert!("graph".parse::<View>().is_err());
    }
}
