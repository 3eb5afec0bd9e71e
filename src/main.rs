// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use transaction_explorer::{
    load_dataset, render, select_dataset, standardize_file, ChartKind, DatasetStore, ExplorerConfig,
    Grid, PatternRegistry, Series, SortController, SortOrder, StatsReport, TableInput,
};

#[derive(Parser)]
#[command(
    name = "transaction-explorer",
    version,
    about = "Explore standardized transaction datasets: tables, ranking and charts"
)]
struct Cli {
    /// TOML config file (overrides EXPLORER_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List standardized datasets in the data directory.
    Datasets,
    /// Standardize a spreadsheet export into the data directory.
    Standardize {
        /// xlsx / xls / ods / csv / json file
        file: PathBuf,
    },
    /// Print the five chart series of a dataset.
    Stats {
        /// Dataset file name, or its 1-based number in `datasets`
        dataset: String,

        /// Print the report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a dataset (or its ranking) as a table.
    Table {
        /// Dataset file name, or its 1-based number in `datasets`
        dataset: String,

        /// Show the professionals ranking instead of the dataset.
        #[arg(long, default_value_t = false)]
        new: bool,

        /// Sort by this column (header name or 0-based index).
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending instead of ascending.
        #[arg(long, default_value_t = false, requires = "sort")]
        desc: bool,
    },
    /// Open the terminal UI (default).
    View {
        /// Dataset to open on start
        dataset: Option<String>,

        /// Spreadsheet to show in the raw import view
        #[arg(long)]
        raw: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::View { .. }));
    init_logging(interactive);

    let config = match &cli.config {
        Some(path) => ExplorerConfig::from_file(path)?.with_overrides(|key| std::env::var(key).ok())?,
        None => ExplorerConfig::load()?,
    };

    match cli.command {
        Some(Commands::Datasets) => run_datasets(&config),
        Some(Commands::Standardize { file }) => run_standardize(&config, file),
        Some(Commands::Stats { dataset, json }) => run_stats(&config, &dataset, json),
        Some(Commands::Table { dataset, new, sort, desc }) => {
            run_table(&config, &dataset, new, sort.as_deref(), desc)
        }
        Some(Commands::View { dataset, raw }) => run_ui_mode(config, dataset, raw),
        None => run_ui_mode(config, None, None),
    }
}

/// The TUI owns the terminal, so it only logs when RUST_LOG asks for it.
fn init_logging(interactive: bool) {
    if interactive && std::env::var_os("RUST_LOG").is_none() {
        return;
    }

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

/// Accept either a file name or a 1-based position in the dataset list
fn resolve_dataset(store: &DatasetStore, input: &str) -> Result<String> {
    if input.trim().chars().all(|c| c.is_ascii_digit()) {
        let datasets = store.list().context("Failed to list datasets")?;
        return Ok(select_dataset(&datasets, input)?);
    }
    DatasetStore::validate_name(input)?;
    Ok(input.to_string())
}

fn run_datasets(config: &ExplorerConfig) -> Result<()> {
    let store = DatasetStore::new(&config.data_dir);
    let datasets = store
        .list()
        .with_context(|| format!("Failed to list {}", config.data_dir.display()))?;

    if datasets.is_empty() {
        println!("No datasets in {}", config.data_dir.display());
        println!("   Run: transaction-explorer standardize <file>");
        return Ok(());
    }

    println!("📂 Datasets in {}", config.data_dir.display());
    for (i, name) in datasets.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    Ok(())
}

fn run_standardize(config: &ExplorerConfig, file: PathBuf) -> Result<()> {
    config.ensure_dirs()?;
    let registry = PatternRegistry::from_dir(&config.patterns_dir)
        .with_context(|| format!("Failed to load patterns from {}", config.patterns_dir.display()))?;

    println!("🔁 Standardizing {}...", file.display());
    let outcome = standardize_file(&file, &registry, &config.data_dir)
        .with_context(|| format!("Failed to standardize {}", file.display()))?;

    println!("✓ Pattern: {}", outcome.pattern);
    println!("✓ Rows: {}", outcome.rows);
    println!("✓ Saved: {}", config.data_dir.join(&outcome.output).display());
    Ok(())
}

fn run_stats(config: &ExplorerConfig, dataset: &str, json: bool) -> Result<()> {
    let store = DatasetStore::new(&config.data_dir);
    let name = resolve_dataset(&store, dataset)?;
    let table = store.load(&name).with_context(|| format!("Failed to load {}", name))?;

    let report = StatsReport::compute(&table, config.time_basis, config.locale);
    info!(dataset = %name, records = report.valid_records, "computed stats");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📈 {} ({} valid records, {} dated rows)", name, report.valid_records, report.dated_rows);
    for chart in &report.charts {
        println!("\n{}", chart.title);
        println!("{}", "━".repeat(chart.title.chars().count()));
        print_series(chart.kind, &chart.series);
    }
    Ok(())
}

fn print_series(kind: ChartKind, series: &Series) {
    if series.is_empty() {
        println!("  (no data)");
        return;
    }

    let label_width = series.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max = series.max_value().unwrap_or(0.0);
    for (label, value) in series.points() {
        let bar = match kind {
            ChartKind::Bar if max > 0.0 => "█".repeat(((value / max) * 30.0).round() as usize),
            _ => String::new(),
        };
        println!("  {:<width$}  {:>12}  {}", label, format_value(value), bar, width = label_width);
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn run_table(
    config: &ExplorerConfig,
    dataset: &str,
    new: bool,
    sort: Option<&str>,
    desc: bool,
) -> Result<()> {
    let store = DatasetStore::new(&config.data_dir);
    let name = resolve_dataset(&store, dataset)?;

    let mut grid = if new {
        let loaded = load_dataset(&store, &name).with_context(|| format!("Failed to load {}", name))?;
        let input = loaded
            .new_table
            .with_context(|| format!("{} has no sender/recipient type columns to rank", name))?;
        render(&input)
    } else {
        let table = store.load(&name).with_context(|| format!("Failed to load {}", name))?;
        render(&TableInput::Rows(table))
    };

    if let Some(column) = sort {
        let index = grid
            .header
            .iter()
            .position(|h| h == column)
            .or_else(|| column.parse::<usize>().ok())
            .filter(|&i| i < grid.column_count())
            .with_context(|| format!("Unknown column: {}", column))?;

        let mut sorter = SortController::attach(&grid);
        sorter.toggle(&mut grid, index);
        if desc {
            sorter.toggle(&mut grid, index);
        }
        let order = sorter.order(index).unwrap_or(SortOrder::Ascending);
        info!(column = %grid.header[index], ?order, "sorted table");
    }

    print_grid(&grid);
    if !grid.warnings.is_empty() {
        eprintln!("⚠️  {} row(s) did not match the header", grid.warnings.len());
    }
    Ok(())
}

fn print_grid(grid: &Grid) {
    let columns = grid
        .body
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(grid.header.len()))
        .max()
        .unwrap_or(0);

    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&grid.header).chain(&grid.body) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |row: &[String]| {
        row.iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    println!("{}", line(&grid.header));
    println!("{}", widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("─┼─"));
    for row in &grid.body {
        println!("{}", line(row));
    }
    println!("\n{} row(s)", grid.row_count());
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: ExplorerConfig, dataset: Option<String>, raw: Option<PathBuf>) -> Result<()> {
    let store = DatasetStore::new(&config.data_dir);
    let mut app = ui::App::new(config, store);

    if let Some(path) = raw {
        let table = transaction_explorer::read_table(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        app.import_raw(table);
    }
    if let Some(input) = dataset {
        let name = resolve_dataset(&app.store, &input)?;
        app.open_dataset(&name);
    }

    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: ExplorerConfig, _dataset: Option<String>, _raw: Option<PathBuf>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: transaction-explorer table <dataset>");
    std::process::exit(1);
}
