use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis as ChartAxis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::ops::Range;
use std::path::PathBuf;
use tracing::{info, warn};

use transaction_explorer::table::format_number;
use transaction_explorer::{
    load_dataset, read_table, select_dataset, AppState, Axis, ChartKey, ChartKind, ChartSpec, DatasetStore,
    Display, ExplorerConfig, Grid, RawTable, SortController, StatsReport, TimeUnit, View,
};

const PAGE: usize = 20;
const MAX_COLUMN_WIDTH: u16 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a 1-based dataset number
    PickDataset(String),
    /// Typing a spreadsheet path for the raw view
    ImportFile(String),
}

pub struct App {
    pub config: ExplorerConfig,
    pub store: DatasetStore,
    pub state: AppState,
    pub current_view: View,
    /// Committed render of the current view
    pub display: Display,
    pub sorter: SortController,
    pub table_state: TableState,
    pub column: usize,
    pub datasets: Vec<String>,
    pub mode: InputMode,
    pub status: Option<String>,
}

impl App {
    pub fn new(config: ExplorerConfig, store: DatasetStore) -> Self {
        let mut app = Self {
            config,
            store,
            state: AppState::new(),
            current_view: View::Standardized,
            display: Display::Placeholder(String::new()),
            sorter: SortController::default(),
            table_state: TableState::default(),
            column: 0,
            datasets: Vec::new(),
            mode: InputMode::Normal,
            status: None,
        };
        app.reload_datasets();
        app.refresh();
        app
    }

    /// Re-render the current view from the state snapshot
    pub fn refresh(&mut self) {
        self.display = self
            .state
            .display(self.current_view, self.config.time_basis, self.config.locale);

        match &self.display {
            Display::Table(grid) => {
                self.sorter = SortController::attach(grid);
                self.table_state
                    .select(if grid.body.is_empty() { None } else { Some(0) });
                self.column = self.column.min(grid.column_count().saturating_sub(1));
            }
            _ => {
                self.sorter = SortController::default();
                self.table_state.select(None);
            }
        }
    }

    pub fn reload_datasets(&mut self) {
        match self.store.list() {
            Ok(list) => self.datasets = list,
            Err(e) => {
                warn!("cannot list datasets: {}", e);
                self.datasets.clear();
                self.status = Some(format!("Cannot list {}: {}", self.store.root().display(), e));
            }
        }
    }

    pub fn import_raw(&mut self, table: RawTable) {
        self.state = self.state.with_raw(table);
        self.current_view = View::Raw;
        self.refresh();
    }

    fn import_file(&mut self, path: &str) {
        match read_table(&PathBuf::from(path.trim())) {
            Ok(table) => {
                self.status = Some(format!("Imported {} ({} rows)", path.trim(), table.len()));
                self.import_raw(table);
            }
            Err(e) => self.status = Some(format!("Import failed: {}", e)),
        }
    }

    /// Load a dataset; on failure the previous snapshot stays displayed
    pub fn open_dataset(&mut self, name: &str) {
        let (state, ticket) = self.state.begin_load();
        self.state = state;

        match load_dataset(&self.store, name) {
            Ok(loaded) => {
                self.state = self.state.complete_load(ticket, loaded);
                if self.current_view == View::Raw {
                    self.current_view = View::Standardized;
                }
                self.status = Some(format!("Opened {}", name));
                info!(dataset = name, "opened dataset");
                self.refresh();
            }
            Err(e) => {
                warn!(dataset = name, "load failed: {}", e);
                self.status = Some(format!("Cannot open {}: {}", name, e));
            }
        }
    }

    fn pick_dataset(&mut self, input: &str) {
        match select_dataset(&self.datasets, input) {
            Ok(name) => self.open_dataset(&name),
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn toggle_vault(&mut self, sender: bool) {
        let mut filter = self.state.filter();
        if sender {
            filter.ignore_sender = !filter.ignore_sender;
        } else {
            filter.ignore_recipient = !filter.ignore_recipient;
        }

        match self.state.with_filter(filter) {
            Ok(state) => {
                self.state = state;
                self.refresh();
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    pub fn sort_current_column(&mut self) {
        if let Display::Table(grid) = &mut self.display {
            if let Some(order) = self.sorter.toggle(grid, self.column) {
                let name = grid.header.get(self.column).cloned().unwrap_or_default();
                self.status = Some(format!("Sorted by {} {}", name, order.arrow()));
                self.table_state
                    .select(if grid.body.is_empty() { None } else { Some(0) });
            }
        }
    }

    fn grid(&self) -> Option<&Grid> {
        match &self.display {
            Display::Table(grid) => Some(grid),
            _ => None,
        }
    }

    fn row_count(&self) -> usize {
        self.grid().map(Grid::row_count).unwrap_or(0)
    }

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
        self.refresh();
    }

    pub fn previous_view(&mut self) {
        self.current_view = self.current_view.previous();
        self.refresh();
    }

    pub fn next_column(&mut self) {
        let columns = self.grid().map(Grid::column_count).unwrap_or(0);
        if self.column + 1 < columns {
            self.column += 1;
        }
    }

    pub fn previous_column(&mut self) {
        self.column = self.column.saturating_sub(1);
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self.table_state.selected().map_or(0, |i| (i + PAGE).min(len - 1));
        self.table_state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = self.table_state.selected().map_or(0, |i| i.saturating_sub(PAGE));
        self.table_state.select(Some(i));
    }

    pub fn last(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.table_state.select(Some(len - 1));
        }
    }

    /// Returns false when the app should quit
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match &mut self.mode {
            InputMode::PickDataset(buffer) | InputMode::ImportFile(buffer) => {
                match code {
                    KeyCode::Esc => self.mode = InputMode::Normal,
                    KeyCode::Backspace => {
                        buffer.pop();
                    }
                    KeyCode::Char(c) => buffer.push(c),
                    KeyCode::Enter => {
                        let mode = std::mem::replace(&mut self.mode, InputMode::Normal);
                        match mode {
                            InputMode::PickDataset(input) => self.pick_dataset(&input),
                            InputMode::ImportFile(path) => self.import_file(&path),
                            InputMode::Normal => {}
                        }
                    }
                    _ => {}
                }
                return true;
            }
            InputMode::Normal => {}
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Tab => self.next_view(),
            KeyCode::BackTab => self.previous_view(),
            KeyCode::Char('o') => {
                self.reload_datasets();
                self.mode = InputMode::PickDataset(String::new());
            }
            KeyCode::Char('i') => self.mode = InputMode::ImportFile(String::new()),
            KeyCode::Char('e') => self.toggle_vault(true),
            KeyCode::Char('d') => self.toggle_vault(false),
            KeyCode::Char('s') | KeyCode::Enter => self.sort_current_column(),
            KeyCode::Right | KeyCode::Char('l') => self.next_column(),
            KeyCode::Left | KeyCode::Char('h') => self.previous_column(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => {
                if self.row_count() > 0 {
                    self.table_state.select(Some(0));
                }
            }
            KeyCode::End => self.last(),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return false,
            _ => {}
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key.code, key.modifiers) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // View tabs
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if let InputMode::PickDataset(input) = &app.mode {
        render_picker(f, chunks[1], &app.datasets, input);
    } else {
        let App {
            display,
            sorter,
            table_state,
            column,
            current_view,
            ..
        } = app;
        match display {
            Display::Table(grid) => {
                render_table(f, chunks[1], grid, sorter, table_state, *column, current_view.title())
            }
            Display::Stats(report) => render_stats(f, chunks[1], report),
            Display::Placeholder(text) => render_placeholder(f, chunks[1], current_view.title(), text),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, view) in View::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *view == app.current_view {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(view.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        app.state.dataset().unwrap_or("no dataset").to_string(),
        Style::default().fg(Color::White),
    ));

    let filter = app.state.filter();
    if filter.ignore_sender {
        tab_spans.push(Span::raw("  "));
        tab_spans.push(Span::styled("−vault sender", Style::default().fg(Color::Red)));
    }
    if filter.ignore_recipient {
        tab_spans.push(Span::raw("  "));
        tab_spans.push(Span::styled("−vault recipient", Style::default().fg(Color::Red)));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn column_widths(grid: &Grid) -> Vec<u16> {
    (0..grid.column_count())
        .map(|i| {
            let header = grid.header[i].chars().count() + 2; // room for the sort arrow
            let body = grid.column(i).iter().map(|s| s.chars().count()).max().unwrap_or(0);
            header.max(body).clamp(3, MAX_COLUMN_WIDTH as usize) as u16
        })
        .collect()
}

/// Columns to draw so that `selected` is visible within `available` cells
fn visible_columns(widths: &[u16], selected: usize, available: u16) -> Range<usize> {
    if widths.is_empty() {
        return 0..0;
    }
    let selected = selected.min(widths.len() - 1);
    let cost = |w: u16| w as usize + 1;

    let mut used = cost(widths[selected]);
    let mut start = selected;
    while start > 0 && used + cost(widths[start - 1]) <= available as usize {
        start -= 1;
        used += cost(widths[start]);
    }
    let mut end = selected + 1;
    while end < widths.len() && used + cost(widths[end]) <= available as usize {
        used += cost(widths[end]);
        end += 1;
    }
    start..end
}

fn render_table(
    f: &mut Frame,
    area: Rect,
    grid: &Grid,
    sorter: &SortController,
    state: &mut TableState,
    selected: usize,
    title: &str,
) {
    let widths = column_widths(grid);
    // borders plus the highlight symbol
    let range = visible_columns(&widths, selected, area.width.saturating_sub(4));

    let header_cells = range.clone().map(|i| {
        let mut text = grid.header[i].clone();
        if let Some(order) = sorter.order(i) {
            text.push(' ');
            text.push_str(order.arrow());
        }
        let mut style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        if i == selected {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(text).style(style)
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = grid.body.iter().map(|row| {
        let cells = range.clone().map(|i| {
            let text = row.get(i).map(String::as_str).unwrap_or("");
            let cell = Cell::from(truncate(text, widths[i] as usize));
            if i == selected {
                cell.style(Style::default().fg(Color::Cyan))
            } else {
                cell
            }
        });
        Row::new(cells).height(1)
    });

    let constraints: Vec<Constraint> = range.clone().map(|i| Constraint::Length(widths[i])).collect();

    let mut block_title = format!(" {} - {} rows ", title, grid.row_count());
    if !grid.warnings.is_empty() {
        block_title.push_str(&format!("⚠ {} ", grid.warnings.len()));
    }

    let table = Table::new(rows, constraints)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(block_title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, state);
}

fn render_stats(f: &mut Frame, area: Rect, report: &StatsReport) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let mut slots = Vec::with_capacity(6);
    for row in rows.iter() {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row);
        slots.extend(halves.iter().copied());
    }

    for (chart, slot) in report.charts.iter().zip(slots.iter()) {
        match chart.kind {
            ChartKind::Line => render_line_chart(f, *slot, chart),
            ChartKind::Bar => render_bar_chart(f, *slot, chart),
        }
    }

    if let Some(slot) = slots.get(report.charts.len()) {
        render_summary(f, *slot, report);
    }
}

fn chart_block(spec: &ChartSpec) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(" {} ", spec.title))
}

fn render_line_chart(f: &mut Frame, area: Rect, spec: &ChartSpec) {
    let series = &spec.series;
    if series.is_empty() {
        f.render_widget(
            Paragraph::new("No dated rows").alignment(Alignment::Center).block(chart_block(spec)),
            area,
        );
        return;
    }

    let data: Vec<(f64, f64)> = series
        .values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();

    let min_y = series.values.iter().copied().fold(0.0, f64::min);
    let max_y = series.max_value().unwrap_or(0.0).max(min_y + 1.0);
    let x_max = series.len().saturating_sub(1).max(1) as f64;

    let unit = match spec.axis {
        Axis::Time(TimeUnit::Day) => "day",
        Axis::Time(TimeUnit::Week) => "week",
        Axis::Category => "",
    };
    let first = series.labels.first().cloned().unwrap_or_default();
    let last = series.labels.last().cloned().unwrap_or_default();
    let muted = Style::default().fg(Color::DarkGray);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Cyan))
        // a single point draws nothing as a line
        .graph_type(if data.len() == 1 { GraphType::Scatter } else { GraphType::Line })
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(chart_block(spec))
        .x_axis(
            ChartAxis::default()
                .title(Span::styled(unit, muted))
                .style(muted)
                .bounds([0.0, x_max])
                .labels(vec![Span::styled(first, muted), Span::styled(last, muted)]),
        )
        .y_axis(
            ChartAxis::default()
                .style(muted)
                .bounds([min_y, max_y])
                .labels(vec![
                    Span::styled(format_number(min_y.floor()), muted),
                    Span::styled(format_number(max_y.ceil()), muted),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_bar_chart(f: &mut Frame, area: Rect, spec: &ChartSpec) {
    let data: Vec<(&str, u64)> = spec
        .series
        .points()
        .map(|(label, value)| (label, value.max(0.0).round() as u64))
        .collect();

    let buckets = data.len().max(1) as u16;
    let bar_width = (area.width.saturating_sub(2) / buckets).saturating_sub(1).max(1);

    let chart = BarChart::default()
        .block(chart_block(spec))
        .data(data.as_slice())
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .label_style(Style::default().fg(Color::DarkGray));

    f.render_widget(chart, area);
}

fn render_summary(f: &mut Frame, area: Rect, report: &StatsReport) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Valid records: ", label),
            Span::raw(report.valid_records.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Dated rows: ", label),
            Span::raw(report.dated_rows.to_string()),
        ]),
    ];

    if let Some(total) = report
        .series(ChartKey::Cumulative)
        .and_then(|s| s.values.last().copied())
    {
        content.push(Line::from(vec![
            Span::styled("  Total volume: ", label),
            Span::raw(format!("{:.2}", total)),
        ]));
    }

    let summary = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Summary "),
    );
    f.render_widget(summary, area);
}

fn render_placeholder(f: &mut Frame, area: Rect, title: &str, text: &str) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(text.to_string(), Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(Span::styled(
            "Press o to open a dataset, i to import a spreadsheet",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", title)),
        );
    f.render_widget(paragraph, area);
}

fn render_picker(f: &mut Frame, area: Rect, datasets: &[String], input: &str) {
    let mut content = vec![Line::from("")];
    if datasets.is_empty() {
        content.push(Line::from(Span::styled(
            "  No datasets found",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, name) in datasets.iter().enumerate() {
        content.push(Line::from(vec![
            Span::styled(format!("  {:>3}", i + 1), Style::default().fg(Color::Yellow)),
            Span::raw(". "),
            Span::raw(name.clone()),
        ]));
    }
    content.push(Line::from(""));
    content.push(Line::from(vec![
        Span::styled("  Dataset number: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(input.to_string()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
    ]));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Open dataset "),
    );
    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let InputMode::ImportFile(path) = &app.mode {
        status_spans.push(Span::styled(" Import file: ", Style::default().fg(Color::Cyan)));
        status_spans.push(Span::raw(path.clone()));
        status_spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw("  (Enter to load, Esc to cancel)"));
    } else {
        if app.grid().is_some() {
            let selected = app.table_state.selected().map(|i| i + 1).unwrap_or(0);
            status_spans.push(Span::styled(
                format!(" Row: {}/{} Col: {} ", selected, app.row_count(), app.column + 1),
                Style::default().fg(Color::Cyan),
            ));
            status_spans.push(Span::raw("| "));
        }
        if let Some(message) = &app.status {
            status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
            status_spans.push(Span::raw(" | "));
        }

        for (key, label, color) in [
            ("Tab", " View | ", Color::Yellow),
            ("o", " Open | ", Color::Yellow),
            ("i", " Import | ", Color::Yellow),
            ("s", " Sort | ", Color::Yellow),
            ("e/d", " Vault | ", Color::Yellow),
            ("q", " Quit", Color::Red),
        ] {
            status_spans.push(Span::styled(key, Style::default().fg(color)));
            status_spans.push(Span::raw(label));
        }
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
