use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ev_flex_value::{summarize, EvSpec, EvValueEstimation, MarketPrice, MarketType, PriceStats};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const FAST_SCROLL: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    EvSpecs,
    MarketPrices,
    EstimationHistory,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::EvSpecs, Page::MarketPrices, Page::EstimationHistory];

    pub fn next(&self) -> Self {
        match self {
            Page::EvSpecs => Page::MarketPrices,
            Page::MarketPrices => Page::EstimationHistory,
            Page::EstimationHistory => Page::EvSpecs,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::EvSpecs => Page::EstimationHistory,
            Page::MarketPrices => Page::EvSpecs,
            Page::EstimationHistory => Page::MarketPrices,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::EvSpecs => "EV Specs",
            Page::MarketPrices => "Market Prices",
            Page::EstimationHistory => "Estimation History",
        }
    }
}

pub struct App {
    pub specs: Vec<EvSpec>,
    pub prices: Vec<MarketPrice>,
    pub filtered_prices: Vec<MarketPrice>,
    pub estimations: Vec<EvValueEstimation>,
    pub current_page: Page,
    pub price_filter: Option<MarketType>,
    pub show_detail: bool,
    specs_state: TableState,
    prices_state: TableState,
    history_state: TableState,
}

fn initial_state(len: usize) -> TableState {
    let mut state = TableState::default();
    if len > 0 {
        state.select(Some(0));
    }
    state
}

impl App {
    pub fn new(
        specs: Vec<EvSpec>,
        prices: Vec<MarketPrice>,
        estimations: Vec<EvValueEstimation>,
    ) -> Self {
        Self {
            specs_state: initial_state(specs.len()),
            prices_state: initial_state(prices.len()),
            history_state: initial_state(estimations.len()),
            filtered_prices: prices.clone(),
            specs,
            prices,
            estimations,
            current_page: Page::EvSpecs,
            price_filter: None,
            show_detail: false,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.show_detail = false;
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.show_detail = false;
    }

    /// Detail panel only exists for estimations
    pub fn toggle_detail(&mut self) {
        if self.current_page == Page::EstimationHistory {
            self.show_detail = !self.show_detail;
        }
    }

    /// `None` shows every segment
    pub fn apply_filter(&mut self, filter: Option<MarketType>) {
        self.price_filter = filter;
        self.filtered_prices = match filter {
            None => self.prices.clone(),
            Some(market_type) => self
                .prices
                .iter()
                .filter(|p| p.market_type == market_type)
                .cloned()
                .collect(),
        };
        self.prices_state = initial_state(self.filtered_prices.len());
    }

    pub fn row_count(&self) -> usize {
        match self.current_page {
            Page::EvSpecs => self.specs.len(),
            Page::MarketPrices => self.filtered_prices.len(),
            Page::EstimationHistory => self.estimations.len(),
        }
    }

    pub fn selected(&self) -> Option<usize> {
        match self.current_page {
            Page::EvSpecs => self.specs_state.selected(),
            Page::MarketPrices => self.prices_state.selected(),
            Page::EstimationHistory => self.history_state.selected(),
        }
    }

    fn select(&mut self, index: Option<usize>) {
        let state = match self.current_page {
            Page::EvSpecs => &mut self.specs_state,
            Page::MarketPrices => &mut self.prices_state,
            Page::EstimationHistory => &mut self.history_state,
        };
        state.select(index);
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self
            .selected()
            .map(|i| (i + FAST_SCROLL).min(len - 1))
            .unwrap_or(0);
        self.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = self
            .selected()
            .map(|i| i.saturating_sub(FAST_SCROLL))
            .unwrap_or(0);
        self.select(Some(i));
    }

    pub fn first(&mut self) {
        if self.row_count() > 0 {
            self.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.select(Some(len - 1));
        }
    }

    pub fn selected_estimation(&self) -> Option<&EvValueEstimation> {
        self.history_state
            .selected()
            .and_then(|i| self.estimations.get(i))
    }

    pub fn spec_model(&self, ev_spec_id: i64) -> Option<&str> {
        self.specs
            .iter()
            .find(|s| s.id == ev_spec_id)
            .map(|s| s.model.as_str())
    }

    /// Statistics over every loaded price of each segment, ignoring the filter
    pub fn segment_stats(&self) -> Vec<(MarketType, Option<PriceStats>)> {
        MarketType::ALL
            .iter()
            .map(|&market_type| {
                let prices: Vec<MarketPrice> = self
                    .prices
                    .iter()
                    .filter(|p| p.market_type == market_type)
                    .cloned()
                    .collect();
                (market_type, summarize(&prices))
            })
            .collect()
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

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Char(c @ '1'..='4') if app.current_page == Page::MarketPrices => {
                    let filter = match c {
                        '1' => Some(MarketType::DayAhead),
                        '2' => Some(MarketType::Intraday),
                        '3' => Some(MarketType::Imbalance),
                        _ => None,
                    };
                    app.apply_filter(filter);
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Tabs + segment averages
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::EvSpecs => render_specs(f, chunks[1], app),
        Page::MarketPrices => render_prices(f, chunks[1], app),
        Page::EstimationHistory if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_history(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::EstimationHistory => render_history(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn market_color(market_type: MarketType) -> Color {
    match market_type {
        MarketType::DayAhead => Color::Cyan,
        MarketType::Intraday => Color::Yellow,
        MarketType::Imbalance => Color::Magenta,
    }
}

fn value_color(value: f64) -> Color {
    if value < 0.0 {
        Color::Red
    } else {
        Color::Green
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!(
            "Specs: {}  Prices: {}  Estimations: {}",
            app.specs.len(),
            app.prices.len(),
            app.estimations.len()
        ),
        Style::default().fg(Color::White),
    ));

    let mut avg_spans = vec![];
    for (market_type, stats) in app.segment_stats() {
        if !avg_spans.is_empty() {
            avg_spans.push(Span::raw("   "));
        }
        let text = match stats {
            Some(s) => format!("{} avg {:.2} ({} obs)", market_type.label(), s.mean, s.count),
            None => format!("{} avg -", market_type.label()),
        };
        avg_spans.push(Span::styled(text, Style::default().fg(market_color(market_type))));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans), Line::from(avg_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_specs(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.specs.iter().map(|spec| {
        Row::new(vec![
            Cell::from(spec.id.to_string()),
            Cell::from(truncate(&spec.model, 30)),
            Cell::from(format!("{:.1}", spec.battery_capacity_kwh)),
            Cell::from(format!("{:.1}", spec.efficiency_kwh_per_100km)),
            Cell::from(format!("{:.1}", spec.max_charging_power_kw)),
            Cell::from(spec.created_at.format("%Y-%m-%d").to_string()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["ID", "Model", "Battery kWh", "kWh/100km", "Max kW", "Created"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" EV Specifications "),
    )
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.specs_state);
}

fn render_prices(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.filtered_prices.iter().map(|price| {
        let color = market_color(price.market_type);
        Row::new(vec![
            Cell::from(price.id.to_string()),
            Cell::from(price.market_type.label()).style(Style::default().fg(color)),
            Cell::from(format!("{:.2}", price.price_eur_per_mwh))
                .style(Style::default().fg(value_color(price.price_eur_per_mwh))),
            Cell::from(price.timestamp.format("%Y-%m-%d %H:%M").to_string()),
        ])
    });

    let title = match app.price_filter {
        Some(market_type) => format!(" Market Prices ({}) ", market_type.label()),
        None => " Market Prices ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(18),
        ],
    )
    .header(header_row(&["ID", "Market", "EUR/MWh", "Timestamp"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.prices_state);
}

fn render_history(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .estimations
        .iter()
        .map(|e| {
            let model = app.spec_model(e.ev_spec_id).unwrap_or("?");
            Row::new(vec![
                Cell::from(e.id.to_string()),
                Cell::from(truncate(model, 24)),
                Cell::from(e.annual_km.to_string()),
                Cell::from(format!("{:.2}", e.estimated_value_eur_per_year))
                    .style(Style::default().fg(value_color(e.estimated_value_eur_per_year))),
                Cell::from(e.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(26),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(18),
        ],
    )
    .header(header_row(&["ID", "Model", "km/yr", "EUR/yr", "Created"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Estimations "),
    )
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.history_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.row_count()),
        Style::default().fg(Color::Cyan),
    )];

    if app.current_page == Page::MarketPrices {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("1-3", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Segment "));
        status_spans.push(Span::styled("4", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" All"));
    }
    if app.current_page == Page::EstimationHistory {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Details"));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Fast | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let Some(e) = app.selected_estimation() else {
        let empty = Paragraph::new("No estimation selected").block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Estimation Details "),
        );
        f.render_widget(empty, area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let section = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let euros = |value: f64| {
        Span::styled(
            format!("{:>10.2} EUR", value),
            Style::default().fg(value_color(value)),
        )
    };

    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  EV: ", label),
            Span::raw(app.spec_model(e.ev_spec_id).unwrap_or("unknown").to_string()),
            Span::styled(format!(" (#{})", e.ev_spec_id), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Annual distance: ", label),
            Span::raw(format!("{} km", e.annual_km)),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![Span::styled("  VALUE BREAKDOWN", section)]),
        Line::from(""),
        Line::from(vec![Span::styled("  Day-ahead:  ", label), euros(e.day_ahead_value)]),
        Line::from(vec![Span::styled("  Intraday:   ", label), euros(e.intraday_value)]),
        Line::from(vec![Span::styled("  Imbalance:  ", label), euros(e.imbalance_value)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total:      ", label),
            euros(e.estimated_value_eur_per_year),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Created: ", label),
            Span::raw(e.created_at.to_rfc3339()),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )]),
    ];

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Estimation Details "),
    );

    f.render_widget(detail_panel, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
