use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use warehouse_auditor::{AnnotatedTable, Severity, Status, Tally};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Normative,
    Operational,
    Summary,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Normative => Page::Operational,
            Page::Operational => Page::Summary,
            Page::Summary => Page::Normative,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Normative => Page::Summary,
            Page::Operational => Page::Normative,
            Page::Summary => Page::Operational,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Normative => "Normative Audit",
            Page::Operational => "Operational Audit",
            Page::Summary => "Summary",
        }
    }
}

pub struct App {
    pub normative: AnnotatedTable,
    pub operational: AnnotatedTable,
    /// Row indices visible on the current audit page
    pub visible_rows: Vec<usize>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub problems_only: bool,
}

impl App {
    pub fn new(normative: AnnotatedTable, operational: AnnotatedTable) -> Self {
        let mut app = Self {
            normative,
            operational,
            visible_rows: Vec::new(),
            state: TableState::default(),
            current_page: Page::Normative,
            show_detail: false,
            problems_only: false,
        };
        app.refresh_rows();
        app
    }

    pub fn current_table(&self) -> &AnnotatedTable {
        match self.current_page {
            Page::Operational => &self.operational,
            _ => &self.normative,
        }
    }

    /// Recompute visible rows for the current page and filter
    pub fn refresh_rows(&mut self) {
        let problems_only = self.problems_only;
        self.visible_rows = self
            .current_table()
            .verdicts
            .iter()
            .enumerate()
            .filter(|(_, v)| !problems_only || v.status.severity() != Severity::Ok)
            .map(|(i, _)| i)
            .collect();

        if self.visible_rows.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn toggle_problems_only(&mut self) {
        self.problems_only = !self.problems_only;
        self.refresh_rows();
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.state
            .selected()
            .and_then(|i| self.visible_rows.get(i))
            .copied()
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.refresh_rows();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.refresh_rows();
    }

    fn move_by(&mut self, delta: isize, wrap: bool) {
        let len = self.visible_rows.len();
        if len == 0 {
            return;
        }
        let current = self.state.selected().unwrap_or(0) as isize;
        let mut target = current + delta;

        if wrap {
            target = target.rem_euclid(len as isize);
        } else {
            target = target.clamp(0, len as isize - 1);
        }
        self.state.select(Some(target as usize));
    }

    pub fn next(&mut self) {
        self.move_by(1, true);
    }

    pub fn previous(&mut self) {
        self.move_by(-1, true);
    }

    pub fn page_down(&mut self) {
        self.move_by(20, false);
    }

    pub fn page_up(&mut self) {
        self.move_by(-20, false);
    }
}

fn status_color(status: Status) -> Color {
    match status.severity() {
        Severity::Ok => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
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

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

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
                KeyCode::Char('f') => app.toggle_problems_only(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => {
                    if !app.visible_rows.is_empty() {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if !app.visible_rows.is_empty() {
                        app.state.select(Some(app.visible_rows.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Summary => render_summary(f, chunks[1], app),
        _ if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_table(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        _ => render_table(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Normative, Page::Operational, Page::Summary];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
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

    let tally = &app.current_table().tally;
    let ok: usize = tally
        .entries()
        .iter()
        .filter(|(s, _)| s.severity() == Severity::Ok)
        .map(|(_, n)| n)
        .sum();

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", tally.total()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(format!("✓ {}", ok), Style::default().fg(Color::Green)));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {}", tally.total() - ok),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let table = app.current_table();

    let header_cells = ["Row", "Material", "Location", "Type", "Status", "Observation"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .visible_rows
        .iter()
        .filter_map(|&i| Some((table.records.get(i)?, table.verdicts.get(i)?)))
        .map(|(record, verdict)| {
            let color = status_color(verdict.status);
            Row::new(vec![
                Cell::from(format!("{}", record.row + 1)),
                Cell::from(truncate(&record.material_code, 18)),
                Cell::from(truncate(&record.location.as_text(), 14)),
                Cell::from(record.declared_warehouse_type.clone()),
                Cell::from(format!("{} {}", verdict.status.glyph(), verdict.status.label()))
                    .style(Style::default().fg(color)),
                Cell::from(truncate(&verdict.observation, 60)),
            ])
            .height(1)
        })
        .collect();

    let title = format!(" {} ", app.current_page.title());
    let widget = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(20),
            Constraint::Length(16),
            Constraint::Length(6),
            Constraint::Length(34),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(widget, area, &mut app.state);
}

fn tally_lines<'a>(title: &'a str, tally: &Tally) -> Vec<Line<'a>> {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (status, count) in tally.entries() {
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::raw(status.glyph()),
            Span::raw(" "),
            Span::styled(
                format!("{:<32}", status.label()),
                Style::default().fg(status_color(*status)),
            ),
            Span::styled(format!("{:>7}", count), Style::default().fg(Color::White)),
        ]));
    }

    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled(
            format!("{:<32}{:>7}", "Total", tally.total()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let mut content = tally_lines("Normative audit (location vs permitted zones)", &app.normative.tally);
    content.extend(tally_lines(
        "Operational audit (declared vs master warehouse type)",
        &app.operational.tally,
    ));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Summary "),
    );

    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.visible_rows.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if app.problems_only {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled("Filter: problems", Style::default().fg(Color::Green)));
    }

    for (key, label, color) in [
        ("Enter", " Details | ", Color::Yellow),
        ("f", " Problems | ", Color::Yellow),
        ("Tab", " Page | ", Color::Yellow),
        ("↑/↓", " Nav | ", Color::Yellow),
        ("q", " Quit", Color::Red),
    ] {
        if key == "Enter" {
            status_spans.push(Span::raw(" | "));
        }
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(label));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Record Details ");

    let table = app.current_table();
    let (record, verdict) = match app
        .selected_row()
        .and_then(|i| Some((table.records.get(i)?, table.verdicts.get(i)?)))
    {
        Some(pair) => pair,
        None => {
            f.render_widget(Paragraph::new("No record selected").block(block), area);
            return;
        }
    };

    let label = |text: &'static str| {
        Span::styled(
            text,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    };

    let warehouse_name = table
        .warehouse_names
        .as_ref()
        .and_then(|names| names.get(record.row))
        .cloned()
        .unwrap_or_default();

    let content = vec![
        Line::from(""),
        Line::from(vec![label("  Material: "), Span::raw(record.material_code.clone())]),
        Line::from(""),
        Line::from(vec![label("  Location: "), Span::raw(record.location.as_text())]),
        Line::from(""),
        Line::from(vec![
            label("  Warehouse type: "),
            Span::raw(record.declared_warehouse_type.clone()),
            Span::raw(" "),
            Span::styled(warehouse_name, Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![
            label("  Status: "),
            Span::styled(
                format!("{} {}", verdict.status.glyph(), verdict.status.code()),
                Style::default().fg(status_color(verdict.status)),
            ),
        ]),
        Line::from(""),
        Line::from(vec![label("  Observation: ")]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&verdict.observation, 35),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(vec![label("  Suggested correction: ")]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&verdict.suggested_correction, 35),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  Press Enter to close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.chars().count() + word.chars().count() < width {
            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
        } else {
            if !current_line.is_empty() {
                if !result.is_empty() {
                    result.push_str("\n  ");
                }
                result.push_str(&current_line);
            }
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        if !result.is_empty() {
            result.push_str("\n  ");
        }
        result.push_str(&current_line);
    }

    result
}
