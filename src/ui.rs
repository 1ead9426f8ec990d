use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use open_hands::{
    month_name, monthly_summary, CycleState, MonthlySummary, MonthlyReport, Pager, SavingsGroup,
};
use open_hands::entities::Cycle;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::HashMap;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Groups,
    Reports,
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFilter {
    None,
    WithoutCycle,
    Active,
    Terminated,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Groups => Page::Reports,
            Page::Reports => Page::Summary,
            Page::Summary => Page::Groups,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Groups => Page::Summary,
            Page::Reports => Page::Groups,
            Page::Summary => Page::Reports,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Groups => "Grupos",
            Page::Reports => "Reportes",
            Page::Summary => "Resumen Mensual",
        }
    }
}

pub struct App {
    pub groups: Vec<SavingsGroup>,
    pub filtered_groups: Vec<SavingsGroup>,
    pub cycles_by_group: HashMap<i64, Vec<Cycle>>,
    pub reports: Vec<MonthlyReport>,
    pub pager: Pager,
    pub current_page: Page,
    pub groups_state: TableState,
    pub reports_state: TableState,
    pub group_filter: GroupFilter,
    pub year: i32,
    pub month: u32,
}

impl App {
    pub fn new(
        groups: Vec<SavingsGroup>,
        cycles: Vec<Cycle>,
        mut reports: Vec<MonthlyReport>,
        year: i32,
        month: u32,
    ) -> Self {
        let mut cycles_by_group: HashMap<i64, Vec<Cycle>> = HashMap::new();
        for cycle in cycles {
            cycles_by_group.entry(cycle.group_id).or_default().push(cycle);
        }

        // Newest periods first, matching the listing order in the store
        reports.sort_by(|a, b| {
            (b.year, b.month, b.id).cmp(&(a.year, a.month, a.id))
        });

        let mut groups_state = TableState::default();
        if !groups.is_empty() {
            groups_state.select(Some(0));
        }
        let mut reports_state = TableState::default();
        if !reports.is_empty() {
            reports_state.select(Some(0));
        }

        let pager = Pager::new(reports.len());
        let filtered_groups = groups.clone();

        Self {
            groups,
            filtered_groups,
            cycles_by_group,
            reports,
            pager,
            current_page: Page::Groups,
            groups_state,
            reports_state,
            group_filter: GroupFilter::None,
            year,
            month,
        }
    }

    pub fn cycle_state_for(&self, group_id: i64) -> CycleState {
        match self.cycles_by_group.get(&group_id) {
            Some(cycles) => CycleState::classify(cycles),
            None => CycleState::WithoutCycle,
        }
    }

    pub fn apply_group_filter(&mut self, filter: GroupFilter) {
        self.group_filter = filter;

        let wanted = match filter {
            GroupFilter::None => {
                self.filtered_groups = self.groups.clone();
                self.reset_group_selection();
                return;
            }
            GroupFilter::WithoutCycle => CycleState::WithoutCycle,
            GroupFilter::Active => CycleState::Active,
            GroupFilter::Terminated => CycleState::Terminated,
        };

        self.filtered_groups = self
            .groups
            .iter()
            .filter(|g| self.cycle_state_for(g.id) == wanted)
            .cloned()
            .collect();
        self.reset_group_selection();
    }

    fn reset_group_selection(&mut self) {
        if self.filtered_groups.is_empty() {
            self.groups_state.select(None);
        } else {
            self.groups_state.select(Some(0));
        }
    }

    /// Reports visible on the current page of the pager.
    pub fn visible_reports(&self) -> &[MonthlyReport] {
        let window = self.pager.window();
        let start = window.offset.min(self.reports.len());
        let end = (start + window.limit).min(self.reports.len());
        &self.reports[start..end]
    }

    pub fn next_report_page(&mut self) {
        if self.pager.next() {
            self.reports_state.select(Some(0));
        }
    }

    pub fn previous_report_page(&mut self) {
        if self.pager.previous() {
            self.reports_state.select(Some(0));
        }
    }

    pub fn next_period(&mut self) {
        if self.month == 12 {
            self.month = 1;
            self.year += 1;
        } else {
            self.month += 1;
        }
    }

    pub fn previous_period(&mut self) {
        if self.month == 1 {
            self.month = 12;
            self.year -= 1;
        } else {
            self.month -= 1;
        }
    }

    pub fn summary(&self) -> Option<MonthlySummary> {
        monthly_summary(&self.groups, &self.reports, self.year, self.month)
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next_row(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    fn active_table(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Reports => {
                let len = self.visible_reports().len();
                (&mut self.reports_state, len)
            }
            _ => {
                let len = self.filtered_groups.len();
                (&mut self.groups_state, len)
            }
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
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
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Char('c') if app.current_page == Page::Groups => {
                    app.apply_group_filter(GroupFilter::None);
                }
                KeyCode::Char('1') if app.current_page == Page::Groups => {
                    app.apply_group_filter(GroupFilter::WithoutCycle);
                }
                KeyCode::Char('2') if app.current_page == Page::Groups => {
                    app.apply_group_filter(GroupFilter::Active);
                }
                KeyCode::Char('3') if app.current_page == Page::Groups => {
                    app.apply_group_filter(GroupFilter::Terminated);
                }
                KeyCode::Char('n') | KeyCode::Right => match app.current_page {
                    Page::Reports => app.next_report_page(),
                    Page::Summary => app.next_period(),
                    Page::Groups => {}
                },
                KeyCode::Char('p') | KeyCode::Left => match app.current_page {
                    Page::Reports => app.previous_report_page(),
                    Page::Summary => app.previous_period(),
                    Page::Groups => {}
                },
                KeyCode::Down | KeyCode::Char('j') => app.next_row(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_row(),
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
        Page::Groups => render_groups(f, chunks[1], app),
        Page::Reports => render_reports(f, chunks[1], app),
        Page::Summary => render_summary(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = vec![
        (Page::Groups, "Grupos"),
        (Page::Reports, "Reportes"),
        (Page::Summary, "Resumen Mensual"),
    ];

    let mut tab_spans = vec![];
    for (i, (page, name)) in pages.iter().enumerate() {
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

        tab_spans.push(Span::styled(*name, style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Grupos: {}", app.groups.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Reportes: {}", app.reports.len()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn state_color(state: CycleState) -> Color {
    match state {
        CycleState::Active => Color::Green,
        CycleState::Terminated => Color::Red,
        CycleState::WithoutCycle => Color::DarkGray,
    }
}

fn render_groups(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Nombre", "País", "Ciudad", "Miembros", "Tipo", "Ciclo"]
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

    let states: Vec<CycleState> = app
        .filtered_groups
        .iter()
        .map(|g| app.cycle_state_for(g.id))
        .collect();

    let rows = app.filtered_groups.iter().zip(states.iter()).map(|(g, state)| {
        let cells = vec![
            Cell::from(truncate(&g.name, 28)),
            Cell::from(g.country.clone()),
            Cell::from(g.city.clone()),
            Cell::from(format!("{}", g.total_members)),
            Cell::from(g.savings_type.as_str().to_uppercase()),
            Cell::from(state.label()).style(Style::default().fg(state_color(*state))),
        ];
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(30),
            Constraint::Length(15),
            Constraint::Length(15),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Grupos de Ahorro "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.groups_state);
}

fn render_reports(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Periodo", "Grupo", "Reuniones", "Asistencia", "Ahorro"]
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

    let names: HashMap<i64, &str> = app
        .groups
        .iter()
        .map(|g| (g.id, g.name.as_str()))
        .collect();

    let rows: Vec<Row> = app
        .visible_reports()
        .iter()
        .map(|r| {
            let group_name = names.get(&r.group_id).copied().unwrap_or("?");
            let attendance = r
                .average_attendance
                .map(|a| format!("{:.1}", a))
                .unwrap_or_else(|| "-".to_string());
            let cells = vec![
                Cell::from(format!("{} {}", month_name(r.month), r.year)),
                Cell::from(truncate(group_name, 28)),
                Cell::from(format!("{}", r.meeting_count)),
                Cell::from(attendance),
                Cell::from(format!("${:.2}", r.amount_saved))
                    .style(Style::default().fg(Color::Green)),
            ];
            Row::new(cells).height(1)
        })
        .collect();

    let title = format!(
        " Reportes Mensuales - Página {}/{} ",
        app.pager.current_page(),
        app.pager.total_pages().max(1)
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(30),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
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

    f.render_stateful_widget(table, area, &mut app.reports_state);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        " Resumen Mensual - {} {} ",
        month_name(app.month),
        app.year
    );

    let content = match app.summary() {
        Some(s) => summary_lines(&s),
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No hay datos para este periodo",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "  Use n/p para cambiar de mes",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )),
        ],
    };

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    );

    f.render_widget(paragraph, area);
}

fn summary_lines(s: &MonthlySummary) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Grupos Activos: ", label),
            Span::raw(format!("{}", s.group_count)),
            Span::raw("    "),
            Span::styled("Reportes: ", label),
            Span::raw(format!("{}", s.report_count)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Miembros: ", label),
            Span::raw(format!("{}", s.total_members)),
            Span::raw("    "),
            Span::styled("Hombres: ", label),
            Span::raw(format!("{}", s.total_men)),
            Span::raw("    "),
            Span::styled("Mujeres: ", label),
            Span::raw(format!("{}", s.total_women)),
            Span::raw("    "),
            Span::styled("Niños: ", label),
            Span::raw(format!("{}", s.total_children)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total Ahorrado: ", label),
            Span::styled(
                format!("${:.2}", s.total_savings),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled("Asistencia Total: ", label),
            Span::raw(format!("{:.1}", s.total_attendance)),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Tipos de Grupo    ", label),
            Span::raw(format!(
                "ASCA: {}   ROSCA: {}   Simple: {}   Juvenil: {}",
                s.asca_count, s.rosca_count, s.simple_count, s.youth_count
            )),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Ahorro por Tipo   ", label),
            Span::raw(format!(
                "ASCA: ${:.2}   ROSCA: ${:.2}   Simple: ${:.2}   Juvenil: ${:.2}",
                s.savings_by_type.asca,
                s.savings_by_type.rosca,
                s.savings_by_type.simple,
                s.savings_by_type.youth
            )),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  n/p cambia de mes",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ]
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    match app.current_page {
        Page::Groups => {
            let selected = app.groups_state.selected().map(|i| i + 1).unwrap_or(0);
            status_spans.push(Span::styled(
                format!(" Fila: {}/{} ", selected, app.filtered_groups.len()),
                Style::default().fg(Color::Cyan),
            ));
            if app.group_filter != GroupFilter::None {
                let name = match app.group_filter {
                    GroupFilter::WithoutCycle => "Sin Ciclo",
                    GroupFilter::Active => "Activo",
                    GroupFilter::Terminated => "Terminado",
                    GroupFilter::None => unreachable!(),
                };
                status_spans.push(Span::raw(" | "));
                status_spans.push(Span::styled(
                    format!("Filtro: {}", name),
                    Style::default().fg(Color::Green),
                ));
                status_spans.push(Span::raw(" ("));
                status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
                status_spans.push(Span::raw(" limpiar)"));
            }
            status_spans.push(Span::raw(" | "));
            status_spans.push(Span::styled("1-3", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Filtro ciclo"));
        }
        Page::Reports => {
            status_spans.push(Span::styled(
                format!(
                    " Página: {}/{} ({} reportes) ",
                    app.pager.current_page(),
                    app.pager.total_pages().max(1),
                    app.pager.total_count()
                ),
                Style::default().fg(Color::Cyan),
            ));
            status_spans.push(Span::raw(" | "));
            status_spans.push(Span::styled("n/p", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Página"));
        }
        Page::Summary => {
            status_spans.push(Span::styled(
                format!(" Periodo: {} {} ", month_name(app.month), app.year),
                Style::default().fg(Color::Cyan),
            ));
            status_spans.push(Span::raw(" | "));
            status_spans.push(Span::styled("n/p", Style::default().fg(Color::Yellow)));
            status_spans.push(Span::raw(" Mes"));
        }
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Página | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Salir"));

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
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use open_hands::entities::{CycleStatus, SavingsType};

    fn sample_group(id: i64, name: &str) -> SavingsGroup {
        SavingsGroup {
            id,
            name: name.to_string(),
            country: "Honduras".to_string(),
            city: "Tegucigalpa".to_string(),
            zone: None,
            total_members: 10,
            men: 4,
            women: 6,
            boys: 0,
            girls: 0,
            savings_type: SavingsType::Simple,
            youth_group: false,
            cycle_duration: 12,
            creation_year: Some(2023),
            creation_month: Some(1),
            facilitator_id: "fac-1".to_string(),
        }
    }

    fn sample_report(id: i64, group_id: i64, year: i32, month: u32) -> MonthlyReport {
        MonthlyReport {
            id,
            group_id,
            facilitator_id: "fac-1".to_string(),
            year,
            month,
            meeting_count: 4,
            average_attendance: Some(8.0),
            amount_saved: 100.0,
            comments: None,
            created_at: chrono::Utc::now(),
        }
    }

    fn sample_cycle(id: i64, group_id: i64, status: CycleStatus) -> Cycle {
        Cycle {
            id,
            group_id,
            name: format!("Ciclo {}", id),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            status,
        }
    }

    #[test]
    fn test_visible_reports_windowed() {
        let reports: Vec<MonthlyReport> =
            (1..=10).map(|i| sample_report(i, 1, 2024, 3)).collect();
        let mut app = App::new(vec![sample_group(1, "G")], vec![], reports, 2024, 3);

        assert_eq!(app.visible_reports().len(), 8);
        app.next_report_page();
        assert_eq!(app.visible_reports().len(), 2);
        app.next_report_page();
        // Already on the last page, window unchanged
        assert_eq!(app.visible_reports().len(), 2);
    }

    #[test]
    fn test_group_filter_by_cycle_state() {
        let groups = vec![sample_group(1, "Activo"), sample_group(2, "Sin ciclo")];
        let cycles = vec![sample_cycle(1, 1, CycleStatus::Active)];
        let mut app = App::new(groups, cycles, vec![], 2024, 3);

        app.apply_group_filter(GroupFilter::Active);
        assert_eq!(app.filtered_groups.len(), 1);
        assert_eq!(app.filtered_groups[0].id, 1);

        app.apply_group_filter(GroupFilter::WithoutCycle);
        assert_eq!(app.filtered_groups.len(), 1);
        assert_eq!(app.filtered_groups[0].id, 2);

        app.apply_group_filter(GroupFilter::None);
        assert_eq!(app.filtered_groups.len(), 2);
    }

    #[test]
    fn test_period_navigation_wraps_year() {
        let mut app = App::new(vec![], vec![], vec![], 2024, 12);
        app.next_period();
        assert_eq!((app.year, app.month), (2025, 1));
        app.previous_period();
        assert_eq!((app.year, app.month), (2024, 12));
    }
}
