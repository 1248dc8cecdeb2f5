use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use food_waste::app::{App, CrudAction, Input, Page, StatusKind};
use food_waste::dashboard::QueryResult;
use food_waste::schema::Table as DbTable;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table},
    Frame, Terminal,
};
use std::io;

const MAX_COLUMN_WIDTH: usize = 30;

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
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                return Ok(());
            }
            if let Some(input) = map_key(key) {
                app.handle_input(input);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn map_key(key: KeyEvent) -> Option<Input> {
    let input = match key.code {
        KeyCode::Char(c) => Input::Char(c),
        KeyCode::Backspace => Input::Backspace,
        KeyCode::Enter => Input::Enter,
        KeyCode::Up => Input::Up,
        KeyCode::Down => Input::Down,
        KeyCode::Left => Input::Left,
        KeyCode::Right => Input::Right,
        KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => Input::BackTab,
        KeyCode::Tab => Input::Tab,
        KeyCode::BackTab => Input::BackTab,
        KeyCode::PageUp => Input::PageUp,
        KeyCode::PageDown => Input::PageDown,
        KeyCode::Esc => Input::Esc,
        _ => return None,
    };
    Some(input)
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(44), Constraint::Min(0)])
        .split(chunks[1]);

    match app.page {
        Page::QueryDashboard => render_query_menu(f, content[0], app),
        Page::CrudOperations => render_crud_panel(f, content[0], app),
    }

    let title = match app.page {
        Page::QueryDashboard => app
            .selected_query()
            .map(|q| format!(" {} ", q.name))
            .unwrap_or_else(|| " No query selected ".to_string()),
        Page::CrudOperations => format!(" {} ", app.table.schema().label),
    };
    render_result(f, content[1], app.current_result(), app.scroll, &title);

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::QueryDashboard, Page::CrudOperations];

    let mut tab_spans = vec![Span::styled(
        " 🍲 Food Waste Management  ",
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

// ============================================================================
// QUERY DASHBOARD
// ============================================================================

fn render_query_menu(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let categories: Vec<ListItem> = app
        .catalog
        .categories
        .iter()
        .map(|c| ListItem::new(truncate(&c.name, 40)))
        .collect();
    let mut category_state = ListState::default();
    category_state.select(Some(app.category_index));
    f.render_stateful_widget(
        selectable_list(categories, " Category (←/→) "),
        chunks[0],
        &mut category_state,
    );

    let queries: Vec<ListItem> = app
        .selected_category()
        .map(|c| {
            c.queries
                .iter()
                .map(|q| ListItem::new(truncate(&q.name, 40)))
                .collect()
        })
        .unwrap_or_default();
    let mut query_state = ListState::default();
    query_state.select(Some(app.query_index));
    f.render_stateful_widget(
        selectable_list(queries, " Query (↑/↓) "),
        chunks[1],
        &mut query_state,
    );
}

fn selectable_list<'a>(items: Vec<ListItem<'a>>, title: &'a str) -> List<'a> {
    List::new(items)
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
        .highlight_symbol("→ ")
}

// ============================================================================
// CRUD
// ============================================================================

fn render_crud_panel(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Table selector
            Constraint::Length(3), // Action selector
            Constraint::Min(0),    // Form
        ])
        .split(area);

    let table_spans: Vec<Span> = DbTable::ALL
        .iter()
        .map(|t| {
            let style = if *t == app.table {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(format!(" {} ", t.schema().label), style)
        })
        .collect();
    f.render_widget(
        Paragraph::new(Line::from(table_spans))
            .block(Block::default().borders(Borders::ALL).title(" Table (←/→) ")),
        chunks[0],
    );

    let mut action_spans = Vec::new();
    for action in CrudAction::ALL {
        let style = if action == app.action {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        action_spans.push(Span::styled(format!(" {} ", action.hotkey()), Style::default().fg(Color::Cyan)));
        action_spans.push(Span::styled(action.title().to_string(), style));
    }
    f.render_widget(
        Paragraph::new(Line::from(action_spans))
            .block(Block::default().borders(Borders::ALL).title(" Action ")),
        chunks[1],
    );

    render_form(f, chunks[2], app);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();

    if !app.is_editing() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "  Press a / u / d to open a form",
            Style::default().fg(Color::DarkGray),
        )));
    }

    for field in app.fields() {
        let marker = if field.focused { "→ " } else { "  " };
        let label_style = if field.focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let required = if field.required { "*" } else { "" };
        let cursor = if field.focused { "▏" } else { "" };

        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Green)),
            Span::styled(format!("{}{}: ", field.label, required), label_style),
            Span::raw(field.value.to_string()),
            Span::styled(cursor, Style::default().fg(Color::Yellow)),
        ]));
    }

    let title = format!(" {} {} ", app.action.title(), app.table.schema().label);
    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    );

    f.render_widget(form, area);
}

// ============================================================================
// RESULTS & STATUS
// ============================================================================

fn render_result(f: &mut Frame, area: Rect, result: Option<&QueryResult>, scroll: usize, title: &str) {
    let title = match result {
        Some(r) if !r.is_empty() => format!("{}({} rows, from {}) ", title, r.len(), scroll + 1),
        _ => title.to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title);

    let Some(result) = result else {
        f.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    if result.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No rows",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let widths: Vec<Constraint> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let longest = result
                .rows
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.to_string().chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0);
            Constraint::Length(longest.min(MAX_COLUMN_WIDTH) as u16)
        })
        .collect();

    let header_cells = result.columns.iter().map(|h| {
        Cell::from(h.clone()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = result.rows.iter().skip(scroll).map(|row| {
        let cells = row
            .iter()
            .map(|c| Cell::from(truncate(&c.to_string(), MAX_COLUMN_WIDTH)));
        Row::new(cells).height(1)
    });

    let table = Table::new(rows, widths).header(header).block(block);

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(status) = &app.status {
        let (icon, color) = match status.kind {
            StatusKind::Success => ("✅", Color::Green),
            StatusKind::Warning => ("⚠️ ", Color::Yellow),
            StatusKind::Error => ("❌", Color::Red),
        };
        status_spans.push(Span::styled(
            format!(" {} {} ", icon, status.message),
            Style::default().fg(color),
        ));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    if app.page == Page::CrudOperations && app.is_editing() {
        status_spans.push(Span::raw(" Submit | "));
        status_spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" Close form | "));
    } else {
        status_spans.push(Span::raw(" Refresh | "));
    }
    status_spans.push(Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Scroll | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

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
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
