// 🖥️ Interactive application state
//
// Pure state machine driven by `Input`s. The terminal layer (ui.rs) only
// translates key events and draws; everything here runs without a terminal.

use crate::crud::{self, Form};
use crate::dashboard::{run_query, NamedQuery, QueryCatalog, QueryCategory, QueryResult};
use crate::error::Result;
use crate::schema::{Column, Table};
use rusqlite::Connection;
use tracing::{debug, warn};

/// Rows moved per PgUp/PgDn
pub const SCROLL_PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Char(char),
    Backspace,
    Enter,
    Up,
    Down,
    Left,
    Right,
    Tab,
    BackTab,
    PageUp,
    PageDown,
    Esc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    QueryDashboard,
    CrudOperations,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::QueryDashboard => Page::CrudOperations,
            Page::CrudOperations => Page::QueryDashboard,
        }
    }

    pub fn previous(&self) -> Self {
        // Two pages: same as next
        self.next()
    }

    pub fn title(&self) -> &str {
        match self {
            Page::QueryDashboard => "Query Dashboard",
            Page::CrudOperations => "CRUD Operations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudAction {
    View,
    Add,
    Update,
    Delete,
}

impl CrudAction {
    pub const ALL: [CrudAction; 4] = [
        CrudAction::View,
        CrudAction::Add,
        CrudAction::Update,
        CrudAction::Delete,
    ];

    pub fn title(&self) -> &str {
        match self {
            CrudAction::View => "View",
            CrudAction::Add => "Add",
            CrudAction::Update => "Update",
            CrudAction::Delete => "Delete",
        }
    }

    pub fn hotkey(&self) -> char {
        match self {
            CrudAction::View => 'v',
            CrudAction::Add => 'a',
            CrudAction::Update => 'u',
            CrudAction::Delete => 'd',
        }
    }

    fn from_hotkey(c: char) -> Option<Self> {
        CrudAction::ALL.iter().copied().find(|a| a.hotkey() == c)
    }

    fn needs_key(&self) -> bool {
        matches!(self, CrudAction::Update | CrudAction::Delete)
    }

    fn needs_form(&self) -> bool {
        matches!(self, CrudAction::Add | CrudAction::Update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

/// One editable line on the CRUD page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<'a> {
    pub label: &'static str,
    pub value: &'a str,
    pub required: bool,
    pub focused: bool,
}

pub struct App<'c> {
    conn: &'c Connection,
    pub catalog: QueryCatalog,
    pub page: Page,

    // Query dashboard
    pub category_index: usize,
    pub query_index: usize,
    pub query_result: Option<QueryResult>,

    // CRUD
    pub table: Table,
    pub action: CrudAction,
    pub form: Form,
    pub key_input: String,
    pub focus: usize,
    pub crud_result: Option<QueryResult>,

    pub scroll: usize,
    pub status: Option<Status>,
    pub should_quit: bool,
}

impl<'c> App<'c> {
    pub fn new(conn: &'c Connection, catalog: QueryCatalog) -> Self {
        let mut app = App {
            conn,
            catalog,
            page: Page::QueryDashboard,
            category_index: 0,
            query_index: 0,
            query_result: None,
            table: Table::Providers,
            action: CrudAction::View,
            form: Form::new(Table::Providers),
            key_input: String::new(),
            focus: 0,
            crud_result: None,
            scroll: 0,
            status: None,
            should_quit: false,
        };

        app.run_selected_query();
        app
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    pub fn handle_input(&mut self, input: Input) {
        match input {
            Input::Tab => return self.switch_page(self.page.next()),
            Input::BackTab => return self.switch_page(self.page.previous()),
            Input::PageDown => return self.scroll_down(SCROLL_PAGE),
            Input::PageUp => return self.scroll_up(SCROLL_PAGE),
            _ => {}
        }

        match self.page {
            Page::QueryDashboard => self.handle_dashboard_input(input),
            Page::CrudOperations => self.handle_crud_input(input),
        }
    }

    fn handle_dashboard_input(&mut self, input: Input) {
        match input {
            Input::Char('q') | Input::Esc => self.should_quit = true,
            Input::Left => self.select_category(self.category_index.checked_sub(1)),
            Input::Right => self.select_category(Some(self.category_index + 1)),
            Input::Up => self.select_query(self.query_index.checked_sub(1)),
            Input::Down => self.select_query(Some(self.query_index + 1)),
            Input::Enter => self.run_selected_query(),
            _ => {}
        }
    }

    fn handle_crud_input(&mut self, input: Input) {
        if self.is_editing() {
            return self.handle_form_input(input);
        }

        match input {
            Input::Char('q') | Input::Esc => self.should_quit = true,
            Input::Char(c) => {
                if let Some(action) = CrudAction::from_hotkey(c) {
                    self.select_action(action);
                }
            }
            Input::Left => self.select_table(self.table.previous()),
            Input::Right => self.select_table(self.table.next()),
            Input::Up => self.scroll_up(1),
            Input::Down => self.scroll_down(1),
            Input::Enter => self.refresh_table(),
            _ => {}
        }
    }

    /// Typing goes to the focused field; Esc closes the form
    fn handle_form_input(&mut self, input: Input) {
        let count = self.field_count();

        match input {
            Input::Esc => self.select_action(CrudAction::View),
            Input::Up => self.focus = (self.focus + count - 1) % count,
            Input::Down => self.focus = (self.focus + 1) % count,
            Input::Left => self.select_table(self.table.previous()),
            Input::Right => self.select_table(self.table.next()),
            Input::Char(c) => {
                if let Some(buffer) = self.focused_buffer() {
                    buffer.push(c);
                }
            }
            Input::Backspace => {
                if let Some(buffer) = self.focused_buffer() {
                    buffer.pop();
                }
            }
            Input::Enter => self.submit(),
            _ => {}
        }
    }

    // ========================================================================
    // QUERY DASHBOARD
    // ========================================================================

    pub fn selected_category(&self) -> Option<&QueryCategory> {
        self.catalog.categories.get(self.category_index)
    }

    pub fn selected_query(&self) -> Option<&NamedQuery> {
        self.selected_category()
            .and_then(|c| c.queries.get(self.query_index))
    }

    fn select_category(&mut self, index: Option<usize>) {
        match index {
            Some(i) if i < self.catalog.categories.len() && i != self.category_index => {
                self.category_index = i;
                self.query_index = 0;
                self.run_selected_query();
            }
            _ => {}
        }
    }

    fn select_query(&mut self, index: Option<usize>) {
        let len = self.selected_category().map(|c| c.queries.len()).unwrap_or(0);
        match index {
            Some(i) if i < len && i != self.query_index => {
                self.query_index = i;
                self.run_selected_query();
            }
            _ => {}
        }
    }

    fn run_selected_query(&mut self) {
        let Some(query) = self.selected_query() else {
            self.query_result = None;
            return;
        };
        let name = query.name.clone();

        debug!(query = %name, "running catalog query");
        let result = run_query(self.conn, &query.sql);
        self.scroll = 0;
        match result {
            Ok(result) => {
                self.status = None;
                self.query_result = Some(result);
            }
            Err(e) => {
                warn!(query = %name, error = %e, "catalog query failed");
                self.query_result = None;
                self.set_status(StatusKind::Error, format!("{} failed: {}", name, e));
            }
        }
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Add, Update and Delete open a form; View does not
    pub fn is_editing(&self) -> bool {
        self.action != CrudAction::View
    }

    pub fn field_count(&self) -> usize {
        let key = usize::from(self.action.needs_key());
        let form = if self.action.needs_form() { self.form.len() } else { 0 };
        key + form
    }

    /// Fields of the open form, key first
    pub fn fields(&self) -> Vec<Field<'_>> {
        let mut fields = Vec::new();

        if self.action.needs_key() {
            let schema = self.table.schema();
            let label = schema
                .column(schema.primary_key)
                .map(|c| c.label)
                .unwrap_or(schema.primary_key);
            fields.push(Field {
                label,
                value: &self.key_input,
                required: true,
                focused: false,
            });
        }

        if self.action.needs_form() {
            let columns: Vec<&'static Column> = self.form.columns();
            for (i, column) in columns.into_iter().enumerate() {
                fields.push(Field {
                    label: column.label,
                    value: self.form.value(i).unwrap_or_default(),
                    required: column.required,
                    focused: false,
                });
            }
        }

        let focus = self.focus;
        for (i, field) in fields.iter_mut().enumerate() {
            field.focused = i == focus;
        }
        fields
    }

    fn focused_buffer(&mut self) -> Option<&mut String> {
        let mut index = self.focus;
        if self.action.needs_key() {
            if index == 0 {
                return Some(&mut self.key_input);
            }
            index -= 1;
        }
        if self.action.needs_form() {
            return self.form.value_mut(index);
        }
        None
    }

    fn select_table(&mut self, table: Table) {
        self.table = table;
        self.form = Form::new(table);
        self.key_input.clear();
        self.focus = 0;
        self.status = None;
        self.refresh_table();
    }

    fn select_action(&mut self, action: CrudAction) {
        self.action = action;
        self.focus = 0;
        self.status = None;
        if action == CrudAction::View {
            self.refresh_table();
        }
    }

    fn switch_page(&mut self, page: Page) {
        self.page = page;
        self.scroll = 0;
        self.status = None;
        if page == Page::CrudOperations && self.crud_result.is_none() {
            self.refresh_table();
        }
    }

    fn refresh_table(&mut self) {
        self.scroll = 0;
        match crud::view(self.conn, self.table) {
            Ok(result) => self.crud_result = Some(result),
            Err(e) => {
                self.crud_result = None;
                self.set_status(StatusKind::Error, format!("Failed to read {}: {}", self.table, e));
            }
        }
    }

    fn submit(&mut self) {
        let outcome = match self.action {
            CrudAction::View => return self.refresh_table(),
            CrudAction::Add => crud::add(self.conn, &self.form),
            CrudAction::Update => crud::parse_key(self.table, &self.key_input)
                .and_then(|key| crud::update(self.conn, key, &self.form)),
            CrudAction::Delete => crud::parse_key(self.table, &self.key_input)
                .and_then(|key| crud::delete(self.conn, self.table, key)),
        };

        self.apply_outcome(outcome);
    }

    fn apply_outcome(&mut self, outcome: Result<crud::WriteOutcome>) {
        match outcome {
            Ok(outcome) if outcome.is_no_match() => {
                self.set_status(StatusKind::Warning, outcome.message());
            }
            Ok(outcome) => {
                if self.action == CrudAction::Add {
                    self.form.clear();
                    self.focus = 0;
                }
                let message = outcome.message();
                self.refresh_table();
                self.set_status(StatusKind::Success, message);
            }
            Err(e) => self.set_status(StatusKind::Error, e.to_string()),
        }
    }

    // ========================================================================
    // RESULTS & STATUS
    // ========================================================================

    /// Result set shown on the current page
    pub fn current_result(&self) -> Option<&QueryResult> {
        match self.page {
            Page::QueryDashboard => self.query_result.as_ref(),
            Page::CrudOperations => self.crud_result.as_ref(),
        }
    }

    fn scroll_down(&mut self, rows: usize) {
        let len = self.current_result().map(|r| r.len()).unwrap_or(0);
        self.scroll = (self.scroll + rows).min(len.saturating_sub(1));
    }

    fn scroll_up(&mut self, rows: usize) {
        self.scroll = self.scroll.saturating_sub(rows);
    }

    fn set_status(&mut self, kind: StatusKind, message: String) {
        self.status = Some(Status { kind, message });
    }
}
