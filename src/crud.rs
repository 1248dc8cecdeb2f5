// ✏️ CRUD Operations - schema-driven forms over the four tables
//
// Every statement is built from the table's schema; user input only ever
// reaches the backend as bound parameters.

use crate::dashboard::{run_query, QueryResult};
use crate::error::{FoodWasteError, Result};
use crate::normalize::{parse_date, parse_datetime, DATETIME_FORMAT, DATE_FORMAT};
use crate::schema::{Column, ColumnKind, Table};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{info, warn};

// ============================================================================
// FORMS
// ============================================================================

/// Text buffers for a table's non-key columns, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    table: Table,
    values: Vec<String>,
}

impl Form {
    pub fn new(table: Table) -> Self {
        Form {
            table,
            values: vec![String::new(); table.schema().form_columns().count()],
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn columns(&self) -> Vec<&'static Column> {
        self.table.schema().form_columns().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn value_mut(&mut self, index: usize) -> Option<&mut String> {
        self.values.get_mut(index)
    }

    /// Set a field by column name
    pub fn set(&mut self, column: &str, value: impl Into<String>) -> Result<()> {
        let index = self
            .table
            .schema()
            .form_columns()
            .position(|c| c.name == column)
            .ok_or_else(|| {
                FoodWasteError::invalid_field(
                    column,
                    format!("not a form field of {}", self.table),
                )
            })?;

        self.values[index] = value.into();
        Ok(())
    }

    pub fn with(mut self, column: &str, value: impl Into<String>) -> Result<Self> {
        self.set(column, value)?;
        Ok(self)
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(String::clear);
    }

    /// Validate every field and produce the bound parameters for INSERT/UPDATE
    pub fn to_params(&self) -> Result<Vec<Value>> {
        self.table
            .schema()
            .form_columns()
            .zip(&self.values)
            .map(|(column, raw)| field_value(column, raw))
            .collect()
    }
}

/// Text is stored as typed; no trimming or case normalization here
pub fn field_value(column: &Column, raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        if column.required {
            return Err(FoodWasteError::invalid_field(column.name, "is required"));
        }
        return Ok(Value::Null);
    }

    match column.kind {
        ColumnKind::Text => Ok(Value::Text(raw.to_string())),
        ColumnKind::Integer => {
            let value: i64 = trimmed
                .parse()
                .map_err(|_| FoodWasteError::invalid_field(column.name, "must be a whole number"))?;
            if let Some(min) = column.min {
                if value < min {
                    return Err(FoodWasteError::invalid_field(
                        column.name,
                        format!("must be at least {}", min),
                    ));
                }
            }
            Ok(Value::Integer(value))
        }
        ColumnKind::Date => parse_date(trimmed)
            .map(|d| Value::Text(d.format(DATE_FORMAT).to_string()))
            .ok_or_else(|| {
                FoodWasteError::invalid_field(column.name, "expected a date like 2025-03-17")
            }),
        ColumnKind::DateTime => parse_datetime(trimmed)
            .map(|dt| Value::Text(dt.format(DATETIME_FORMAT).to_string()))
            .ok_or_else(|| {
                FoodWasteError::invalid_field(
                    column.name,
                    "expected a timestamp like 2025-03-17 14:30:00",
                )
            }),
    }
}

/// Parse a primary-key value typed by the user
pub fn parse_key(table: Table, raw: &str) -> Result<i64> {
    let schema = table.schema();
    let column = schema
        .column(schema.primary_key)
        .ok_or_else(|| FoodWasteError::UnknownTable(table.to_string()))?;

    match field_value(column, raw)? {
        Value::Integer(key) => Ok(key),
        _ => Err(FoodWasteError::invalid_field(column.name, "must be a whole number")),
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Added,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub table: Table,
    pub kind: WriteKind,
    pub key: i64,
    pub rows_affected: usize,
}

impl WriteOutcome {
    /// Statement ran but matched nothing
    pub fn is_no_match(&self) -> bool {
        self.rows_affected == 0
    }

    pub fn message(&self) -> String {
        let pk = self.table.schema().primary_key;

        if self.is_no_match() {
            return format!("No matching row in {} for {} = {}", self.table, pk, self.key);
        }

        match self.kind {
            WriteKind::Added => format!("Added to {} ({} = {})", self.table, pk, self.key),
            WriteKind::Updated => format!("Updated {} where {} = {}", self.table, pk, self.key),
            WriteKind::Deleted => format!("Deleted from {} where {} = {}", self.table, pk, self.key),
        }
    }
}

// ============================================================================
// OPERATIONS (autocommit, one statement each)
// ============================================================================

pub fn view(conn: &Connection, table: Table) -> Result<QueryResult> {
    run_query(conn, &table.schema().select_all_sql())
}

pub fn add(conn: &Connection, form: &Form) -> Result<WriteOutcome> {
    let params = form.to_params()?;
    let table = form.table();

    let rows_affected = conn.execute(&table.schema().insert_sql(), params_from_iter(params))?;
    let outcome = WriteOutcome {
        table,
        kind: WriteKind::Added,
        key: conn.last_insert_rowid(),
        rows_affected,
    };

    info!(table = %table, key = outcome.key, "row added");
    Ok(outcome)
}

pub fn update(conn: &Connection, key: i64, form: &Form) -> Result<WriteOutcome> {
    let mut params = form.to_params()?;
    params.push(Value::Integer(key));
    let table = form.table();

    let rows_affected = conn.execute(&table.schema().update_sql(), params_from_iter(params))?;
    let outcome = WriteOutcome {
        table,
        kind: WriteKind::Updated,
        key,
        rows_affected,
    };

    log_outcome(&outcome);
    Ok(outcome)
}

pub fn delete(conn: &Connection, table: Table, key: i64) -> Result<WriteOutcome> {
    let rows_affected = conn.execute(&table.schema().delete_sql(), [key])?;
    let outcome = WriteOutcome {
        table,
        kind: WriteKind::Deleted,
        key,
        rows_affected,
    };

    log_outcome(&outcome);
    Ok(outcome)
}

fn log_outcome(outcome: &WriteOutcome) {
    if outcome.is_no_match() {
        warn!(table = %outcome.table, key = outcome.key, kind = ?outcome.kind, "no matching row");
    } else {
        info!(table = %outcome.table, key = outcome.key, kind = ?outcome.kind, "row written");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::CellValue;
    use crate::db::{count_rows, setup_database};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn acme(city: &str) -> Form {
        Form::new(Table::Providers)
            .with("Name", "Acme")
            .unwrap()
            .with("Type", "Restaurant")
            .unwrap()
            .with("City", city)
            .unwrap()
            .with("Contact", "555-0100")
            .unwrap()
    }

    fn city_of(conn: &Connection, key: i64) -> String {
        conn.query_row(
            "SELECT City FROM Providers WHERE Provider_ID = ?1",
            [key],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_form_fields_follow_schema() {
        let form = Form::new(Table::FoodListings);
        let names: Vec<&str> = form.columns().iter().map(|c| c.name).collect();

        assert_eq!(form.len(), 8);
        assert_eq!(names[0], "Food_Name");
        assert!(!names.contains(&"Food_ID"));

        let mut form = Form::new(Table::Providers);
        assert!(matches!(
            form.set("Provider_ID", "7"),
            Err(FoodWasteError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_add_provider() {
        let conn = setup();

        let outcome = add(&conn, &acme("Austin")).unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.kind, WriteKind::Added);
        assert_eq!(count_rows(&conn, Table::Providers).unwrap(), 1);
        assert_eq!(city_of(&conn, outcome.key), "Austin");

        let rows = view(&conn, Table::Providers).unwrap();
        assert_eq!(rows.columns, vec!["Provider_ID", "Name", "Type", "City", "Contact"]);
        assert_eq!(rows.rows[0][1], CellValue::Text("Acme".to_string()));
    }

    #[test]
    fn test_add_does_not_normalize_city() {
        let conn = setup();

        let outcome = add(&conn, &acme("  austin ")).unwrap();
        assert_eq!(city_of(&conn, outcome.key), "  austin ");
    }

    #[test]
    fn test_delete_missing_row_is_not_an_error() {
        let conn = setup();
        add(&conn, &acme("Austin")).unwrap();

        let outcome = delete(&conn, Table::Providers, 42).unwrap();
        assert_eq!(outcome.rows_affected, 0);
        assert!(outcome.is_no_match());
        assert_eq!(outcome.message(), "No matching row in Providers for Provider_ID = 42");
        assert_eq!(count_rows(&conn, Table::Providers).unwrap(), 1);
    }

    #[test]
    fn test_update_and_delete_existing_row() {
        let conn = setup();
        let key = add(&conn, &acme("Austin")).unwrap().key;

        let changed = acme("Dallas").with("Contact", "").unwrap();
        let outcome = update(&conn, key, &changed).unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(city_of(&conn, key), "Dallas");

        let contact: Option<String> = conn
            .query_row(
                "SELECT Contact FROM Providers WHERE Provider_ID = ?1",
                [key],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(contact, None);

        assert!(update(&conn, key + 100, &changed).unwrap().is_no_match());

        let outcome = delete(&conn, Table::Providers, key).unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.message(), format!("Deleted from Providers where Provider_ID = {}", key));
        assert_eq!(count_rows(&conn, Table::Providers).unwrap(), 0);
    }

    #[test]
    fn test_validation_errors() {
        let conn = setup();

        let nameless = acme("Austin").with("Name", "   ").unwrap();
        assert!(matches!(
            add(&conn, &nameless),
            Err(FoodWasteError::InvalidField { ref field, .. }) if field == "Name"
        ));

        let provider = add(&conn, &acme("Austin")).unwrap().key;
        let food = Form::new(Table::FoodListings)
            .with("Food_Name", "Bread")
            .unwrap()
            .with("Quantity", "-3")
            .unwrap()
            .with("Provider_ID", provider.to_string())
            .unwrap();
        assert!(matches!(
            add(&conn, &food),
            Err(FoodWasteError::InvalidField { ref field, .. }) if field == "Quantity"
        ));

        let food = food
            .with("Quantity", "12")
            .unwrap()
            .with("Expiry_Date", "next tuesday")
            .unwrap();
        assert!(matches!(
            add(&conn, &food),
            Err(FoodWasteError::InvalidField { ref field, .. }) if field == "Expiry_Date"
        ));

        assert_eq!(count_rows(&conn, Table::FoodListings).unwrap(), 0);
    }

    #[test]
    fn test_add_food_listing_with_dates() {
        let conn = setup();
        let provider = add(&conn, &acme("Austin")).unwrap().key;

        let food = Form::new(Table::FoodListings)
            .with("Food_Name", "Bread")
            .unwrap()
            .with("Quantity", "12")
            .unwrap()
            .with("Expiry_Date", "03/17/2025")
            .unwrap()
            .with("Provider_ID", provider.to_string())
            .unwrap();
        let key = add(&conn, &food).unwrap().key;

        let expiry: String = conn
            .query_row(
                "SELECT Expiry_Date FROM Food_Listings WHERE Food_ID = ?1",
                [key],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(expiry, "2025-03-17");
    }

    #[test]
    fn test_foreign_key_violation_surfaces_as_database_error() {
        let conn = setup();

        let food = Form::new(Table::FoodListings)
            .with("Food_Name", "Bread")
            .unwrap()
            .with("Quantity", "12")
            .unwrap()
            .with("Provider_ID", "42")
            .unwrap();

        assert!(matches!(add(&conn, &food), Err(FoodWasteError::Database(_))));
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key(Table::Claims, " 42 ").unwrap(), 42);
        assert!(parse_key(Table::Claims, "").is_err());
        assert!(parse_key(Table::Claims, "0").is_err());
        assert!(parse_key(Table::Claims, "abc").is_err());
    }
}
