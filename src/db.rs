use crate::schema::Table;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// Open the backend and turn on foreign-key enforcement for this connection
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
        }
    }

    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    debug!(path = %path.display(), "database opened");
    Ok(conn)
}

/// Bootstrap the four tables. Safe to run repeatedly.
pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases report "memory" and that's fine
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Parent tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Providers (
            Provider_ID INTEGER PRIMARY KEY,
            Name TEXT NOT NULL,
            Type TEXT,
            City TEXT,
            Contact TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS Receivers (
            Receiver_ID INTEGER PRIMARY KEY,
            Name TEXT NOT NULL,
            Type TEXT,
            City TEXT,
            Contact TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Dependent tables
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS Food_Listings (
            Food_ID INTEGER PRIMARY KEY,
            Food_Name TEXT NOT NULL,
            Quantity INTEGER NOT NULL CHECK (Quantity >= 0),
            Expiry_Date DATE,
            Provider_ID INTEGER NOT NULL REFERENCES Providers(Provider_ID),
            Provider_Type TEXT,
            Location TEXT,
            Food_Type TEXT,
            Meal_Type TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS Claims (
            Claim_ID INTEGER PRIMARY KEY,
            Food_ID INTEGER NOT NULL REFERENCES Food_Listings(Food_ID),
            Receiver_ID INTEGER NOT NULL REFERENCES Receivers(Receiver_ID),
            Status TEXT,
            Timestamp DATETIME
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_food_provider ON Food_Listings(Provider_ID)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_claims_food ON Claims(Food_ID)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_claims_receiver ON Claims(Receiver_ID)",
        [],
    )?;

    info!("database schema ready");
    Ok(())
}

pub fn count_rows(conn: &Connection, table: Table) -> Result<i64> {
    let count: i64 = conn
        .query_row(&table.schema().count_sql(), [], |row| row.get(0))
        .with_context(|| format!("Failed to count rows in {}", table))?;

    Ok(count)
}

/// Row count of every table, in load order
pub fn table_counts(conn: &Connection) -> Result<Vec<(Table, i64)>> {
    Table::ALL
        .iter()
        .map(|table| Ok((*table, count_rows(conn, *table)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    #[test]
    fn test_setup_database_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let counts = table_counts(&conn).unwrap();
        assert_eq!(counts.len(), 4);
        assert!(counts.iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO Food_Listings (Food_ID, Food_Name, Quantity, Provider_ID) VALUES (?1, ?2, ?3, ?4)",
            params![1, "Bread", 10, 999],
        );
        assert!(result.is_err(), "listing with unknown provider must fail");

        conn.execute(
            "INSERT INTO Providers (Provider_ID, Name) VALUES (?1, ?2)",
            params![999, "Acme"],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO Food_Listings (Food_ID, Food_Name, Quantity, Provider_ID) VALUES (?1, ?2, ?3, ?4)",
            params![1, "Bread", 10, 999],
        )
        .unwrap();

        assert_eq!(count_rows(&conn, Table::FoodListings).unwrap(), 1);
    }

    #[test]
    fn test_open_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("food.db");

        let conn = open_database(&path).unwrap();
        setup_database(&conn).unwrap();

        assert!(path.exists());
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
