// Food Waste Management - Core Library
// Exposes all modules for use in the CLI, the terminal UI, and tests

pub mod error;
pub mod config;
pub mod logging;
pub mod normalize;
pub mod schema;         // Declarative table schemas
pub mod entities;       // Typed rows for the loader
pub mod db;
pub mod cleaning;       // Raw extracts → cleaned extracts + rejects
pub mod loader;         // Cleaned extracts → backend
pub mod dashboard;      // Query catalog + result sets
pub mod crud;
pub mod app;            // Terminal-independent UI state

// Re-export commonly used types
pub use error::{FoodWasteError, Result};
pub use config::{Config, PathsConfig, RejectPolicy};
pub use schema::{Column, ColumnKind, Table, TableSchema};
pub use entities::{Claim, Entity, FoodListing, Provider, Receiver};
pub use db::{count_rows, open_database, setup_database, table_counts};
pub use cleaning::{run_cleaning, CleaningReport, CleaningRun};
pub use loader::{run_load, LoadReport, TableLoadStats};
pub use dashboard::{run_query, CellValue, NamedQuery, QueryCatalog, QueryCategory, QueryResult};
pub use crud::{Form, WriteKind, WriteOutcome};
pub use app::{App, CrudAction, Input, Page};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
