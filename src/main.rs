// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use food_waste::logging::{init_logging, LogTarget};
use food_waste::{
    open_database, run_cleaning, run_load, run_query, setup_database, Config, QueryCatalog,
};

#[derive(Parser)]
#[command(name = "food-waste")]
#[command(about = "Food waste management: clean extracts, load them, query and edit the database")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to food_waste.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the four tables if they don't exist
    InitDb,
    /// Clean the raw extracts into cleaned, reject and report files
    Clean,
    /// Load the cleaned extracts into the database
    Load,
    /// List the query catalog
    Queries,
    /// Run one catalog query
    Query {
        category: String,
        name: String,
        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Interactive dashboard and CRUD forms (default)
    Ui,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Commands::Ui);

    let target = match command {
        Commands::Ui => LogTarget::File,
        _ => LogTarget::Console,
    };
    let _guard = init_logging(target, &config.paths.log_dir);

    match command {
        Commands::InitDb => run_init_db(&config),
        Commands::Clean => run_clean(&config),
        Commands::Load => run_load_mode(&config),
        Commands::Queries => run_list_queries(&config),
        Commands::Query { category, name, json } => run_single_query(&config, &category, &name, json),
        Commands::Ui => run_ui_mode(&config),
    }
}

fn run_init_db(config: &Config) -> Result<()> {
    println!("🔧 Setting up database...");
    let conn = open_database(&config.database.path)?;
    setup_database(&conn)?;
    println!("✓ Database ready at {}", config.database.path.display());
    Ok(())
}

fn run_clean(config: &Config) -> Result<()> {
    println!("🧹 Cleaning raw extracts");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Reading from {}", config.paths.raw_dir.display());

    let run = run_cleaning(&config.paths, config.cleaning.reject_policy)?;

    println!();
    for (table, stats) in &run.stats {
        println!(
            "  {:<15} read {:>5} | duplicates {:>4} | missing required {:>4} | bad id {:>4} | malformed {:>4} | nulled {:>4}",
            table.schema().label,
            stats.read,
            stats.duplicates,
            stats.missing_required,
            stats.bad_identifier,
            stats.malformed,
            stats.nulled_values
        );
    }

    let report = &run.report;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Providers:      {}", report.providers);
    println!("✓ Receivers:      {}", report.receivers);
    println!("✓ Food Listings:  {}", report.food_listings);
    println!("✓ Claims:         {}", report.claims);
    if report.invalid_food > 0 || report.invalid_claims > 0 {
        println!("⚠️  Invalid Food:   {}", report.invalid_food);
        println!("⚠️  Invalid Claims: {}", report.invalid_claims);
        for path in &run.reject_files {
            println!("   → {}", path.display());
        }
    }
    println!("\n✅ Cleaned files written to {}", config.paths.clean_dir.display());

    Ok(())
}

fn run_load_mode(config: &Config) -> Result<()> {
    println!("💾 Loading cleaned extracts");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut conn = open_database(&config.database.path)?;
    let report = run_load(&mut conn, &config.paths, config.loader.progress)?;

    println!();
    for stats in &report.tables {
        println!(
            "  {:<15} inserted {:>5} | rejected {:>5} (duplicates {}, errors {})",
            stats.table.schema().label,
            stats.inserted,
            stats.rejected(),
            stats.skipped,
            stats.errors
        );
        if let Some(path) = &stats.reject_file {
            println!("   ⚠️  Rejects: {}", path.display());
        }
    }

    println!("\n🔍 Verifying database...");
    for (table, count) in &report.final_counts {
        println!("✓ {} contains {} rows", table, count);
    }

    println!("\n✅ Load complete");
    Ok(())
}

fn load_catalog(config: &Config) -> Result<QueryCatalog> {
    let catalog = QueryCatalog::load(config.dashboard.catalog.as_deref())?;
    Ok(catalog)
}

fn run_list_queries(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;

    for category in &catalog.categories {
        println!("📊 {}", category.name);
        for query in &category.queries {
            println!("   • {}", query.name);
        }
    }

    Ok(())
}

fn run_single_query(config: &Config, category: &str, name: &str, json: bool) -> Result<()> {
    let catalog = load_catalog(config)?;
    let query = catalog.find(category, name)?;

    let conn = open_database(&config.database.path)?;
    let result = run_query(&conn, &query.sql)
        .with_context(|| format!("Query '{}' failed", query.name))?;
    info!(query = %query.name, rows = result.len(), "query complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else {
        println!("📊 {} / {}\n", category, query.name);
        print!("{}", result.to_text_table());
        println!("\n{} rows", result.len());
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Food Waste Management UI...\n");

    let db_path = &config.database.path;
    if !db_path.exists() {
        bail!(
            "Database not found at {}. Run `food-waste init-db`, `food-waste clean` and `food-waste load` first",
            db_path.display()
        );
    }

    let conn = open_database(db_path)?;
    let catalog = load_catalog(config)?;
    catalog.validate(&conn).context("Query catalog rejected")?;

    for (table, count) in food_waste::table_counts(&conn)? {
        println!("✓ {}: {} rows", table, count);
    }
    println!("\nStarting UI... (Press 'q' to quit)\n");

    let mut app = food_waste::App::new(&conn, catalog);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    bail!("TUI mode not available. Rebuild with `cargo build --features tui`, or use `food-waste query <category> <name>`")
}

#[cfg(all(test, feature = "tui"))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ui_without_database_returns_an_error() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("missing.db");

        let err = run_ui_mode(&config).unwrap_err();

        assert!(err.to_string().contains("Database not found"));
        assert!(!config.database.path.exists());
    }

    #[test]
    fn test_ui_refuses_a_catalog_that_writes() {
        let dir = tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.toml");
        fs::write(
            &catalog_path,
            "[[category]]\nname = \"Maintenance\"\n\n[[category.query]]\nname = \"Purge\"\nsql = \"DELETE FROM Providers\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.database.path = dir.path().join("food_waste.db");
        config.dashboard.catalog = Some(catalog_path);
        let conn = open_database(&config.database.path).unwrap();
        setup_database(&conn).unwrap();
        conn.execute("INSERT INTO Providers (Provider_ID, Name) VALUES (1, 'Acme')", [])
            .unwrap();

        let err = run_ui_mode(&config).unwrap_err();

        assert!(format!("{:#}", err).contains("Query writes to the database"));
        assert_eq!(food_waste::count_rows(&conn, food_waste::Table::Providers).unwrap(), 1);
    }
}
