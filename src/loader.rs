// 🚚 Bulk Loader - cleaned extracts → backend
//
// Providers → Receivers → Food_Listings → Claims, one transaction per table.
// Every row is tried on its own; a failing row is recorded and the set goes on.
// Duplicate primary keys are skipped silently, so reruns are idempotent.

use crate::config::PathsConfig;
use crate::db::table_counts;
use crate::entities::{Claim, Entity, FoodListing, Provider, Receiver};
use crate::schema::Table;
use anyhow::{Context, Result};
use csv::{ByteRecord, StringRecord};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::{params_from_iter, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ERROR_COLUMN: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoadStats {
    pub table: Table,
    pub rows: usize,
    pub inserted: usize,
    /// Primary key already present
    pub skipped: usize,
    /// Deserialization or backend failure, written to the reject artifact
    pub errors: usize,
    pub reject_file: Option<PathBuf>,
}

impl TableLoadStats {
    fn new(table: Table, rows: usize) -> Self {
        TableLoadStats {
            table,
            rows,
            inserted: 0,
            skipped: 0,
            errors: 0,
            reject_file: None,
        }
    }

    /// Every row that did not end up inserted
    pub fn rejected(&self) -> usize {
        self.skipped + self.errors
    }
}

#[derive(Debug, Clone)]
pub struct RejectedRow {
    pub record: StringRecord,
    /// Primary key, when the row got as far as deserializing
    pub key: Option<i64>,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub tables: Vec<TableLoadStats>,
    /// Queried from the backend after the last commit
    pub final_counts: Vec<(Table, i64)>,
}

impl LoadReport {
    pub fn stats(&self, table: Table) -> Option<&TableLoadStats> {
        self.tables.iter().find(|s| s.table == table)
    }

    pub fn final_count(&self, table: Table) -> Option<i64> {
        self.final_counts
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, n)| *n)
    }
}

/// Load all four cleaned extracts in dependency order
pub fn run_load(conn: &mut Connection, paths: &PathsConfig, progress: bool) -> Result<LoadReport> {
    fs::create_dir_all(&paths.reject_dir).with_context(|| {
        format!("Failed to create reject directory {}", paths.reject_dir.display())
    })?;

    let clean = &paths.clean_dir;
    let rejects = &paths.reject_dir;
    let tables = vec![
        load_table::<Provider>(conn, clean, rejects, progress)?,
        load_table::<Receiver>(conn, clean, rejects, progress)?,
        load_table::<FoodListing>(conn, clean, rejects, progress)?,
        load_table::<Claim>(conn, clean, rejects, progress)?,
    ];

    let final_counts = table_counts(conn)?;
    info!(?final_counts, "load complete");

    Ok(LoadReport {
        tables,
        final_counts,
    })
}

/// Load one cleaned extract and write its reject artifact when needed
pub fn load_table<E: Entity>(
    conn: &mut Connection,
    clean_dir: &Path,
    reject_dir: &Path,
    progress: bool,
) -> Result<TableLoadStats> {
    let schema = E::TABLE.schema();
    let path = clean_dir.join(schema.file_name);

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open cleaned extract {}", path.display()))?;
    let headers = decode_lossy(rdr.byte_headers()?);
    // Undecodable text is a row-level reject, so read bytes and decode per row
    let records = rdr
        .byte_records()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let bar = progress_bar(progress, records.len(), schema.name);
    let (mut stats, rejects) = insert_records::<E>(conn, &headers, &records, &bar)?;
    bar.finish_and_clear();

    let reject_path = reject_dir.join(schema.reject_file);
    if rejects.is_empty() {
        if reject_path.exists() {
            fs::remove_file(&reject_path)
                .with_context(|| format!("Failed to remove stale {}", reject_path.display()))?;
        }
    } else {
        write_rejects(&reject_path, &headers, &rejects)?;
        warn!(
            table = schema.name,
            errors = rejects.len(),
            file = %reject_path.display(),
            "rows rejected"
        );
        stats.reject_file = Some(reject_path);
    }

    info!(
        table = schema.name,
        inserted = stats.inserted,
        skipped = stats.skipped,
        errors = stats.errors,
        "table loaded"
    );
    Ok(stats)
}

/// Insert-or-skip every record inside one transaction, committed at the end
pub fn insert_records<E: Entity>(
    conn: &mut Connection,
    headers: &StringRecord,
    records: &[ByteRecord],
    bar: &ProgressBar,
) -> Result<(TableLoadStats, Vec<RejectedRow>)> {
    let schema = E::TABLE.schema();
    let mut stats = TableLoadStats::new(E::TABLE, records.len());
    let mut rejects = Vec::new();

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&schema.insert_or_skip_sql())?;

        for raw in records {
            bar.inc(1);

            let record = match StringRecord::from_byte_record(raw.clone()) {
                Ok(record) => record,
                Err(e) => {
                    stats.errors += 1;
                    rejects.push(RejectedRow {
                        record: decode_lossy(raw),
                        key: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let entity = match record.deserialize::<E>(Some(headers)) {
                Ok(entity) => entity,
                Err(e) => {
                    stats.errors += 1;
                    rejects.push(RejectedRow {
                        record,
                        key: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match stmt.execute(params_from_iter(entity.values())) {
                Ok(0) => stats.skipped += 1,
                Ok(_) => stats.inserted += 1,
                Err(e) => {
                    debug!(table = schema.name, key = entity.id(), error = %e, "row rejected by backend");
                    stats.errors += 1;
                    rejects.push(RejectedRow {
                        record,
                        key: Some(entity.id()),
                        error: e.to_string(),
                    });
                }
            }
        }
    }
    tx.commit()
        .with_context(|| format!("Failed to commit {}", schema.name))?;

    Ok((stats, rejects))
}

fn decode_lossy(record: &ByteRecord) -> StringRecord {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

fn write_rejects(path: &Path, headers: &StringRecord, rejects: &[RejectedRow]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = headers.clone();
    header.push_field(ERROR_COLUMN);
    wtr.write_record(&header)?;

    for reject in rejects {
        let mut record = reject.record.clone();
        // Pad short rows so the error lands in its column
        while record.len() < headers.len() {
            record.push_field("");
        }
        record.truncate(headers.len());
        record.push_field(&reject.error);
        wtr.write_record(&record)?;
    }

    wtr.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn progress_bar(enabled: bool, len: usize, table: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template("{msg:<14} [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let bar = ProgressBar::new(len as u64).with_style(style);
    bar.set_message(table);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::run_cleaning;
    use crate::config::RejectPolicy;
    use crate::db::{count_rows, setup_database};

    const PROVIDERS: &str = "\
Provider_ID,Name,Type,City,Contact
1,Gonzales Ltd,Restaurant,New Jessica,555-0101
2,Nielsen Group,Grocery Store,East Sheila,555-0102
3,Chavez Inc,Catering Service,Lake Jesusview,
";

    const RECEIVERS: &str = "\
Receiver_ID,Name,Type,City,Contact
1,Hope Shelter,Shelter,Austin,555-0201
2,Food For All,NGO,Dallas,555-0202
";

    const FOOD: &str = "\
Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type
10,Bread,40,2025-03-17,1,Restaurant,Austin,Vegetarian,Breakfast
11,Soup,25,2025-03-18,2,Grocery Store,Dallas,Vegan,Lunch
12,Rice,20,2025-03-20,42,Restaurant,Austin,Vegetarian,Dinner
";

    const CLAIMS: &str = "\
Claim_ID,Food_ID,Receiver_ID,Status,Timestamp
100,10,1,Pending,2025-03-05 05:26:00
101,11,2,Completed,2025-03-06 10:00:00
102,999,1,Completed,2025-03-06 11:00:00
";

    fn setup() -> (tempfile::TempDir, PathsConfig, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            raw_dir: dir.path().join("raw"),
            clean_dir: dir.path().join("clean"),
            reject_dir: dir.path().join("rejects"),
            report_dir: dir.path().join("reports"),
            log_dir: dir.path().join("logs"),
        };
        fs::create_dir_all(&paths.clean_dir).unwrap();
        fs::write(paths.clean_dir.join("providers_data.csv"), PROVIDERS).unwrap();
        fs::write(paths.clean_dir.join("receivers_data.csv"), RECEIVERS).unwrap();
        fs::write(paths.clean_dir.join("food_listings_data.csv"), FOOD).unwrap();
        fs::write(paths.clean_dir.join("claims_data.csv"), CLAIMS).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        (dir, paths, conn)
    }

    #[test]
    fn test_load_counts_and_rejects() {
        let (_dir, paths, mut conn) = setup();
        let report = run_load(&mut conn, &paths, false).unwrap();

        let providers = report.stats(Table::Providers).unwrap();
        assert_eq!((providers.inserted, providers.errors), (3, 0));

        // Food 12 points at provider 42
        let food = report.stats(Table::FoodListings).unwrap();
        assert_eq!((food.inserted, food.skipped, food.errors), (2, 0, 1));

        // Claim 102 points at food 999
        let claims = report.stats(Table::Claims).unwrap();
        assert_eq!((claims.inserted, claims.errors), (2, 1));

        assert_eq!(report.final_count(Table::Providers), Some(3));
        assert_eq!(report.final_count(Table::Receivers), Some(2));
        assert_eq!(report.final_count(Table::FoodListings), Some(2));
        assert_eq!(report.final_count(Table::Claims), Some(2));
    }

    #[test]
    fn test_reject_artifact_has_row_and_error() {
        let (_dir, paths, mut conn) = setup();
        run_load(&mut conn, &paths, false).unwrap();

        let path = paths.reject_dir.join("food_listings_rejects.csv");
        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.get(headers.len() - 1), Some(ERROR_COLUMN));

        let rows: Vec<StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some("12"));
        assert!(rows[0].get(9).unwrap().contains("FOREIGN KEY"));

        // No rejects, no artifact
        assert!(!paths.reject_dir.join("providers_rejects.csv").exists());
    }

    #[test]
    fn test_second_load_inserts_nothing() {
        let (_dir, paths, mut conn) = setup();

        let first = run_load(&mut conn, &paths, false).unwrap();
        let second = run_load(&mut conn, &paths, false).unwrap();

        assert_eq!(first.final_counts, second.final_counts);

        let providers = second.stats(Table::Providers).unwrap();
        assert_eq!(providers.inserted, 0);
        assert_eq!(providers.skipped, 3);
        assert_eq!(providers.rejected(), providers.rows);
        assert_eq!(providers.errors, 0);

        for stats in &second.tables {
            assert_eq!(stats.inserted, 0, "{} inserted on rerun", stats.table);
            assert_eq!(stats.rejected(), stats.rows);
        }
    }

    #[test]
    fn test_bad_row_does_not_abort_the_set() {
        let (_dir, paths, mut conn) = setup();
        fs::write(
            paths.clean_dir.join("receivers_data.csv"),
            "Receiver_ID,Name,Type,City,Contact\n1,Hope,Shelter,Austin,1\nabc,Broken,NGO,Austin,2\n2,Pantry,NGO,Dallas,3\n",
        )
        .unwrap();

        let report = run_load(&mut conn, &paths, false).unwrap();
        let receivers = report.stats(Table::Receivers).unwrap();

        assert_eq!(receivers.inserted, 2);
        assert_eq!(receivers.errors, 1);
        assert_eq!(count_rows(&conn, Table::Receivers).unwrap(), 2);

        let rejects = fs::read_to_string(paths.reject_dir.join("receivers_rejects.csv")).unwrap();
        assert!(rejects.contains("abc,Broken,NGO,Austin,2,"));
    }

    #[test]
    fn test_undecodable_row_is_rejected_and_the_set_goes_on() {
        let (_dir, paths, mut conn) = setup();
        let mut data = b"Provider_ID,Name,Type,City,Contact\n1,Gonzales Ltd,Restaurant,Austin,1\n2,".to_vec();
        data.extend_from_slice(&[0xFF, 0xFE]);
        data.extend_from_slice(b",Grocery Store,Dallas,2\n3,Chavez Inc,Restaurant,Austin,3\n");
        fs::write(paths.clean_dir.join("providers_data.csv"), data).unwrap();
        // Keep dependents out of the way of the missing provider
        fs::write(
            paths.clean_dir.join("food_listings_data.csv"),
            "Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type\n",
        )
        .unwrap();

        let report = run_load(&mut conn, &paths, false).unwrap();
        let providers = report.stats(Table::Providers).unwrap();

        assert_eq!(providers.inserted, 2);
        assert_eq!(providers.errors, 1);
        assert_eq!(count_rows(&conn, Table::Providers).unwrap(), 2);

        let rejects = fs::read_to_string(paths.reject_dir.join("providers_rejects.csv")).unwrap();
        assert!(rejects.lines().nth(1).unwrap().starts_with("2,"));
    }

    #[test]
    fn test_backend_rejects_carry_the_key() {
        let (_dir, _paths, mut conn) = setup();
        let headers = StringRecord::from(vec![
            "Food_ID", "Food_Name", "Quantity", "Expiry_Date", "Provider_ID",
            "Provider_Type", "Location", "Food_Type", "Meal_Type",
        ]);
        let records = vec![
            ByteRecord::from(vec!["12", "Rice", "20", "", "42", "", "", "", ""]),
            ByteRecord::from(vec!["x", "Rice", "20", "", "42", "", "", "", ""]),
        ];

        let (stats, rejects) =
            insert_records::<FoodListing>(&mut conn, &headers, &records, &ProgressBar::hidden()).unwrap();

        assert_eq!(stats.errors, 2);
        assert_eq!(rejects[0].key, Some(12));
        assert!(rejects[0].error.contains("FOREIGN KEY"));
        assert_eq!(rejects[1].key, None);
    }

    #[test]
    fn test_null_quantity_is_an_error_not_a_skip() {
        let (_dir, paths, mut conn) = setup();
        fs::write(
            paths.clean_dir.join("food_listings_data.csv"),
            "Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type\n10,Bread,,,1,Restaurant,Austin,Vegetarian,Breakfast\n",
        )
        .unwrap();

        let report = run_load(&mut conn, &paths, false).unwrap();
        let food = report.stats(Table::FoodListings).unwrap();

        assert_eq!(food.skipped, 0);
        assert_eq!(food.errors, 1);
    }

    #[test]
    fn test_parents_committed_before_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let (_data, paths, _) = setup();
        let db_path = dir.path().join("food.db");

        let mut conn = crate::db::open_database(&db_path).unwrap();
        setup_database(&conn).unwrap();
        run_load(&mut conn, &paths, false).unwrap();

        // A second handle sees committed listings only for providers that exist
        let other = Connection::open(&db_path).unwrap();
        let orphans: i64 = other
            .query_row(
                "SELECT COUNT(*) FROM Food_Listings f LEFT JOIN Providers p ON f.Provider_ID = p.Provider_ID WHERE p.Provider_ID IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(orphans, 0);
        assert_eq!(count_rows(&other, Table::Claims).unwrap(), 2);
    }

    #[test]
    fn test_missing_cleaned_file_is_fatal() {
        let (_dir, paths, mut conn) = setup();
        fs::remove_file(paths.clean_dir.join("claims_data.csv")).unwrap();

        assert!(run_load(&mut conn, &paths, false).is_err());
        // Earlier sets were already committed
        assert_eq!(count_rows(&conn, Table::Providers).unwrap(), 3);
    }

    #[test]
    fn test_clean_then_load() {
        let (_dir, paths, mut conn) = setup();
        fs::create_dir_all(&paths.raw_dir).unwrap();
        for table in Table::ALL {
            let file = table.schema().file_name;
            fs::copy(paths.clean_dir.join(file), paths.raw_dir.join(file)).unwrap();
        }

        let cleaning = run_cleaning(&paths, RejectPolicy::KeepInCleaned).unwrap();
        assert_eq!(cleaning.report.invalid_food, 1);
        assert_eq!(cleaning.report.invalid_claims, 1);

        // Rows kept in the cleaned files still fail at the backend
        let report = run_load(&mut conn, &paths, false).unwrap();
        assert_eq!(report.stats(Table::FoodListings).unwrap().errors, 1);
        assert_eq!(report.stats(Table::Claims).unwrap().errors, 1);
    }
}
