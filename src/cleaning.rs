// 🧹 Cleaning Stage - raw extracts → cleaned extracts + rejects + report
//
// Per table: drop exact duplicates, drop rows missing required columns,
// coerce integers, normalize geographic free text, parse dates.
// Then cross-check foreign keys against the cleaned parent sets.
//
// Field-level problems never abort the run; only I/O does.

use crate::config::{PathsConfig, RejectPolicy};
use crate::normalize::{coerce_integer, format_datetime_column, is_missing, parse_datetime, title_case};
use crate::schema::{ColumnKind, Table, TableSchema};
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use csv::StringRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const REPORT_FILE: &str = "cleaning_report.csv";
pub const REASON_COLUMN: &str = "Reason";

// ============================================================================
// CLEANED TABLE
// ============================================================================

/// What happened to the rows of one extract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub read: usize,
    /// More fields than headers
    pub malformed: usize,
    pub duplicates: usize,
    pub missing_required: usize,
    /// Required integer column that could not be coerced
    pub bad_identifier: usize,
    /// Optional values replaced by the null marker (bad date, bad quantity)
    pub nulled_values: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub table: Table,
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    pub stats: CleanStats,
}

impl CleanedTable {
    pub fn schema(&self) -> &'static TableSchema {
        self.table.schema()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Distinct integer values of a column
    pub fn ids(&self, column: &str) -> HashSet<i64> {
        let Some(idx) = self.column_index(column) else {
            return HashSet::new();
        };

        self.rows
            .iter()
            .filter_map(|row| row.get(idx).and_then(coerce_integer))
            .collect()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    fn remove_rows(&mut self, indices: &HashSet<usize>) {
        let mut idx = 0;
        self.rows.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
    }
}

// ============================================================================
// PER-TABLE CLEANING
// ============================================================================

pub fn clean_file(table: Table, path: &Path) -> Result<CleanedTable> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open raw extract {}", path.display()))?;
    clean_reader(table, file)
        .with_context(|| format!("Failed to clean {}", path.display()))
}

pub fn clean_reader<R: Read>(table: Table, reader: R) -> Result<CleanedTable> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: StringRecord = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let row: StringRecord = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        rows.push(row);
    }

    clean_table(table, headers, rows)
}

/// Clean already-read records. Output keeps the input column order.
pub fn clean_table(table: Table, headers: StringRecord, raw_rows: Vec<StringRecord>) -> Result<CleanedTable> {
    let schema = table.schema();

    for column in schema.columns {
        if !headers.iter().any(|h| h == column.name) {
            bail!("{} extract is missing column {}", schema.name, column.name);
        }
    }

    let width = headers.len();
    let index = |name: &str| headers.iter().position(|h| h == name);
    let mut stats = CleanStats {
        read: raw_rows.len(),
        ..CleanStats::default()
    };

    // Step 1: null markers, padding, exact-duplicate removal
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for raw in raw_rows {
        if raw.len() > width {
            stats.malformed += 1;
            continue;
        }

        let mut cells: Vec<String> = raw
            .iter()
            .map(|v| if is_missing(v) { String::new() } else { v.to_string() })
            .collect();
        cells.resize(width, String::new());

        if !seen.insert(cells.clone()) {
            stats.duplicates += 1;
            continue;
        }
        rows.push(cells);
    }

    // Step 2: required columns
    let required: Vec<usize> = schema
        .columns
        .iter()
        .filter(|c| c.required)
        .filter_map(|c| index(c.name))
        .collect();
    rows.retain(|cells| {
        let complete = required.iter().all(|&i| !cells[i].is_empty());
        if !complete {
            stats.missing_required += 1;
        }
        complete
    });

    // Step 3: integer coercion
    for column in schema.columns.iter().filter(|c| c.kind == ColumnKind::Integer) {
        let Some(i) = index(column.name) else { continue };
        let min = column.min.unwrap_or(i64::MIN);

        rows.retain_mut(|cells| {
            if cells[i].is_empty() {
                return true;
            }
            match coerce_integer(&cells[i]).filter(|v| *v >= min) {
                Some(v) => {
                    cells[i] = v.to_string();
                    true
                }
                None if column.required => {
                    stats.bad_identifier += 1;
                    false
                }
                None => {
                    stats.nulled_values += 1;
                    cells[i].clear();
                    true
                }
            }
        });
    }

    // Step 4: geographic free text
    for column in schema.columns.iter().filter(|c| c.normalize) {
        let Some(i) = index(column.name) else { continue };
        for cells in rows.iter_mut() {
            if !cells[i].is_empty() {
                cells[i] = title_case(&cells[i]);
            }
        }
    }

    // Step 5: dates, formatted per column
    for column in schema
        .columns
        .iter()
        .filter(|c| matches!(c.kind, ColumnKind::Date | ColumnKind::DateTime))
    {
        let Some(i) = index(column.name) else { continue };
        let parsed: Vec<Option<NaiveDateTime>> = rows
            .iter()
            .map(|cells| {
                if cells[i].is_empty() {
                    return None;
                }
                let value = parse_datetime(&cells[i]);
                if value.is_none() {
                    stats.nulled_values += 1;
                }
                value
            })
            .collect();

        for (cells, formatted) in rows.iter_mut().zip(format_datetime_column(&parsed)) {
            cells[i] = formatted;
        }
    }

    if stats.malformed + stats.bad_identifier + stats.nulled_values > 0 {
        warn!(
            table = schema.name,
            malformed = stats.malformed,
            bad_identifier = stats.bad_identifier,
            nulled_values = stats.nulled_values,
            "extract had unusable values"
        );
    }
    info!(
        table = schema.name,
        read = stats.read,
        kept = rows.len(),
        duplicates = stats.duplicates,
        missing_required = stats.missing_required,
        "table cleaned"
    );

    Ok(CleanedTable {
        table,
        headers,
        rows: rows.into_iter().map(StringRecord::from).collect(),
        stats,
    })
}

// ============================================================================
// CROSS-ENTITY VALIDATION
// ============================================================================

/// Rows whose foreign keys are absent from the parent id sets, with a reason each
pub fn find_invalid_references(
    child: &CleanedTable,
    parent_ids: &HashMap<Table, HashSet<i64>>,
) -> Vec<(usize, String)> {
    let empty = HashSet::new();
    let checks: Vec<(usize, &str, Table)> = child
        .schema()
        .foreign_keys()
        .filter_map(|c| Some((child.column_index(c.name)?, c.name, c.references?)))
        .collect();

    child
        .rows
        .iter()
        .enumerate()
        .filter_map(|(row_idx, row)| {
            let reasons: Vec<String> = checks
                .iter()
                .filter_map(|(col_idx, name, parent)| {
                    let ids = parent_ids.get(parent).unwrap_or(&empty);
                    let raw = row.get(*col_idx).unwrap_or("");
                    match coerce_integer(raw) {
                        Some(id) if ids.contains(&id) => None,
                        _ => Some(format!("{} {} not found in {}", name, raw, parent)),
                    }
                })
                .collect();

            if reasons.is_empty() {
                None
            } else {
                Some((row_idx, reasons.join("; ")))
            }
        })
        .collect()
}

fn write_invalid_rows(path: &Path, table: &CleanedTable, invalid: &[(usize, String)]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut headers = table.headers.clone();
    headers.push_field(REASON_COLUMN);
    wtr.write_record(&headers)?;

    for (idx, reason) in invalid {
        let mut record = table.rows[*idx].clone();
        record.push_field(reason);
        wtr.write_record(&record)?;
    }

    wtr.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ============================================================================
// REPORT + STAGE
// ============================================================================

/// One-row summary written to `cleaning_report.csv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    #[serde(rename = "Providers")]
    pub providers: usize,

    #[serde(rename = "Receivers")]
    pub receivers: usize,

    #[serde(rename = "Food Listings")]
    pub food_listings: usize,

    #[serde(rename = "Claims")]
    pub claims: usize,

    #[serde(rename = "Invalid Claims")]
    pub invalid_claims: usize,

    #[serde(rename = "Invalid Food")]
    pub invalid_food: usize,
}

impl CleaningReport {
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        wtr.serialize(self)?;
        wtr.flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CleaningRun {
    pub report: CleaningReport,
    pub stats: Vec<(Table, CleanStats)>,
    /// Reject artifacts written by this run
    pub reject_files: Vec<PathBuf>,
}

/// Clean all four extracts, cross-validate, write every artifact
pub fn run_cleaning(paths: &PathsConfig, policy: RejectPolicy) -> Result<CleaningRun> {
    for dir in [&paths.clean_dir, &paths.reject_dir, &paths.report_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let mut tables = Table::ALL
        .iter()
        .map(|table| clean_file(*table, &paths.raw_dir.join(table.schema().file_name)))
        .collect::<Result<Vec<_>>>()?;

    // Parents come first in Table::ALL, so exclusion cascades to dependents
    let mut parent_ids: HashMap<Table, HashSet<i64>> = HashMap::new();
    let mut invalid_counts: HashMap<Table, usize> = HashMap::new();
    let mut reject_files = Vec::new();

    for cleaned in tables.iter_mut() {
        if let Some(invalid_file) = cleaned.schema().invalid_file {
            let invalid = find_invalid_references(cleaned, &parent_ids);
            let path = paths.reject_dir.join(invalid_file);

            if invalid.is_empty() {
                if path.exists() {
                    fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove stale {}", path.display()))?;
                }
            } else {
                write_invalid_rows(&path, cleaned, &invalid)?;
                warn!(
                    table = cleaned.schema().name,
                    invalid = invalid.len(),
                    file = %path.display(),
                    "rows reference missing parents"
                );
                reject_files.push(path);

                if policy == RejectPolicy::ExcludeFromCleaned {
                    let indices: HashSet<usize> = invalid.iter().map(|(i, _)| *i).collect();
                    cleaned.remove_rows(&indices);
                    debug!(table = cleaned.schema().name, "invalid rows excluded from cleaned output");
                }
            }

            invalid_counts.insert(cleaned.table, invalid.len());
        }

        parent_ids.insert(cleaned.table, cleaned.ids(cleaned.schema().primary_key));
    }

    for cleaned in &tables {
        cleaned.write_csv(&paths.clean_dir.join(cleaned.schema().file_name))?;
    }

    let count = |table: Table| {
        tables
            .iter()
            .find(|t| t.table == table)
            .map(CleanedTable::len)
            .unwrap_or(0)
    };
    let report = CleaningReport {
        providers: count(Table::Providers),
        receivers: count(Table::Receivers),
        food_listings: count(Table::FoodListings),
        claims: count(Table::Claims),
        invalid_claims: invalid_counts.get(&Table::Claims).copied().unwrap_or(0),
        invalid_food: invalid_counts.get(&Table::FoodListings).copied().unwrap_or(0),
    };
    report.write_csv(&paths.report_dir.join(REPORT_FILE))?;

    info!(?report, "cleaning complete");

    Ok(CleaningRun {
        report,
        stats: tables.iter().map(|t| (t.table, t.stats.clone())).collect(),
        reject_files,
    })
}
