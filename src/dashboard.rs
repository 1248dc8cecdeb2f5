// 📊 Query Dashboard - fixed catalog of read-only analytic queries
//
// Two levels: category → named query. Queries take no parameters and
// return the full result set.

use crate::error::{FoodWasteError, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQuery {
    pub name: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCategory {
    pub name: String,
    #[serde(rename = "query")]
    pub queries: Vec<NamedQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCatalog {
    #[serde(rename = "category")]
    pub categories: Vec<QueryCategory>,
}

impl QueryCatalog {
    pub fn builtin() -> Self {
        QueryCatalog {
            categories: BUILTIN_CATALOG
                .iter()
                .map(|(name, queries)| QueryCategory {
                    name: name.to_string(),
                    queries: queries
                        .iter()
                        .map(|(name, sql)| NamedQuery {
                            name: name.to_string(),
                            sql: sql.to_string(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Catalog file in TOML:
    ///
    /// ```toml
    /// [[category]]
    /// name = "Provider Analysis"
    ///
    /// [[category.query]]
    /// name = "Cities with Most Active Providers"
    /// sql = "SELECT City, COUNT(*) FROM Providers GROUP BY City"
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        let catalog: QueryCatalog = toml::from_str(content)?;
        if catalog.categories.is_empty() {
            return Err(FoodWasteError::Config("query catalog has no categories".to_string()));
        }
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FoodWasteError::Config(format!(
                "Failed to read query catalog '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// The configured catalog file, or the built-in one
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::builtin()),
        }
    }

    /// Prepare every entry against `conn`; fails on the first one that doesn't
    /// compile or isn't read-only
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for category in &self.categories {
            for query in &category.queries {
                let stmt = conn.prepare(&query.sql)?;
                if !stmt.readonly() {
                    return Err(FoodWasteError::NotReadOnly(format!(
                        "{} / {}",
                        category.name, query.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn find(&self, category: &str, name: &str) -> Result<&NamedQuery> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(category))
            .and_then(|c| c.queries.iter().find(|q| q.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| FoodWasteError::UnknownQuery {
                category: category.to_string(),
                name: name.to_string(),
            })
    }
}

// ============================================================================
// RESULTS
// ============================================================================

/// One displayed cell. Fixed-point columns arrive here as Float.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    /// Length only
    Blob(usize),
}

impl CellValue {
    /// `decl_type` is the declared column type, when the column comes straight from a table
    pub fn from_sql(value: ValueRef<'_>, decl_type: Option<&str>) -> Self {
        let fixed_point = decl_type.map(is_fixed_point).unwrap_or(false);

        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) if fixed_point => CellValue::Float(i as f64),
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Float(f),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                if fixed_point {
                    if let Ok(f) = text.trim().parse::<f64>() {
                        return CellValue::Float(f);
                    }
                }
                CellValue::Text(text)
            }
            ValueRef::Blob(bytes) => CellValue::Blob(bytes.len()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blob(len) => write!(f, "<{} bytes>", len),
        }
    }
}

fn is_fixed_point(decl_type: &str) -> bool {
    let upper = decl_type.trim().to_ascii_uppercase();
    upper.starts_with("DECIMAL") || upper.starts_with("NUMERIC")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Rows as JSON objects keyed by column name
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|cell| serde_json::to_value(cell).unwrap_or_default()))
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    /// Plain-text table for terminals and logs
    pub fn to_text_table(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|s| s.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |values: &[String]| -> String {
            values
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&self.columns));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        out.push('\n');
        for row in &cells {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

/// Execute a read-only statement and collect every row. Anything that would
/// write is refused before it runs.
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(FoodWasteError::NotReadOnly(sql.trim().to_string()));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let decl_types: Vec<Option<String>> = stmt
        .columns()
        .iter()
        .map(|c| c.decl_type().map(str::to_string))
        .collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for (i, decl) in decl_types.iter().enumerate() {
            cells.push(CellValue::from_sql(row.get_ref(i)?, decl.as_deref()));
        }
        rows.push(cells);
    }

    debug!(rows = rows.len(), "query executed");
    Ok(QueryResult { columns, rows })
}

// ============================================================================
// BUILT-IN CATALOG
// ============================================================================

type CatalogEntry = (&'static str, &'static [(&'static str, &'static str)]);

const BUILTIN_CATALOG: &[CatalogEntry] = &[
    (
        "Provider Analysis",
        &[
            (
                "Top 5 Providers by Total Quantity",
                "SELECT p.Provider_ID, p.Name, SUM(f.Quantity) AS Total_Quantity FROM Providers p JOIN Food_Listings f ON p.Provider_ID = f.Provider_ID GROUP BY p.Provider_ID, p.Name ORDER BY Total_Quantity DESC LIMIT 5",
            ),
            (
                "Average Quantity by Provider Type",
                "SELECT p.Type AS Provider_Type, AVG(f.Quantity) AS Avg_Quantity FROM Providers p JOIN Food_Listings f ON p.Provider_ID = f.Provider_ID GROUP BY p.Type",
            ),
            (
                "Cities with Most Active Providers",
                "SELECT City, COUNT(DISTINCT Provider_ID) AS Num_Providers FROM Providers GROUP BY City ORDER BY Num_Providers DESC",
            ),
            (
                "Provider with Maximum Claims",
                "SELECT p.Provider_ID, p.Name, COUNT(c.Claim_ID) AS Total_Claims FROM Providers p JOIN Food_Listings f ON p.Provider_ID = f.Provider_ID JOIN Claims c ON f.Food_ID = c.Food_ID GROUP BY p.Provider_ID, p.Name ORDER BY Total_Claims DESC LIMIT 5",
            ),
            (
                "Providers Offering Most Vegetarian Food",
                "SELECT p.Provider_ID, p.Name, COUNT(*) AS Veg_Food_Count FROM Providers p JOIN Food_Listings f ON p.Provider_ID = f.Provider_ID WHERE f.Food_Type = 'Vegetarian' GROUP BY p.Provider_ID, p.Name ORDER BY Veg_Food_Count DESC",
            ),
        ],
    ),
    (
        "Receiver Analysis",
        &[
            (
                "Top 5 Receivers by Total Quantity Claimed",
                "SELECT r.Receiver_ID, r.Name AS Receiver_Name, SUM(f.Quantity) AS Total_Claimed_Quantity FROM Claims c JOIN Receivers r ON c.Receiver_ID = r.Receiver_ID JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY r.Receiver_ID, r.Name ORDER BY Total_Claimed_Quantity DESC LIMIT 5",
            ),
            (
                "Average Quantity Claimed by Receiver Type",
                "SELECT r.Type AS Receiver_Type, AVG(f.Quantity) AS Avg_Quantity_Claimed FROM Receivers r JOIN Claims c ON r.Receiver_ID = c.Receiver_ID JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY r.Type",
            ),
            (
                "Receivers Claiming from Most Providers",
                "SELECT r.Receiver_ID, r.Name, COUNT(DISTINCT f.Provider_ID) AS Providers_Claimed_From FROM Receivers r JOIN Claims c ON r.Receiver_ID = c.Receiver_ID JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY r.Receiver_ID, r.Name ORDER BY Providers_Claimed_From DESC LIMIT 5",
            ),
            (
                "Receivers Claiming More Than 5 Different Food Items",
                "SELECT r.Receiver_ID, r.Name, COUNT(DISTINCT f.Food_ID) AS Food_Items_Claimed FROM Receivers r JOIN Claims c ON r.Receiver_ID = c.Receiver_ID JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY r.Receiver_ID, r.Name HAVING COUNT(DISTINCT f.Food_ID) > 5 ORDER BY Food_Items_Claimed DESC",
            ),
            (
                "Average Quantity of Food Claimed per Receiver",
                "SELECT r.Receiver_ID, r.Name, AVG(f.Quantity) AS Avg_Claimed FROM Claims c JOIN Receivers r ON c.Receiver_ID = r.Receiver_ID JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY r.Receiver_ID, r.Name ORDER BY Avg_Claimed DESC LIMIT 5",
            ),
        ],
    ),
    (
        "Food Listings & Availability",
        &[
            (
                "Total Quantity of Food Available",
                "SELECT SUM(Quantity) AS Total_Food_Available FROM Food_Listings",
            ),
            (
                "Top 5 Cities by Food Listings",
                "SELECT Location AS City, COUNT(*) AS Num_Listings FROM Food_Listings GROUP BY Location ORDER BY Num_Listings DESC LIMIT 5",
            ),
            (
                "Most Commonly Available Food Types",
                "SELECT Food_Type, COUNT(*) AS Count_Food_Type FROM Food_Listings GROUP BY Food_Type ORDER BY Count_Food_Type DESC",
            ),
            (
                "Top 5 Providers Donating Food About to Expire",
                "SELECT p.Provider_ID, p.Name AS Provider_Name, SUM(f.Quantity) AS Expiring_Quantity FROM Food_Listings f JOIN Providers p ON f.Provider_ID = p.Provider_ID WHERE f.Expiry_Date IS NOT NULL AND f.Expiry_Date <= date('now', '+7 days') GROUP BY p.Provider_ID, p.Name ORDER BY Expiring_Quantity DESC LIMIT 5",
            ),
            (
                "Average Quantity per Meal Type",
                "SELECT Meal_Type, AVG(Quantity) AS Avg_Quantity FROM Food_Listings GROUP BY Meal_Type",
            ),
        ],
    ),
    (
        "Claims & Distribution",
        &[
            (
                "Number of Claims per Food Item",
                "SELECT f.Food_ID, f.Food_Name, COUNT(*) AS Num_Claims FROM Claims c JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY f.Food_ID, f.Food_Name ORDER BY Num_Claims DESC",
            ),
            (
                "Provider with Highest Successful Claims",
                "SELECT p.Provider_ID, p.Name, COUNT(c.Claim_ID) AS Successful_Claims FROM Providers p JOIN Food_Listings f ON p.Provider_ID = f.Provider_ID JOIN Claims c ON f.Food_ID = c.Food_ID WHERE c.Status = 'Completed' GROUP BY p.Provider_ID, p.Name ORDER BY Successful_Claims DESC LIMIT 5",
            ),
            (
                "Percentage of Claims by Status",
                "SELECT Status, ROUND(COUNT(*) * 100.0 / (SELECT COUNT(*) FROM Claims), 2) AS Percentage FROM Claims GROUP BY Status",
            ),
            (
                "Most Claimed Meal Type",
                "SELECT f.Meal_Type, COUNT(*) AS Count_Claimed FROM Claims c JOIN Food_Listings f ON c.Food_ID = f.Food_ID GROUP BY f.Meal_Type ORDER BY Count_Claimed DESC",
            ),
            (
                "Total Quantity Donated by Each Provider",
                "SELECT p.Provider_ID, p.Name, SUM(f.Quantity) AS Total_Quantity_Donated FROM Providers p JOIN Food_Listings f ON p.Provider_ID = f.Provider_ID GROUP BY p.Provider_ID, p.Name ORDER BY Total_Quantity_Donated DESC",
            ),
        ],
    ),
];
