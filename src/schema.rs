// 📐 Table Schemas - one declaration per table
// The same declaration drives cleaning, loading, CRUD forms and SQL building.
// Table and column names only ever come from here, never from user input.

use crate::error::{FoodWasteError, Result};

// ============================================================================
// TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Providers,
    Receivers,
    FoodListings,
    Claims,
}

impl Table {
    /// Parent tables before dependents
    pub const ALL: [Table; 4] = [
        Table::Providers,
        Table::Receivers,
        Table::FoodListings,
        Table::Claims,
    ];

    pub fn schema(&self) -> &'static TableSchema {
        match self {
            Table::Providers => &PROVIDERS,
            Table::Receivers => &RECEIVERS,
            Table::FoodListings => &FOOD_LISTINGS,
            Table::Claims => &CLAIMS,
        }
    }

    pub fn name(&self) -> &'static str {
        self.schema().name
    }

    /// Accepts the SQL table name or its lower-case form ("Food_Listings", "food_listings")
    pub fn from_name(name: &str) -> Result<Table> {
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| FoodWasteError::UnknownTable(name.to_string()))
    }

    pub fn next(&self) -> Self {
        match self {
            Table::Providers => Table::Receivers,
            Table::Receivers => Table::FoodListings,
            Table::FoodListings => Table::Claims,
            Table::Claims => Table::Providers,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Table::Providers => Table::Claims,
            Table::Receivers => Table::Providers,
            Table::FoodListings => Table::Receivers,
            Table::Claims => Table::FoodListings,
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Date,
    DateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// Column name in CSV headers and SQL
    pub name: &'static str,

    /// Human-readable label for forms
    pub label: &'static str,

    pub kind: ColumnKind,

    /// Rows missing this column are dropped during cleaning; forms refuse empty input
    pub required: bool,

    /// Free-text geographic field: trimmed and title-cased during cleaning
    pub normalize: bool,

    /// Lower bound for integer input
    pub min: Option<i64>,

    /// Foreign key target
    pub references: Option<Table>,
}

impl Column {
    const fn new(name: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Column {
            name,
            label,
            kind,
            required: false,
            normalize: false,
            min: None,
            references: None,
        }
    }

    const fn integer(name: &'static str, label: &'static str) -> Self {
        Column::new(name, label, ColumnKind::Integer)
    }

    const fn text(name: &'static str, label: &'static str) -> Self {
        Column::new(name, label, ColumnKind::Text)
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    const fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    const fn references(mut self, table: Table) -> Self {
        self.references = Some(table);
        self
    }
}

// ============================================================================
// TABLE SCHEMA
// ============================================================================

#[derive(Debug)]
pub struct TableSchema {
    pub table: Table,

    /// SQL table name
    pub name: &'static str,

    /// Display label ("Food Listings")
    pub label: &'static str,

    /// Raw and cleaned extract file name
    pub file_name: &'static str,

    /// Loader reject artifact file name
    pub reject_file: &'static str,

    /// Cleaner artifact for rows dropped over unresolved references.
    /// Only tables with foreign keys have one.
    pub invalid_file: Option<&'static str>,

    pub primary_key: &'static str,

    /// Column order used for inserts
    pub columns: &'static [Column],
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns a user fills in on Add/Update; the key is assigned by the backend
    pub fn form_columns(&self) -> impl Iterator<Item = &'static Column> + '_ {
        let pk = self.primary_key;
        self.columns.iter().filter(move |c| c.name != pk)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &'static Column> + '_ {
        self.columns.iter().filter(|c| c.references.is_some())
    }

    pub fn select_all_sql(&self) -> String {
        format!("SELECT * FROM {}", self.name)
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.name)
    }

    /// Insert-or-skip over every column. Only a primary-key conflict is skipped;
    /// NOT NULL, CHECK and foreign-key violations still fail the statement.
    pub fn insert_or_skip_sql(&self) -> String {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO NOTHING",
            self.name,
            names.join(", "),
            placeholders(1, names.len()),
            self.primary_key
        )
    }

    /// Plain insert over the form columns
    pub fn insert_sql(&self) -> String {
        let names: Vec<&str> = self.form_columns().map(|c| c.name).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            names.join(", "),
            placeholders(1, names.len())
        )
    }

    /// Form columns as `SET` assignments; the key binds to the last placeholder
    pub fn update_sql(&self) -> String {
        let assignments: Vec<String> = self
            .form_columns()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c.name, i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            self.name,
            assignments.join(", "),
            self.primary_key,
            assignments.len() + 1
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?1", self.name, self.primary_key)
    }
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// DECLARATIONS
// ============================================================================

static PROVIDERS: TableSchema = TableSchema {
    table: Table::Providers,
    name: "Providers",
    label: "Providers",
    file_name: "providers_data.csv",
    reject_file: "providers_rejects.csv",
    invalid_file: None,
    primary_key: "Provider_ID",
    columns: &[
        Column::integer("Provider_ID", "Provider ID").required().min(1),
        Column::text("Name", "Name").required(),
        Column::text("Type", "Type"),
        Column::text("City", "City").normalized(),
        Column::text("Contact", "Contact"),
    ],
};

static RECEIVERS: TableSchema = TableSchema {
    table: Table::Receivers,
    name: "Receivers",
    label: "Receivers",
    file_name: "receivers_data.csv",
    reject_file: "receivers_rejects.csv",
    invalid_file: None,
    primary_key: "Receiver_ID",
    columns: &[
        Column::integer("Receiver_ID", "Receiver ID").required().min(1),
        Column::text("Name", "Name").required(),
        Column::text("Type", "Type"),
        Column::text("City", "City").normalized(),
        Column::text("Contact", "Contact"),
    ],
};

static FOOD_LISTINGS: TableSchema = TableSchema {
    table: Table::FoodListings,
    name: "Food_Listings",
    label: "Food Listings",
    file_name: "food_listings_data.csv",
    reject_file: "food_listings_rejects.csv",
    invalid_file: Some("invalid_food.csv"),
    primary_key: "Food_ID",
    columns: &[
        Column::integer("Food_ID", "Food ID").required().min(1),
        Column::text("Food_Name", "Food Name").required(),
        Column::integer("Quantity", "Quantity").min(0),
        Column::new("Expiry_Date", "Expiry Date", ColumnKind::Date),
        Column::integer("Provider_ID", "Provider ID")
            .required()
            .min(1)
            .references(Table::Providers),
        Column::text("Provider_Type", "Provider Type"),
        Column::text("Location", "Location"),
        Column::text("Food_Type", "Food Type"),
        Column::text("Meal_Type", "Meal Type"),
    ],
};

static CLAIMS: TableSchema = TableSchema {
    table: Table::Claims,
    name: "Claims",
    label: "Claims",
    file_name: "claims_data.csv",
    reject_file: "claims_rejects.csv",
    invalid_file: Some("invalid_claims.csv"),
    primary_key: "Claim_ID",
    columns: &[
        Column::integer("Claim_ID", "Claim ID").required().min(1),
        Column::integer("Food_ID", "Food ID")
            .required()
            .min(1)
            .references(Table::FoodListings),
        Column::integer("Receiver_ID", "Receiver ID")
            .required()
            .min(1)
            .references(Table::Receivers),
        Column::text("Status", "Status"),
        Column::new("Timestamp", "Timestamp", ColumnKind::DateTime),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_from_name() {
        assert_eq!(Table::from_name("Providers").unwrap(), Table::Providers);
        assert_eq!(Table::from_name("food_listings").unwrap(), Table::FoodListings);
        assert!(matches!(
            Table::from_name("Users"),
            Err(FoodWasteError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_every_table_has_its_primary_key_first() {
        for table in Table::ALL {
            let schema = table.schema();
            assert_eq!(schema.table, table);
            assert_eq!(schema.columns[0].name, schema.primary_key);
            assert!(schema.columns[0].required);
        }
    }

    #[test]
    fn test_form_columns_skip_primary_key() {
        let names: Vec<&str> = Table::Providers
            .schema()
            .form_columns()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Name", "Type", "City", "Contact"]);

        let claim_fields: Vec<&str> = Table::Claims
            .schema()
            .form_columns()
            .map(|c| c.name)
            .collect();
        assert_eq!(claim_fields, vec!["Food_ID", "Receiver_ID", "Status", "Timestamp"]);
    }

    #[test]
    fn test_foreign_keys_point_at_parents() {
        let food_fks: Vec<(&str, Table)> = Table::FoodListings
            .schema()
            .foreign_keys()
            .map(|c| (c.name, c.references.unwrap()))
            .collect();
        assert_eq!(food_fks, vec![("Provider_ID", Table::Providers)]);

        let claim_fks: Vec<(&str, Table)> = Table::Claims
            .schema()
            .foreign_keys()
            .map(|c| (c.name, c.references.unwrap()))
            .collect();
        assert_eq!(
            claim_fks,
            vec![("Food_ID", Table::FoodListings), ("Receiver_ID", Table::Receivers)]
        );

        // Parents come before dependents in load order
        for (i, table) in Table::ALL.iter().enumerate() {
            for fk in table.schema().foreign_keys() {
                let parent = fk.references.unwrap();
                let parent_pos = Table::ALL.iter().position(|t| *t == parent).unwrap();
                assert!(parent_pos < i, "{} loads before {}", parent, table);
            }
        }
    }

    #[test]
    fn test_invalid_file_only_for_tables_with_references() {
        for table in Table::ALL {
            let schema = table.schema();
            assert_eq!(
                schema.invalid_file.is_some(),
                schema.foreign_keys().next().is_some(),
                "{}",
                schema.name
            );
        }
        assert_eq!(Table::FoodListings.schema().invalid_file, Some("invalid_food.csv"));
        assert_eq!(Table::Claims.schema().invalid_file, Some("invalid_claims.csv"));
    }

    #[test]
    fn test_sql_builders() {
        let schema = Table::Providers.schema();
        assert_eq!(
            schema.insert_or_skip_sql(),
            "INSERT INTO Providers (Provider_ID, Name, Type, City, Contact) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(Provider_ID) DO NOTHING"
        );
        assert_eq!(
            schema.insert_sql(),
            "INSERT INTO Providers (Name, Type, City, Contact) VALUES (?1, ?2, ?3, ?4)"
        );
        assert_eq!(
            schema.update_sql(),
            "UPDATE Providers SET Name = ?1, Type = ?2, City = ?3, Contact = ?4 WHERE Provider_ID = ?5"
        );
        assert_eq!(schema.delete_sql(), "DELETE FROM Providers WHERE Provider_ID = ?1");
        assert_eq!(schema.select_all_sql(), "SELECT * FROM Providers");
    }

    #[test]
    fn test_table_cycle() {
        let mut table = Table::Providers;
        for _ in 0..4 {
            table = table.next();
        }
        assert_eq!(table, Table::Providers);
        assert_eq!(Table::Providers.previous(), Table::Claims);
    }
}
