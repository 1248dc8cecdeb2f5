use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoodWasteError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown query: {category} / {name}")]
    UnknownQuery { category: String, name: String },

    #[error("Query writes to the database: {0}")]
    NotReadOnly(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl FoodWasteError {
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        FoodWasteError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FoodWasteError>;
