// Entity Models - one flat record per table
//
// Each entity:
// - deserializes from a cleaned extract row (CSV headers kept verbatim)
// - knows its table and primary key
// - yields its values in schema column order for insert-or-skip

pub mod provider;
pub mod receiver;
pub mod food_listing;
pub mod claim;

pub use provider::Provider;
pub use receiver::Receiver;
pub use food_listing::FoodListing;
pub use claim::Claim;

use crate::normalize::{parse_date, parse_datetime, DATETIME_FORMAT, DATE_FORMAT};
use crate::schema::Table;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;

pub trait Entity: DeserializeOwned {
    const TABLE: Table;

    fn id(&self) -> i64;

    /// Values in `TableSchema::columns` order
    fn values(&self) -> Vec<Value>;
}

pub(crate) fn text_value(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

pub(crate) fn date_value(value: &Option<NaiveDate>) -> Value {
    match value {
        Some(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        None => Value::Null,
    }
}

pub(crate) fn datetime_value(value: &Option<NaiveDateTime>) -> Value {
    match value {
        Some(dt) => Value::Text(dt.format(DATETIME_FORMAT).to_string()),
        None => Value::Null,
    }
}

/// Empty cell is None; anything else must parse
pub(crate) fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date: {}", s))),
    }
}

pub(crate) fn optional_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_datetime(&s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", s))),
    }
}
