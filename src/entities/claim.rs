// 📋 Claim - a Receiver's claim against a FoodListing

use super::{datetime_value, optional_datetime, text_value, Entity};
use crate::schema::Table;
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claim {
    #[serde(rename = "Claim_ID")]
    pub id: i64,

    #[serde(rename = "Food_ID")]
    pub food_id: i64,

    #[serde(rename = "Receiver_ID")]
    pub receiver_id: i64,

    /// Pending, Completed, Cancelled
    #[serde(rename = "Status", default)]
    pub status: Option<String>,

    #[serde(rename = "Timestamp", default, deserialize_with = "optional_datetime")]
    pub timestamp: Option<NaiveDateTime>,
}

impl Entity for Claim {
    const TABLE: Table = Table::Claims;

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Integer(self.food_id),
            Value::Integer(self.receiver_id),
            text_value(&self.status),
            datetime_value(&self.timestamp),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_timestamp_round_trips_to_sql_text() {
        let data = "Claim_ID,Food_ID,Receiver_ID,Status,Timestamp\n1,164,908,Pending,2025-03-05 05:26:00\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let claim: Claim = rdr.deserialize().next().unwrap().unwrap();

        assert_eq!(claim.food_id, 164);
        assert_eq!(claim.receiver_id, 908);
        assert_eq!(claim.values()[4], Value::Text("2025-03-05 05:26:00".to_string()));
    }

    #[test]
    fn test_claim_without_timestamp() {
        let data = "Claim_ID,Food_ID,Receiver_ID,Status,Timestamp\n2,1,1,Completed,\n";
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        let claim: Claim = rdr.deserialize().next().unwrap().unwrap();

        assert_eq!(claim.timestamp, None);
        assert_eq!(claim.values()[4], Value::Null);
    }
}
