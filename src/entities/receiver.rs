// 🤝 Receiver - an organisation or individual receiving food
// Same shape as Provider, separate identifier space.

use super::{text_value, Entity};
use crate::schema::Table;
use rusqlite::types::Value;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Receiver {
    #[serde(rename = "Receiver_ID")]
    pub id: i64,

    #[serde(rename = "Name")]
    pub name: String,

    /// Category label (NGO, Shelter, Individual, ...)
    #[serde(rename = "Type", default)]
    pub receiver_type: Option<String>,

    #[serde(rename = "City", default)]
    pub city: Option<String>,

    #[serde(rename = "Contact", default)]
    pub contact: Option<String>,
}

impl Entity for Receiver {
    const TABLE: Table = Table::Receivers;

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.name.clone()),
            text_value(&self.receiver_type),
            text_value(&self.city),
            text_value(&self.contact),
        ]
    }
}
