// 🏪 Provider - an organisation donating food

use super::{text_value, Entity};
use crate::schema::Table;
use rusqlite::types::Value;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Provider {
    #[serde(rename = "Provider_ID")]
    pub id: i64,

    #[serde(rename = "Name")]
    pub name: String,

    /// Category label (Restaurant, Supermarket, ...)
    #[serde(rename = "Type", default)]
    pub provider_type: Option<String>,

    #[serde(rename = "City", default)]
    pub city: Option<String>,

    #[serde(rename = "Contact", default)]
    pub contact: Option<String>,
}

impl Entity for Provider {
    const TABLE: Table = Table::Providers;

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.name.clone()),
            text_value(&self.provider_type),
            text_value(&self.city),
            text_value(&self.contact),
        ]
    }
}
