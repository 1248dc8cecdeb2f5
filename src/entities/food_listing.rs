// 🥫 FoodListing - a quantity of food offered by a Provider

use super::{date_value, optional_date, text_value, Entity};
use crate::schema::Table;
use chrono::NaiveDate;
use rusqlite::types::Value;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FoodListing {
    #[serde(rename = "Food_ID")]
    pub id: i64,

    #[serde(rename = "Food_Name")]
    pub food_name: String,

    /// None when the extract carried no usable quantity
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<i64>,

    #[serde(rename = "Expiry_Date", default, deserialize_with = "optional_date")]
    pub expiry_date: Option<NaiveDate>,

    #[serde(rename = "Provider_ID")]
    pub provider_id: i64,

    #[serde(rename = "Provider_Type", default)]
    pub provider_type: Option<String>,

    #[serde(rename = "Location", default)]
    pub location: Option<String>,

    #[serde(rename = "Food_Type", default)]
    pub food_type: Option<String>,

    #[serde(rename = "Meal_Type", default)]
    pub meal_type: Option<String>,
}

impl Entity for FoodListing {
    const TABLE: Table = Table::FoodListings;

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.food_name.clone()),
            self.quantity.map(Value::Integer).unwrap_or(Value::Null),
            date_value(&self.expiry_date),
            Value::Integer(self.provider_id),
            text_value(&self.provider_type),
            text_value(&self.location),
            text_value(&self.food_type),
            text_value(&self.meal_type),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Food_ID,Food_Name,Quantity,Expiry_Date,Provider_ID,Provider_Type,Location,Food_Type,Meal_Type\n";

    fn parse(row: &str) -> Result<FoodListing, csv::Error> {
        let data = format!("{}{}\n", HEADER, row);
        let mut rdr = csv::Reader::from_reader(data.as_bytes());
        rdr.deserialize().next().unwrap()
    }

    #[test]
    fn test_food_listing_with_empty_optional_fields() {
        let listing = parse("3,Bread,,,12,Bakery,Austin,Vegetarian,Breakfast").unwrap();

        assert_eq!(listing.id, 3);
        assert_eq!(listing.quantity, None);
        assert_eq!(listing.expiry_date, None);
        assert_eq!(listing.provider_id, 12);

        let values = listing.values();
        assert_eq!(values.len(), Table::FoodListings.schema().columns.len());
        assert_eq!(values[2], Value::Null);
        assert_eq!(values[4], Value::Integer(12));
    }

    #[test]
    fn test_food_listing_expiry_date_stored_as_iso_date() {
        let listing = parse("3,Bread,40,2025-03-17,12,Bakery,Austin,Vegetarian,Breakfast").unwrap();

        assert_eq!(listing.expiry_date, NaiveDate::from_ymd_opt(2025, 3, 17));
        assert_eq!(listing.values()[3], Value::Text("2025-03-17".to_string()));
    }

    #[test]
    fn test_food_listing_bad_date_is_an_error() {
        assert!(parse("3,Bread,40,someday,12,Bakery,Austin,Vegetarian,Breakfast").is_err());
    }
}
