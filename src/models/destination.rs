use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::{object_id, review::Review, timestamp};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(
        rename = "_id",
        skip_serializing_if = "Option::is_none",
        serialize_with = "object_id::serialize"
    )]
    pub oid: Option<ObjectId>,
    pub id: i64,
    pub name: String,
    pub location: String,
    /// Display price such as "$45/night".
    pub price: String,
    pub image: String,
    pub description: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Admin forms send amenities and features as comma separated text; API
/// clients may send arrays.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum ListInput {
    List(Vec<String>),
    Text(String),
}

impl ListInput {
    pub fn normalize(self) -> Vec<String> {
        let items: Vec<String> = match self {
            ListInput::List(items) => items,
            ListInput::Text(text) => text.split(',').map(str::to_string).collect(),
        };

        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub amenities: Option<ListInput>,
    pub features: Option<ListInput>,
    pub rating: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookedRange {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated_text_is_split_and_trimmed() {
        let input: DestinationInput = serde_json::from_value(serde_json::json!({
            "amenities": " Fire pit, Water ,, Toilets ,",
            "features": ["Lake view", "  ", " Hiking "]
        }))
        .unwrap();

        assert_eq!(
            input.amenities.unwrap().normalize(),
            vec!["Fire pit", "Water", "Toilets"]
        );
        assert_eq!(input.features.unwrap().normalize(), vec!["Lake view", "Hiking"]);
    }
}
