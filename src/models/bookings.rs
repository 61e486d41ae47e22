use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{object_id, timestamp};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Statuses that hold the destination's dates.
    pub const BLOCKING: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::Pending];

    /// Statuses that count towards a traveller's stats.
    pub const COUNTED: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::Completed];

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(
        rename = "_id",
        skip_serializing_if = "Option::is_none",
        serialize_with = "object_id::serialize"
    )]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub username: String,
    pub destination_id: i64,
    pub destination_name: String,
    #[serde(default)]
    pub destination_image: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub nights: i64,
    pub guests: i32,
    pub status: BookingStatus,
    pub total_price: f64,
    #[serde(default)]
    pub special_requests: String,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub booking_reference: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Raw booking request. Every field is optional so that missing values are
/// reported as validation failures instead of JSON parse errors.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingInput {
    pub username: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub destination_id: Option<i64>,
    pub destination_name: Option<String>,
    pub destination_image: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default, alias = "guests", deserialize_with = "deserialize_lenient_i64")]
    pub number_of_people: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub total_price: Option<f64>,
    pub special_requests: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BookingQuery {
    pub username: Option<String>,
    pub destination_id: Option<i64>,
    pub status: Option<BookingStatus>,
}

// Form submissions send numbers as strings.
fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a whole number")),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("expected a whole number")),
        Some(_) => Err(serde::de::Error::custom("expected a whole number")),
    }
}

fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .trim_start_matches('$')
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("expected a number")),
        Some(_) => Err(serde::de::Error::custom("expected a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings_are_accepted() {
        let input: BookingInput = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "destinationId": "1",
            "numberOfPeople": "2",
            "totalPrice": "$205.50"
        }))
        .unwrap();

        assert_eq!(input.destination_id, Some(1));
        assert_eq!(input.number_of_people, Some(2));
        assert_eq!(input.total_price, Some(205.5));
    }

    #[test]
    fn test_guests_alias_and_missing_fields() {
        let input: BookingInput =
            serde_json::from_value(serde_json::json!({ "guests": 3, "destinationId": null })).unwrap();

        assert_eq!(input.number_of_people, Some(3));
        assert_eq!(input.destination_id, None);
        assert_eq!(input.total_price, None);
    }

    #[test]
    fn test_status_sets() {
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(BookingStatus::BLOCKING.contains(&BookingStatus::Pending));
        assert!(!BookingStatus::COUNTED.contains(&BookingStatus::Pending));
    }
}
