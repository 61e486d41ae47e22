use chrono::{NaiveDate, Utc};
use log::info;
use mongodb::{
    bson::{doc, Document},
    Database,
};

use crate::{
    db::mongo::{collect, next_sequence, BOOKINGS, DESTINATIONS, REVIEWS},
    error::AppError,
    models::{
        bookings::{Booking, BookingStatus},
        destination::{BookedRange, Destination, DestinationInput},
        review::Review,
        timestamp,
    },
};

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

pub async fn list(db: &Database) -> Result<Vec<Destination>, AppError> {
    let cursor = db
        .collection::<Destination>(DESTINATIONS)
        .find(doc! {})
        .sort(doc! { "id": 1 })
        .await?;
    collect(cursor).await
}

/// One destination with its reviews attached, newest review first.
pub async fn get(db: &Database, id: i64) -> Result<Destination, AppError> {
    let mut destination = find(db, id).await?;

    let cursor = db
        .collection::<Review>(REVIEWS)
        .find(doc! { "campsiteId": id })
        .sort(doc! { "_id": -1 })
        .await?;
    destination.reviews = collect(cursor).await?;

    Ok(destination)
}

pub async fn find(db: &Database, id: i64) -> Result<Destination, AppError> {
    db.collection::<Destination>(DESTINATIONS)
        .find_one(doc! { "id": id })
        .await?
        .ok_or_else(|| AppError::not_found(format!("Destination {id} not found")))
}

/// Builds a new destination from form input; everything but the id.
pub fn build(input: DestinationInput, id: i64) -> Result<Destination, AppError> {
    let now = Utc::now();
    Ok(Destination {
        oid: None,
        id,
        name: required(input.name, "name")?,
        location: required(input.location, "location")?,
        price: required(input.price, "price")?,
        image: required(input.image, "image")?,
        description: required(input.description, "description")?,
        amenities: input.amenities.map(|a| a.normalize()).unwrap_or_default(),
        features: input.features.map(|f| f.normalize()).unwrap_or_default(),
        rating: input.rating.unwrap_or(0.0),
        reviews: Vec::new(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn create(db: &Database, input: DestinationInput) -> Result<Destination, AppError> {
    // Validate before an id is consumed.
    build(input.clone(), 0)?;

    let id = next_sequence(db, DESTINATIONS).await?;
    let mut destination = build(input, id)?;

    let result = db
        .collection::<Destination>(DESTINATIONS)
        .insert_one(&destination)
        .await?;
    destination.oid = result.inserted_id.as_object_id();

    info!("Created destination {} ({})", destination.id, destination.name);
    Ok(destination)
}

/// `$set` document holding only the fields present in `input`.
pub fn update_document(input: DestinationInput) -> Result<Document, AppError> {
    let mut set = Document::new();

    let text_fields = [
        ("name", input.name),
        ("location", input.location),
        ("price", input.price),
        ("image", input.image),
        ("description", input.description),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(AppError::validation(format!("{field} cannot be empty")));
            }
            set.insert(field, value);
        }
    }

    if let Some(amenities) = input.amenities {
        set.insert("amenities", amenities.normalize());
    }
    if let Some(features) = input.features {
        set.insert("features", features.normalize());
    }
    if let Some(rating) = input.rating {
        set.insert("rating", rating);
    }

    set.insert("updatedAt", timestamp::format(&Utc::now()));
    Ok(set)
}

pub async fn update(db: &Database, id: i64, input: DestinationInput) -> Result<Destination, AppError> {
    let set = update_document(input)?;

    let result = db
        .collection::<Destination>(DESTINATIONS)
        .update_one(doc! { "id": id }, doc! { "$set": set })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::not_found(format!("Destination {id} not found")));
    }

    find(db, id).await
}

pub async fn delete(db: &Database, id: i64) -> Result<(), AppError> {
    let result = db
        .collection::<Destination>(DESTINATIONS)
        .delete_one(doc! { "id": id })
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found(format!("Destination {id} not found")));
    }

    info!("Deleted destination {id}");
    Ok(())
}

/// Date ranges held by pending or confirmed bookings, from `from` onwards.
pub async fn booked_ranges(db: &Database, id: i64, from: NaiveDate) -> Result<Vec<BookedRange>, AppError> {
    find(db, id).await?;

    let statuses: Vec<&str> = BookingStatus::BLOCKING.iter().map(|s| s.as_str()).collect();
    let cursor = db
        .collection::<Booking>(BOOKINGS)
        .find(doc! {
            "destinationId": id,
            "status": { "$in": statuses },
            "endDate": { "$gt": from.to_string() },
        })
        .sort(doc! { "startDate": 1 })
        .await?;

    Ok(collect(cursor)
        .await?
        .into_iter()
        .map(|b| BookedRange {
            start_date: b.start_date,
            end_date: b.end_date,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::destination::ListInput;

    fn scenario_b() -> DestinationInput {
        DestinationInput {
            name: Some("X".into()),
            location: Some("Y".into()),
            price: Some("$100/night".into()),
            image: Some("http://i/img.png".into()),
            description: Some("d".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_with_minimal_fields() {
        let destination = build(scenario_b(), 1).unwrap();
        assert_eq!(destination.id, 1);
        assert_eq!(destination.price, "$100/night");
        assert!(destination.amenities.is_empty());
        assert_eq!(destination.rating, 0.0);
    }

    #[test]
    fn test_build_rejects_missing_fields() {
        let mut input = scenario_b();
        input.location = Some("   ".into());
        let err = build(input, 1).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "location is required"));
    }

    #[test]
    fn test_update_only_sets_given_fields() {
        let set = update_document(DestinationInput {
            price: Some("$60/night".into()),
            amenities: Some(ListInput::Text("Wifi, Showers".into())),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(set.get_str("price").unwrap(), "$60/night");
        assert_eq!(set.get_array("amenities").unwrap().len(), 2);
        assert!(set.get("name").is_none());
        assert!(set.get_str("updatedAt").is_ok());
    }
}
