use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, to_bson, Document},
    Database,
};

use crate::{
    db::mongo::{collect, BOOKINGS, USERS},
    error::AppError,
    models::{
        bookings::{Booking, BookingStatus},
        timestamp,
        user::UserStats,
    },
};

/// Aggregates a traveller's stats from their bookings. Only confirmed and
/// completed bookings count. The favourite destination is the most booked
/// name; ties go to the name that sorts first.
pub fn compute_stats(bookings: &[Booking], last_booking: Option<DateTime<Utc>>) -> UserStats {
    let counted: Vec<&Booking> = bookings
        .iter()
        .filter(|b| BookingStatus::COUNTED.contains(&b.status))
        .collect();

    let destinations: HashSet<i64> = counted.iter().map(|b| b.destination_id).collect();

    let mut per_name: HashMap<&str, usize> = HashMap::new();
    for booking in &counted {
        *per_name.entry(booking.destination_name.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = per_name.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    UserStats {
        total_bookings: counted.len() as i64,
        total_nights: counted.iter().map(|b| b.nights).sum(),
        total_destinations_visited: destinations.len() as i64,
        favorite_destination: ranked.first().map(|(name, _)| name.to_string()),
        last_booking,
        total_spent: counted.iter().map(|b| b.total_price).sum(),
    }
}

pub async fn bookings_for_user(db: &Database, user_id: &str) -> Result<Vec<Booking>, AppError> {
    let cursor = db
        .collection::<Booking>(BOOKINGS)
        .find(doc! { "userId": user_id })
        .sort(doc! { "_id": -1 })
        .await?;
    collect(cursor).await
}

/// Stats as of now, derived from the stored bookings. `lastBooking` is the
/// creation time of the newest counted booking.
pub async fn current_stats(db: &Database, user_id: &str) -> Result<UserStats, AppError> {
    let bookings = bookings_for_user(db, user_id).await?;
    let last_booking = bookings
        .iter()
        .filter(|b| BookingStatus::COUNTED.contains(&b.status))
        .map(|b| b.created_at)
        .max();

    Ok(compute_stats(&bookings, last_booking))
}

/// Recomputes the stats from scratch and stores them on the user document.
pub async fn refresh_user_stats(db: &Database, user_id: &str) -> Result<UserStats, AppError> {
    let stats = current_stats(db, user_id).await?;
    let oid = ObjectId::parse_str(user_id).map_err(|_| AppError::validation("Invalid user id"))?;

    let update = doc! {
        "$set": {
            "stats": to_bson(&stats)?,
            "updatedAt": timestamp::format(&Utc::now()),
        }
    };
    db.collection::<Document>(USERS)
        .update_one(doc! { "_id": oid }, update)
        .await?;

    Ok(stats)
}
