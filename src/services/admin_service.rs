use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    Database,
};
use serde::Serialize;

use crate::{
    db::mongo::{BOOKINGS, DESTINATIONS, USERS},
    error::AppError,
    models::bookings::{Booking, BookingStatus},
    services::booking_service,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_destinations: u64,
    pub total_bookings: u64,
    pub active_bookings: u64,
    pub cancelled_bookings: u64,
    pub total_revenue: f64,
    pub recent_bookings: Vec<Booking>,
}

fn status_in(statuses: &[BookingStatus]) -> Document {
    let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    doc! { "status": { "$in": names } }
}

pub async fn dashboard(db: &Database) -> Result<DashboardStats, AppError> {
    let users = db.collection::<Document>(USERS);
    let destinations = db.collection::<Document>(DESTINATIONS);
    let bookings = db.collection::<Booking>(BOOKINGS);

    let total_users = users.count_documents(doc! {}).await?;
    let total_destinations = destinations.count_documents(doc! {}).await?;
    let total_bookings = bookings.count_documents(doc! {}).await?;
    let active_bookings = bookings
        .count_documents(status_in(&BookingStatus::BLOCKING))
        .await?;
    let cancelled_bookings = bookings
        .count_documents(doc! { "status": BookingStatus::Cancelled.as_str() })
        .await?;

    let total_revenue = booking_service::all(db, status_in(&BookingStatus::COUNTED))
        .await?
        .iter()
        .map(|booking| booking.total_price)
        .sum::<f64>();

    let recent_bookings: Vec<Booking> = bookings
        .find(doc! {})
        .sort(doc! { "_id": -1 })
        .limit(5)
        .await?
        .try_collect()
        .await?;

    Ok(DashboardStats {
        total_users,
        total_destinations,
        total_bookings,
        active_bookings,
        cancelled_bookings,
        total_revenue,
        recent_bookings,
    })
}
