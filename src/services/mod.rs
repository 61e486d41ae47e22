pub mod account_service;
pub mod activity_service;
pub mod admin_service;
pub mod booking_service;
pub mod destination_service;
pub mod profile_service;
pub mod review_service;
pub mod stats_service;
