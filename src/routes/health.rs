use std::collections::HashMap;

use actix_web::{web, HttpResponse, Responder};
use log::error;
use mongodb::{bson::doc, Database};
use serde::Serialize;

use crate::config::Config;

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

/*
    GET /health
*/
pub async fn liveness() -> impl Responder {
    "OK"
}

/*
    GET /api/health
*/
pub async fn health_check(db: web::Data<Database>, config: web::Data<Config>) -> impl Responder {
    let mongo = check_mongodb(&db).await;

    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: config.environment.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    if mongo.status != "ok" {
        health.status = "degraded".to_string();
    }
    health.services.insert("mongodb".to_string(), mongo);

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(db: &Database) -> ServiceStatus {
    match db.run_command(doc! { "ping": 1 }).await {
        Ok(_) => ServiceStatus {
            status: "ok".to_string(),
            details: Some("Connected successfully to MongoDB".to_string()),
        },
        Err(e) => {
            error!("MongoDB health check failed: {}", e);
            ServiceStatus {
                status: "error".to_string(),
                details: Some("Failed to connect".to_string()),
            }
        }
    }
}
