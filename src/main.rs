use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};

use campsite_api::{config::Config, db, routes};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        info!("Release mode");
    }

    let config = Config::load()?;
    info!("Attempting to bind to {}:{}", config.host, config.port);

    let client = db::mongo::create_mongo_client(&config.mongodb_uri)
        .await
        .map_err(std::io::Error::other)?;
    let database = client.database(&config.database_name);

    if let Err(e) = db::mongo::ensure_indexes(&database).await {
        warn!("Failed to create indexes: {}", e);
    }

    info!("Starting HTTP server...");

    let bind = (config.host.clone(), config.port);
    let database = web::Data::new(database);
    let config = web::Data::new(config);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(database.clone())
            .app_data(config.clone())
            .configure(routes::config)
    })
    .bind(bind)?
    .run()
    .await
}
