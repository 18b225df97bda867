// Valuflow API server
//
// Serves the valuation job pipeline: job CRUD, guarded status
// transitions, and per-role notification inboxes.

use std::path::Path;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use log::info;

use valuflow::db::Database;
use valuflow::{JobStore, NotificationStore};
use valuflow_server::{routes, ServerConfig};

const CONFIG_FILE: &str = "valuflow.json";

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration
    let mut config = match ServerConfig::from_file(Path::new(CONFIG_FILE)) {
        Ok(cfg) => cfg,
        Err(_) => {
            eprintln!("Warning: {} not found, using defaults", CONFIG_FILE);
            ServerConfig::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .format_timestamp_secs()
    .init();

    info!("Starting valuflow server v{}", env!("CARGO_PKG_VERSION"));

    // Open the database and build the stores
    let db_path = config
        .database_path()
        .context("Could not determine database path")?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let job_store = JobStore::new(db.clone());
    let notification_store = NotificationStore::new(db);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(job_store.clone()))
            .app_data(web::Data::new(notification_store.clone()))
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
