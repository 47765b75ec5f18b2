use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use staysync_api::config::ApiConfig;
use staysync_api::jobs::reservation_sync_manager::load_catalog;
use staysync_api::{handlers, helpers, Database, ReservationSyncManager};

#[get("/health")]
async fn health(db: web::Data<Arc<Database>>) -> impl Responder {
    match db.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(_) => HttpResponse::InternalServerError().json(serde_json::json!({
            "status": "unhealthy",
            "database": "disconnected"
        })),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Booking confirmation email sync", long_about = None)]
struct Args {
    /// Config file; defaults to <config_dir>/staysync/api.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    log_file_path: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Run one sync and print the summary as JSON
    Run,
    /// Serve the HTTP API (default)
    Serve,
    /// Print the loaded property catalog
    Catalog,
}

fn init_tracing(log_file_path: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = log_file_path {
        let log_path = std::path::Path::new(log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("staysync.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file_path.as_deref());

    let (config, config_path) =
        ApiConfig::load(args.config.as_deref()).context("Failed to load config")?;
    tracing::info!(path = %config_path.display(), "Loaded config");

    match args.command.unwrap_or(Command::Serve) {
        Command::Catalog => {
            let catalog = load_catalog(&config)?;
            println!("{}", toml::to_string_pretty(&catalog)?);
            Ok(())
        }
        Command::Run => {
            let db = helpers::database::initialize_database(&config)?;
            let manager = ReservationSyncManager::from_config(&config, &db)?;
            let summary = manager.run_sync().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: ApiConfig) -> anyhow::Result<()> {
    let db = helpers::database::initialize_database(&config)?;
    let manager = Arc::new(ReservationSyncManager::from_config(&config, &db)?);

    let (host, port) = config.server_address();
    tracing::info!("Server will listen on {}:{}", host, port);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        let cors = match &cors_config {
            Some(cors_config) => {
                let mut cors_builder = Cors::default();
                for origin in &cors_config.allowed_origins {
                    cors_builder = cors_builder.allowed_origin(origin);
                }
                cors_builder
            }
            None => Cors::default().allow_any_origin(),
        }
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec!["Accept", "Content-Type"])
        .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(manager.clone()))
            .service(health)
            .route(
                "/api/reservations",
                web::get().to(handlers::reservations::list_reservations),
            )
            .route("/api/sync", web::post().to(handlers::sync::trigger_sync))
            .route("/api/sync/runs", web::get().to(handlers::sync::list_sync_runs))
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
