use dotenvy::dotenv;
use tracing::{error, info};

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;

use config::settings::AppConfig;
use infrastructure::openai::OpenAiService;
use infrastructure::storage::{local::StorageService, s3::MirrorService};
use state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    info!("Starting server...");

    let config = match AppConfig::new() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration (is OPENAI_API_KEY set?): {}", e);
            std::process::exit(1);
        }
    };

    let openai = OpenAiService::new(config.openai.clone()).expect("Failed to build HTTP client");
    let mirror = config.mirror.as_ref().map(MirrorService::new);
    let storage = StorageService::new(config.storage_dir.clone(), mirror);

    tokio::fs::create_dir_all(storage.root())
        .await
        .expect("Failed to create storage directory");

    let port = config.server_port;
    info!("{} storing artifacts in {}", config.app_name, storage.root().display());

    let app = app::create_app(AppState::new(config, openai, storage));

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await.unwrap();
}
