use dotenvy::dotenv;
use tracing::info;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod modules;
mod routes;
mod state;
mod workers;

use config::settings::AppConfig;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting server...");

    let config = AppConfig::new();
    let port = config.server_port;

    let state = state::AppState::from_config(config)
        .await
        .expect("Failed to wire application state");

    tokio::spawn(workers::janitor::start_janitor(state.clone()));

    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    info!("Server running on http://0.0.0.0:{port}");

    axum::serve(listener, app).await.unwrap();
}
