use anyhow::Result;

use sidehustle_ai::services::InferenceClient;
use sidehustle_ai::{app, config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        "Starting SIDEHustle AI gateway"
    );

    // Create inference client
    let inference = InferenceClient::from_settings(&settings)?;

    // Create application state
    let state = app::AppState::new(settings.clone(), inference);

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
