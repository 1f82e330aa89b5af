//! HTTP server for the college assistant

use campus_query::{AppConfig, CollegeAssistant};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    if config.api_key.is_none() {
        warn!("GROQ_API_KEY not set - placement SQL generation will fail");
    }

    // store build and entity lookups happen once, before serving
    let assistant = Arc::new(CollegeAssistant::from_config(&config)?);
    info!(
        "Entity lookups loaded: {} companies, {} departments",
        assistant.placement().lookups().companies.len(),
        assistant.placement().lookups().departments.len()
    );

    let listener = TcpListener::bind(&config.server_addr).await?;
    info!("Server listening on {}", config.server_addr);

    campus_query::http::serve(listener, assistant).await?;
    Ok(())
}
