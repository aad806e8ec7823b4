use financial_insight_pipeline::{
    api::start_server,
    config::PipelineConfig,
    store::SAMPLE_USER_IDS,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from_env()?;

    info!("🚀 Financial Insight Pipeline - API Server");
    info!("📍 Port: {}", config.port);

    let pipeline = Arc::new(config.build_pipeline()?);
    let user_ids = SAMPLE_USER_IDS.iter().map(|id| id.to_string()).collect();

    info!("✅ Pipeline initialized");
    info!("📡 Starting API server...");

    start_server(pipeline, user_ids, config.port).await?;

    Ok(())
}
