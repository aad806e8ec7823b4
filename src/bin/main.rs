use financial_insight_pipeline::{
    config::PipelineConfig,
    pipeline::PipelineStatus,
};
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

    let user_id = std::env::args().nth(1).unwrap_or_else(|| "user_001".to_string());

    let config = PipelineConfig::from_env()?;
    let pipeline = config.build_pipeline()?;

    info!(user_id = %user_id, "Financial Insight Pipeline starting");

    let report = pipeline.run(&user_id).await;

    println!("\n=== PIPELINE RESULT ===");
    println!("Run ID: {}", report.state.run_id());
    println!("User: {}", report.state.user_id());

    for result in report.state.results() {
        println!("\n--- {} ---\n{}", result.stage, result.narrative_text);
    }

    match report.status {
        PipelineStatus::Done => Ok(()),
        PipelineStatus::Failed(failure) => {
            eprintln!(
                "\nPipeline failed while {} ({}): {}",
                failure.stage, failure.kind, failure.reason
            );
            std::process::exit(1);
        }
        PipelineStatus::Aborted { before } => {
            eprintln!("\nPipeline aborted before {}", before);
            std::process::exit(2);
        }
    }
}
