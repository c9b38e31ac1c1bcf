use loan_agent_orchestrator::bank;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let port: u16 = std::env::var("BANK_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "8000".to_string())
        .parse()?;

    info!("Starting mock core banking service");

    bank::start_server(port).await?;

    Ok(())
}
