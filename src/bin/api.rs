use loan_agent_orchestrator::{
    agent::{Orchestrator, OrchestratorConfig, DEFAULT_MAX_TOOL_ROUNDS},
    api::start_server,
    decision::GeminiDecisionEngine,
    execution::ToolExecutor,
    state::InMemoryThreadStore,
    tools::registry_from_env,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Decision rounds will return 503 until it is configured");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let max_tool_rounds: usize = std::env::var("MAX_TOOL_ROUNDS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);

    info!("🚀 Loan Desk Orchestrator - API Server");
    info!("📍 Port: {}", api_port);
    info!("🔁 Max tool rounds per pass: {}", max_tool_rounds);

    // Create components
    let tool_executor = ToolExecutor::new(registry_from_env());
    let decision_engine = Box::new(GeminiDecisionEngine::new(
        gemini_api_key,
        tool_executor.registry().catalogue(),
    ));
    let store = Box::new(InMemoryThreadStore::new());

    // Create orchestrator
    let orchestrator = Arc::new(Orchestrator::new(
        decision_engine,
        tool_executor,
        store,
        OrchestratorConfig { max_tool_rounds },
    ));

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, api_port).await?;

    Ok(())
}
