use loan_agent_orchestrator::{
    agent::{Orchestrator, OrchestratorConfig},
    decision::{Decision, ScriptedDecisionEngine},
    execution::ToolExecutor,
    models::{Message, ThreadId, ToolCall},
    state::InMemoryThreadStore,
    tools::create_default_registry,
};
use tracing::info;

fn assess_call(income: f64, credit_score: i64, loan_amount: f64) -> ToolCall {
    let arguments = serde_json::json!({
        "income": income,
        "credit_score": credit_score,
        "loan_amount": loan_amount,
    });
    ToolCall {
        tool_name: "assess_loan_risk".to_string(),
        arguments: arguments.as_object().cloned().unwrap_or_default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Loan Desk Orchestrator starting");

    // Scripted decision rounds matching the demo conversation below, so the
    // whole pass pipeline runs without an LLM or the banking service.
    let script = vec![
        Decision::CallTools {
            content: "Let me run the numbers on that.".to_string(),
            calls: vec![assess_call(5000.0, 750, 20000.0)],
        },
        Decision::Final {
            content: "Good news! Your $20000 loan is APPROVED: excellent credit score \
                      and healthy income ratio. Would you like me to proceed with disbursement?"
                .to_string(),
        },
    ];

    // Create components
    let decision_engine = Box::new(ScriptedDecisionEngine::new(script));
    let tool_executor = ToolExecutor::new(create_default_registry(None));
    let store = Box::new(InMemoryThreadStore::new());

    // Create orchestrator
    let orchestrator = Orchestrator::new(
        decision_engine,
        tool_executor,
        store,
        OrchestratorConfig::default(),
    );

    let thread_id = ThreadId::new("demo-thread");

    println!("Welcome to the Bank. Please enter your User ID to start.");

    let turns = [
        "Hello! I'd like to borrow some money.",
        "Oh right, I'm user_123.",
        "I need a loan of $20000 please.",
    ];

    for turn in turns {
        println!("\nYou: {}", turn);
        let outcome = orchestrator.run_turn(&thread_id, turn).await?;

        for message in &outcome.new_messages {
            match message {
                Message::ToolRequest { calls, .. } => {
                    for call in calls {
                        println!("  [calling {}]", call.tool_name);
                    }
                }
                Message::ToolResult { tool_name, content } => {
                    println!("  [{}] {}", tool_name, content);
                }
                _ => {}
            }
        }

        if let Some(reply) = outcome.reply() {
            println!("Agent: {}", reply);
        }
    }

    let transcript = orchestrator.history(&thread_id).await?;
    println!("\n=== THREAD TRANSCRIPT ===");
    for (i, message) in transcript.iter().enumerate() {
        println!("  {}: {}", i + 1, message.kind());
    }

    Ok(())
}
