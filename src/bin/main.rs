use financial_assistant_orchestrator::{
    capabilities::create_mock_registry,
    coordinator::ExecutionCoordinator,
    language::MockTextGenerator,
    session::SessionManager,
    voice::MockSpeech,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Assistant orchestrator demo starting");

    // Offline demo: mock collaborators, canned capability handlers
    let registry = create_mock_registry();
    let sessions = Arc::new(SessionManager::default());
    let coordinator = ExecutionCoordinator::new(
        registry,
        sessions.clone(),
        Arc::new(MockTextGenerator),
        Arc::new(MockSpeech),
    );

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Compare Tesla vs Apple performance".to_string());

    info!(query = %query, "Running coordinator");

    let response = coordinator.run(&query, false, true).await?;

    println!("\n=== RESPONSE ===");
    println!("Session: {}", response.session_id);
    println!("Interpretation: {}", response.query_interpretation);
    println!("Confidence: {:.2}", response.confidence);
    println!("\nCapabilities:");
    for status in &response.capabilities_used {
        println!(
            "  {:<20} {:?} - {}",
            status.capability.to_string(),
            status.state,
            status.description
        );
    }
    println!("\nAnswer:\n{}", response.response_text);

    let session = sessions.get(response.session_id).await?;
    println!(
        "\nFinal status: {:?} at {:.0}%",
        session.overall_status, session.progress_percentage
    );

    Ok(())
}
