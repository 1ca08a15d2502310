use financial_assistant_orchestrator::{
    api::start_server,
    capabilities::create_default_registry,
    coordinator::{ExecutionCoordinator, DEFAULT_CAPABILITY_TIMEOUT},
    language::{MistralClient, MockTextGenerator, TextGenerator},
    session::{SessionManager, DEFAULT_SESSION_TTL},
    voice::{MockSpeech, SpeechApiClient, SpeechCollaborator},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8011".to_string())
        .parse()?;

    info!("Intelligent Financial Assistant Orchestrator - API Server");
    info!("Port: {}", port);

    // Collaborators from environment, mock fallbacks when unconfigured
    let generator: Arc<dyn TextGenerator> = match std::env::var("MISTRAL_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => Arc::new(MistralClient::new(api_key)),
        _ => {
            warn!("MISTRAL_API_KEY not set, using mock text generator");
            Arc::new(MockTextGenerator)
        }
    };

    let speech: Arc<dyn SpeechCollaborator> = match SpeechApiClient::from_env() {
        Some(client) => Arc::new(client),
        None => {
            warn!("SPEECH_API_BASE_URL not set, using mock speech collaborator");
            Arc::new(MockSpeech)
        }
    };

    let registry = create_default_registry(generator.clone());

    let ttl = env_secs("SESSION_TTL_SECS", DEFAULT_SESSION_TTL);
    let sessions = Arc::new(SessionManager::new(ttl));

    let capability_timeout = env_secs("CAPABILITY_TIMEOUT_SECS", DEFAULT_CAPABILITY_TIMEOUT);

    let coordinator = Arc::new(
        ExecutionCoordinator::new(registry, sessions.clone(), generator, speech)
            .with_capability_timeout(capability_timeout),
    );

    // Background TTL sweep; stale sessions also 404 lazily on access
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            sessions.evict_expired().await;
        }
    });

    info!("Coordinator initialized, starting API server");

    start_server(coordinator, port).await?;

    Ok(())
}
