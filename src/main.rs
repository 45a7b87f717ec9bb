//! tutorbot - LLM-backed study tutor chat bot
//!
//! A backend implementing the conversational state machine for a tutoring
//! bot: registration and login against a profile store, subject
//! management, tutoring chats, and quiz generation over a hosted language
//! model.

mod api;
mod db;
mod llm;
mod prompts;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use db::Database;
use llm::CompletionConfig;
use runtime::SessionManager;
use state_machine::DEFAULT_CATALOG;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutorbot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("TUTORBOT_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.tutorbot/tutorbot.db")
    });

    let port: u16 = std::env::var("TUTORBOT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let catalog: Vec<String> = std::env::var("TUTORBOT_SUBJECTS")
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| DEFAULT_CATALOG.iter().map(|s| (*s).to_string()).collect());

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // Initialize completion service
    let completions = CompletionConfig::from_env().build();
    match &completions {
        Some(service) => {
            tracing::info!(model = %service.model_id(), "Completion service configured");
        }
        None => {
            tracing::warn!("No completion API key configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
        }
    }

    tracing::info!(subjects = ?catalog, "Subject catalog loaded");

    // Create application state
    let state = AppState::new(SessionManager::new(db, completions, catalog));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("tutorbot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
