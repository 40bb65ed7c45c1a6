//! Design Code Chat REST API Server
//!
//! Serves the classification dialogue, case chat and catalog endpoints.
//!
//! ## Usage
//!
//! ```bash
//! # Start the server
//! GEMINI_API_KEY=... cargo run --bin design_code_server --features server
//!
//! # Test endpoints
//! curl -X POST http://localhost:3000/api/ai-chat/design-code \
//!   -H "Content-Type: application/json" \
//!   -d '{"description": "a five-pointed star", "context": []}'
//!
//! curl http://localhost:3000/api/design-codes/01
//! curl http://localhost:3000/api/health
//! ```

use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use design_code_chat::api::{create_router, AppState};
use design_code_chat::case_chat::CaseChat;
use design_code_chat::{DialogueEngine, EngineConfig};

const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env();
    info!(
        timeout_secs = config.llm_timeout.as_secs(),
        max_codes = config.max_codes,
        policy = %config.limit_policy,
        "Engine configuration loaded"
    );

    let llm = dc_agentic::create_llm_client()?;
    let case_chat = CaseChat::new(llm.clone()).with_timeout(config.llm_timeout);
    let engine = DialogueEngine::with_config(llm, config)?;

    let app = create_router(AppState::new(engine, case_chat))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let bind = std::env::var("DESIGN_CODE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let addr: SocketAddr = bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server running on http://{}", addr);
    info!("  POST   /api/ai-chat/design-code");
    info!("  POST   /api/ai-chat");
    info!("  GET    /api/design-codes[/:category[/:division]]");
    info!("  GET    /api/design-code/:code");
    info!("  GET    /api/health");

    axum::serve(listener, app).await?;

    Ok(())
}
