use std::sync::Arc;

use anyhow::Context as _;
use assistant_relay::AssistantRelay;
use assistant_relay::vendors::openai::OpenAiAssistantsClient;
use tracing::{info, warn};

use crate::config::ServeArgs;
use crate::routes;

/// Builds the relay over the OpenAI Assistants API.
pub fn build_relay(args: &ServeArgs) -> anyhow::Result<AssistantRelay> {
    let service = OpenAiAssistantsClient::new(args.openai_config())
        .context("failed to create OpenAI assistants client")?;
    if args.assistant_id.as_deref().is_none_or(|id| id.trim().is_empty()) {
        warn!("OPENAI_ASSISTANT_ID is not set; submissions will fail until it is configured");
    }
    AssistantRelay::builder()
        .service(Arc::new(service))
        .assistant_id(args.assistant_id.clone())
        .wait_policy(args.wait_policy())
        .build()
        .context("failed to build assistant relay")
}

/// Serves the relay until Ctrl-C.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let relay = build_relay(&args)?;
    let app = routes::router(relay, args.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    let addr = listener
        .local_addr()
        .context("failed to resolve bound address")?;
    info!(addr = %addr, path = routes::ASSISTANT_PATH, "assistant relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .context("assistant relay server exited with an error")
}
