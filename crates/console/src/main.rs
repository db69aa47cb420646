//! Chatbridge Console
//!
//! Interactive question/answer loop over stdin/stdout. Logs go to stderr
//! so they never interleave with the conversation.

mod session;

use anyhow::Context;
use chatbridge_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{DbPool, Repository},
    llm::GeminiClient,
    ChatPipeline,
};
use session::ConsoleSession;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Console default when RUST_LOG is unset; info-level pipeline logs would drown the chat
const CONSOLE_LOG_LEVEL: &str = "warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.observability);

    let generator = GeminiClient::new(&config.llm)?;

    let db = DbPool::new(&config.database)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    db.bootstrap().await.context("Failed to prepare database")?;
    info!(database = %config.database.url, "Database ready");

    let pipeline = ChatPipeline::new(Arc::new(Repository::new(db)), Arc::new(generator))
        .with_surface("console");

    let answered = ConsoleSession::new(
        Arc::new(pipeline),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .run()
    .await?;

    info!(answered, "Console session ended");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(CONSOLE_LOG_LEVEL));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
