//! Chatbridge Common Library
//!
//! Shared code for the Chatbridge gateway and console including:
//! - Intent detection, context lookup and prompt composition
//! - The chat pipeline tying them to a text generator
//! - Database models, seeding and the catalog repository
//! - Generation client abstraction (Gemini)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod chat;
pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod llm;
pub mod metrics;

// Re-export commonly used types
pub use chat::{ChatPipeline, PreparedPrompt};
pub use config::AppConfig;
pub use db::{Catalog, DbPool, Repository};
pub use errors::{AppError, Result};
pub use llm::{Envelope, Generator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
