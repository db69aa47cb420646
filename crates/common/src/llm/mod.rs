//! Text generation abstraction
//!
//! The hosted model is an opaque collaborator: give it a prompt, get back
//! either the whole answer or a finite stream of fragments.
//! - [`Generator`]: the provider seam
//! - [`GeminiClient`]: Google Generative Language API implementation
//! - [`ScriptedGenerator`]: replays canned fragments, for development and tests
//! - [`Envelope`]: the `{"text": ...}` / `{"error": ...}` wire unit of a stream

mod gemini;
mod scripted;

pub use gemini::GeminiClient;
pub use scripted::ScriptedGenerator;

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lazy, finite, non-restartable sequence of generated text fragments
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Fragments wrapped for the wire; ends after the first error envelope
pub type EnvelopeStream = BoxStream<'static, Envelope>;

/// Shown when the provider answered but carried no extractable text
pub const UNREADABLE_RESPONSE: &str = "Maaf, ada masalah dalam memahami respons dari Gemini.";

/// Prefix of the error envelope sent when a stream fails
pub const STREAM_FAILURE_PREFIX: &str = "Maaf, ada masalah teknis di server: ";

/// Trait for text generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate the complete answer for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Start generating and hand back fragments as they arrive
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// One line of a streamed chat response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Text(String),
    Error(String),
}

impl Envelope {
    /// User-facing error envelope for a failed generation
    pub fn failure(err: &AppError) -> Self {
        Envelope::Error(format!("{}{}", STREAM_FAILURE_PREFIX, err))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error(_))
    }

    /// Compact JSON object followed by a newline
    pub fn to_ndjson_line(&self) -> String {
        let value = match self {
            Envelope::Text(text) => serde_json::json!({ "text": text }),
            Envelope::Error(message) => serde_json::json!({ "error": message }),
        };
        format!("{}\n", value)
    }
}

/// Wrap fragments as envelopes.
///
/// Empty fragments are dropped. The first error becomes a single error
/// envelope and the stream stops there; nothing is retried.
pub fn into_envelopes(fragments: FragmentStream) -> EnvelopeStream {
    stream::unfold(Some(fragments), |state| async move {
        let mut fragments = state?;
        loop {
            match fragments.next().await? {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => return Some((Envelope::Text(text), Some(fragments))),
                Err(err) => {
                    warn!(error = %err, "Generation stream failed");
                    return Some((Envelope::failure(&err), None));
                }
            }
        }
    })
    .boxed()
}

/// A stream holding one error envelope, for failures before the first fragment
pub fn failed_stream(err: &AppError) -> EnvelopeStream {
    stream::once(futures::future::ready(Envelope::failure(err))).boxed()
}
