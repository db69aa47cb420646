//! Chat pipeline
//!
//! One question flows Extractor -> Resolver -> Composer -> Generator. The
//! pipeline is immutable once built and shared behind an `Arc` by both the
//! console loop and the HTTP gateway.

use crate::context::{ContextResolver, Entities, Intent, IntentExtractor, PromptComposer};
use crate::db::Catalog;
use crate::llm::{failed_stream, into_envelopes, EnvelopeStream, Generator};
use crate::metrics;
use futures::future;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Reply used when a blocking generation fails
pub const TECHNICAL_APOLOGY: &str = "Maaf, ada masalah teknis. Silakan coba lagi nanti.";

/// Everything known about a question before the model is called
#[derive(Debug, Clone, Serialize)]
pub struct PreparedPrompt {
    pub intent: Intent,
    pub entities: Entities,
    pub context: String,
    pub prompt: String,
}

pub struct ChatPipeline {
    extractor: IntentExtractor,
    resolver: ContextResolver,
    composer: PromptComposer,
    catalog: Arc<dyn Catalog>,
    generator: Arc<dyn Generator>,
    surface: &'static str,
}

impl ChatPipeline {
    pub fn new(catalog: Arc<dyn Catalog>, generator: Arc<dyn Generator>) -> Self {
        Self {
            extractor: IntentExtractor::new(),
            resolver: ContextResolver::new(catalog.clone()),
            composer: PromptComposer::new(),
            catalog,
            generator,
            surface: "console",
        }
    }

    /// Label the surface this pipeline serves in metrics (`console`, `http`)
    pub fn with_surface(mut self, surface: &'static str) -> Self {
        self.surface = surface;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Classify the question, look up its context and build the prompt
    pub async fn prepare(&self, query: &str) -> PreparedPrompt {
        let extraction = self.extractor.extract(query);
        info!(
            intent = %extraction.intent,
            entities = ?extraction.entities,
            "Query classified"
        );
        metrics::record_chat(extraction.intent.as_str(), self.surface);

        let context = self
            .resolver
            .resolve(extraction.intent, &extraction.entities)
            .await;
        debug!(context_len = context.len(), context = %context, "Context resolved");
        let prompt = self.composer.compose(extraction.intent, &context, query);

        PreparedPrompt {
            intent: extraction.intent,
            entities: extraction.entities,
            context,
            prompt,
        }
    }

    /// Answer in one piece; provider failures become an apology
    pub async fn answer(&self, query: &str) -> String {
        let prepared = self.prepare(query).await;

        let started = Instant::now();
        let result = self.generator.generate(&prepared.prompt).await;
        metrics::record_generation(started.elapsed().as_secs_f64(), "blocking", result.is_ok());

        result.unwrap_or_else(|e| {
            error!(error = %e, model = self.generator.model_name(), "Generation failed");
            TECHNICAL_APOLOGY.to_string()
        })
    }

    /// Answer as a stream of envelopes, ending with at most one error
    pub async fn answer_stream(&self, query: &str) -> EnvelopeStream {
        let prepared = self.prepare(query).await;

        let started = Instant::now();
        let fragments = match self.generator.generate_stream(&prepared.prompt).await {
            Ok(fragments) => fragments,
            Err(e) => {
                error!(error = %e, model = self.generator.model_name(), "Generation stream failed to start");
                metrics::record_generation(started.elapsed().as_secs_f64(), "stream", false);
                return failed_stream(&e);
            }
        };

        let failed = Arc::new(AtomicBool::new(false));
        let seen = failed.clone();
        into_envelopes(fragments)
            .inspect(move |envelope| {
                if envelope.is_error() {
                    seen.store(true, Ordering::Relaxed);
                }
            })
            .map(Some)
            .chain(stream::once(async move {
                let success = !failed.load(Ordering::Relaxed);
                metrics::record_generation(started.elapsed().as_secs_f64(), "stream", success);
                None
            }))
            .filter_map(future::ready)
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EntityKey, PERSONA_GENERIC, PERSONA_SALES};
    use crate::db::models::DeviceStatus;
    use crate::db::MemoryCatalog;
    use crate::llm::{Envelope, ScriptedGenerator, STREAM_FAILURE_PREFIX};

    fn catalog() -> Arc<MemoryCatalog> {
        Arc::new(
            MemoryCatalog::new()
                .with_product("Laptop A", 15_000_000.0, 50, None)
                .with_device("OLT-BDG-001", DeviceStatus::Online, "Bandung", "2025-05-25 09:00:00"),
        )
    }

    fn pipeline(catalog: Arc<MemoryCatalog>, generator: Arc<ScriptedGenerator>) -> ChatPipeline {
        ChatPipeline::new(catalog, generator)
    }

    #[tokio::test]
    async fn test_unknown_intent_uses_generic_persona_without_context() {
        let catalog = catalog();
        let chat = pipeline(catalog.clone(), Arc::new(ScriptedGenerator::new(["Halo!"])));

        let prepared = chat.prepare("Selamat pagi").await;

        assert_eq!(prepared.intent, Intent::Unknown);
        assert!(prepared.entities.is_empty());
        assert!(prepared.context.is_empty());
        assert!(prepared.prompt.starts_with(PERSONA_GENERIC));
        assert!(!prepared.prompt.contains("Konteks:"));
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn test_prepare_price_question() {
        let chat = pipeline(catalog(), Arc::new(ScriptedGenerator::new(["ok"])));

        let prepared = chat.prepare("Berapa harga laptop A?").await;

        assert_eq!(prepared.intent, Intent::GetProductPrice);
        assert_eq!(prepared.entities.get(EntityKey::ProductName), Some("A"));
        assert!(prepared.context.contains("Laptop A"));
        assert!(prepared.prompt.starts_with(PERSONA_SALES));
        assert!(prepared.prompt.contains("Pertanyaan Pengguna: Berapa harga laptop A?"));
    }

    #[tokio::test]
    async fn test_answer_sends_composed_prompt() {
        let generator = Arc::new(ScriptedGenerator::new(["OLT-BDG-001 ", "sedang Online."]));
        let chat = pipeline(catalog(), generator.clone());

        let answer = chat.answer("cek status olt-bdg-001").await;

        assert_eq!(answer, "OLT-BDG-001 sedang Online.");
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("Konteks: Status perangkat OLT-BDG-001: Saat ini Online di Bandung."));
    }

    #[tokio::test]
    async fn test_answer_failure_apologizes() {
        let chat = pipeline(catalog(), Arc::new(ScriptedGenerator::unavailable("quota exceeded")));

        assert_eq!(chat.answer("halo").await, TECHNICAL_APOLOGY);
    }

    #[tokio::test]
    async fn test_answer_stream_envelopes() {
        let chat = pipeline(catalog(), Arc::new(ScriptedGenerator::new(["Hal", "o!"])));

        let body: String = chat
            .answer_stream("halo")
            .await
            .map(|envelope| envelope.to_ndjson_line())
            .collect()
            .await;

        assert_eq!(body, "{\"text\":\"Hal\"}\n{\"text\":\"o!\"}\n");
    }

    #[tokio::test]
    async fn test_answer_stream_start_failure() {
        let chat = pipeline(catalog(), Arc::new(ScriptedGenerator::unavailable("down")));

        let envelopes: Vec<Envelope> = chat.answer_stream("halo").await.collect().await;

        assert_eq!(
            envelopes,
            vec![Envelope::Error(format!("{}Generation error: down", STREAM_FAILURE_PREFIX))]
        );
    }

    #[tokio::test]
    async fn test_answer_stream_mid_failure_keeps_sent_text() {
        let generator = ScriptedGenerator::new(["Hal"]).failing_after("reset");
        let chat = pipeline(catalog(), Arc::new(generator));

        let envelopes: Vec<Envelope> = chat.answer_stream("halo").await.collect().await;

        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0], Envelope::Text("Hal".into()));
        assert!(envelopes[1].is_error());
    }
}
