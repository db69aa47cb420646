//! Scripted generator for development and tests

use super::{FragmentStream, Generator};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replays a fixed list of fragments for every prompt
#[derive(Default)]
pub struct ScriptedGenerator {
    fragments: Vec<String>,
    fail_after_fragments: Option<String>,
    unavailable: Option<String>,
    hold_open: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Fail with `message` once the scripted fragments are exhausted
    pub fn failing_after(mut self, message: &str) -> Self {
        self.fail_after_fragments = Some(message.to_string());
        self
    }

    /// Keep streams open after the scripted fragments, like a provider that stalls
    pub fn holding_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Fail every call before any text is produced
    pub fn unavailable(message: &str) -> Self {
        Self {
            unavailable: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Number of generate calls, blocking and streaming
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt received
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|prompt| prompt.clone())
    }

    fn record(&self, prompt: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        match &self.unavailable {
            Some(message) => Err(AppError::Generation {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn failure(&self) -> Option<AppError> {
        self.fail_after_fragments
            .as_ref()
            .map(|message| AppError::Generation {
                message: message.clone(),
            })
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.record(prompt)?;
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self.fragments.concat()),
        }
    }

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.record(prompt)?;
        let items: Vec<Result<String>> = self
            .fragments
            .iter()
            .cloned()
            .map(Ok)
            .chain(self.failure().map(Err))
            .collect();
        let fragments = stream::iter(items);
        if self.hold_open {
            return Ok(fragments.chain(stream::pending()).boxed());
        }
        Ok(fragments.boxed())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
