//! Scripted generators for tests.

use crate::{DescriptorDraft, Generator};
use anyhow::{Result, anyhow};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::sync::Barrier;

/// A draft with a single string `input` property.
pub fn draft(name: &str, description: &str) -> DescriptorDraft {
    DescriptorDraft {
        name: name.to_owned(),
        description: description.to_owned(),
        input_schema: json!({
            "type": "object",
            "properties": { "input": { "type": "string" } },
            "required": ["input"]
        }),
    }
}

/// Extract the `Specialty:` line from a factory prompt.
pub fn specialty_of(prompt: &str) -> Option<&str> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Specialty: "))
        .map(str::trim)
}

/// Always returns the same draft.
#[derive(Clone)]
pub struct StaticGenerator(pub DescriptorDraft);

impl Generator for StaticGenerator {
    async fn generate(&self, _prompt: &str) -> Result<DescriptorDraft> {
        Ok(self.0.clone())
    }
}

/// Names the agent after the requested specialty, as a model would.
#[derive(Clone, Default)]
pub struct SpecialtyGenerator;

impl Generator for SpecialtyGenerator {
    async fn generate(&self, prompt: &str) -> Result<DescriptorDraft> {
        let specialty = specialty_of(prompt).ok_or_else(|| anyhow!("prompt has no specialty"))?;
        Ok(draft(specialty, &format!("An agent specialized as {specialty}.")))
    }
}

/// Always fails.
#[derive(Clone)]
pub struct FailingGenerator(pub &'static str);

impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<DescriptorDraft> {
        Err(anyhow!(self.0))
    }
}

/// Sleeps before delegating.
pub struct Delayed<G> {
    /// Wrapped generator.
    pub inner: G,
    /// Delay before each call.
    pub delay: Duration,
}

impl<G: Generator> Generator for Delayed<G> {
    async fn generate(&self, prompt: &str) -> Result<DescriptorDraft> {
        tokio::time::sleep(self.delay).await;
        self.inner.generate(prompt).await
    }
}

/// Waits on a shared barrier before delegating, so callers only proceed once
/// the expected number of generations are in flight at the same time.
pub struct Gated<G> {
    /// Wrapped generator.
    pub inner: G,
    /// Barrier shared by concurrent calls.
    pub barrier: Arc<Barrier>,
}

impl<G: Generator> Generator for Gated<G> {
    async fn generate(&self, prompt: &str) -> Result<DescriptorDraft> {
        self.barrier.wait().await;
        self.inner.generate(prompt).await
    }
}
