//! Generation pipeline: prompt → completion → normalize → validate
//!
//! One invocation per request, short-circuiting on first failure. Nothing
//! persists between runs; the provider round trip is the only await point.

use crate::error::Result;
use crate::normalize::normalize;
use crate::prompts::{PromptInputs, TaskKind, build_prompt};
use crate::provider::CompletionProvider;
use crate::shape::{ValidatedDocument, validate};
use std::sync::Arc;
use tracing::debug;

pub struct GenerationPipeline {
    provider: Arc<dyn CompletionProvider>,
}

impl GenerationPipeline {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub async fn run(&self, kind: TaskKind, inputs: &PromptInputs) -> Result<ValidatedDocument> {
        let prompt = build_prompt(kind, inputs)?;
        let raw = self.provider.complete(&prompt).await?;
        debug!(
            task = kind.as_str(),
            raw_chars = raw.len(),
            "normalizing completion"
        );
        let normalized = normalize(&raw);
        let doc = validate(&normalized, kind)?;
        debug!(task = kind.as_str(), "completion validated");
        Ok(doc)
    }
}
