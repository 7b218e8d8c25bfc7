// Prose generation for the findings record and the monthly anomaly list
pub mod openai;
pub mod prompts;

use async_trait::async_trait;

use crate::error::EngineError;

pub use openai::OpenAiCompletions;
pub use prompts::{anomaly_overview, anomaly_prompt, findings_prompt};

// The returned text is opaque: callers display it but never parse it.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, EngineError>;
}
