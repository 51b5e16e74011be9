pub mod error;
pub mod gemini;
pub mod json;

use crate::domain::analysis::{Analysis, AnalysisRequest, GroundingSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

/// One synthesis round-trip: the validated report, the provider's grounding
/// attributions, and the raw text the report was parsed from.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub analysis: Analysis,
    pub grounding: Vec<GroundingSource>,
    pub raw_text: String,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_analysis(&self, request: &AnalysisRequest)
        -> anyhow::Result<SynthesisOutput>;
}
