use crate::config::Settings;
use crate::domain::analysis::{Analysis, AnalysisRequest};
use crate::llm::gemini::GeminiClient;
use crate::llm::{LlmClient, Provider};
use crate::sources;
use anyhow::ensure;
use std::sync::Arc;

/// Front door for one analysis round-trip. Prompt assembly and the wire
/// format live behind `LlmClient`; this layer owns request validation and
/// source reconciliation, and stays off the chart path so consumers shape
/// series at render time.
#[derive(Clone)]
pub struct SynthesisEngine {
    client: Arc<dyn LlmClient>,
}

impl SynthesisEngine {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::with_client(Arc::new(GeminiClient::from_settings(
            settings,
        )?)))
    }

    pub fn with_client(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn provider(&self) -> Provider {
        self.client.provider()
    }

    pub async fn synthesize(&self, request: &AnalysisRequest) -> anyhow::Result<Analysis> {
        ensure!(
            !request.symbol.trim().is_empty(),
            "ticker symbol must be non-empty"
        );

        tracing::info!(
            symbol = %request.symbol,
            provider = ?self.client.provider(),
            has_document = request.document.is_some(),
            "requesting synthesis"
        );

        let output = self.client.generate_analysis(request).await?;
        let mut analysis = output.analysis;
        analysis.sources =
            sources::reconcile_sources(output.grounding, &output.raw_text, &analysis.symbol);

        tracing::info!(
            symbol = %analysis.symbol,
            risk = %analysis.risk_factor,
            sources = analysis.sources.len(),
            "synthesis complete"
        );
        Ok(analysis)
    }
}
