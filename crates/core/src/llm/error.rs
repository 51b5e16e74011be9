use crate::llm::Provider;
use std::fmt;

/// Failure with operator-grade context attached. The raw model output rides
/// along for logs; user-facing surfaces render their own generic message.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub model: String,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl LlmDiagnosticsError {
    pub fn new(
        provider: Provider,
        model: impl Into<String>,
        stage: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn with_raw_output(mut self, raw_output: impl Into<String>) -> Self {
        self.raw_output = Some(raw_output.into());
        self
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model call failed (provider={:?}, model={}, stage={}): {}",
            self.provider, self.model, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
