use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mandated tribunal roster. The model is instructed to use these names and
/// titles; the contract layer falls back to them when it does not.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub name: &'static str,
    pub title: &'static str,
}

pub const QUANT_PERSONA: Persona = Persona {
    name: "MARK",
    title: "CHIEF QUANTITATIVE STRATEGIST",
};

pub const NEWS_PERSONA: Persona = Persona {
    name: "ANNA",
    title: "GLOBAL MARKET INTELLIGENCE LEAD",
};

pub const JUDGE_PERSONA: Persona = Persona {
    name: "BOSE",
    title: "EQUITYECHO CHIEF JUSTICE",
};

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub document: Option<DocumentAttachment>,
}

impl AnalysisRequest {
    pub fn new(symbol: &str) -> anyhow::Result<Self> {
        let symbol = symbol.trim().to_ascii_uppercase();
        ensure!(!symbol.is_empty(), "ticker symbol must be non-empty");
        Ok(Self {
            symbol,
            document: None,
        })
    }

    pub fn with_document(mut self, document: DocumentAttachment) -> Self {
        self.document = Some(document);
        self
    }
}

/// Raw bytes of a user-supplied filing, chart screenshot or note. Encoding
/// for the wire happens at the provider boundary.
#[derive(Debug, Clone)]
pub struct DocumentAttachment {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub symbol: String,
    pub company_name: String,
    pub current_price: f64,
    pub risk_factor: RiskFactor,
    pub summary_verdict: String,
    pub confidence_metrics: ConfidenceMetrics,
    // Wire names predate the tactical/strategic split: `weeklyPredictedPriceData`
    // carries the 7-point daily path and `predictedPriceData` the weekly path.
    #[serde(rename = "weeklyPredictedPriceData")]
    pub tactical_series: Vec<PricePoint>,
    #[serde(rename = "predictedPriceData")]
    pub strategic_series: Vec<PricePoint>,
    pub quant_analyst: AnalystPerspective,
    pub news_analyst: AnalystPerspective,
    pub judge_analyst: AnalystPerspective,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystPerspective {
    pub name: String,
    pub title: String,
    pub recommendation: String,
    pub rationale: String,
    pub key_metrics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceMetrics {
    pub data_robustness: f64,
    pub sentiment_signal: f64,
    pub forecast_reliability: f64,
    pub buy_confidence: f64,
    pub hold_confidence: f64,
    pub sell_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskFactor {
    Low,
    Medium,
    High,
    Extreme,
}

impl RiskFactor {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "EXTREME" => Some(Self::Extreme),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicted point as the model emits it. The date stays a raw string
/// here; normalization happens when a chart series is materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(default)]
    pub date: Option<String>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingSource {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}
