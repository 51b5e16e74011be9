use crate::domain::analysis::{
    Analysis, AnalystPerspective, ConfidenceMetrics, Persona, PricePoint, RiskFactor,
    JUDGE_PERSONA, NEWS_PERSONA, QUANT_PERSONA,
};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_RECOMMENDATION: &str = "HOLD";

// Tolerant mirror of the model's JSON. Cosmetic fields default when absent;
// the numeric price, the risk token and the three analyst objects must exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysis {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub company_name: String,
    pub current_price: f64,
    pub risk_factor: String,
    #[serde(default)]
    pub summary_verdict: String,
    #[serde(default)]
    pub confidence_metrics: LlmConfidenceMetrics,
    #[serde(default, rename = "weeklyPredictedPriceData")]
    pub tactical_series: Vec<PricePoint>,
    #[serde(default, rename = "predictedPriceData")]
    pub strategic_series: Vec<PricePoint>,
    pub quant_analyst: LlmAnalystPerspective,
    pub news_analyst: LlmAnalystPerspective,
    pub judge_analyst: LlmAnalystPerspective,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfidenceMetrics {
    pub data_robustness: f64,
    pub sentiment_signal: f64,
    pub forecast_reliability: f64,
    pub buy_confidence: f64,
    pub hold_confidence: f64,
    pub sell_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalystPerspective {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub key_metrics: Vec<String>,
}

impl LlmAnalysis {
    pub fn validate_and_into_analysis(self, requested_symbol: &str) -> anyhow::Result<Analysis> {
        // The model sometimes answers with an exchange-qualified ticker; keep
        // its non-empty answer, otherwise fall back to what was asked for.
        let mut symbol = self.symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            symbol = requested_symbol.trim().to_ascii_uppercase();
        }
        ensure!(!symbol.is_empty(), "resolved symbol must be non-empty");

        let risk_factor = RiskFactor::parse(&self.risk_factor)
            .with_context(|| format!("unrecognized riskFactor token: {:?}", self.risk_factor))?;

        let company_name = non_empty_or(self.company_name, &symbol);

        Ok(Analysis {
            company_name,
            current_price: self.current_price,
            risk_factor,
            summary_verdict: self.summary_verdict.trim().to_string(),
            confidence_metrics: self.confidence_metrics.into_metrics(),
            tactical_series: self.tactical_series,
            strategic_series: self.strategic_series,
            quant_analyst: self.quant_analyst.into_perspective(QUANT_PERSONA),
            news_analyst: self.news_analyst.into_perspective(NEWS_PERSONA),
            judge_analyst: self.judge_analyst.into_perspective(JUDGE_PERSONA),
            sources: Vec::new(),
            symbol,
        })
    }
}

impl LlmConfidenceMetrics {
    // Values pass through untouched, fractional or not. Scaling to whole
    // percents is a display concern (see domain::verdict::display_percent).
    fn into_metrics(self) -> ConfidenceMetrics {
        ConfidenceMetrics {
            data_robustness: self.data_robustness,
            sentiment_signal: self.sentiment_signal,
            forecast_reliability: self.forecast_reliability,
            buy_confidence: self.buy_confidence,
            hold_confidence: self.hold_confidence,
            sell_confidence: self.sell_confidence,
        }
    }
}

impl LlmAnalystPerspective {
    fn into_perspective(self, persona: Persona) -> AnalystPerspective {
        let recommendation = self.recommendation.trim().to_string();
        AnalystPerspective {
            name: non_empty_or(self.name, persona.name),
            title: non_empty_or(self.title, persona.title),
            recommendation: if recommendation.is_empty() {
                DEFAULT_RECOMMENDATION.to_string()
            } else {
                recommendation
            },
            rationale: self.rationale.trim().to_string(),
            key_metrics: self
                .key_metrics
                .into_iter()
                .map(|metric| metric.trim().to_string())
                .filter(|metric| !metric.is_empty())
                .collect(),
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_payload() -> serde_json::Value {
        json!({
            "symbol": "MSFT",
            "companyName": "Microsoft Corporation",
            "currentPrice": 425.22,
            "riskFactor": "MEDIUM",
            "summaryVerdict": "Cloud momentum intact.",
            "confidenceMetrics": {
                "dataRobustness": 92,
                "sentimentSignal": 74,
                "forecastReliability": 68,
                "buyConfidence": 85.4,
                "holdConfidence": 10,
                "sellConfidence": 4.6
            },
            "weeklyPredictedPriceData": [
                { "date": "2024-03-05", "price": 427.0 },
                { "date": "2024-03-06", "price": 429.5 }
            ],
            "predictedPriceData": [
                { "date": "2024-03-12", "price": 431.0 }
            ],
            "quantAnalyst": {
                "name": "MARK",
                "title": "CHIEF QUANTITATIVE STRATEGIST",
                "recommendation": "BUY",
                "rationale": "Momentum is positive.",
                "keyMetrics": ["RSI 61", "", " 50DMA > 200DMA "]
            },
            "newsAnalyst": {
                "name": "",
                "title": "",
                "recommendation": "",
                "rationale": "  Coverage skews bullish. ",
                "keyMetrics": []
            },
            "judgeAnalyst": {
                "name": "BOSE",
                "title": "EQUITYECHO CHIEF JUSTICE",
                "recommendation": "ACCUMULATE",
                "rationale": "Weighing both sides. FINAL DECREE: BUY. RISK PROFILE: MEDIUM.",
                "keyMetrics": ["Consensus PT $470"]
            }
        })
    }

    #[test]
    fn validates_full_payload() {
        let contract: LlmAnalysis = serde_json::from_value(minimal_payload()).unwrap();
        let analysis = contract.validate_and_into_analysis("msft").unwrap();

        assert_eq!(analysis.symbol, "MSFT");
        assert_eq!(analysis.risk_factor, RiskFactor::Medium);
        assert_eq!(analysis.confidence_metrics.buy_confidence, 85.4);
        assert_eq!(analysis.tactical_series.len(), 2);
        assert_eq!(analysis.strategic_series.len(), 1);
        assert!(analysis.sources.is_empty());
        // Blank metric entries are dropped, survivors trimmed.
        assert_eq!(
            analysis.quant_analyst.key_metrics,
            vec!["RSI 61".to_string(), "50DMA > 200DMA".to_string()]
        );
    }

    #[test]
    fn blank_analyst_fields_fall_back_to_persona_and_hold() {
        let contract: LlmAnalysis = serde_json::from_value(minimal_payload()).unwrap();
        let analysis = contract.validate_and_into_analysis("MSFT").unwrap();

        assert_eq!(analysis.news_analyst.name, "ANNA");
        assert_eq!(analysis.news_analyst.title, "GLOBAL MARKET INTELLIGENCE LEAD");
        assert_eq!(analysis.news_analyst.recommendation, "HOLD");
        assert_eq!(analysis.news_analyst.rationale, "Coverage skews bullish.");
    }

    #[test]
    fn empty_symbol_resolves_to_requested() {
        let mut payload = minimal_payload();
        payload["symbol"] = json!("  ");
        let contract: LlmAnalysis = serde_json::from_value(payload).unwrap();
        let analysis = contract.validate_and_into_analysis("nvda").unwrap();
        assert_eq!(analysis.symbol, "NVDA");
    }

    #[test]
    fn unknown_risk_token_is_rejected() {
        let mut payload = minimal_payload();
        payload["riskFactor"] = json!("SEVERE");
        let contract: LlmAnalysis = serde_json::from_value(payload).unwrap();
        let err = contract.validate_and_into_analysis("MSFT").unwrap_err();
        assert!(err.to_string().contains("riskFactor"));
    }

    #[test]
    fn missing_confidence_metrics_default_to_zero() {
        let mut payload = minimal_payload();
        payload.as_object_mut().unwrap().remove("confidenceMetrics");
        let contract: LlmAnalysis = serde_json::from_value(payload).unwrap();
        let analysis = contract.validate_and_into_analysis("MSFT").unwrap();
        assert_eq!(analysis.confidence_metrics.buy_confidence, 0.0);
        assert_eq!(analysis.confidence_metrics.data_robustness, 0.0);
    }

    #[test]
    fn missing_price_fails_deserialization() {
        let mut payload = minimal_payload();
        payload.as_object_mut().unwrap().remove("currentPrice");
        assert!(serde_json::from_value::<LlmAnalysis>(payload).is_err());
    }

    #[test]
    fn blank_company_name_falls_back_to_symbol() {
        let mut payload = minimal_payload();
        payload["companyName"] = json!("");
        let contract: LlmAnalysis = serde_json::from_value(payload).unwrap();
        let analysis = contract.validate_and_into_analysis("MSFT").unwrap();
        assert_eq!(analysis.company_name, "MSFT");
    }

    #[test]
    fn points_without_dates_deserialize() {
        let mut payload = minimal_payload();
        payload["weeklyPredictedPriceData"] = json!([{ "price": 430.0 }]);
        let contract: LlmAnalysis = serde_json::from_value(payload).unwrap();
        let analysis = contract.validate_and_into_analysis("MSFT").unwrap();
        assert_eq!(analysis.tactical_series[0].date, None);
        assert_eq!(analysis.tactical_series[0].price, 430.0);
    }
}
