use crate::domain::analysis::Analysis;
use crate::domain::contract::LlmAnalysis;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(fenced) = trimmed.strip_prefix("```") {
        // Markdown fences (```json ... ``` or ``` ... ```), with or without
        // a newline after the opener.
        let fenced = fenced.strip_prefix("json").unwrap_or(fenced);
        let fenced = match fenced.rfind("```") {
            Some(end) => &fenced[..end],
            None => fenced,
        };
        return Some(fenced.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_analysis(text: &str, requested_symbol: &str) -> anyhow::Result<Analysis> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmAnalysis>(&json_str)
        .with_context(|| format!("model output is not valid JSON for the analysis schema: {json_str}"))?;
    parsed.validate_and_into_analysis(requested_symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis_json() -> String {
        json!({
            "symbol": "AAPL",
            "companyName": "Apple Inc.",
            "currentPrice": 187.3,
            "riskFactor": "LOW",
            "summaryVerdict": "Services growth carries the quarter.",
            "confidenceMetrics": {
                "dataRobustness": 90,
                "sentimentSignal": 72,
                "forecastReliability": 66,
                "buyConfidence": 58,
                "holdConfidence": 30,
                "sellConfidence": 12
            },
            "weeklyPredictedPriceData": [
                { "date": "2024-03-05", "price": 188.1 }
            ],
            "predictedPriceData": [
                { "date": "2024-03-12", "price": 190.4 }
            ],
            "quantAnalyst": {
                "name": "MARK",
                "title": "CHIEF QUANTITATIVE STRATEGIST",
                "recommendation": "BUY",
                "rationale": "Breadth confirms the move.",
                "keyMetrics": ["RSI 58"]
            },
            "newsAnalyst": {
                "name": "ANNA",
                "title": "GLOBAL MARKET INTELLIGENCE LEAD",
                "recommendation": "HOLD",
                "rationale": "Headlines cut both ways.",
                "keyMetrics": []
            },
            "judgeAnalyst": {
                "name": "BOSE",
                "title": "EQUITYECHO CHIEF JUSTICE",
                "recommendation": "BUY",
                "rationale": "FINAL DECREE: BUY. RISK PROFILE: LOW.",
                "keyMetrics": []
            }
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_handles_fence_without_language_tag() {
        let fenced = "```\n{\"a\":1}\n```";
        assert_eq!(extract_json(fenced), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let text = "Here is the report you asked for: {\"a\":1} Let me know.";
        assert_eq!(extract_json(text), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn extract_json_rejects_braceless_text() {
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn parse_analysis_accepts_bare_json() {
        let analysis = parse_analysis(&analysis_json(), "AAPL").unwrap();
        assert_eq!(analysis.symbol, "AAPL");
        assert_eq!(analysis.tactical_series.len(), 1);
    }

    #[test]
    fn parse_analysis_accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", analysis_json());
        let analysis = parse_analysis(&fenced, "AAPL").unwrap();
        assert_eq!(analysis.company_name, "Apple Inc.");
    }

    #[test]
    fn parse_analysis_accepts_prose_wrapped_json() {
        let wrapped = format!("Tribunal findings follow.\n{}\nEnd of report.", analysis_json());
        let analysis = parse_analysis(&wrapped, "AAPL").unwrap();
        assert_eq!(analysis.judge_analyst.name, "BOSE");
    }

    #[test]
    fn parse_analysis_rejects_malformed_payload() {
        assert!(parse_analysis("{\"symbol\": \"AAPL\"", "AAPL").is_err());
        assert!(parse_analysis("not even close", "AAPL").is_err());
    }
}
