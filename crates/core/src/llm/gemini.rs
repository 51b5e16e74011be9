use crate::config::Settings;
use crate::domain::analysis::{
    AnalysisRequest, GroundingSource, JUDGE_PERSONA, NEWS_PERSONA, QUANT_PERSONA,
};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{LlmClient, Provider, SynthesisOutput};
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Local, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

const JSON_MIME_TYPE: &str = "application/json";
const GROUNDING_DEFAULT_TITLE: &str = "Real-time News Scour";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    async fn generate_content(
        &self,
        req: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(&self.api_key)?);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::new(
                Provider::Gemini,
                &self.model,
                "http",
                format!("status={status}"),
            )
            .with_raw_output(text)
            .into());
        }

        serde_json::from_str::<GenerateContentResponse>(&text)
            .with_context(|| format!("failed to decode Gemini response JSON: {text}"))
    }

    fn build_request(&self, request: &AnalysisRequest) -> GenerateContentRequest {
        let mut parts = vec![Part::text(Self::task_prompt(
            request,
            Local::now().date_naive(),
        ))];
        if let Some(document) = &request.document {
            parts.push(Part::inline_data(&document.media_type, &document.bytes));
        }

        GenerateContentRequest {
            contents: vec![Content { parts }],
            system_instruction: Content {
                parts: vec![Part::text(Self::system_instruction())],
            },
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
                response_schema: Self::response_schema(),
            },
            tools: vec![Tool {
                google_search: serde_json::json!({}),
            }],
        }
    }

    fn system_instruction() -> String {
        format!(
            "You are the EquityEcho Intelligence Tribunal.\n\n\
TRIBUNAL COMPOSITION (MANDATORY NAMES):\n\
1. Quant Analyst: must be named \"{quant_name}\" with the title \"{quant_title}\".\n\
2. News Analyst: must be named \"{news_name}\" with the title \"{news_title}\".\n\
3. Judge: must be named \"{judge_name}\" with the title \"{judge_title}\".\n\n\
MANDATORY TOOL USAGE:\n\
You MUST use the googleSearch tool to pull the LATEST market data, headlines and filings before writing a single word.\n\n\
DATE FORMATTING RULES:\n\
- Every date field in predicted data MUST use the YYYY-MM-DD format strictly.\n\
- weeklyPredictedPriceData starts tomorrow and covers 7 consecutive days.\n\
- predictedPriceData starts next week and covers 4 to 6 subsequent weeks, one point per week.\n\n\
METRIC SCALING RULES:\n\
- All confidence values MUST be integers between 0 and 100.\n\n\
JUDGE'S CLOSING:\n\
{judge_name} MUST end the rationale with: \"FINAL DECREE: [BUY/SELL/HOLD]. RISK PROFILE: [LOW/MEDIUM/HIGH/EXTREME].\"\n\
The RISK PROFILE named there MUST match the riskFactor field.\n\n\
Return the response as structured JSON matching the provided schema.",
            quant_name = QUANT_PERSONA.name,
            quant_title = QUANT_PERSONA.title,
            news_name = NEWS_PERSONA.name,
            news_title = NEWS_PERSONA.title,
            judge_name = JUDGE_PERSONA.name,
            judge_title = JUDGE_PERSONA.title,
        )
    }

    fn task_prompt(request: &AnalysisRequest, today: NaiveDate) -> String {
        let document_line = if request.document.is_some() {
            "Weigh the attached document as primary evidence alongside the live web intelligence."
        } else {
            "Base the verdict purely on live web intelligence."
        };

        format!(
            "Conduct an exhaustive intelligence scour for {symbol}. Today's date is {today}.\n\
1. Search for the latest headlines, price action and analyst targets.\n\
2. Fill weeklyPredictedPriceData with the 7-day daily tactical forecast.\n\
3. Fill predictedPriceData with the 4-6 point weekly strategic forecast.\n\
{document_line}",
            symbol = request.symbol,
            today = today.format("%a %b %d %Y"),
        )
    }

    // Gemini structured-output schema; type names are uppercase in this API.
    fn response_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "symbol": { "type": "STRING" },
                "companyName": { "type": "STRING" },
                "currentPrice": { "type": "NUMBER" },
                "riskFactor": { "type": "STRING" },
                "summaryVerdict": { "type": "STRING" },
                "confidenceMetrics": {
                    "type": "OBJECT",
                    "properties": {
                        "dataRobustness": { "type": "NUMBER" },
                        "sentimentSignal": { "type": "NUMBER" },
                        "forecastReliability": { "type": "NUMBER" },
                        "buyConfidence": { "type": "NUMBER" },
                        "holdConfidence": { "type": "NUMBER" },
                        "sellConfidence": { "type": "NUMBER" }
                    },
                    "required": [
                        "dataRobustness",
                        "sentimentSignal",
                        "forecastReliability",
                        "buyConfidence",
                        "holdConfidence",
                        "sellConfidence"
                    ]
                },
                "weeklyPredictedPriceData": Self::series_schema(),
                "predictedPriceData": Self::series_schema(),
                "quantAnalyst": Self::analyst_schema(),
                "newsAnalyst": Self::analyst_schema(),
                "judgeAnalyst": Self::analyst_schema()
            },
            "required": [
                "symbol",
                "companyName",
                "currentPrice",
                "riskFactor",
                "summaryVerdict",
                "confidenceMetrics",
                "weeklyPredictedPriceData",
                "predictedPriceData",
                "quantAnalyst",
                "newsAnalyst",
                "judgeAnalyst"
            ]
        })
    }

    fn series_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "date": { "type": "STRING" },
                    "price": { "type": "NUMBER" }
                },
                "required": ["date", "price"]
            }
        })
    }

    fn analyst_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "title": { "type": "STRING" },
                "recommendation": { "type": "STRING" },
                "rationale": { "type": "STRING" },
                "keyMetrics": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": ["name", "title", "recommendation", "rationale", "keyMetrics"]
        })
    }

    fn response_text(res: &GenerateContentResponse) -> Option<String> {
        let content = res.candidates.first()?.content.as_ref()?;
        let mut out = String::new();
        for part in &content.parts {
            if let Some(text) = &part.text {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    fn grounding_sources(res: &GenerateContentResponse) -> Vec<GroundingSource> {
        let Some(candidate) = res.candidates.first() else {
            return Vec::new();
        };
        let Some(metadata) = &candidate.grounding_metadata else {
            return Vec::new();
        };
        metadata
            .grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .map(|web| GroundingSource {
                title: Some(
                    web.title
                        .clone()
                        .filter(|title| !title.is_empty())
                        .unwrap_or_else(|| GROUNDING_DEFAULT_TITLE.to_string()),
                ),
                uri: web.uri.clone(),
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> anyhow::Result<SynthesisOutput> {
        let body = self.build_request(request);
        let response = self.generate_content(&body).await?;

        let Some(text) = Self::response_text(&response) else {
            let finish_reason = response
                .candidates
                .first()
                .and_then(|candidate| candidate.finish_reason.clone());
            return Err(LlmDiagnosticsError::new(
                Provider::Gemini,
                &self.model,
                "empty_response",
                format!("no text candidate returned (finish_reason={finish_reason:?})"),
            )
            .into());
        };

        let analysis = match json::parse_analysis(&text, &request.symbol) {
            Ok(analysis) => analysis,
            Err(err) => {
                return Err(LlmDiagnosticsError::new(
                    Provider::Gemini,
                    &self.model,
                    "parse",
                    format!("{err:#}"),
                )
                .with_raw_output(text)
                .into())
            }
        };

        let grounding = Self::grounding_sources(&response);
        tracing::debug!(
            symbol = %request.symbol,
            grounding_chunks = grounding.len(),
            "Gemini synthesis parsed"
        );

        Ok(SynthesisOutput {
            analysis,
            grounding,
            raw_text: text,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
    tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline_data(media_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: media_type.to_string(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebSource>,
}

#[derive(Debug, Clone, Deserialize)]
struct WebSource {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}
