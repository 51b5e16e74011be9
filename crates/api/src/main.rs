use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use equityecho_core::chart::{self, ChartDataPoint, SeriesKind};
use equityecho_core::domain::analysis::{Analysis, AnalysisRequest, DocumentAttachment};
use equityecho_core::llm::error::LlmDiagnosticsError;
use equityecho_core::synthesis::SynthesisEngine;

const SYNTHESIS_FAILED_MESSAGE: &str =
    "Synthesis failed. Check ticker symbol or network connectivity.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = equityecho_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let engine = match SynthesisEngine::from_settings(&settings) {
        Ok(engine) => Some(engine),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "GEMINI_API_KEY missing; starting API in degraded mode");
            None
        }
    };

    let state = AppState {
        engine,
        latest: Arc::new(RwLock::new(None)),
        generations: Arc::new(AtomicU64::new(0)),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze", post(analyze))
        .route("/analysis/latest", get(get_latest_analysis))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // The dashboard is served from a different origin in every deploy.
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    engine: Option<SynthesisEngine>,
    latest: Arc<RwLock<Option<DashboardState>>>,
    generations: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeBody {
    symbol: String,
    #[serde(default)]
    document_base64: Option<String>,
    #[serde(default)]
    document_mime_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum DashboardState {
    Complete(AnalysisView),
    Failed(FailureNotice),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisView {
    analysis_id: Uuid,
    completed_at: DateTime<Utc>,
    analysis: Analysis,
    tactical_chart: Vec<ChartDataPoint>,
    strategic_chart: Vec<ChartDataPoint>,
}

impl AnalysisView {
    fn assemble(analysis: Analysis) -> Self {
        let tactical_chart = chart::materialize_series(
            &analysis.tactical_series,
            SeriesKind::Tactical.default_volatility(),
            SeriesKind::Tactical,
        );
        let strategic_chart = chart::materialize_series(
            &analysis.strategic_series,
            SeriesKind::Strategic.default_volatility(),
            SeriesKind::Strategic,
        );
        Self {
            analysis_id: Uuid::new_v4(),
            completed_at: Utc::now(),
            analysis,
            tactical_chart,
            strategic_chart,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureNotice {
    error: String,
    failed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

fn api_error(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeBody>,
) -> Result<Json<AnalysisView>, (StatusCode, Json<ApiError>)> {
    let Some(engine) = &state.engine else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "synthesis engine is not configured",
        ));
    };

    let request = match build_request(&body) {
        Ok(request) => request,
        Err(e) => return Err(api_error(StatusCode::BAD_REQUEST, &format!("{e:#}"))),
    };

    // Every accepted request supersedes all in-flight ones; a slow older
    // synthesis must never overwrite a newer outcome.
    let generation = state.generations.fetch_add(1, Ordering::SeqCst) + 1;

    match engine.synthesize(&request).await {
        Ok(analysis) => {
            let view = AnalysisView::assemble(analysis);
            publish_if_current(&state, generation, DashboardState::Complete(view.clone())).await;
            Ok(Json(view))
        }
        Err(e) => {
            log_synthesis_failure(&request.symbol, &e);
            publish_if_current(
                &state,
                generation,
                DashboardState::Failed(FailureNotice {
                    error: SYNTHESIS_FAILED_MESSAGE.to_string(),
                    failed_at: Utc::now(),
                }),
            )
            .await;
            Err(api_error(StatusCode::BAD_GATEWAY, SYNTHESIS_FAILED_MESSAGE))
        }
    }
}

async fn get_latest_analysis(
    State(state): State<AppState>,
) -> Result<Json<DashboardState>, StatusCode> {
    let slot = state.latest.read().await;
    slot.clone().map(Json).ok_or(StatusCode::NOT_FOUND)
}

fn build_request(body: &AnalyzeBody) -> anyhow::Result<AnalysisRequest> {
    let mut request = AnalysisRequest::new(&body.symbol)?;
    if let Some(encoded) = body.document_base64.as_deref() {
        let media_type = body
            .document_mime_type
            .clone()
            .context("documentMimeType is required when documentBase64 is present")?;
        let bytes = BASE64
            .decode(encoded.trim())
            .context("documentBase64 is not valid base64")?;
        request = request.with_document(DocumentAttachment { bytes, media_type });
    }
    Ok(request)
}

async fn publish_if_current(state: &AppState, generation: u64, outcome: DashboardState) {
    let mut slot = state.latest.write().await;
    if state.generations.load(Ordering::SeqCst) != generation {
        tracing::warn!(generation, "stale synthesis outcome discarded");
        return;
    }
    *slot = Some(outcome);
}

fn log_synthesis_failure(symbol: &str, err: &anyhow::Error) {
    sentry_anyhow::capture_anyhow(err);
    match err.downcast_ref::<LlmDiagnosticsError>() {
        Some(diagnostics) => tracing::error!(
            symbol,
            stage = diagnostics.stage,
            raw_output = diagnostics.raw_output.as_deref().unwrap_or(""),
            error = %err,
            "synthesis failed"
        ),
        None => tracing::error!(symbol, error = %format!("{err:#}"), "synthesis failed"),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &equityecho_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
