use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use equityecho_core::chart::{self, SeriesKind};
use equityecho_core::domain::analysis::{AnalysisRequest, DocumentAttachment};
use equityecho_core::llm::error::LlmDiagnosticsError;
use equityecho_core::synthesis::SynthesisEngine;

mod render;

const SYNTHESIS_FAILED_MESSAGE: &str =
    "Synthesis failed. Check ticker symbol or network connectivity.";

#[derive(Debug, Parser)]
#[command(
    name = "equityecho",
    about = "Web-grounded equity synthesis from the EquityEcho tribunal"
)]
struct Args {
    /// Ticker symbol to analyze, e.g. AAPL.
    symbol: String,

    /// Supporting document to weigh in (.pdf, .txt, .png, .jpg, .jpeg).
    #[arg(long)]
    document: Option<PathBuf>,

    /// Emit the dashboard payload as JSON instead of the text report.
    #[arg(long)]
    json: bool,
}

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

    let args = Args::parse();

    let mut request = AnalysisRequest::new(&args.symbol)?;
    if let Some(path) = &args.document {
        request = request.with_document(load_document(path)?);
    }

    let engine = SynthesisEngine::from_settings(&settings)?;

    let analysis = match engine.synthesize(&request).await {
        Ok(analysis) => analysis,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            if let Some(diagnostics) = err.downcast_ref::<LlmDiagnosticsError>() {
                tracing::error!(
                    symbol = %request.symbol,
                    stage = diagnostics.stage,
                    raw_output = diagnostics.raw_output.as_deref().unwrap_or(""),
                    error = %err,
                    "synthesis failed"
                );
            } else {
                tracing::error!(
                    symbol = %request.symbol,
                    error = %format!("{err:#}"),
                    "synthesis failed"
                );
            }
            bail!(SYNTHESIS_FAILED_MESSAGE);
        }
    };

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

    if args.json {
        let payload = render::DashboardPayload {
            analysis: &analysis,
            tactical_chart: &tactical_chart,
            strategic_chart: &strategic_chart,
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render::print_dashboard(&analysis, &tactical_chart, &strategic_chart);
    }

    Ok(())
}

fn load_document(path: &Path) -> anyhow::Result<DocumentAttachment> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .with_context(|| format!("{} has no file extension", path.display()))?;

    let media_type = media_type_for_extension(&extension).with_context(|| {
        format!("unsupported document type .{extension} (expected .pdf, .txt, .png, .jpg or .jpeg)")
    })?;

    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    Ok(DocumentAttachment {
        bytes,
        media_type: media_type.to_string(),
    })
}

fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
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
