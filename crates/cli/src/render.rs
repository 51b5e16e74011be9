use equityecho_core::chart::ChartDataPoint;
use equityecho_core::domain::analysis::{Analysis, AnalystPerspective};
use equityecho_core::domain::verdict::{display_percent, split_decree, Leaning, Tone};
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload<'a> {
    pub analysis: &'a Analysis,
    pub tactical_chart: &'a [ChartDataPoint],
    pub strategic_chart: &'a [ChartDataPoint],
}

const RULE: &str =
    "==============================================================================";
const BAR_CELLS: i64 = 20;

pub fn print_dashboard(
    analysis: &Analysis,
    tactical_chart: &[ChartDataPoint],
    strategic_chart: &[ChartDataPoint],
) {
    print!(
        "{}",
        render_dashboard(analysis, tactical_chart, strategic_chart)
    );
}

pub fn render_dashboard(
    analysis: &Analysis,
    tactical_chart: &[ChartDataPoint],
    strategic_chart: &[ChartDataPoint],
) -> String {
    let mut out = String::new();

    let risk_marker = tone_marker(Tone::for_risk(analysis.risk_factor));
    _ = writeln!(out, "{RULE}");
    _ = writeln!(
        out,
        "  EQUITYECHO TRIBUNAL  |  {} ({})",
        analysis.company_name, analysis.symbol
    );
    _ = writeln!(
        out,
        "  PRICE ${:.2}  |  RISK [{risk_marker}] {}",
        analysis.current_price, analysis.risk_factor
    );
    _ = writeln!(out, "{RULE}");

    if !analysis.summary_verdict.is_empty() {
        _ = writeln!(out, "\n  VERDICT: {}", analysis.summary_verdict);
    }

    let metrics = &analysis.confidence_metrics;
    _ = writeln!(out, "\n  CONFIDENCE");
    confidence_row(&mut out, "Data Robustness", metrics.data_robustness);
    confidence_row(&mut out, "Sentiment Signal", metrics.sentiment_signal);
    confidence_row(&mut out, "Forecast Reliability", metrics.forecast_reliability);
    confidence_row(&mut out, "Buy Confidence", metrics.buy_confidence);
    confidence_row(&mut out, "Hold Confidence", metrics.hold_confidence);
    confidence_row(&mut out, "Sell Confidence", metrics.sell_confidence);

    _ = writeln!(out, "\n  THE TRIBUNAL");
    analyst_block(&mut out, &analysis.quant_analyst, false);
    analyst_block(&mut out, &analysis.news_analyst, false);
    analyst_block(&mut out, &analysis.judge_analyst, true);

    if !analysis.sources.is_empty() {
        _ = writeln!(out, "\n  SOURCES");
        for (index, source) in analysis.sources.iter().enumerate() {
            let title = source.title.as_deref().unwrap_or("(untitled)");
            _ = writeln!(out, "    {}. {title}", index + 1);
            if let Some(uri) = source.uri.as_deref() {
                _ = writeln!(out, "       {uri}");
            }
        }
    }

    series_table(&mut out, "TACTICAL FORECAST (DAILY)", tactical_chart);
    series_table(&mut out, "STRATEGIC FORECAST (WEEKLY)", strategic_chart);

    out
}

fn confidence_row(out: &mut String, label: &str, value: f64) {
    let percent = display_percent(value);
    let filled = (percent.clamp(0, 100) * BAR_CELLS / 100) as usize;
    let empty = (BAR_CELLS as usize) - filled;
    _ = writeln!(
        out,
        "    {label:<22} {percent:>3}%  |{}{}|",
        "#".repeat(filled),
        "-".repeat(empty)
    );
}

fn analyst_block(out: &mut String, perspective: &AnalystPerspective, is_judge: bool) {
    let leaning = Leaning::classify(&perspective.recommendation);
    let marker = tone_marker(Tone::for_leaning(leaning));
    _ = writeln!(
        out,
        "  [{marker}] {} - {}  [{}] {}",
        perspective.name,
        perspective.title,
        leaning.as_str(),
        perspective.recommendation
    );

    if is_judge {
        let (lead, decree) = split_decree(&perspective.rationale);
        let lead = lead.trim();
        if !lead.is_empty() {
            _ = writeln!(out, "      {lead}");
        }
        if let Some(decree) = decree {
            _ = writeln!(out, "      >> {decree}");
        }
    } else if !perspective.rationale.is_empty() {
        _ = writeln!(out, "      {}", perspective.rationale);
    }

    for metric in &perspective.key_metrics {
        _ = writeln!(out, "      * {metric}");
    }
}

fn series_table(out: &mut String, heading: &str, series: &[ChartDataPoint]) {
    if series.is_empty() {
        return;
    }
    _ = writeln!(out, "\n  {heading}");
    for point in series {
        _ = writeln!(
            out,
            "    {:<8} ${:>10.2}   vol {:>7}",
            point.date, point.price, point.volume
        );
    }
}

fn tone_marker(tone: Tone) -> char {
    match tone {
        Tone::Positive => '+',
        Tone::Caution => '~',
        Tone::Critical => '!',
    }
}
