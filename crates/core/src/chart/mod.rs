pub mod dates;
pub mod noise;

use crate::domain::analysis::PricePoint;
use chrono::{Local, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

const VOLUME_FLOOR: u32 = 100_000;
const VOLUME_CEIL: u32 = 600_000;

/// The two forecast horizons a dashboard renders. Each carries its own
/// display volatility and its own fallback date cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// 7 daily points starting tomorrow.
    Tactical,
    /// 4 to 6 weekly points starting next week.
    Strategic,
}

impl SeriesKind {
    pub fn default_volatility(self) -> f64 {
        match self {
            Self::Tactical => 0.02,
            Self::Strategic => 0.01,
        }
    }
}

/// A render-ready point: display label, jittered price, synthetic volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataPoint {
    pub date: String,
    pub price: f64,
    pub volume: u32,
    pub is_prediction: bool,
}

/// Turns model price points into chart points in input order: dates are
/// normalized, prices jittered then rounded to cents, volumes synthesized.
pub fn materialize_series(
    points: &[PricePoint],
    volatility: f64,
    kind: SeriesKind,
) -> Vec<ChartDataPoint> {
    materialize_series_with(
        &mut rand::thread_rng(),
        points,
        volatility,
        kind,
        Local::now().date_naive(),
    )
}

pub fn materialize_series_with<R: Rng>(
    rng: &mut R,
    points: &[PricePoint],
    volatility: f64,
    kind: SeriesKind,
    today: NaiveDate,
) -> Vec<ChartDataPoint> {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| ChartDataPoint {
            date: dates::normalize_label(point.date.as_deref(), index, kind, today),
            price: round_cents(noise::jitter_price(rng, point.price, volatility)),
            volume: rng.gen_range(VOLUME_FLOOR..VOLUME_CEIL),
            is_prediction: true,
        })
        .collect()
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
