use crate::domain::analysis::RiskFactor;

pub const DECREE_TOKEN: &str = "FINAL DECREE";

/// Which way a free-text recommendation leans, for badge styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaning {
    Bullish,
    Bearish,
    Neutral,
}

impl Leaning {
    pub fn classify(recommendation: &str) -> Self {
        let upper = recommendation.to_ascii_uppercase();
        if upper.contains("BUY") || upper.contains("ACCUMULATE") {
            Self::Bullish
        } else if upper.contains("SELL") || upper.contains("REDUCE") {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Caution,
    Critical,
}

impl Tone {
    pub fn for_risk(risk: RiskFactor) -> Self {
        match risk {
            RiskFactor::Low => Self::Positive,
            RiskFactor::Medium => Self::Caution,
            RiskFactor::High | RiskFactor::Extreme => Self::Critical,
        }
    }

    pub fn for_leaning(leaning: Leaning) -> Self {
        match leaning {
            Leaning::Bullish => Self::Positive,
            Leaning::Neutral => Self::Caution,
            Leaning::Bearish => Self::Critical,
        }
    }
}

/// Splits a judge rationale at the first case-insensitive "FINAL DECREE",
/// keeping the token with the decree half. Absent token leaves the whole
/// rationale as the lead.
pub fn split_decree(rationale: &str) -> (&str, Option<&str>) {
    match find_ascii_ci(rationale, DECREE_TOKEN) {
        Some(at) => (&rationale[..at], Some(&rationale[at..])),
        None => (rationale, None),
    }
}

/// Confidence values arrive either as whole percents or 0..=1 ratios
/// depending on how literally the model took the scaling rule. Ratios are
/// scaled up; everything else is rounded as-is.
pub fn display_percent(value: f64) -> i64 {
    if value > 0.0 && value <= 1.0 {
        (value * 100.0).round() as i64
    } else {
        value.round() as i64
    }
}

// Byte-window scan; an ASCII needle can only match at char boundaries.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&at| haystack[at..at + needle.len()].eq_ignore_ascii_case(needle))
}
