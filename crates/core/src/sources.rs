use crate::domain::analysis::GroundingSource;
use regex::Regex;
use std::collections::HashSet;

pub const MIN_SOURCES: usize = 3;
pub const MAX_SOURCES: usize = 5;

const URL_PATTERN: &str = r#"https?://[^\s<>"')\]]+"#;
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Merges the model's grounding attributions into a presentable source list.
/// Duplicate URIs collapse, an empty list is rebuilt from links found in the
/// raw response text, and well-known research URLs top the list up to at
/// least `MIN_SOURCES` without ever exceeding `MAX_SOURCES`. Never fails;
/// worst case the caller gets the fallback ladder alone.
pub fn reconcile_sources(
    attributions: Vec<GroundingSource>,
    raw_text: &str,
    symbol: &str,
) -> Vec<GroundingSource> {
    let attributions = if attributions.is_empty() {
        recover_links(raw_text)
    } else {
        attributions
    };

    let mut sources = dedup_by_uri(attributions);
    if sources.len() < MIN_SOURCES {
        for fallback in fallback_sources(symbol) {
            if sources.len() >= MAX_SOURCES {
                break;
            }
            let collides = sources
                .iter()
                .any(|source| source.uri.as_deref() == fallback.uri.as_deref());
            if !collides {
                sources.push(fallback);
            }
        }
    }
    sources
}

/// Research URLs any ticker can fall back to, regulatory filings first.
pub fn fallback_sources(symbol: &str) -> Vec<GroundingSource> {
    vec![
        GroundingSource {
            title: Some(format!("{symbol} - SEC EDGAR Regulatory Filings")),
            uri: Some(format!(
                "https://www.sec.gov/cgi-bin/browse-edgar?CIK={symbol}&action=getcompany"
            )),
        },
        GroundingSource {
            title: Some(format!("{symbol} - Yahoo Finance Market Data")),
            uri: Some(format!("https://finance.yahoo.com/quote/{symbol}")),
        },
        GroundingSource {
            title: Some(format!("{symbol} - Bloomberg Terminal Insights")),
            uri: Some(format!("https://www.bloomberg.com/quote/{symbol}:US")),
        },
        GroundingSource {
            title: Some(format!("{symbol} - MarketWatch Analysis")),
            uri: Some(format!(
                "https://www.marketwatch.com/investing/stock/{symbol}"
            )),
        },
    ]
}

fn dedup_by_uri(sources: Vec<GroundingSource>) -> Vec<GroundingSource> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(sources.len());
    for source in sources {
        if let Some(uri) = &source.uri {
            if !seen.insert(uri.clone()) {
                continue;
            }
        }
        unique.push(source);
    }
    unique
}

fn recover_links(text: &str) -> Vec<GroundingSource> {
    if text.is_empty() {
        return Vec::new();
    }
    let Ok(pattern) = Regex::new(URL_PATTERN) else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .map(|found| GroundingSource {
            title: None,
            uri: Some(
                found
                    .as_str()
                    .trim_end_matches(TRAILING_PUNCTUATION)
                    .to_string(),
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(uri: &str) -> GroundingSource {
        GroundingSource {
            title: Some("title".into()),
            uri: Some(uri.into()),
        }
    }

    #[test]
    fn empty_input_yields_fallback_floor_with_regulatory_domain() {
        let sources = reconcile_sources(Vec::new(), "", "AAPL");

        assert!(sources.len() >= MIN_SOURCES);
        assert!(sources.len() <= MAX_SOURCES);
        assert!(sources
            .iter()
            .any(|s| s.uri.as_deref().is_some_and(|uri| uri.contains("sec.gov"))));
        assert!(sources
            .iter()
            .all(|s| s.uri.as_deref().is_some_and(|uri| uri.contains("AAPL"))));

        let mut uris: Vec<_> = sources.iter().filter_map(|s| s.uri.clone()).collect();
        uris.sort();
        uris.dedup();
        assert_eq!(uris.len(), sources.len());
    }

    #[test]
    fn four_distinct_sources_pass_untouched() {
        let input = vec![
            source("https://a.example/1"),
            source("https://a.example/2"),
            source("https://a.example/3"),
            source("https://a.example/4"),
        ];
        let sources = reconcile_sources(input.clone(), "", "AAPL");
        assert_eq!(sources, input);
    }

    #[test]
    fn two_sources_plus_colliding_fallback_top_up_without_duplicates() {
        let input = vec![
            source("https://finance.yahoo.com/quote/AAPL"),
            source("https://a.example/news"),
        ];
        let sources = reconcile_sources(input, "", "AAPL");

        // Three of the four fallbacks fit before the cap; the Yahoo one collides.
        assert_eq!(sources.len(), MAX_SOURCES);
        let yahoo_entries = sources
            .iter()
            .filter(|s| s.uri.as_deref() == Some("https://finance.yahoo.com/quote/AAPL"))
            .count();
        assert_eq!(yahoo_entries, 1);
    }

    #[test]
    fn duplicate_uris_collapse_before_the_floor_check() {
        let input = vec![
            source("https://a.example/1"),
            source("https://a.example/1"),
            source("https://a.example/1"),
        ];
        let sources = reconcile_sources(input, "", "TSLA");
        // One survivor, then fallbacks fill the floor.
        assert!(sources.len() >= MIN_SOURCES);
        let first = sources
            .iter()
            .filter(|s| s.uri.as_deref() == Some("https://a.example/1"))
            .count();
        assert_eq!(first, 1);
    }

    #[test]
    fn links_recover_from_raw_text_when_attributions_are_empty() {
        let raw = "Per https://example.com/report, and also (https://news.example/a).";
        let sources = reconcile_sources(Vec::new(), raw, "NVDA");

        let uris: Vec<_> = sources.iter().filter_map(|s| s.uri.as_deref()).collect();
        assert!(uris.contains(&"https://example.com/report"));
        assert!(uris.contains(&"https://news.example/a"));
    }

    #[test]
    fn untitled_sources_survive_dedup() {
        let input = vec![
            GroundingSource {
                title: None,
                uri: None,
            },
            GroundingSource {
                title: None,
                uri: None,
            },
            source("https://a.example/1"),
            source("https://a.example/2"),
        ];
        let sources = reconcile_sources(input, "", "AMD");
        // Uri-less entries are never treated as duplicates of each other.
        let unlinked = sources.iter().filter(|s| s.uri.is_none()).count();
        assert_eq!(unlinked, 2);
    }

    #[test]
    fn fallback_ladder_interpolates_symbol() {
        let ladder = fallback_sources("NVDA");
        assert_eq!(ladder.len(), 4);
        assert_eq!(
            ladder[0].uri.as_deref(),
            Some("https://www.sec.gov/cgi-bin/browse-edgar?CIK=NVDA&action=getcompany")
        );
        assert!(ladder
            .iter()
            .all(|s| s.title.as_deref().is_some_and(|t| t.contains("NVDA"))));
    }
}
