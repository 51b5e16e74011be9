use crate::chart::SeriesKind;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

const LENIENT_FORMATS: [&str; 6] = [
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Resolves a raw model-supplied date to a calendar day. Strict `YYYY-MM-DD`
/// wins; a few lenient formats are tried next; anything else lands on the
/// per-series deterministic fallback so charts always have a full axis.
pub fn resolve_date(raw: Option<&str>, index: usize, kind: SeriesKind, today: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return fallback_date(kind, index, today);
    };
    parse_strict_ymd(raw)
        .or_else(|| parse_lenient(raw))
        .unwrap_or_else(|| fallback_date(kind, index, today))
}

/// Short display label for a chart axis, e.g. "Mar 5". Purely calendar
/// arithmetic; the host timezone never shifts a well-formed date.
pub fn normalize_label(raw: Option<&str>, index: usize, kind: SeriesKind, today: NaiveDate) -> String {
    resolve_date(raw, index, kind, today)
        .format("%b %-d")
        .to_string()
}

fn fallback_date(kind: SeriesKind, index: usize, today: NaiveDate) -> NaiveDate {
    let steps = index as i64 + 1;
    match kind {
        SeriesKind::Tactical => today + Duration::days(steps),
        SeriesKind::Strategic => today + Duration::days(steps * 7),
    }
}

// Splitting on '-' first keeps "2024-03-05" off the lenient ladder entirely.
fn parse_strict_ymd(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_lenient(raw: &str) -> Option<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(timestamp.date());
    }
    LENIENT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn strict_ymd_labels_without_timezone_shift() {
        // "2024-03-05" must label as "Mar 5" on every host timezone.
        let label = normalize_label(Some("2024-03-05"), 0, SeriesKind::Tactical, today());
        assert_eq!(label, "Mar 5");
    }

    #[test]
    fn lenient_formats_are_accepted() {
        assert_eq!(
            resolve_date(Some("2024/03/05"), 0, SeriesKind::Tactical, today()),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            resolve_date(Some("03/05/2024"), 0, SeriesKind::Tactical, today()),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            resolve_date(Some("Mar 5, 2024"), 0, SeriesKind::Tactical, today()),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            resolve_date(Some("2024-03-05T10:30:00Z"), 0, SeriesKind::Tactical, today()),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn empty_tactical_date_falls_back_per_index() {
        // Index 2 in a tactical series lands on today + 3 days.
        let resolved = resolve_date(Some(""), 2, SeriesKind::Tactical, today());
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(
            normalize_label(Some(""), 2, SeriesKind::Tactical, today()),
            "Mar 4"
        );
    }

    #[test]
    fn missing_strategic_date_falls_back_weekly() {
        let resolved = resolve_date(None, 1, SeriesKind::Strategic, today());
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn unparseable_date_falls_back() {
        let resolved = resolve_date(Some("next tuesday"), 0, SeriesKind::Tactical, today());
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn out_of_range_ymd_falls_back() {
        let resolved = resolve_date(Some("2024-13-40"), 0, SeriesKind::Tactical, today());
        assert_eq!(resolved, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }

    #[test]
    fn single_digit_day_has_no_padding() {
        let label = normalize_label(Some("2024-12-09"), 0, SeriesKind::Strategic, today());
        assert_eq!(label, "Dec 9");
    }
}
