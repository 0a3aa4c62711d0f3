//! Cutoff expressions
//!
//! The crawler's `interval` setting is either a relative window ending at the
//! start of the run or an absolute local date/time. Notes uploaded before the
//! resolved cutoff are stale.

use crate::ConfigError;
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// A parsed cutoff, not yet anchored to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Window ending at the run start (e.g. the last 3 days)
    Relative(Duration),
    /// Fixed local date/time
    Absolute(NaiveDateTime),
}

impl Cutoff {
    /// Anchors the cutoff to the run start time
    ///
    /// Returns `None` when the window reaches past the earliest representable
    /// date.
    pub fn resolve(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Self::Relative(window) => now.checked_sub_signed(*window),
            Self::Absolute(at) => Some(*at),
        }
    }
}

/// Parses an interval expression
///
/// # Returns
///
/// * `Ok(None)` - `all` (or empty): no cutoff, full history
/// * `Ok(Some(Cutoff))` - a relative or absolute cutoff
/// * `Err(ConfigError)` - the expression is not understood
pub fn parse_cutoff(expr: &str) -> Result<Option<Cutoff>, ConfigError> {
    let expr = expr.trim();
    let lower = expr.to_ascii_lowercase();

    let relative = match lower.as_str() {
        "" | "all" => return Ok(None),
        "1day" => Some(Duration::days(1)),
        "3day" => Some(Duration::days(3)),
        "1week" => Some(Duration::weeks(1)),
        "1month" => Some(Duration::days(30)),
        other => parse_counted_window(other),
    };
    if let Some(window) = relative {
        return Ok(Some(Cutoff::Relative(window)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(expr, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ConfigError::Validation(format!("Invalid cutoff date: {}", expr)))?;
        return Ok(Some(Cutoff::Absolute(midnight)));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(expr, format) {
            return Ok(Some(Cutoff::Absolute(at)));
        }
    }

    Err(ConfigError::Validation(format!(
        "Unrecognized interval '{}' (expected all, 1day, 3day, 1week, 1month, <N>d, <N>w or YYYY-MM-DD)",
        expr
    )))
}

/// `<N>d` / `<N>w` windows
fn parse_counted_window(expr: &str) -> Option<Duration> {
    let (idx, unit) = expr.char_indices().last()?;
    let count: i64 = expr[..idx].parse().ok()?;
    if count <= 0 {
        return None;
    }
    match unit {
        'd' => Duration::try_days(count),
        'w' => Duration::try_weeks(count),
        _ => None,
    }
}

/// Parses and anchors an interval expression in one step
///
/// An unparseable expression is logged and treated as "no cutoff" so the run
/// proceeds in full-history mode instead of aborting.
pub fn resolve_cutoff(expr: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    match parse_cutoff(expr) {
        Ok(None) => None,
        Ok(Some(cutoff)) => {
            let resolved = cutoff.resolve(now);
            if resolved.is_none() {
                tracing::error!(
                    "Interval '{}' reaches too far back; crawling without a cutoff",
                    expr
                );
            }
            resolved
        }
        Err(e) => {
            tracing::error!("{}; crawling without a cutoff", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_all_means_no_cutoff() {
        assert_eq!(parse_cutoff("all").unwrap(), None);
        assert_eq!(parse_cutoff("").unwrap(), None);
    }

    #[test]
    fn test_keyword_windows() {
        let now = at("2024-01-10 12:00:00");
        assert_eq!(
            parse_cutoff("1day").unwrap().unwrap().resolve(now).unwrap(),
            at("2024-01-09 12:00:00")
        );
        assert_eq!(
            parse_cutoff("1week").unwrap().unwrap().resolve(now).unwrap(),
            at("2024-01-03 12:00:00")
        );
        assert_eq!(
            parse_cutoff("1month").unwrap().unwrap().resolve(now).unwrap(),
            at("2023-12-11 12:00:00")
        );
    }

    #[test]
    fn test_counted_windows() {
        let now = at("2024-01-10 12:00:00");
        assert_eq!(
            parse_cutoff("5d").unwrap().unwrap().resolve(now).unwrap(),
            at("2024-01-05 12:00:00")
        );
        assert_eq!(
            parse_cutoff("2w").unwrap().unwrap().resolve(now).unwrap(),
            at("2023-12-27 12:00:00")
        );
        assert!(parse_cutoff("0d").is_err());
    }

    #[test]
    fn test_absolute_date_is_local_midnight() {
        assert_eq!(
            parse_cutoff("2024-01-10").unwrap(),
            Some(Cutoff::Absolute(at("2024-01-10 00:00:00")))
        );
        assert_eq!(
            parse_cutoff("2024-01-10 08:30").unwrap(),
            Some(Cutoff::Absolute(at("2024-01-10 08:30:00")))
        );
    }

    #[test]
    fn test_unparseable_falls_back_to_full_history() {
        assert!(parse_cutoff("2024-13-45").is_err());
        assert_eq!(resolve_cutoff("yesterday-ish", at("2024-01-10 00:00:00")), None);
    }

    #[test]
    fn test_out_of_range_window_is_rejected() {
        assert!(parse_cutoff("999999999999999d").is_err());
        assert!(parse_cutoff("999999999999999w").is_err());
        assert_eq!(resolve_cutoff("999999999999999d", at("2024-01-10 00:00:00")), None);
    }

    #[test]
    fn test_window_past_earliest_date_means_no_cutoff() {
        let now = at("2024-01-10 00:00:00");
        let cutoff = parse_cutoff("100000000d").unwrap().unwrap();
        assert_eq!(cutoff.resolve(now), None);
        assert_eq!(resolve_cutoff("100000000d", now), None);
    }
}
