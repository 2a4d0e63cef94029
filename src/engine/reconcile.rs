use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

static WINDOW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d[\dA-Za-z/:.\- ]*?)\s+-\s+(\d[\dA-Za-z/:.\- ]*?)\s*\)")
        .expect("report window regex is valid")
});

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\[?\s*(?:(\d{1,6})\s*d\s*)?(?:(\d{1,6})\s*h\s*)?(?:(\d{1,6})\s*m\s*)?(\d{1,6})\s*s\s*\]?$",
    )
        .expect("duration regex is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

/// Start/end of the period a link report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ReportWindow {
    pub fn seconds(&self) -> u64 {
        (self.end - self.start).num_seconds().max(0) as u64
    }
}

/// First parenthesized `(start - end)` range in `text` with a positive span.
pub fn parse_report_window(text: &str) -> Option<ReportWindow> {
    WINDOW_PATTERN.captures_iter(text).find_map(|captures| {
        let start = parse_timestamp(captures.get(1)?.as_str())?;
        let end = parse_timestamp(captures.get(2)?.as_str())?;
        let window = ReportWindow { start, end };
        (window.seconds() > 0).then_some(window)
    })
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(value);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(value) = NaiveDate::parse_from_str(raw, format) {
            return value.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Seconds in a `[27d 10h 03m 17s]` style duration.
pub fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let captures = DURATION_PATTERN.captures(raw.trim())?;
    let unit = |index: usize| -> Option<u64> {
        match captures.get(index) {
            Some(value) => value.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };
    let days = unit(1)?;
    let hours = unit(2)?;
    let minutes = unit(3)?;
    let seconds = unit(4)?;
    days.checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

pub fn render_duration(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{hours:02}h {minutes:02}m {seconds:02}s")
    }
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Clamp to [0, 100] and render with at most three decimals.
pub fn render_percent(value: f64) -> String {
    let rendered = format!("{:.3}", clamp_percent(value));
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0%".to_string()
    } else {
        format!("{trimmed}%")
    }
}

/// Raw timing signals for one link, each independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkTiming {
    pub uptime_percent: Option<f64>,
    pub downtime_percent: Option<f64>,
    pub uptime_duration: Option<String>,
    pub downtime_duration: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMethod {
    BothDurations,
    UptimeDurationAndWindow,
    LiteralPercent,
    Unrecoverable,
}

impl ReconcileMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BothDurations => "both_durations",
            Self::UptimeDurationAndWindow => "uptime_duration_and_window",
            Self::LiteralPercent => "literal_percent",
            Self::Unrecoverable => "unrecoverable",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTiming {
    pub uptime_percent: f64,
    pub downtime_percent: f64,
    pub uptime_duration: String,
    pub downtime_duration: String,
    pub method: ReconcileMethod,
}

impl ReconciledTiming {
    pub fn uptime_label(&self) -> String {
        render_percent(self.uptime_percent)
    }

    pub fn downtime_label(&self) -> String {
        render_percent(self.downtime_percent)
    }
}

/// Resolve the four timing signals into one consistent pair of
/// percentages. Duration arithmetic is preferred over OCR'd percentages.
pub fn reconcile(timing: &LinkTiming, window: Option<&ReportWindow>) -> ReconciledTiming {
    let uptime_seconds = timing
        .uptime_duration
        .as_deref()
        .and_then(parse_duration_seconds);
    let downtime_seconds = timing
        .downtime_duration
        .as_deref()
        .and_then(parse_duration_seconds);
    let literal_duration = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("N/A")
            .to_string()
    };

    if let (Some(window), Some(up), Some(down)) = (window, uptime_seconds, downtime_seconds) {
        let observed = up.saturating_add(down);
        if observed > 0 && window.seconds() > 0 {
            let uptime = clamp_percent(up as f64 / observed as f64 * 100.0);
            return ReconciledTiming {
                uptime_percent: uptime,
                downtime_percent: 100.0 - uptime,
                uptime_duration: render_duration(up),
                downtime_duration: render_duration(down),
                method: ReconcileMethod::BothDurations,
            };
        }
    }

    if let (Some(window), Some(up)) = (window, uptime_seconds) {
        let span = window.seconds();
        if span > 0 {
            let uptime = clamp_percent(up as f64 / span as f64 * 100.0);
            return ReconciledTiming {
                uptime_percent: uptime,
                downtime_percent: 100.0 - uptime,
                uptime_duration: render_duration(up),
                downtime_duration: render_duration(span.saturating_sub(up)),
                method: ReconcileMethod::UptimeDurationAndWindow,
            };
        }
    }

    let (uptime, downtime) = match (timing.uptime_percent, timing.downtime_percent) {
        (Some(up), Some(down)) => (clamp_percent(up), clamp_percent(down)),
        (Some(up), None) => {
            let up = clamp_percent(up);
            (up, 100.0 - up)
        }
        (None, Some(down)) => {
            let down = clamp_percent(down);
            (100.0 - down, down)
        }
        (None, None) => {
            return ReconciledTiming {
                uptime_percent: 0.0,
                downtime_percent: 0.0,
                uptime_duration: literal_duration(&timing.uptime_duration),
                downtime_duration: literal_duration(&timing.downtime_duration),
                method: ReconcileMethod::Unrecoverable,
            };
        }
    };

    ReconciledTiming {
        uptime_percent: uptime,
        downtime_percent: downtime,
        uptime_duration: literal_duration(&timing.uptime_duration),
        downtime_duration: literal_duration(&timing.downtime_duration),
        method: ReconcileMethod::LiteralPercent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(days: i64) -> ReportWindow {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid start");
        ReportWindow {
            start,
            end: start + chrono::Duration::days(days),
        }
    }

    #[test]
    fn full_uptime_over_exact_window_is_one_hundred_percent() {
        let timing = LinkTiming {
            uptime_duration: Some("2d 00h 00m 00s".to_string()),
            ..LinkTiming::default()
        };
        let reconciled = reconcile(&timing, Some(&window(2)));
        assert_eq!(reconciled.uptime_label(), "100%");
        assert_eq!(reconciled.downtime_label(), "0%");
        assert_eq!(reconciled.downtime_duration, "00h 00m 00s");
        assert_eq!(reconciled.method, ReconcileMethod::UptimeDurationAndWindow);
    }

    #[test]
    fn durations_override_ocr_percentages() {
        let timing = LinkTiming {
            uptime_percent: Some(12.0),
            downtime_percent: Some(3.0),
            uptime_duration: Some("[27d 10h 03m 17s]".to_string()),
            downtime_duration: Some("[13h 50m 00s]".to_string()),
        };
        let reconciled = reconcile(&timing, Some(&window(28)));
        assert_eq!(reconciled.method, ReconcileMethod::BothDurations);
        assert!((reconciled.uptime_percent + reconciled.downtime_percent - 100.0).abs() < 0.001);
        assert_eq!(reconciled.uptime_label(), "97.941%");
        assert_eq!(reconciled.uptime_duration, "27d 10h 03m 17s");
    }

    #[test]
    fn single_literal_percentage_gets_its_complement() {
        let timing = LinkTiming {
            downtime_percent: Some(2.059),
            ..LinkTiming::default()
        };
        let reconciled = reconcile(&timing, None);
        assert_eq!(reconciled.uptime_label(), "97.941%");
        assert_eq!(reconciled.downtime_label(), "2.059%");
        assert_eq!(reconciled.uptime_duration, "N/A");
        assert!((reconciled.uptime_percent + reconciled.downtime_percent - 100.0).abs() < 0.001);
    }

    #[test]
    fn nothing_recoverable_defaults_to_zero() {
        let reconciled = reconcile(&LinkTiming::default(), Some(&window(1)));
        assert_eq!(reconciled.uptime_label(), "0%");
        assert_eq!(reconciled.downtime_label(), "0%");
        assert_eq!(reconciled.method, ReconcileMethod::Unrecoverable);
    }

    #[test]
    fn percentages_are_clamped() {
        assert_eq!(render_percent(104.2), "100%");
        assert_eq!(render_percent(-3.0), "0%");
        assert_eq!(render_percent(99.99951), "100%");
        assert_eq!(render_percent(12.5), "12.5%");
        assert_eq!(render_percent(f64::NAN), "0%");
    }

    #[test]
    fn report_window_accepts_common_formats() {
        let parsed =
            parse_report_window("Report (1/1/2026 12:00:00 AM - 1/3/2026 12:00:00 AM) Sensors")
                .expect("window parses");
        assert_eq!(parsed.seconds(), 2 * 86_400);

        let parsed =
            parse_report_window("(2026-01-01 00:00 - 2026-01-31 00:00)").expect("iso window");
        assert_eq!(parsed.seconds(), 30 * 86_400);

        assert!(parse_report_window("(Local Probe)").is_none());
        assert!(parse_report_window("(1/3/2026 - 1/1/2026)").is_none());
    }

    #[test]
    fn durations_parse_with_optional_units() {
        assert_eq!(parse_duration_seconds("13h 50m 00s"), Some(49_800));
        assert_eq!(parse_duration_seconds("[0s]"), Some(0));
        assert_eq!(parse_duration_seconds("1d 00h 00m 01s"), Some(86_401));
        assert_eq!(parse_duration_seconds("soon"), None);
        assert_eq!(render_duration(49_800), "13h 50m 00s");
    }

    #[test]
    fn oversized_durations_are_unrecoverable_not_fatal() {
        assert_eq!(
            parse_duration_seconds("[999999999999999d 00h 00m 00s]"),
            None
        );
        assert_eq!(parse_duration_seconds("999999d 00h 00m 00s"), Some(86_399_913_600));

        let timing = LinkTiming {
            uptime_duration: Some("[999999999999999d 00h 00m 00s]".to_string()),
            uptime_percent: Some(99.5),
            ..LinkTiming::default()
        };
        let reconciled = reconcile(&timing, Some(&window(2)));
        assert_eq!(reconciled.method, ReconcileMethod::LiteralPercent);
        assert_eq!(reconciled.uptime_label(), "99.5%");
    }
}
