//! Domain types for query metrics, periods and summary rows

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Metrics recorded per query digest sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Metric {
    #[default]
    QueryTimeSum,
    QueryTimeMax,
    TsCnt,
    RowsSentSum,
    RowsExaminedSum,
}

impl Metric {
    /// All supported metrics, in selector order. The first one is the default.
    pub const ALL: [Metric; 5] = [
        Metric::QueryTimeSum,
        Metric::QueryTimeMax,
        Metric::TsCnt,
        Metric::RowsSentSum,
        Metric::RowsExaminedSum,
    ];

    /// Wire token, used both in the location and in backend records
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::QueryTimeSum => "Query_time_sum",
            Metric::QueryTimeMax => "Query_time_max",
            Metric::TsCnt => "ts_cnt",
            Metric::RowsSentSum => "Rows_sent_sum",
            Metric::RowsExaminedSum => "Rows_examined_sum",
        }
    }

    /// Parse a wire token; unknown tokens yield `None`
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == token)
    }

    /// Display label for selectors and the y axis
    pub fn label(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Relative look-back window, applied per series against its own latest sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
    OneDay,
    TwoDays,
    OneWeek,
    TwoWeeks,
    ThirtyDays,
    SixtyDays,
    #[default]
    All,
}

impl Period {
    /// All periods, in selector order
    pub const ALL: [Period; 13] = [
        Period::FifteenMinutes,
        Period::ThirtyMinutes,
        Period::OneHour,
        Period::ThreeHours,
        Period::SixHours,
        Period::TwelveHours,
        Period::OneDay,
        Period::TwoDays,
        Period::OneWeek,
        Period::TwoWeeks,
        Period::ThirtyDays,
        Period::SixtyDays,
        Period::All,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::FifteenMinutes => "15min",
            Period::ThirtyMinutes => "30min",
            Period::OneHour => "1h",
            Period::ThreeHours => "3h",
            Period::SixHours => "6h",
            Period::TwelveHours => "12h",
            Period::OneDay => "1d",
            Period::TwoDays => "2d",
            Period::OneWeek => "1w",
            Period::TwoWeeks => "2w",
            Period::ThirtyDays => "30days",
            Period::SixtyDays => "60days",
            Period::All => "all",
        }
    }

    /// Parse a wire token; unknown tokens yield `None`
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == token)
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::FifteenMinutes => "15 minutes",
            Period::ThirtyMinutes => "30 minutes",
            Period::OneHour => "1 hour",
            Period::ThreeHours => "3 hours",
            Period::SixHours => "6 hours",
            Period::TwelveHours => "12 hours",
            Period::OneDay => "1 day",
            Period::TwoDays => "2 days",
            Period::OneWeek => "1 week",
            Period::TwoWeeks => "2 weeks",
            Period::ThirtyDays => "30 days",
            Period::SixtyDays => "60 days",
            Period::All => "All time",
        }
    }

    /// Window length in milliseconds; `None` means no filtering
    pub fn duration_ms(self) -> Option<i64> {
        match self {
            Period::FifteenMinutes => Some(15 * MINUTE_MS),
            Period::ThirtyMinutes => Some(30 * MINUTE_MS),
            Period::OneHour => Some(HOUR_MS),
            Period::ThreeHours => Some(3 * HOUR_MS),
            Period::SixHours => Some(6 * HOUR_MS),
            Period::TwelveHours => Some(12 * HOUR_MS),
            Period::OneDay => Some(DAY_MS),
            Period::TwoDays => Some(2 * DAY_MS),
            Period::OneWeek => Some(7 * DAY_MS),
            Period::TwoWeeks => Some(14 * DAY_MS),
            Period::ThirtyDays => Some(30 * DAY_MS),
            Period::SixtyDays => Some(60 * DAY_MS),
            Period::All => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute `[min, max]` window in epoch milliseconds, inclusive on both ends
///
/// Bounds are floats because chart scales report fractional positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    /// Create a range from two finite bounds, swapping them if reversed
    pub fn new(a: f64, b: f64) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Some(Self { min, max })
    }
}

/// One time-bucketed sample of a query digest
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Series key (digest checksum); `None` when the backend omitted it
    pub series_key: Option<String>,
    /// Bucket start in epoch milliseconds
    pub timestamp: i64,
    pub values: BTreeMap<Metric, f64>,
    pub sample_text: String,
}

impl MetricSample {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    /// The series key if it is usable for grouping
    pub fn key(&self) -> Option<&str> {
        self.series_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Per-series aggregate row from the summary endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub series_key: String,
    pub sample_text: String,
    pub aggregates: BTreeMap<Metric, f64>,
    /// Number of queries aggregated into this row (`ts_cnt`)
    pub count: u64,
}

impl SummaryRow {
    pub fn aggregate(&self, metric: Metric) -> Option<f64> {
        self.aggregates.get(&metric).copied()
    }
}

/// Parse a backend timestamp into epoch milliseconds
///
/// Accepts RFC 3339, RFC 2822 / HTTP dates (`Mon, 28 Jul 2025 12:34:56 GMT`),
/// naive `YYYY-MM-DD HH:MM:SS` (read as UTC) and plain epoch milliseconds.
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(ms) = raw.parse::<i64>() {
        return checked_millis(ms);
    }

    Err(Error::InvalidTimestamp(raw.to_string()))
}

/// Epoch milliseconds, if they fall inside the representable date range
pub fn checked_millis(ms: i64) -> Result<i64> {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(_) => Ok(ms),
        None => Err(Error::InvalidTimestamp(ms.to_string())),
    }
}

/// Format epoch milliseconds for axis ranges and tooltips
pub fn format_timestamp(ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y/%m/%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}
