//! Backend API boundary
//!
//! Endpoints:
//! - `GET /api/query_history` - every sample, oldest first
//! - `GET /api/query_summary?period=..&zoomMin=..&zoomMax=..` - one row per
//!   series, already sorted by relevance
//!
//! Records are loosely shaped (SQL decimals arrive as strings, checksums as
//! numbers or strings, timestamps as HTTP dates), so they are decoded into
//! [`QueryRecord`] with every field optional and validated here.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::codec::{format_bound, PARAM_PERIOD, PARAM_ZOOM_MAX, PARAM_ZOOM_MIN};
use crate::data::{checked_millis, parse_timestamp, Metric, MetricSample, Period, SummaryRow, ZoomRange};
use crate::error::{Error, Result};

pub const HISTORY_PATH: &str = "/api/query_history";
pub const SUMMARY_PATH: &str = "/api/query_summary";

/// One record as sent by either endpoint
///
/// Missing fields default to `None`. Metric fields missing from a record
/// are absent from the decoded sample rather than zero.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryRecord {
    pub checksum: Option<Value>,
    pub ts_min: Option<Value>,
    pub sample: Option<String>,
    #[serde(rename = "Query_time_sum")]
    pub query_time_sum: Option<Value>,
    #[serde(rename = "Query_time_max")]
    pub query_time_max: Option<Value>,
    pub ts_cnt: Option<Value>,
    #[serde(rename = "Rows_sent_sum")]
    pub rows_sent_sum: Option<Value>,
    #[serde(rename = "Rows_examined_sum")]
    pub rows_examined_sum: Option<Value>,
}

impl QueryRecord {
    fn key(&self) -> Option<String> {
        match self.checksum.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            // BIGINT checksums; keep every digit
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn field(&self, metric: Metric) -> Option<&Value> {
        match metric {
            Metric::QueryTimeSum => self.query_time_sum.as_ref(),
            Metric::QueryTimeMax => self.query_time_max.as_ref(),
            Metric::TsCnt => self.ts_cnt.as_ref(),
            Metric::RowsSentSum => self.rows_sent_sum.as_ref(),
            Metric::RowsExaminedSum => self.rows_examined_sum.as_ref(),
        }
    }

    fn values(&self) -> BTreeMap<Metric, f64> {
        Metric::ALL
            .into_iter()
            .filter_map(|metric| self.field(metric).and_then(number).map(|v| (metric, v)))
            .collect()
    }

    fn timestamp(&self) -> Result<i64> {
        match &self.ts_min {
            Some(Value::String(s)) => parse_timestamp(s),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .ok_or_else(|| Error::InvalidTimestamp(n.to_string()))
                .and_then(checked_millis),
            Some(other) => Err(Error::InvalidTimestamp(other.to_string())),
            None => Err(Error::InvalidRecord("missing ts_min".to_string())),
        }
    }

    /// Convert into a sample; the series key may still be missing
    pub fn into_sample(self) -> Result<MetricSample> {
        let timestamp = self.timestamp()?;
        Ok(MetricSample {
            series_key: self.key(),
            timestamp,
            values: self.values(),
            sample_text: self.sample.unwrap_or_default(),
        })
    }

    /// Convert into a summary row; rows need a series key
    pub fn into_summary_row(self) -> Result<SummaryRow> {
        let series_key = self
            .key()
            .ok_or_else(|| Error::InvalidRecord("summary row without checksum".to_string()))?;
        let aggregates = self.values();
        let count = aggregates
            .get(&Metric::TsCnt)
            .map(|c| c.max(0.0).round() as u64)
            .unwrap_or(0);
        Ok(SummaryRow {
            series_key,
            sample_text: self.sample.unwrap_or_default(),
            aggregates,
            count,
        })
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Decoded history response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPayload {
    pub samples: Vec<MetricSample>,
    /// Records dropped for an unreadable timestamp
    pub rejected: usize,
}

/// Decode a `/api/query_history` response body
pub fn parse_history(body: &str) -> Result<HistoryPayload> {
    let records: Vec<QueryRecord> = serde_json::from_str(body)?;
    let mut payload = HistoryPayload::default();

    for record in records {
        match record.into_sample() {
            Ok(sample) => payload.samples.push(sample),
            Err(e) => {
                debug!(error = %e, "rejecting history record");
                payload.rejected += 1;
            }
        }
    }

    if payload.rejected > 0 {
        warn!(rejected = payload.rejected, "history records without a usable timestamp");
    }
    Ok(payload)
}

/// Decode a `/api/query_summary` response body, keeping backend order
pub fn parse_summary(body: &str) -> Result<Vec<SummaryRow>> {
    let records: Vec<QueryRecord> = serde_json::from_str(body)?;
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        match record.into_summary_row() {
            Ok(row) => rows.push(row),
            Err(e) => warn!(error = %e, "skipping summary row"),
        }
    }
    Ok(rows)
}

/// Query string for the summary endpoint
///
/// `period` is omitted for [`Period::All`]; zoom bounds are sent as a pair.
pub fn summary_query(period: Period, zoom: Option<ZoomRange>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if period != Period::All {
        serializer.append_pair(PARAM_PERIOD, period.as_str());
    }
    if let Some(zoom) = zoom {
        serializer.append_pair(PARAM_ZOOM_MIN, &format_bound(zoom.min));
        serializer.append_pair(PARAM_ZOOM_MAX, &format_bound(zoom.max));
    }
    serializer.finish()
}

pub fn history_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), HISTORY_PATH)
}

pub fn summary_url(base_url: &str, period: Period, zoom: Option<ZoomRange>) -> String {
    let query = summary_query(period, zoom);
    let base = base_url.trim_end_matches('/');
    if query.is_empty() {
        format!("{}{}", base, SUMMARY_PATH)
    } else {
        format!("{}{}?{}", base, SUMMARY_PATH, query)
    }
}
