//! Location query string codec
//!
//! Parameters (single route):
//! ```text
//! ?metric=Query_time_sum&period=1d&zoomMin=1704067200000&zoomMax=1704153600000&checksum=ABCD
//! ```
//!
//! Decoding never fails. Unknown or malformed values fall back to defaults.

use tracing::debug;
use url::form_urlencoded;

use crate::data::{Metric, Period, ZoomRange};

pub const PARAM_METRIC: &str = "metric";
pub const PARAM_PERIOD: &str = "period";
pub const PARAM_ZOOM_MIN: &str = "zoomMin";
pub const PARAM_ZOOM_MAX: &str = "zoomMax";
pub const PARAM_CHECKSUM: &str = "checksum";

/// The part of the view state that lives in the location
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationState {
    pub metric: Metric,
    pub period: Period,
    pub zoom: Option<ZoomRange>,
    /// Selected series key (drilldown)
    pub checksum: Option<String>,
}

/// Decode a location query string, with or without the leading `?`
pub fn decode(query: &str) -> LocationState {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut metric = None;
    let mut period = None;
    let mut zoom_min = None;
    let mut zoom_max = None;
    let mut checksum = None;

    // First occurrence wins, as with URLSearchParams::get
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = match &*key {
            PARAM_METRIC => &mut metric,
            PARAM_PERIOD => &mut period,
            PARAM_ZOOM_MIN => &mut zoom_min,
            PARAM_ZOOM_MAX => &mut zoom_max,
            PARAM_CHECKSUM => &mut checksum,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let metric = match metric.as_deref() {
        None | Some("") => Metric::default(),
        Some(token) => Metric::parse(token).unwrap_or_else(|| {
            debug!(token = %token, "unknown metric in location, using default");
            Metric::default()
        }),
    };

    let period = match period.as_deref() {
        None | Some("") => Period::All,
        Some(token) => Period::parse(token).unwrap_or_else(|| {
            debug!(token = %token, "unknown period in location, using all");
            Period::All
        }),
    };

    let zoom = match (zoom_min.as_deref(), zoom_max.as_deref()) {
        (Some(min), Some(max)) => {
            let range = parse_bound(min)
                .zip(parse_bound(max))
                .and_then(|(min, max)| ZoomRange::new(min, max));
            if range.is_none() {
                debug!(min = %min, max = %max, "malformed zoom bounds in location, ignoring");
            }
            range
        }
        _ => None,
    };

    let checksum = checksum.filter(|key| !key.trim().is_empty());

    LocationState {
        metric,
        period,
        zoom,
        checksum,
    }
}

/// Encode a location state as a query string (without the leading `?`)
pub fn encode(state: &LocationState) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair(PARAM_METRIC, state.metric.as_str());
    serializer.append_pair(PARAM_PERIOD, state.period.as_str());
    if let Some(zoom) = state.zoom {
        serializer.append_pair(PARAM_ZOOM_MIN, &format_bound(zoom.min));
        serializer.append_pair(PARAM_ZOOM_MAX, &format_bound(zoom.max));
    }
    if let Some(checksum) = &state.checksum {
        serializer.append_pair(PARAM_CHECKSUM, checksum);
    }
    serializer.finish()
}

fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Shortest decimal that parses back to the same value
pub fn format_bound(value: f64) -> String {
    format!("{}", value)
}
