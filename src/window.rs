//! Period and zoom window filtering
//!
//! The period filter is relative to each series' own latest sample, so a
//! series that went quiet a week ago still shows its last day under `1d`.
//! The zoom filter is absolute and runs on the period-filtered subset.
//! Groups are sorted, so both filters reduce to a contiguous sub-slice.

use std::collections::BTreeMap;

use crate::data::{MetricSample, Period, ZoomRange};
use crate::grouping::{Grouping, SeriesGroup};
use crate::state::ViewState;

/// Filtered samples per series key, borrowed from a [`Grouping`]
pub type FilteredGroups<'a> = BTreeMap<&'a str, &'a [MetricSample]>;

/// Period and zoom filters; either part can be disabled
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowFilter {
    /// `None` or [`Period::All`] disables the period filter
    pub period: Option<Period>,
    pub zoom: Option<ZoomRange>,
}

impl WindowFilter {
    pub fn new(period: Period, zoom: Option<ZoomRange>) -> Self {
        Self {
            period: Some(period),
            zoom,
        }
    }

    pub fn from_view(view: &ViewState) -> Self {
        Self::new(view.period, view.zoom)
    }

    /// Apply the period filter, then the zoom filter
    pub fn apply<'a>(&self, samples: &'a [MetricSample]) -> &'a [MetricSample] {
        let mut window = samples;
        if let Some(period) = self.period {
            window = filter_period(window, period);
        }
        if let Some(zoom) = &self.zoom {
            window = filter_zoom(window, zoom);
        }
        window
    }

    pub fn apply_group<'a>(&self, group: &'a SeriesGroup) -> &'a [MetricSample] {
        self.apply(group.samples())
    }
}

/// Keep samples at or after `latest - duration(period)`
///
/// `samples` must be ascending by timestamp.
pub fn filter_period(samples: &[MetricSample], period: Period) -> &[MetricSample] {
    let (Some(duration), Some(last)) = (period.duration_ms(), samples.last()) else {
        return samples;
    };
    let cutoff = last.timestamp.saturating_sub(duration);
    let start = samples.partition_point(|s| s.timestamp < cutoff);
    &samples[start..]
}

/// Keep samples inside `[zoom.min, zoom.max]`
///
/// `samples` must be ascending by timestamp.
pub fn filter_zoom<'a>(samples: &'a [MetricSample], zoom: &ZoomRange) -> &'a [MetricSample] {
    let start = samples.partition_point(|s| (s.timestamp as f64) < zoom.min);
    let end = samples.partition_point(|s| (s.timestamp as f64) <= zoom.max);
    &samples[start..end.max(start)]
}

/// Filter every group of a grouping
pub fn filter_groups<'a>(grouping: &'a Grouping, filter: &WindowFilter) -> FilteredGroups<'a> {
    grouping
        .groups()
        .map(|group| (group.key(), filter.apply_group(group)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{parse_timestamp, Metric};
    use crate::grouping::group_samples;
    use std::collections::BTreeMap;

    const HOUR: i64 = 3_600_000;
    const DAY: i64 = 24 * HOUR;

    fn make_sample(key: &str, timestamp: i64, value: f64) -> MetricSample {
        MetricSample {
            series_key: Some(key.to_string()),
            timestamp,
            values: BTreeMap::from([(Metric::QueryTimeSum, value)]),
            sample_text: String::new(),
        }
    }

    fn timestamps(samples: &[MetricSample]) -> Vec<i64> {
        samples.iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn test_period_keeps_boundary_sample() {
        let t0 = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let t1 = parse_timestamp("2024-01-02T00:00:00Z").unwrap();
        let samples = vec![make_sample("c1", t0, 5.0), make_sample("c1", t1, 7.0)];

        let filtered = filter_period(&samples, Period::OneDay);
        assert_eq!(timestamps(filtered), vec![t0, t1]);
    }

    #[test]
    fn test_period_is_suffix_relative_to_group() {
        let samples: Vec<_> = (0..10).map(|i| make_sample("a", i * HOUR, 1.0)).collect();
        let filtered = filter_period(&samples, Period::ThreeHours);
        // last = 9h, cutoff = 6h
        assert_eq!(timestamps(filtered), vec![6 * HOUR, 7 * HOUR, 8 * HOUR, 9 * HOUR]);
        assert!(!filtered.is_empty());
    }

    #[test]
    fn test_period_cutoff_is_per_group() {
        let grouping = group_samples(vec![
            make_sample("recent", 100 * DAY, 1.0),
            make_sample("recent", 100 * DAY - 2 * HOUR, 1.0),
            make_sample("sparse", 10 * DAY, 1.0),
            make_sample("sparse", 10 * DAY - 30 * 60_000, 1.0),
        ]);
        let filtered = filter_groups(&grouping, &WindowFilter::new(Period::OneHour, None));
        assert_eq!(filtered["recent"].len(), 1);
        // the sparse series keeps its own last hour despite being 90 days old
        assert_eq!(filtered["sparse"].len(), 2);
    }

    #[test]
    fn test_all_period_and_disabled_filter_keep_everything() {
        let samples: Vec<_> = (0..5).map(|i| make_sample("a", i * DAY, 1.0)).collect();
        assert_eq!(filter_period(&samples, Period::All).len(), 5);
        assert_eq!(WindowFilter::default().apply(&samples).len(), 5);
    }

    #[test]
    fn test_zoom_is_inclusive() {
        let samples: Vec<_> = (0..10).map(|i| make_sample("a", i * 10, 1.0)).collect();
        let zoom = ZoomRange::new(20.0, 50.0).unwrap();
        assert_eq!(timestamps(filter_zoom(&samples, &zoom)), vec![20, 30, 40, 50]);

        let empty = ZoomRange::new(1000.0, 2000.0).unwrap();
        assert!(filter_zoom(&samples, &empty).is_empty());
    }

    #[test]
    fn test_period_then_zoom_never_exceeds_zoom_alone() {
        let samples: Vec<_> = (0..48).map(|i| make_sample("a", i * HOUR, 1.0)).collect();
        let zooms = [
            ZoomRange::new(0.0, 47.0 * HOUR as f64).unwrap(),
            ZoomRange::new(10.0 * HOUR as f64, 30.0 * HOUR as f64).unwrap(),
            ZoomRange::new(40.0 * HOUR as f64, 100.0 * HOUR as f64).unwrap(),
        ];
        for period in [Period::OneHour, Period::TwelveHours, Period::OneDay, Period::All] {
            for zoom in zooms {
                let composed = WindowFilter::new(period, Some(zoom)).apply(&samples);
                let zoom_only = WindowFilter {
                    period: None,
                    zoom: Some(zoom),
                }
                .apply(&samples);
                assert!(composed.len() <= zoom_only.len());
            }
        }
    }

    #[test]
    fn test_period_cutoff_saturates_at_extreme_timestamps() {
        let samples = vec![
            make_sample("a", i64::MIN + 1, 1.0),
            make_sample("a", i64::MIN + 2, 2.0),
        ];
        let filtered = filter_period(&samples, Period::SixtyDays);
        assert_eq!(timestamps(filtered), vec![i64::MIN + 1, i64::MIN + 2]);
    }

    #[test]
    fn test_empty_group_stays_empty() {
        let samples: Vec<MetricSample> = Vec::new();
        let filter = WindowFilter::new(Period::OneDay, ZoomRange::new(0.0, 1.0));
        assert!(filter.apply(&samples).is_empty());
    }
}
