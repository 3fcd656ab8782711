//! Chart projection
//!
//! Turns filtered series, the summary and the current display mode into a
//! render-ready dataset: one label axis of timestamps and one or more value
//! lines aligned to it.

use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::config::{AxisAlignment, DashboardConfig};
use crate::data::{format_timestamp, Metric, MetricSample, SummaryRow};
use crate::error::Result;
use crate::ranking::{aggregate_by_timestamp, RankedSeriesSet};
use crate::state::{DisplayMode, ViewState};
use crate::window::FilteredGroups;

/// Label of the single dataset in aggregated mode
pub const COMBINED_LABEL: &str = "Combined";

/// Range text shown when the axis is empty
pub const ALL_TIME_TEXT: &str = "All time";

/// One line of the chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDataset {
    pub label: String,
    pub color: String,
    /// Series plotted by this line; `None` for the combined line
    pub series_key: Option<String>,
    /// One entry per axis label; `None` where the series has no value
    pub values: Vec<Option<f64>>,
}

impl ChartDataset {
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

/// Render-ready chart data
#[derive(Debug, Clone, PartialEq)]
pub struct ChartProjection {
    /// Axis timestamps in epoch milliseconds
    pub labels: Vec<i64>,
    pub datasets: Vec<ChartDataset>,
    /// Human-readable range of the axis
    pub period_text: String,
}

impl ChartProjection {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Largest plotted value, for scaling the y axis
    pub fn max_value(&self) -> f64 {
        self.datasets
            .iter()
            .flat_map(|d| d.values.iter().flatten())
            .fold(0.0f64, |a, &b| a.max(b))
    }
}

/// Everything a projection is derived from
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInput<'a> {
    pub view: &'a ViewState,
    pub filtered: &'a FilteredGroups<'a>,
    pub summary: &'a [SummaryRow],
    pub ranked: &'a RankedSeriesSet,
}

/// Builds chart projections and series labels
pub struct Projector {
    config: DashboardConfig,
    whitespace: Regex,
}

impl Projector {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let whitespace = Regex::new(r"\s+")?;
        Ok(Self { config, whitespace })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Build the projection for the current display mode
    pub fn project(&self, input: ProjectionInput<'_>) -> ChartProjection {
        match &input.view.mode {
            DisplayMode::Drilldown { series_key } => self.drilldown(input, series_key),
            DisplayMode::Aggregated => self.aggregated(input),
            DisplayMode::ByChecksum => self.by_checksum(input),
        }
    }

    /// Legend label for a series
    ///
    /// Collapsed and truncated sample text plus a short key, or the raw key
    /// when the summary has no row for it.
    pub fn series_label(&self, key: &str, summary: &[SummaryRow]) -> String {
        match summary.iter().find(|row| row.series_key == key) {
            Some(row) => {
                let collapsed = self.collapse_whitespace(&row.sample_text);
                let text: String = collapsed.chars().take(self.config.label_sample_chars).collect();
                let short_key: String = key.chars().take(self.config.label_key_chars).collect();
                format!("{}... [{}]", text, short_key)
            }
            None => key.to_string(),
        }
    }

    fn collapse_whitespace<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.whitespace.replace_all(text, " ")
    }

    fn drilldown(&self, input: ProjectionInput<'_>, key: &str) -> ChartProjection {
        let samples = input.filtered.get(key).copied().unwrap_or_default();
        let metric = input.view.metric;

        let labels: Vec<i64> = samples.iter().map(|s| s.timestamp).collect();
        let color = match input.ranked.get(key) {
            Some(entry) => entry.color.clone(),
            None => self.config.color(0).to_string(),
        };
        let dataset = ChartDataset {
            label: self.series_label(key, input.summary),
            color,
            series_key: Some(key.to_string()),
            values: samples.iter().map(|s| s.value(metric)).collect(),
        };

        ChartProjection {
            period_text: period_text(&labels),
            labels,
            datasets: vec![dataset],
        }
    }

    fn aggregated(&self, input: ProjectionInput<'_>) -> ChartProjection {
        let sums = aggregate_by_timestamp(input.filtered, input.view.metric);
        let labels: Vec<i64> = sums.iter().map(|(ts, _)| *ts).collect();
        let dataset = ChartDataset {
            label: COMBINED_LABEL.to_string(),
            color: self.config.color(0).to_string(),
            series_key: None,
            values: sums.iter().map(|(_, sum)| Some(*sum)).collect(),
        };

        ChartProjection {
            period_text: period_text(&labels),
            labels,
            datasets: vec![dataset],
        }
    }

    fn by_checksum(&self, input: ProjectionInput<'_>) -> ChartProjection {
        let metric = input.view.metric;
        let series: Vec<(&str, &str, &[MetricSample])> = input
            .ranked
            .entries()
            .iter()
            .map(|entry| {
                let samples = input.filtered.get(entry.key.as_str()).copied().unwrap_or_default();
                (entry.key.as_str(), entry.color.as_str(), samples)
            })
            .collect();

        let labels: Vec<i64> = match self.config.axis_alignment {
            AxisAlignment::FirstSeries => series
                .iter()
                .find(|(_, _, samples)| !samples.is_empty())
                .map(|(_, _, samples)| samples.iter().map(|s| s.timestamp).collect())
                .unwrap_or_default(),
            AxisAlignment::Union => series
                .iter()
                .flat_map(|(_, _, samples)| samples.iter().map(|s| s.timestamp))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        };

        let datasets = series
            .iter()
            .map(|(key, color, samples)| {
                let values = match self.config.axis_alignment {
                    AxisAlignment::FirstSeries => positional_values(samples, labels.len(), metric),
                    AxisAlignment::Union => aligned_values(samples, &labels, metric),
                };
                ChartDataset {
                    label: self.series_label(key, input.summary),
                    color: color.to_string(),
                    series_key: Some(key.to_string()),
                    values,
                }
            })
            .collect();

        ChartProjection {
            period_text: period_text(&labels),
            labels,
            datasets,
        }
    }
}

/// The i-th sample's value against the i-th axis label
fn positional_values(samples: &[MetricSample], len: usize, metric: Metric) -> Vec<Option<f64>> {
    (0..len)
        .map(|i| samples.get(i).and_then(|s| s.value(metric)))
        .collect()
}

/// The value of the sample at each axis timestamp, if any
fn aligned_values(samples: &[MetricSample], labels: &[i64], metric: Metric) -> Vec<Option<f64>> {
    labels
        .iter()
        .map(|ts| {
            let idx = samples.partition_point(|s| s.timestamp < *ts);
            samples
                .get(idx)
                .filter(|s| s.timestamp == *ts)
                .and_then(|s| s.value(metric))
        })
        .collect()
}

/// "first ～ last" over an axis, or [`ALL_TIME_TEXT`] when it is empty
pub fn period_text(labels: &[i64]) -> String {
    match (labels.first(), labels.last()) {
        (Some(first), Some(last)) => {
            format!("{} ～ {}", format_timestamp(*first), format_timestamp(*last))
        }
        _ => ALL_TIME_TEXT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Period;
    use crate::grouping::{group_samples, Grouping};
    use crate::window::{filter_groups, WindowFilter};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn make_sample(key: &str, timestamp: i64, value: f64) -> MetricSample {
        MetricSample {
            series_key: Some(key.to_string()),
            timestamp,
            values: BTreeMap::from([(Metric::QueryTimeSum, value), (Metric::TsCnt, 1.0)]),
            sample_text: String::new(),
        }
    }

    fn make_row(key: &str, sample: &str) -> SummaryRow {
        SummaryRow {
            series_key: key.to_string(),
            sample_text: sample.to_string(),
            aggregates: BTreeMap::new(),
            count: 1,
        }
    }

    fn make_grouping() -> Grouping {
        group_samples(vec![
            make_sample("AAAAAAAAAAAA", 1_000, 1.0),
            make_sample("AAAAAAAAAAAA", 2_000, 2.0),
            make_sample("BBBBBBBBBBBB", 1_000, 10.0),
            make_sample("BBBBBBBBBBBB", 3_000, 30.0),
            make_sample("CCCCCCCCCCCC", 4_000, 400.0),
        ])
    }

    fn make_summary() -> Vec<SummaryRow> {
        vec![
            make_row("BBBBBBBBBBBB", "SELECT  *\n  FROM orders WHERE id = ?"),
            make_row("AAAAAAAAAAAA", "UPDATE users SET x = 1"),
        ]
    }

    fn project(projector: &Projector, view: &ViewState, grouping: &Grouping) -> ChartProjection {
        let summary = make_summary();
        let ranked = RankedSeriesSet::from_summary(&summary, projector.config());
        let filtered = filter_groups(grouping, &WindowFilter::from_view(view));
        projector.project(ProjectionInput {
            view,
            filtered: &filtered,
            summary: &summary,
            ranked: &ranked,
        })
    }

    fn projector(axis_alignment: AxisAlignment) -> Projector {
        Projector::new(DashboardConfig {
            axis_alignment,
            ..DashboardConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_series_label_collapses_and_truncates() {
        let projector = projector(AxisAlignment::FirstSeries);
        let label = projector.series_label("BBBBBBBBBBBB", &make_summary());
        assert_eq!(label, "SELECT * FROM orders... [BBBBBBBB]");
    }

    #[test]
    fn test_series_label_falls_back_to_key() {
        let projector = projector(AxisAlignment::FirstSeries);
        assert_eq!(projector.series_label("ZZZZ", &make_summary()), "ZZZZ");
    }

    #[test]
    fn test_drilldown_projection() {
        let projector = projector(AxisAlignment::FirstSeries);
        let view = ViewState {
            mode: DisplayMode::Drilldown {
                series_key: "AAAAAAAAAAAA".to_string(),
            },
            ..ViewState::default()
        };
        let projection = project(&projector, &view, &make_grouping());

        assert_eq!(projection.labels, vec![1_000, 2_000]);
        assert_eq!(projection.datasets.len(), 1);
        let dataset = &projection.datasets[0];
        assert_eq!(dataset.values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(dataset.label, "UPDATE users SET x =... [AAAAAAAA]");
        // second rank color
        assert_eq!(dataset.color, projector.config().color(1));
        assert_eq!(
            projection.period_text,
            "1970/01/01 00:00:01 ～ 1970/01/01 00:00:02"
        );
    }

    #[test]
    fn test_drilldown_outside_ranking() {
        let projector = projector(AxisAlignment::FirstSeries);
        let view = ViewState {
            mode: DisplayMode::Drilldown {
                series_key: "CCCCCCCCCCCC".to_string(),
            },
            ..ViewState::default()
        };
        let projection = project(&projector, &view, &make_grouping());
        let dataset = &projection.datasets[0];
        assert_eq!(dataset.label, "CCCCCCCCCCCC");
        assert_eq!(dataset.color, projector.config().color(0));
        assert_eq!(dataset.values, vec![Some(400.0)]);
    }

    #[test]
    fn test_drilldown_unknown_series_is_empty() {
        let projector = projector(AxisAlignment::FirstSeries);
        let view = ViewState {
            mode: DisplayMode::Drilldown {
                series_key: "missing".to_string(),
            },
            ..ViewState::default()
        };
        let projection = project(&projector, &view, &make_grouping());
        assert!(projection.is_empty());
        assert!(projection.datasets[0].is_empty());
        assert_eq!(projection.period_text, ALL_TIME_TEXT);
    }

    #[test]
    fn test_aggregated_projection_covers_all_series() {
        let projector = projector(AxisAlignment::FirstSeries);
        let view = ViewState {
            mode: DisplayMode::Aggregated,
            ..ViewState::default()
        };
        let projection = project(&projector, &view, &make_grouping());
        assert_eq!(projection.labels, vec![1_000, 2_000, 3_000, 4_000]);
        assert_eq!(
            projection.datasets,
            vec![ChartDataset {
                label: COMBINED_LABEL.to_string(),
                color: projector.config().color(0).to_string(),
                series_key: None,
                values: vec![Some(11.0), Some(2.0), Some(30.0), Some(400.0)],
            }]
        );
    }

    #[test]
    fn test_by_checksum_uses_first_ranked_series_axis() {
        let projector = projector(AxisAlignment::FirstSeries);
        let projection = project(&projector, &ViewState::default(), &make_grouping());

        // B is ranked first, so its timestamps form the axis
        assert_eq!(projection.labels, vec![1_000, 3_000]);
        assert_eq!(projection.datasets.len(), 2);
        assert_eq!(projection.datasets[0].series_key.as_deref(), Some("BBBBBBBBBBBB"));
        assert_eq!(projection.datasets[0].values, vec![Some(10.0), Some(30.0)]);
        // A is plotted positionally against B's axis
        assert_eq!(projection.datasets[1].values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_by_checksum_skips_empty_series_for_axis() {
        let projector = projector(AxisAlignment::FirstSeries);
        let grouping = group_samples(vec![
            make_sample("AAAAAAAAAAAA", 1_000, 1.0),
            make_sample("AAAAAAAAAAAA", 2_000, 2.0),
        ]);
        let projection = project(&projector, &ViewState::default(), &grouping);
        assert_eq!(projection.labels, vec![1_000, 2_000]);
        assert!(projection.datasets[0].is_empty());
        assert_eq!(projection.datasets[1].values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_by_checksum_union_axis() {
        let projector = projector(AxisAlignment::Union);
        let projection = project(&projector, &ViewState::default(), &make_grouping());
        assert_eq!(projection.labels, vec![1_000, 2_000, 3_000]);
        assert_eq!(projection.datasets[0].values, vec![Some(10.0), None, Some(30.0)]);
        assert_eq!(projection.datasets[1].values, vec![Some(1.0), Some(2.0), None]);
    }

    #[test]
    fn test_projection_follows_active_metric_and_period() {
        let projector = projector(AxisAlignment::FirstSeries);
        let view = ViewState {
            metric: Metric::TsCnt,
            period: Period::FifteenMinutes,
            mode: DisplayMode::Aggregated,
            ..ViewState::default()
        };
        let projection = project(&projector, &view, &make_grouping());
        // every series is within 15 minutes of its own latest sample
        assert_eq!(projection.labels, vec![1_000, 2_000, 3_000, 4_000]);
        assert_eq!(
            projection.datasets[0].values,
            vec![Some(2.0), Some(1.0), Some(1.0), Some(1.0)]
        );
    }

    #[test]
    fn test_empty_input() {
        let projector = projector(AxisAlignment::FirstSeries);
        let projection = project(&projector, &ViewState::default(), &Grouping::default());
        assert!(projection.is_empty());
        assert_eq!(projection.period_text, ALL_TIME_TEXT);
        assert_eq!(projection.max_value(), 0.0);
    }
}
