//! Top-N ranking and cross-series aggregation

use std::collections::BTreeMap;

use crate::config::{DashboardConfig, MAX_RANKED};
use crate::data::{Metric, SummaryRow};
use crate::window::FilteredGroups;

/// One ranked series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSeries {
    pub key: String,
    pub rank: usize,
    pub color: String,
}

/// The first N summary rows in backend order, with colors assigned by rank
///
/// Colors belong to the rank, not to the key: a new summary payload assigns
/// them again from scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedSeriesSet {
    entries: Vec<RankedSeries>,
}

impl RankedSeriesSet {
    pub fn from_summary(summary: &[SummaryRow], config: &DashboardConfig) -> Self {
        let limit = config.top_n.min(MAX_RANKED);
        let entries = summary
            .iter()
            .take(limit)
            .enumerate()
            .map(|(rank, row)| RankedSeries {
                key: row.series_key.clone(),
                rank,
                color: config.color(rank).to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[RankedSeries] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&RankedSeries> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Key at a rank index, e.g. the dataset index of a clicked chart point
    pub fn key_at(&self, rank: usize) -> Option<&str> {
        self.entries.get(rank).map(|entry| entry.key.as_str())
    }
}

/// Sum `metric` per timestamp across all filtered series
///
/// Only series with a sample at a timestamp contribute to it. A sample
/// without a value for `metric` counts as zero. Output is ascending.
pub fn aggregate_by_timestamp(filtered: &FilteredGroups<'_>, metric: Metric) -> Vec<(i64, f64)> {
    let mut sums: BTreeMap<i64, f64> = BTreeMap::new();
    for samples in filtered.values() {
        for sample in samples.iter() {
            *sums.entry(sample.timestamp).or_insert(0.0) += sample.value(metric).unwrap_or(0.0);
        }
    }
    sums.into_iter().collect()
}
