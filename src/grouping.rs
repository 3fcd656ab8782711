//! Series grouping
//!
//! Groups a flat list of samples by series key. Each group is kept in
//! ascending timestamp order, which the window filter relies on.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::data::MetricSample;

/// Samples of one series, ascending by timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    key: String,
    samples: Vec<MetricSample>,
}

impl SeriesGroup {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the most recent sample
    pub fn latest(&self) -> Option<i64> {
        self.samples.last().map(|s| s.timestamp)
    }
}

/// Result of grouping one fetched batch of samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    groups: BTreeMap<String, SeriesGroup>,
    dropped: usize,
}

impl Grouping {
    pub fn get(&self, key: &str) -> Option<&SeriesGroup> {
        self.groups.get(key)
    }

    pub fn groups(&self) -> impl Iterator<Item = &SeriesGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Samples discarded because they had no usable series key
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Group samples by series key
pub fn group_samples(samples: Vec<MetricSample>) -> Grouping {
    let mut groups: BTreeMap<String, SeriesGroup> = BTreeMap::new();
    let mut dropped = 0;

    for sample in samples {
        let Some(key) = sample.key().map(str::to_string) else {
            dropped += 1;
            continue;
        };
        groups
            .entry(key.clone())
            .or_insert_with(|| SeriesGroup {
                key,
                samples: Vec::new(),
            })
            .samples
            .push(sample);
    }

    for group in groups.values_mut() {
        let ascending = group
            .samples
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp);
        if !ascending {
            debug!(key = %group.key, "sorting out-of-order samples");
            group.samples.sort_by_key(|s| s.timestamp);
        }
    }

    if dropped > 0 {
        warn!(dropped, "dropped samples without a series key");
    }

    Grouping { groups, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_sample(key: Option<&str>, timestamp: i64) -> MetricSample {
        MetricSample {
            series_key: key.map(str::to_string),
            timestamp,
            values: BTreeMap::new(),
            sample_text: String::new(),
        }
    }

    fn timestamps(group: &SeriesGroup) -> Vec<i64> {
        group.samples().iter().map(|s| s.timestamp).collect()
    }

    #[test]
    fn test_groups_by_key() {
        let grouping = group_samples(vec![
            make_sample(Some("a"), 1),
            make_sample(Some("b"), 2),
            make_sample(Some("a"), 3),
        ]);
        assert_eq!(grouping.len(), 2);
        assert_eq!(timestamps(grouping.get("a").unwrap()), vec![1, 3]);
        assert_eq!(timestamps(grouping.get("b").unwrap()), vec![2]);
        assert_eq!(grouping.dropped(), 0);
    }

    #[test]
    fn test_sorts_out_of_order_input() {
        let grouping = group_samples(vec![
            make_sample(Some("a"), 30),
            make_sample(Some("a"), 10),
            make_sample(Some("a"), 20),
        ]);
        let group = grouping.get("a").unwrap();
        assert_eq!(timestamps(group), vec![10, 20, 30]);
        assert_eq!(group.latest(), Some(30));
    }

    #[test]
    fn test_drops_missing_keys() {
        let grouping = group_samples(vec![
            make_sample(None, 1),
            make_sample(Some(""), 2),
            make_sample(Some("a"), 3),
        ]);
        assert_eq!(grouping.len(), 1);
        assert_eq!(grouping.dropped(), 2);
    }

    #[test]
    fn test_groups_are_homogeneous() {
        let grouping = group_samples(vec![
            make_sample(Some("a"), 1),
            make_sample(Some("b"), 1),
            make_sample(Some("a"), 2),
        ]);
        for group in grouping.groups() {
            assert!(group
                .samples()
                .iter()
                .all(|s| s.series_key.as_deref() == Some(group.key())));
        }
    }
}
