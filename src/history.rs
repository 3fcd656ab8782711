//! History synchronizer
//!
//! Bridges the [`ViewStore`] and the navigation stack. User actions are
//! written to the stack with `push` (new entry) or `replace` (corrective
//! rewrite of the current entry). Back/forward navigation goes the other
//! way: the location is decoded and applied to the store, and nothing is
//! written back.

use tracing::{debug, info};

use crate::codec::{self, LocationState};
use crate::state::{NavWrite, Transition, ViewAction, ViewState, ViewStore};

/// A navigation stack holding location query strings
pub trait Navigator {
    /// Query string of the current entry, with or without the leading `?`
    fn current_query(&self) -> String;

    /// Add a new entry and make it current
    fn push(&mut self, query: &str);

    /// Rewrite the current entry in place
    fn replace(&mut self, query: &str);
}

/// In-memory navigation stack with browser semantics
///
/// Pushing discards any forward entries.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<String>,
    index: usize,
}

impl MemoryHistory {
    pub fn new(initial_query: &str) -> Self {
        Self {
            entries: vec![initial_query.to_string()],
            index: 0,
        }
    }

    /// Step back one entry; returns false at the start of history
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    /// Step forward one entry; returns false at the end of history
    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Navigator for MemoryHistory {
    fn current_query(&self) -> String {
        self.entries[self.index].clone()
    }

    fn push(&mut self, query: &str) {
        self.entries.truncate(self.index + 1);
        self.entries.push(query.to_string());
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, query: &str) {
        self.entries[self.index] = query.to_string();
    }
}

/// Keeps a [`ViewStore`] and a [`Navigator`] consistent
#[derive(Debug)]
pub struct HistorySync<N: Navigator> {
    navigator: N,
}

impl<N: Navigator> HistorySync<N> {
    pub fn new(navigator: N) -> Self {
        Self { navigator }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    /// Build the initial store from the current location
    ///
    /// A malformed or non-canonical location is rewritten in place with
    /// `replace`, so it never adds a history entry.
    pub fn initialize(&mut self) -> ViewStore {
        let raw = self.navigator.current_query();
        let location = codec::decode(&raw);
        let state = ViewState::from_location(&location);

        let canonical = codec::encode(&state.location());
        if raw.strip_prefix('?').unwrap_or(&raw) != canonical {
            debug!(%raw, %canonical, "canonicalising initial location");
            self.write(NavWrite::Replace, &state.location());
        }

        info!(?state, "view state initialised from location");
        ViewStore::new(state)
    }

    /// Apply a user action and record it on the navigation stack
    pub fn dispatch(&mut self, store: &mut ViewStore, action: ViewAction) -> Transition {
        let transition = store.dispatch(action);
        self.write(transition.nav, &store.state().location());
        transition
    }

    /// Apply the current location after a back/forward navigation
    ///
    /// Only reads from the navigator.
    pub fn restore(&self, store: &mut ViewStore) -> Transition {
        let location = codec::decode(&self.navigator.current_query());
        store.restore(&location)
    }

    fn write(&mut self, nav: NavWrite, location: &LocationState) {
        let query = codec::encode(location);
        match nav {
            NavWrite::Push => {
                debug!(%query, "push location");
                self.navigator.push(&query);
            }
            NavWrite::Replace => {
                debug!(%query, "replace location");
                self.navigator.replace(&query);
            }
            NavWrite::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Metric, Period, ZoomRange};
    use crate::state::{DisplayMode, Origin};

    fn zoom(min: f64, max: f64) -> ZoomRange {
        ZoomRange::new(min, max).unwrap()
    }

    #[test]
    fn test_initialize_from_canonical_location_does_not_write() {
        let mut sync = HistorySync::new(MemoryHistory::new("?metric=ts_cnt&period=1d"));
        let store = sync.initialize();
        assert_eq!(store.state().metric, Metric::TsCnt);
        assert_eq!(store.state().period, Period::OneDay);
        assert_eq!(sync.navigator().entries(), ["?metric=ts_cnt&period=1d"]);
    }

    #[test]
    fn test_initialize_replaces_malformed_location() {
        let mut sync = HistorySync::new(MemoryHistory::new("?metric=nope&zoomMin=x&zoomMax=5"));
        let store = sync.initialize();
        assert_eq!(store.state().metric, Metric::QueryTimeSum);
        assert_eq!(sync.navigator().len(), 1);
        assert_eq!(sync.navigator().current_query(), "metric=Query_time_sum&period=all");
    }

    #[test]
    fn test_user_actions_push_entries() {
        let mut sync = HistorySync::new(MemoryHistory::new(""));
        let mut store = sync.initialize();

        sync.dispatch(&mut store, ViewAction::SetPeriod(Period::OneWeek));
        sync.dispatch(&mut store, ViewAction::CommitZoom(zoom(1000.0, 2000.0)));
        sync.dispatch(&mut store, ViewAction::ToggleAggregated);

        // initial entry + period + zoom; the toggle is not navigable
        assert_eq!(sync.navigator().len(), 3);
        assert_eq!(
            sync.navigator().current_query(),
            "metric=Query_time_sum&period=1w&zoomMin=1000&zoomMax=2000"
        );
    }

    #[test]
    fn test_back_restores_without_writing() {
        let mut sync = HistorySync::new(MemoryHistory::new("metric=Query_time_sum&period=all"));
        let mut store = sync.initialize();
        sync.dispatch(&mut store, ViewAction::SetMetric(Metric::RowsSentSum));
        sync.dispatch(&mut store, ViewAction::SelectSeries("c1".to_string()));
        assert_eq!(sync.navigator().len(), 3);

        assert!(sync.navigator_mut().back());
        let t = sync.restore(&mut store);
        assert_eq!(t.origin, Origin::Restore);
        assert_eq!(t.nav, NavWrite::None);
        assert_eq!(store.state().mode, DisplayMode::ByChecksum);
        assert_eq!(store.state().metric, Metric::RowsSentSum);
        assert_eq!(sync.navigator().len(), 3);

        assert!(sync.navigator_mut().forward());
        sync.restore(&mut store);
        assert_eq!(store.state().selected_series_key(), Some("c1"));
        assert_eq!(sync.navigator().len(), 3);
    }

    #[test]
    fn test_back_to_metric_only_location_clears_zoom() {
        let mut sync = HistorySync::new(MemoryHistory::new("?metric=ts_cnt"));
        let mut store = sync.initialize();
        sync.dispatch(&mut store, ViewAction::CommitZoom(zoom(5.0, 10.0)));
        assert_eq!(store.state().zoom, Some(zoom(5.0, 10.0)));

        sync.navigator_mut().back();
        // the initial entry was canonicalised, simulate a raw metric-only entry
        sync.navigator_mut().replace("?metric=ts_cnt");
        let t = sync.restore(&mut store);
        assert!(t.refetch);
        assert_eq!(store.state().zoom, None);
        assert_eq!(store.state().metric, Metric::TsCnt);
    }

    #[test]
    fn test_push_discards_forward_entries() {
        let mut history = MemoryHistory::new("a");
        history.push("b");
        history.push("c");
        assert!(history.back());
        assert!(history.back());
        assert!(!history.back());
        history.push("d");
        assert_eq!(history.entries(), ["a", "d"]);
        assert!(!history.forward());
    }
}
