//! Dashboard session
//!
//! Event-driven orchestration of one dashboard page: user actions,
//! back/forward navigation and fetch completions come in, fetch requests
//! and derived chart data come out. The host (browser shell or test) owns
//! the actual I/O.

use tracing::{debug, info, warn};

use crate::api;
use crate::config::DashboardConfig;
use crate::data::SummaryRow;
use crate::error::{Error, Result};
use crate::fetch::{Endpoint, FetchSequencer, FetchTicket};
use crate::grouping::{group_samples, Grouping};
use crate::history::{HistorySync, Navigator};
use crate::projection::{ChartProjection, ProjectionInput, Projector};
use crate::ranking::RankedSeriesSet;
use crate::state::{DisplayMode, Transition, ViewAction, ViewState, ViewStore};
use crate::table::{summary_table, SummaryTableRow};
use crate::window::{filter_groups, WindowFilter};

/// Load status of the backend data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    /// Nothing requested yet
    #[default]
    Idle,
    Loading,
    Ready,
    /// The last fetch failed; previously loaded data is still shown
    Degraded(String),
}

/// A fetch the host should perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub url: String,
}

/// Result of a user action or a navigation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub transition: Transition,
    pub fetches: Vec<FetchRequest>,
}

/// State of one dashboard page
pub struct Session<N: Navigator> {
    projector: Projector,
    sync: HistorySync<N>,
    store: ViewStore,
    sequencer: FetchSequencer,
    grouping: Grouping,
    rejected: usize,
    summary: Vec<SummaryRow>,
    ranked: RankedSeriesSet,
    history_status: LoadStatus,
    summary_status: LoadStatus,
}

impl<N: Navigator> Session<N> {
    /// Create a session from the navigator's current location
    pub fn new(config: DashboardConfig, navigator: N) -> Result<Self> {
        config.validate()?;
        let projector = Projector::new(config)?;
        let mut sync = HistorySync::new(navigator);
        let store = sync.initialize();

        Ok(Self {
            projector,
            sync,
            store,
            sequencer: FetchSequencer::new(),
            grouping: Grouping::default(),
            rejected: 0,
            summary: Vec::new(),
            ranked: RankedSeriesSet::default(),
            history_status: LoadStatus::Idle,
            summary_status: LoadStatus::Idle,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        self.projector.config()
    }

    pub fn view(&self) -> &ViewState {
        self.store.state()
    }

    pub fn navigator(&self) -> &N {
        self.sync.navigator()
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        self.sync.navigator_mut()
    }

    pub fn summary(&self) -> &[SummaryRow] {
        &self.summary
    }

    pub fn ranked(&self) -> &RankedSeriesSet {
        &self.ranked
    }

    /// Samples dropped for a missing key or unreadable timestamp
    pub fn dropped_samples(&self) -> usize {
        self.grouping.dropped() + self.rejected
    }

    /// Combined status of both endpoints
    pub fn status(&self) -> LoadStatus {
        match (&self.history_status, &self.summary_status) {
            (LoadStatus::Degraded(msg), _) | (_, LoadStatus::Degraded(msg)) => {
                LoadStatus::Degraded(msg.clone())
            }
            (LoadStatus::Loading, _) | (_, LoadStatus::Loading) => LoadStatus::Loading,
            (LoadStatus::Ready, LoadStatus::Ready) => LoadStatus::Ready,
            (LoadStatus::Idle, LoadStatus::Idle) => LoadStatus::Idle,
            _ => LoadStatus::Loading,
        }
    }

    /// Fetches for the initial page load
    pub fn start(&mut self) -> Vec<FetchRequest> {
        self.issue_fetches()
    }

    /// Apply a user action, recording it in the navigation history
    pub fn dispatch(&mut self, action: ViewAction) -> SessionUpdate {
        let transition = self.sync.dispatch(&mut self.store, action);
        self.after(transition)
    }

    /// Apply the navigator's location after a back/forward navigation
    pub fn on_navigation(&mut self) -> SessionUpdate {
        let transition = self.sync.restore(&mut self.store);
        self.after(transition)
    }

    /// Select the series behind a clicked dataset
    ///
    /// Only by-checksum mode maps dataset indices to ranked series.
    pub fn select_dataset(&mut self, index: usize) -> Option<SessionUpdate> {
        if self.view().mode != DisplayMode::ByChecksum {
            return None;
        }
        let key = self.ranked.key_at(index)?.to_string();
        Some(self.dispatch(ViewAction::SelectSeries(key)))
    }

    /// Apply a completed fetch
    ///
    /// Returns false when the response is stale and was discarded. Failures
    /// keep the previously loaded data and only change the status.
    pub fn receive(&mut self, ticket: FetchTicket, response: Result<String>) -> bool {
        if !self.sequencer.is_current(ticket) {
            debug!(
                endpoint = %ticket.endpoint,
                seq = ticket.seq,
                latest = self.sequencer.latest(ticket.endpoint),
                "discarding stale response"
            );
            return false;
        }

        let outcome = response.and_then(|body| match ticket.endpoint {
            Endpoint::History => api::parse_history(&body).map(|payload| {
                self.rejected = payload.rejected;
                self.grouping = group_samples(payload.samples);
                info!(
                    series = self.grouping.len(),
                    dropped = self.dropped_samples(),
                    "query history loaded"
                );
            }),
            Endpoint::Summary => api::parse_summary(&body).map(|rows| {
                self.ranked = RankedSeriesSet::from_summary(&rows, self.projector.config());
                self.summary = rows;
                info!(rows = self.summary.len(), "query summary loaded");
            }),
        });

        let status = match outcome {
            Ok(()) => LoadStatus::Ready,
            Err(e) => {
                warn!(endpoint = %ticket.endpoint, error = %e, "fetch failed, keeping previous data");
                LoadStatus::Degraded(e.to_string())
            }
        };
        match ticket.endpoint {
            Endpoint::History => self.history_status = status,
            Endpoint::Summary => self.summary_status = status,
        }
        true
    }

    /// Chart data for the current view
    pub fn projection(&self) -> ChartProjection {
        let view = self.store.state();
        let filtered = filter_groups(&self.grouping, &WindowFilter::from_view(view));
        self.projector.project(ProjectionInput {
            view,
            filtered: &filtered,
            summary: &self.summary,
            ranked: &self.ranked,
        })
    }

    /// Summary table rows for the current view
    pub fn table(&self) -> Vec<SummaryTableRow> {
        summary_table(
            &self.summary,
            self.store.state(),
            &self.ranked,
            self.projector.config(),
        )
    }

    fn after(&mut self, transition: Transition) -> SessionUpdate {
        let fetches = if transition.refetch {
            self.issue_fetches()
        } else {
            Vec::new()
        };
        SessionUpdate {
            transition,
            fetches,
        }
    }

    fn issue_fetches(&mut self) -> Vec<FetchRequest> {
        let view = self.store.state().clone();
        let base = self.projector.config().api_base_url.clone();

        let history = FetchRequest {
            ticket: self.sequencer.issue(Endpoint::History),
            url: api::history_url(&base),
        };
        let summary = FetchRequest {
            ticket: self.sequencer.issue(Endpoint::Summary),
            url: api::summary_url(&base, view.period, view.zoom),
        };
        self.history_status = LoadStatus::Loading;
        self.summary_status = LoadStatus::Loading;
        vec![history, summary]
    }
}

/// Wrap a transport failure for [`Session::receive`]
pub fn backend_error(message: impl Into<String>) -> Error {
    Error::Backend(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Metric, Period, ZoomRange};
    use crate::history::MemoryHistory;
    use crate::projection::COMBINED_LABEL;
    use crate::state::NavWrite;
    use pretty_assertions::assert_eq;

    const HISTORY: &str = r#"[
        {"checksum": "AAAA1111BBBB", "ts_min": "2024-01-01 00:00:00", "Query_time_sum": 1.0},
        {"checksum": "AAAA1111BBBB", "ts_min": "2024-01-02 00:00:00", "Query_time_sum": 2.0},
        {"checksum": "CCCC2222DDDD", "ts_min": "2024-01-01 00:00:00", "Query_time_sum": 5.0},
        {"ts_min": "2024-01-01 00:00:00", "Query_time_sum": 100.0}
    ]"#;

    const SUMMARY: &str = r#"[
        {"checksum": "CCCC2222DDDD", "sample": "SELECT * FROM t", "Query_time_sum": 5.0, "ts_cnt": 2},
        {"checksum": "AAAA1111BBBB", "sample": "DELETE FROM u", "Query_time_sum": 3.0, "ts_cnt": 4}
    ]"#;

    fn make_session(query: &str) -> Session<MemoryHistory> {
        Session::new(DashboardConfig::default(), MemoryHistory::new(query)).unwrap()
    }

    fn load(session: &mut Session<MemoryHistory>) {
        for request in session.start() {
            let body = match request.ticket.endpoint {
                Endpoint::History => HISTORY,
                Endpoint::Summary => SUMMARY,
            };
            assert!(session.receive(request.ticket, Ok(body.to_string())));
        }
    }

    #[test]
    fn test_initial_load() {
        let mut session = make_session("?metric=Query_time_sum&period=all");
        assert_eq!(session.status(), LoadStatus::Idle);
        load(&mut session);

        assert_eq!(session.status(), LoadStatus::Ready);
        assert_eq!(session.dropped_samples(), 1);
        let projection = session.projection();
        assert_eq!(projection.datasets.len(), 2);
        assert_eq!(projection.datasets[0].series_key.as_deref(), Some("CCCC2222DDDD"));
    }

    #[test]
    fn test_start_requests_both_endpoints() {
        let mut session = make_session("?period=1d&zoomMin=1&zoomMax=2");
        let requests = session.start();
        let urls: Vec<_> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:5000/api/query_history",
                "http://localhost:5000/api/query_summary?period=1d&zoomMin=1&zoomMax=2",
            ]
        );
        assert_eq!(session.status(), LoadStatus::Loading);
    }

    #[test]
    fn test_stale_summary_is_discarded() {
        let mut session = make_session("");
        load(&mut session);

        let update = session.dispatch(ViewAction::SetPeriod(Period::OneDay));
        let old = update
            .fetches
            .iter()
            .find(|r| r.ticket.endpoint == Endpoint::Summary)
            .unwrap()
            .ticket;
        let update = session.dispatch(ViewAction::SetPeriod(Period::OneWeek));
        let new = update
            .fetches
            .iter()
            .find(|r| r.ticket.endpoint == Endpoint::Summary)
            .unwrap()
            .ticket;

        // the newer response lands first, the older one afterwards
        assert!(session.receive(new, Ok(r#"[{"checksum": "AAAA1111BBBB"}]"#.to_string())));
        assert!(!session.receive(old, Ok(SUMMARY.to_string())));
        assert_eq!(session.summary().len(), 1);
        assert_eq!(session.ranked().key_at(0), Some("AAAA1111BBBB"));
    }

    #[test]
    fn test_backend_failure_keeps_previous_data() {
        let mut session = make_session("");
        load(&mut session);
        let before = session.projection();
        let query_before = session.navigator().current_query();

        let update = session.dispatch(ViewAction::SetPeriod(Period::OneDay));
        for request in update.fetches {
            session.receive(request.ticket, Err(backend_error("connection refused")));
        }

        assert!(matches!(session.status(), LoadStatus::Degraded(_)));
        assert_eq!(session.summary().len(), 2);
        assert_eq!(session.view().period, Period::OneDay);
        assert_ne!(session.navigator().current_query(), query_before);
        assert_eq!(
            session.navigator().current_query(),
            "metric=Query_time_sum&period=1d"
        );
        // same data, re-filtered for the new period
        assert_eq!(session.projection().datasets.len(), before.datasets.len());
    }

    #[test]
    fn test_malformed_response_degrades() {
        let mut session = make_session("");
        load(&mut session);
        let update = session.dispatch(ViewAction::CommitZoom(ZoomRange::new(0.0, 1.0).unwrap()));
        let summary = update
            .fetches
            .into_iter()
            .find(|r| r.ticket.endpoint == Endpoint::Summary)
            .unwrap();
        assert!(session.receive(summary.ticket, Ok("<html>oops</html>".to_string())));
        assert!(matches!(session.status(), LoadStatus::Degraded(_)));
        assert_eq!(session.ranked().len(), 2);
    }

    #[test]
    fn test_select_dataset_and_clear() {
        let mut session = make_session("");
        load(&mut session);

        let update = session.select_dataset(1).unwrap();
        assert_eq!(update.transition.nav, NavWrite::Push);
        assert!(update.fetches.is_empty());
        assert_eq!(session.view().selected_series_key(), Some("AAAA1111BBBB"));
        assert_eq!(
            session.projection().datasets[0].label,
            "DELETE FROM u... [AAAA1111]"
        );

        // no dataset mapping outside by-checksum mode
        assert!(session.select_dataset(0).is_none());

        let update = session.dispatch(ViewAction::ClearSelection);
        assert!(update.transition.reset_chart_transform);
        assert_eq!(session.view().mode, DisplayMode::ByChecksum);
    }

    #[test]
    fn test_aggregated_mode_sums_all_series() {
        let mut session = make_session("");
        load(&mut session);
        session.dispatch(ViewAction::ToggleAggregated);

        let projection = session.projection();
        assert_eq!(projection.datasets[0].label, COMBINED_LABEL);
        assert_eq!(projection.datasets[0].values, vec![Some(6.0), Some(2.0)]);
    }

    #[test]
    fn test_navigation_restore_refetches_without_writing() {
        let mut session = make_session("?metric=ts_cnt&period=all");
        load(&mut session);
        session.dispatch(ViewAction::CommitZoom(ZoomRange::new(0.0, 1.0).unwrap()));
        assert_eq!(session.navigator().len(), 2);

        session.navigator_mut().back();
        let update = session.on_navigation();
        assert_eq!(update.transition.nav, NavWrite::None);
        assert_eq!(update.fetches.len(), 2);
        assert_eq!(session.view().zoom, None);
        assert_eq!(session.view().metric, Metric::TsCnt);
        assert_eq!(session.navigator().len(), 2);
    }

    #[test]
    fn test_out_of_range_timestamp_is_rejected_not_fatal() {
        let mut session = make_session("");
        for request in session.start() {
            let body = match request.ticket.endpoint {
                Endpoint::History => r#"[
                    {"checksum": "AAAA1111BBBB", "ts_min": "-9223372036854775800"},
                    {"checksum": "AAAA1111BBBB", "ts_min": "2024-01-01 00:00:00", "Query_time_sum": 1.0}
                ]"#,
                Endpoint::Summary => SUMMARY,
            };
            session.receive(request.ticket, Ok(body.to_string()));
        }
        assert_eq!(session.dropped_samples(), 1);

        session.dispatch(ViewAction::SetPeriod(Period::OneDay));
        let projection = session.projection();
        assert_eq!(projection.labels, vec![1_704_067_200_000]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DashboardConfig {
            top_n: 0,
            ..DashboardConfig::default()
        };
        assert!(Session::new(config, MemoryHistory::new("")).is_err());
    }
}
