//! View state store
//!
//! Single source of truth for metric, period, zoom range, selection and
//! display mode. Every change goes through [`ViewStore::dispatch`] (user
//! actions) or [`ViewStore::restore`] (navigation), and reports a
//! [`Transition`] describing what the caller has to do next.

use tracing::debug;

use crate::codec::LocationState;
use crate::data::{Metric, Period, ZoomRange};

/// How the chart presents the ranked series
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// One line per ranked series
    #[default]
    ByChecksum,
    /// One line summing the metric across all series
    Aggregated,
    /// Only the selected series
    Drilldown { series_key: String },
}

/// Complete view state for one dashboard session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub metric: Metric,
    pub period: Period,
    pub zoom: Option<ZoomRange>,
    pub mode: DisplayMode,
}

impl ViewState {
    pub fn from_location(location: &LocationState) -> Self {
        let mode = match &location.checksum {
            Some(key) => DisplayMode::Drilldown {
                series_key: key.clone(),
            },
            None => DisplayMode::ByChecksum,
        };
        Self {
            metric: location.metric,
            period: location.period,
            zoom: location.zoom,
            mode,
        }
    }

    /// Project onto the fields carried by the location
    pub fn location(&self) -> LocationState {
        LocationState {
            metric: self.metric,
            period: self.period,
            zoom: self.zoom,
            checksum: self.selected_series_key().map(str::to_string),
        }
    }

    pub fn selected_series_key(&self) -> Option<&str> {
        match &self.mode {
            DisplayMode::Drilldown { series_key } => Some(series_key),
            _ => None,
        }
    }

    pub fn is_aggregated(&self) -> bool {
        self.mode == DisplayMode::Aggregated
    }
}

/// Where a state change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A user interaction; may write to the navigation stack
    User,
    /// A back/forward navigation; must never write to the navigation stack
    Restore,
}

/// Navigation write requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavWrite {
    None,
    /// New navigable entry
    Push,
    /// Rewrite the current entry
    Replace,
}

/// User interactions
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    SetMetric(Metric),
    /// Changing the period also drops the zoom range
    SetPeriod(Period),
    CommitZoom(ZoomRange),
    ResetZoom,
    SelectSeries(String),
    /// Back to by-checksum from any mode, dropping the zoom range and any chart transform
    ClearSelection,
    /// Switch between by-checksum and aggregated display
    ToggleAggregated,
}

/// Outcome of applying an action or a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub origin: Origin,
    pub nav: NavWrite,
    /// Whether the state changed at all
    pub changed: bool,
    /// Period or zoom changed, so both endpoints must be fetched again
    pub refetch: bool,
    /// The renderer should drop its zoom/pan transform
    pub reset_chart_transform: bool,
}

impl Transition {
    fn unchanged(origin: Origin) -> Self {
        Self {
            origin,
            nav: NavWrite::None,
            changed: false,
            refetch: false,
            reset_chart_transform: false,
        }
    }

    fn between(origin: Origin, before: &ViewState, after: &ViewState) -> Self {
        let changed = before != after;
        let in_location = before.location() != after.location();
        let nav = match origin {
            Origin::User if in_location => NavWrite::Push,
            _ => NavWrite::None,
        };
        Self {
            origin,
            nav,
            changed,
            refetch: before.period != after.period || before.zoom != after.zoom,
            reset_chart_transform: false,
        }
    }
}

/// Owner of the current [`ViewState`]
#[derive(Debug, Clone, Default)]
pub struct ViewStore {
    state: ViewState,
}

impl ViewStore {
    pub fn new(state: ViewState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Apply a user action
    pub fn dispatch(&mut self, action: ViewAction) -> Transition {
        let before = self.state.clone();
        let mut next = before.clone();
        let mut reset_chart_transform = false;

        match action {
            ViewAction::SetMetric(metric) => next.metric = metric,
            ViewAction::SetPeriod(period) => {
                next.period = period;
                next.zoom = None;
            }
            ViewAction::CommitZoom(zoom) => next.zoom = Some(zoom),
            ViewAction::ResetZoom => {
                next.zoom = None;
                reset_chart_transform = true;
            }
            ViewAction::SelectSeries(series_key) => {
                if series_key.trim().is_empty() {
                    return Transition::unchanged(Origin::User);
                }
                next.mode = DisplayMode::Drilldown { series_key };
            }
            ViewAction::ClearSelection => {
                next.mode = DisplayMode::ByChecksum;
                next.zoom = None;
                reset_chart_transform = true;
            }
            ViewAction::ToggleAggregated => match next.mode {
                DisplayMode::ByChecksum => next.mode = DisplayMode::Aggregated,
                DisplayMode::Aggregated => next.mode = DisplayMode::ByChecksum,
                DisplayMode::Drilldown { .. } => {
                    debug!("aggregated toggle ignored while a series is selected");
                }
            },
        }

        let mut transition = Transition::between(Origin::User, &before, &next);
        transition.reset_chart_transform = reset_chart_transform;
        if transition.changed {
            debug!(?next, "view state updated");
        }
        self.state = next;
        transition
    }

    /// Apply a location restored by back/forward navigation
    ///
    /// The location is authoritative for every field it carries: a missing
    /// zoom clears the active one, a missing checksum leaves drilldown. The
    /// aggregated toggle is not part of the location and is kept.
    pub fn restore(&mut self, location: &LocationState) -> Transition {
        let before = self.state.clone();
        let mode = match (&location.checksum, &before.mode) {
            (Some(key), _) => DisplayMode::Drilldown {
                series_key: key.clone(),
            },
            (None, DisplayMode::Drilldown { .. }) => DisplayMode::ByChecksum,
            (None, mode) => mode.clone(),
        };
        let next = ViewState {
            metric: location.metric,
            period: location.period,
            zoom: location.zoom,
            mode,
        };

        let mut transition = Transition::between(Origin::Restore, &before, &next);
        transition.reset_chart_transform = before.zoom.is_some() && next.zoom.is_none();
        debug!(?next, "view state restored from location");
        self.state = next;
        transition
    }
}
