//! slowquery-dash - View state and chart data for a slow query dashboard
//!
//! This crate contains the WASM-compatible core of a dashboard that plots
//! MySQL slow query digests over time. It is shared by the browser shell
//! in `dashboard/` and can be driven from any host that provides a
//! navigation stack and performs HTTP requests.
//!
//! # Features
//!
//! - Encode and decode the view state to a shareable query string
//! - Keep the view state and back/forward history in sync without loops
//! - Group, window, rank and aggregate per-digest samples
//! - Build render-ready chart datasets for three display modes
//! - Discard out-of-order fetch responses
//!
//! # Example
//!
//! ```
//! use slowquery_dash::{DashboardConfig, MemoryHistory, Navigator, Period, Session, ViewAction};
//!
//! let mut session = Session::new(DashboardConfig::default(), MemoryHistory::new("?period=1d")).unwrap();
//! for request in session.start() {
//!     // perform GET request.url, then hand the body back
//!     session.receive(request.ticket, Ok("[]".to_string()));
//! }
//! session.dispatch(ViewAction::SetPeriod(Period::OneWeek));
//! assert_eq!(session.navigator().current_query(), "metric=Query_time_sum&period=1w");
//! let chart = session.projection();
//! assert!(chart.is_empty());
//! ```

pub mod api;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod fetch;
pub mod grouping;
pub mod history;
pub mod projection;
pub mod ranking;
pub mod session;
pub mod state;
pub mod table;
pub mod window;

pub use codec::LocationState;
pub use config::{AxisAlignment, DashboardConfig};
pub use data::{Metric, MetricSample, Period, SummaryRow, ZoomRange};
pub use error::{Error, Result};
pub use fetch::{Endpoint, FetchTicket};
pub use history::{HistorySync, MemoryHistory, Navigator};
pub use projection::{ChartDataset, ChartProjection};
pub use ranking::RankedSeriesSet;
pub use session::{backend_error, FetchRequest, LoadStatus, Session, SessionUpdate};
pub use state::{DisplayMode, NavWrite, Origin, Transition, ViewAction, ViewState, ViewStore};
pub use table::SummaryTableRow;
