//! Dioxus-based slow query dashboard
//!
//! A pure Rust frontend that compiles to WebAssembly. All view state lives
//! in a [`Session`] from `slowquery-dash`; this crate performs the HTTP
//! requests, wires `window.history` in as the navigator and draws the chart.

use dioxus::prelude::*;
use gloo_net::http::Request;
use slowquery_dash::data::format_timestamp;
use slowquery_dash::{
    backend_error, ChartProjection, DashboardConfig, DisplayMode, FetchRequest, LoadStatus,
    Metric, Period, Session, SessionUpdate, SummaryTableRow, ViewAction, ViewState, ZoomRange,
};
use tracing::{error, info};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod browser;
use browser::BrowserHistory;

const CONFIG_URL: &str = "config.json";

const CHART_WIDTH: f64 = 900.0;
const CHART_HEIGHT: f64 = 360.0;
const PADDING: f64 = 60.0;

/// Drags narrower than this fraction of the chart are treated as clicks
const MIN_DRAG_FRACTION: f64 = 0.01;

/// Point markers are skipped on dense charts
const MAX_MARKED_POINTS: usize = 200;

type SessionSignal = Signal<Option<Session<BrowserHistory>>>;

fn main() {
    tracing_wasm::set_as_global_default();
    launch(App);
}

#[component]
fn App() -> Element {
    let mut session: SessionSignal = use_signal(|| None);
    let mut init_error = use_signal(|| None::<String>);
    // bumped whenever the chart must forget its drag state
    let chart_epoch = use_signal(|| 0u32);

    use_effect(move || {
        spawn(async move {
            let config = load_config().await;
            match Session::new(config, BrowserHistory) {
                Ok(mut s) => {
                    let requests = s.start();
                    session.set(Some(s));
                    run_fetches(session, requests);
                }
                Err(e) => {
                    error!(error = %e, "failed to start dashboard session");
                    init_error.set(Some(e.to_string()));
                }
            }
        });
    });

    // Back/forward buttons
    use_effect(move || {
        let mut session = session;
        let closure = Closure::wrap(Box::new(move || {
            let update = match session.try_write() {
                Ok(mut guard) => guard.as_mut().map(Session::on_navigation),
                Err(_) => None,
            };
            if let Some(update) = update {
                apply_update(session, chart_epoch, update);
            }
        }) as Box<dyn FnMut()>);

        if let Some(window) = web_sys::window() {
            let _ = window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
        }

        closure.forget();
    });

    let on_action = move |action: ViewAction| dispatch(session, chart_epoch, action);

    let on_select_dataset = move |index: usize| {
        let update = session.write().as_mut().and_then(|s| s.select_dataset(index));
        if let Some(update) = update {
            apply_update(session, chart_epoch, update);
        }
    };

    let snapshot = session.read().as_ref().map(|s| {
        (
            s.view().clone(),
            s.projection(),
            s.table(),
            s.status(),
            s.dropped_samples(),
        )
    });

    rsx! {
        style { {include_str!("styles.css")} }

        div { class: "app",
            match snapshot {
                None => rsx! {
                    Header { view: ViewState::default(), period_text: String::new(), on_action }
                    main { class: "container",
                        if let Some(err) = init_error.read().as_ref() {
                            ErrorMessage { message: err.clone() }
                        } else {
                            LoadingSpinner {}
                        }
                    }
                },
                Some((view, projection, rows, status, dropped)) => rsx! {
                    Header { view: view.clone(), period_text: projection.period_text.clone(), on_action }
                    main { class: "container",
                        Controls { view: view.clone(), on_action }
                        StatusBanner { status: status.clone(), dropped }
                        if projection.is_empty() {
                            if status == LoadStatus::Ready {
                                EmptyState {}
                            } else if status == LoadStatus::Loading {
                                LoadingSpinner {}
                            }
                        } else {
                            ChartView {
                                key: "{chart_epoch}",
                                projection: projection.clone(),
                                metric: view.metric,
                                on_zoom: move |zoom| on_action(ViewAction::CommitZoom(zoom)),
                                on_select: on_select_dataset,
                            }
                        }
                        SummaryTable {
                            rows,
                            on_select: move |key| on_action(ViewAction::SelectSeries(key)),
                        }
                    }
                },
            }

            Footer {}
        }
    }
}

fn dispatch(mut session: SessionSignal, chart_epoch: Signal<u32>, action: ViewAction) {
    let update = session.write().as_mut().map(|s| s.dispatch(action));
    if let Some(update) = update {
        apply_update(session, chart_epoch, update);
    }
}

fn apply_update(session: SessionSignal, mut chart_epoch: Signal<u32>, update: SessionUpdate) {
    if update.transition.reset_chart_transform {
        *chart_epoch.write() += 1;
    }
    run_fetches(session, update.fetches);
}

/// Perform fetches and hand each response back to the session
fn run_fetches(session: SessionSignal, requests: Vec<FetchRequest>) {
    for request in requests {
        let mut session = session;
        spawn_local(async move {
            let response = fetch_text(&request.url).await;
            // the signal is gone once the app unmounts
            if let Ok(mut guard) = session.try_write() {
                if let Some(s) = guard.as_mut() {
                    s.receive(request.ticket, response);
                }
            }
        });
    }
}

async fn fetch_text(url: &str) -> slowquery_dash::Result<String> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|e| backend_error(format!("Failed to fetch {}: {}", url, e)))?;

    if !response.ok() {
        return Err(backend_error(format!(
            "HTTP error: {} {}",
            response.status(),
            response.status_text()
        )));
    }

    response
        .text()
        .await
        .map_err(|e| backend_error(format!("Failed to read response: {}", e)))
}

/// `config.json` next to the page, or the defaults when it is missing
async fn load_config() -> DashboardConfig {
    match fetch_text(CONFIG_URL)
        .await
        .and_then(|body| DashboardConfig::from_json(&body))
    {
        Ok(config) => {
            info!(api = %config.api_base_url, "loaded {}", CONFIG_URL);
            config
        }
        Err(e) => {
            info!(error = %e, "using default dashboard config");
            DashboardConfig::default()
        }
    }
}

#[component]
fn Header(view: ViewState, period_text: String, on_action: EventHandler<ViewAction>) -> Element {
    let selected = view.selected_series_key().map(str::to_string);

    rsx! {
        header { class: "header",
            div { class: "header-content",
                h1 {
                    class: "title",
                    title: "Back to all queries",
                    onclick: move |_| on_action.call(ViewAction::ClearSelection),
                    span { class: "icon", "🐢" }
                    " Slow Query Dashboard"
                }
                p { class: "subtitle",
                    if let Some(key) = selected {
                        "Query "
                        code { "{key}" }
                        " • "
                    }
                    "{period_text}"
                }
            }
        }
    }
}

#[component]
fn Controls(view: ViewState, on_action: EventHandler<ViewAction>) -> Element {
    let drilldown = matches!(view.mode, DisplayMode::Drilldown { .. });
    let aggregated = view.is_aggregated();
    let current_metric = view.metric;
    let current_period = view.period;

    rsx! {
        div { class: "controls",
            label { class: "control",
                "Metric "
                select {
                    onchange: move |evt: FormEvent| {
                        if let Some(metric) = Metric::parse(&evt.value()) {
                            on_action.call(ViewAction::SetMetric(metric));
                        }
                    },
                    for metric in Metric::ALL {
                        option {
                            value: "{metric.as_str()}",
                            selected: metric == current_metric,
                            "{metric.label()}"
                        }
                    }
                }
            }

            label { class: "control",
                "Period "
                select {
                    onchange: move |evt: FormEvent| {
                        if let Some(period) = Period::parse(&evt.value()) {
                            on_action.call(ViewAction::SetPeriod(period));
                        }
                    },
                    for period in Period::ALL {
                        option {
                            value: "{period.as_str()}",
                            selected: period == current_period,
                            "{period.label()}"
                        }
                    }
                }
            }

            label { class: "control",
                input {
                    r#type: "checkbox",
                    checked: !aggregated,
                    disabled: drilldown,
                    onchange: move |_| on_action.call(ViewAction::ToggleAggregated),
                }
                " Split by query"
            }

            if view.zoom.is_some() {
                button {
                    class: "btn",
                    onclick: move |_| on_action.call(ViewAction::ResetZoom),
                    "Reset zoom"
                }
            }

            if drilldown {
                button {
                    class: "btn",
                    onclick: move |_| on_action.call(ViewAction::ClearSelection),
                    "All queries"
                }
            }
        }
    }
}

#[component]
fn StatusBanner(status: LoadStatus, dropped: usize) -> Element {
    rsx! {
        if let LoadStatus::Degraded(message) = &status {
            div { class: "banner banner-error",
                "⚠️ {message}"
                span { class: "banner-hint", " Showing the last loaded data." }
            }
        }
        if dropped > 0 {
            div { class: "banner", "{dropped} samples without a checksum were ignored." }
        }
    }
}

/// Maps timestamps and values into SVG coordinates
struct Scale {
    t_min: i64,
    span: f64,
    max_value: f64,
}

impl Scale {
    fn new(projection: &ChartProjection) -> Self {
        let t_min = projection.labels.first().copied().unwrap_or(0);
        let t_max = projection.labels.last().copied().unwrap_or(t_min);
        let max_value = projection.max_value();
        Self {
            t_min,
            span: (t_max.saturating_sub(t_min) as f64).max(1.0),
            max_value: if max_value > 0.0 { max_value } else { 1.0 },
        }
    }

    fn x(&self, timestamp: i64) -> f64 {
        let offset = timestamp.saturating_sub(self.t_min) as f64;
        PADDING + (CHART_WIDTH - 2.0 * PADDING) * (offset / self.span)
    }

    fn y(&self, value: f64) -> f64 {
        PADDING + (CHART_HEIGHT - 2.0 * PADDING) * (1.0 - value / self.max_value)
    }

    /// Timestamp under a fraction of the plot area
    fn timestamp_at(&self, chart_fraction: f64) -> f64 {
        self.t_min as f64 + self.span * chart_fraction
    }
}

#[component]
fn ChartView(
    projection: ChartProjection,
    metric: Metric,
    on_zoom: EventHandler<ZoomRange>,
    on_select: EventHandler<usize>,
) -> Element {
    let scale = Scale::new(&projection);
    let padding_ratio = PADDING / CHART_WIDTH;

    let mut chart_div_width = use_signal(|| 0.0f64);
    let mut drag_start = use_signal(|| None::<f64>);
    let mut drag_end = use_signal(|| None::<f64>);

    let to_fraction = move |element_x: f64| {
        let width = *chart_div_width.read();
        (width > 0.0).then(|| (element_x / width).clamp(0.0, 1.0))
    };

    let t_min = scale.t_min;
    let span = scale.span;
    let commit = move |start: f64, end: f64| {
        if (end - start).abs() < MIN_DRAG_FRACTION {
            return;
        }
        let scale = Scale {
            t_min,
            span,
            max_value: 1.0,
        };
        let to_chart = |f: f64| ((f - padding_ratio) / (1.0 - 2.0 * padding_ratio)).clamp(0.0, 1.0);
        let a = scale.timestamp_at(to_chart(start)).round();
        let b = scale.timestamp_at(to_chart(end)).round();
        if let Some(zoom) = ZoomRange::new(a, b) {
            on_zoom.call(zoom);
        }
    };

    let selection = match (*drag_start.read(), *drag_end.read()) {
        (Some(a), Some(b)) => Some((a.min(b) * CHART_WIDTH, (a - b).abs() * CHART_WIDTH)),
        _ => None,
    };

    let first_label = projection.labels.first().map(|&t| format_timestamp(t)).unwrap_or_default();
    let last_label = projection.labels.last().map(|&t| format_timestamp(t)).unwrap_or_default();
    let mark_points = projection.labels.len() <= MAX_MARKED_POINTS;

    rsx! {
        div { class: "chart-card",
            div { class: "chart-header",
                h2 { class: "chart-title", "{metric.label()}" }
                span { class: "hint", "Drag across the chart to zoom" }
            }
            div {
                class: "chart-container",
                onmounted: move |evt| {
                    let mounted_data = evt.data().clone();
                    spawn(async move {
                        if let Ok(rect) = mounted_data.get_client_rect().await {
                            chart_div_width.set(rect.width());
                        }
                    });
                },
                onmousedown: move |e| {
                    let fraction = to_fraction(e.data().element_coordinates().x);
                    drag_start.set(fraction);
                    drag_end.set(fraction);
                },
                onmousemove: move |e| {
                    if drag_start.read().is_some() {
                        drag_end.set(to_fraction(e.data().element_coordinates().x));
                    }
                },
                onmouseup: move |_| {
                    let start = *drag_start.read();
                    let end = *drag_end.read();
                    drag_start.set(None);
                    drag_end.set(None);
                    if let (Some(start), Some(end)) = (start, end) {
                        commit(start, end);
                    }
                },
                onmouseleave: move |_| {
                    drag_start.set(None);
                    drag_end.set(None);
                },

                svg {
                    class: "chart",
                    view_box: "0 0 {CHART_WIDTH} {CHART_HEIGHT}",
                    "preserveAspectRatio": "xMidYMid meet",

                    // Grid lines
                    for i in 0..5 {
                        line {
                            x1: "{PADDING}",
                            y1: "{PADDING + (CHART_HEIGHT - 2.0 * PADDING) * (i as f64 / 4.0)}",
                            x2: "{CHART_WIDTH - PADDING}",
                            y2: "{PADDING + (CHART_HEIGHT - 2.0 * PADDING) * (i as f64 / 4.0)}",
                            class: "grid-line"
                        }
                    }

                    // Y-axis labels
                    for i in 0..5 {
                        text {
                            x: "{PADDING - 10.0}",
                            y: "{PADDING + (CHART_HEIGHT - 2.0 * PADDING) * (i as f64 / 4.0)}",
                            class: "axis-label",
                            "text-anchor": "end",
                            "{format_value(scale.max_value * (1.0 - i as f64 / 4.0))}"
                        }
                    }

                    // X-axis range
                    text {
                        x: "{PADDING}",
                        y: "{CHART_HEIGHT - PADDING / 2.0}",
                        class: "axis-label",
                        "{first_label}"
                    }
                    text {
                        x: "{CHART_WIDTH - PADDING}",
                        y: "{CHART_HEIGHT - PADDING / 2.0}",
                        class: "axis-label",
                        "text-anchor": "end",
                        "{last_label}"
                    }

                    for (idx, dataset) in projection.datasets.iter().enumerate() {
                        path {
                            key: "line-{idx}",
                            d: "{generate_line_path(&projection.labels, &dataset.values, &scale)}",
                            fill: "none",
                            stroke: "{dataset.color}",
                            "stroke-width": "2"
                        }
                        if mark_points {
                            for (i, (ts, value)) in projection.labels.iter().zip(&dataset.values).enumerate() {
                                if let Some(value) = value {
                                    circle {
                                        key: "point-{idx}-{i}",
                                        class: "point",
                                        cx: "{scale.x(*ts)}",
                                        cy: "{scale.y(*value)}",
                                        r: "3",
                                        fill: "{dataset.color}",
                                        onclick: move |_| on_select.call(idx),
                                    }
                                }
                            }
                        }
                    }

                    if let Some((x, width)) = selection {
                        rect {
                            class: "zoom-selection",
                            x: "{x}",
                            y: "{PADDING}",
                            width: "{width}",
                            height: "{CHART_HEIGHT - 2.0 * PADDING}",
                        }
                    }
                }
            }

            // Legend
            div { class: "chart-legend",
                for (idx, dataset) in projection.datasets.iter().enumerate() {
                    div {
                        key: "legend-{idx}",
                        class: legend_item_class(dataset.series_key.is_some()),
                        onclick: move |_| on_select.call(idx),
                        span {
                            class: "legend-color",
                            style: "background-color: {dataset.color}"
                        }
                        span { class: "legend-label", "{dataset.label}" }
                    }
                }
            }
        }
    }
}

fn legend_item_class(selectable: bool) -> &'static str {
    if selectable {
        "legend-item clickable"
    } else {
        "legend-item"
    }
}

/// SVG path for one dataset; gaps start a new segment
fn generate_line_path(labels: &[i64], values: &[Option<f64>], scale: &Scale) -> String {
    let mut path = String::new();
    let mut pen_down = false;

    for (&ts, value) in labels.iter().zip(values) {
        match value {
            Some(v) => {
                let command = if pen_down { " L" } else { " M" };
                path.push_str(&format!("{} {:.1} {:.1}", command, scale.x(ts), scale.y(*v)));
                pen_down = true;
            }
            None => pen_down = false,
        }
    }

    path.trim_start().to_string()
}

fn format_value(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else if value >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.3}", value)
    }
}

#[component]
fn SummaryTable(rows: Vec<SummaryTableRow>, on_select: EventHandler<String>) -> Element {
    rsx! {
        div { class: "table-card",
            table { class: "summary-table",
                thead {
                    tr {
                        th { "" }
                        th { "Checksum" }
                        th { "Query" }
                        th { class: "num", "Query time (sum)" }
                        th { class: "num", "Query time (max)" }
                        th { class: "num", "Count" }
                        th { class: "num", "Rows sent" }
                        th { class: "num", "Rows examined" }
                    }
                }
                tbody {
                    for row in rows {
                        {
                            let key = row.series_key.clone();
                            let swatch = row.color.clone().unwrap_or_else(|| "transparent".to_string());
                            rsx! {
                                tr {
                                    key: "{row.series_key}",
                                    class: "clickable",
                                    onclick: move |_| on_select.call(key.clone()),
                                    td { span { class: "legend-color", style: "background-color: {swatch}" } }
                                    td { code { title: "{row.series_key}", "{row.short_key}" } }
                                    td { class: "sample", title: "{row.sample_text}", "{row.sample_text}" }
                                    td { class: "num", "{row.query_time_sum}" }
                                    td { class: "num", "{row.query_time_max}" }
                                    td { class: "num", "{row.ts_cnt}" }
                                    td { class: "num", "{row.rows_sent_sum}" }
                                    td { class: "num", "{row.rows_examined_sum}" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn Footer() -> Element {
    rsx! {
        footer { class: "footer",
            p {
                "Built with "
                a { href: "https://dioxuslabs.com", "Dioxus" }
            }
        }
    }
}

#[component]
fn LoadingSpinner() -> Element {
    rsx! {
        div { class: "loading",
            div { class: "spinner" }
            p { "Loading query history..." }
        }
    }
}

#[component]
fn ErrorMessage(message: String) -> Element {
    rsx! {
        div { class: "error-container",
            div { class: "error-icon", "⚠️" }
            h2 { "Failed to Start" }
            p { class: "error-message", "{message}" }
            p { class: "error-hint",
                "Check "
                code { "config.json" }
                " next to the page."
            }
        }
    }
}

#[component]
fn EmptyState() -> Element {
    rsx! {
        div { class: "empty-state",
            div { class: "empty-icon", "📈" }
            h2 { "No Samples In This Range" }
            p { "Pick a longer period or reset the zoom." }
        }
    }
}
