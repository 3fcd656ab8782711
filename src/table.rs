//! Summary table shown under the chart

use crate::config::DashboardConfig;
use crate::data::{Metric, SummaryRow};
use crate::ranking::RankedSeriesSet;
use crate::state::ViewState;

/// One formatted table row
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTableRow {
    pub series_key: String,
    pub short_key: String,
    pub sample_text: String,
    pub query_time_sum: String,
    pub query_time_max: String,
    pub ts_cnt: String,
    pub rows_sent_sum: String,
    pub rows_examined_sum: String,
    /// Chart color when the series is ranked
    pub color: Option<String>,
}

/// Rows for the current view: the selected series in drilldown, else the top N
pub fn summary_table(
    summary: &[SummaryRow],
    view: &ViewState,
    ranked: &RankedSeriesSet,
    config: &DashboardConfig,
) -> Vec<SummaryTableRow> {
    let rows: Vec<&SummaryRow> = match view.selected_series_key() {
        Some(key) => summary.iter().filter(|row| row.series_key == key).collect(),
        None => summary.iter().take(config.top_n).collect(),
    };

    rows.into_iter()
        .map(|row| SummaryTableRow {
            series_key: row.series_key.clone(),
            short_key: row.series_key.chars().take(config.label_key_chars).collect(),
            sample_text: row.sample_text.clone(),
            query_time_sum: format_seconds(row.aggregate(Metric::QueryTimeSum)),
            query_time_max: format_seconds(row.aggregate(Metric::QueryTimeMax)),
            ts_cnt: format_count(row.aggregate(Metric::TsCnt)),
            rows_sent_sum: format_count(row.aggregate(Metric::RowsSentSum)),
            rows_examined_sum: format_count(row.aggregate(Metric::RowsExaminedSum)),
            color: ranked.get(&row.series_key).map(|entry| entry.color.clone()),
        })
        .collect()
}

/// Three decimals; blank when absent or zero
fn format_seconds(value: Option<f64>) -> String {
    match value {
        Some(v) if v != 0.0 => format!("{:.3}", v),
        _ => String::new(),
    }
}

fn format_count(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
        None => String::new(),
    }
}
