//! Browser history as a [`Navigator`]

use slowquery_dash::Navigator;
use tracing::warn;
use wasm_bindgen::JsValue;

/// `window.history` and `window.location` of the page
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserHistory;

impl BrowserHistory {
    fn history() -> Option<web_sys::History> {
        web_sys::window()?.history().ok()
    }

    /// Same path, new query string
    fn url_for(query: &str) -> String {
        let path = web_sys::window()
            .and_then(|w| w.location().pathname().ok())
            .unwrap_or_else(|| "/".to_string());
        if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        }
    }
}

impl Navigator for BrowserHistory {
    fn current_query(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default()
    }

    fn push(&mut self, query: &str) {
        let Some(history) = Self::history() else {
            warn!("window.history unavailable");
            return;
        };
        let url = Self::url_for(query);
        if let Err(e) = history.push_state_with_url(&JsValue::NULL, "", Some(&url)) {
            warn!(?e, url = %url, "pushState failed");
        }
    }

    fn replace(&mut self, query: &str) {
        let Some(history) = Self::history() else {
            warn!("window.history unavailable");
            return;
        };
        let url = Self::url_for(query);
        if let Err(e) = history.replace_state_with_url(&JsValue::NULL, "", Some(&url)) {
            warn!(?e, url = %url, "replaceState failed");
        }
    }
}
