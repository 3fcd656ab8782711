//! Dashboard configuration

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on the number of ranked series
pub const MAX_RANKED: usize = 10;

/// Default chart palette, assigned by rank and cycled
pub const DEFAULT_PALETTE: [&str; 10] = [
    "rgba(75,192,192,1)",
    "rgba(255,99,132,1)",
    "rgba(54,162,235,1)",
    "rgba(255,206,86,1)",
    "rgba(153,102,255,1)",
    "rgba(255,159,64,1)",
    "rgba(0,200,83,1)",
    "rgba(233,30,99,1)",
    "rgba(63,81,181,1)",
    "rgba(0,188,212,1)",
];

/// How the shared label axis is built in by-checksum mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisAlignment {
    /// Reuse the timestamps of the first ranked series that has data;
    /// every other series is plotted positionally against them
    #[default]
    FirstSeries,
    /// Union of all ranked series' timestamps, with gaps left absent
    Union,
}

/// Configuration for the dashboard core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the query history backend
    pub api_base_url: String,
    /// Number of summary rows ranked and charted
    pub top_n: usize,
    /// Colors assigned by rank index
    pub palette: Vec<String>,
    /// Characters of sample text kept in series labels
    pub label_sample_chars: usize,
    /// Characters of the series key kept in series labels
    pub label_key_chars: usize,
    pub axis_alignment: AxisAlignment,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            top_n: 10,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            label_sample_chars: 20,
            label_key_chars: 8,
            axis_alignment: AxisAlignment::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 || self.top_n > MAX_RANKED {
            return Err(Error::ConfigError(format!(
                "top_n must be between 1 and {}",
                MAX_RANKED
            )));
        }
        if self.palette.is_empty() {
            return Err(Error::ConfigError("palette must not be empty".to_string()));
        }
        Ok(())
    }

    /// Color for a rank index; depends on the index alone
    pub fn color(&self, rank: usize) -> &str {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[rank % DEFAULT_PALETTE.len()];
        }
        &self.palette[rank % self.palette.len()]
    }
}
