//! Fetch sequencing
//!
//! Fetches are never cancelled, so a slow old response can arrive after a
//! newer one. Every issued fetch gets a ticket with a per-endpoint sequence
//! number, and only the latest ticket of an endpoint may be applied.

use std::fmt;

/// Backend endpoints the dashboard fetches from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    History,
    Summary,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::History => f.write_str("history"),
            Endpoint::Summary => f.write_str("summary"),
        }
    }
}

/// Identifies one issued fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub endpoint: Endpoint,
    pub seq: u64,
}

/// Issues tickets and tells stale ones apart
#[derive(Debug, Clone, Default)]
pub struct FetchSequencer {
    history: u64,
    summary: u64,
}

impl FetchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, endpoint: Endpoint) -> FetchTicket {
        let counter = self.counter_mut(endpoint);
        *counter += 1;
        FetchTicket {
            endpoint,
            seq: *counter,
        }
    }

    /// Sequence number of the most recently issued ticket (0 if none)
    pub fn latest(&self, endpoint: Endpoint) -> u64 {
        match endpoint {
            Endpoint::History => self.history,
            Endpoint::Summary => self.summary,
        }
    }

    /// Whether a response for `ticket` may still be applied
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.seq == self.latest(ticket.endpoint)
    }

    fn counter_mut(&mut self, endpoint: Endpoint) -> &mut u64 {
        match endpoint {
            Endpoint::History => &mut self.history,
            Endpoint::Summary => &mut self.summary,
        }
    }
}
