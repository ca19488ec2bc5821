use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::journey::{Phase, Timing};

/// Every state change in the engine produces an Event.
/// Adapters turn them into collaborator calls; observers log or display them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    PhaseChanged {
        from: Phase,
        to: Phase,
        timing: Timing,
        at: DateTime<Utc>,
    },
    /// Raised at most once per journey, on first entry into Returning or Late.
    AlertRequested {
        phase: Phase,
        remaining_secs: i64,
        remaining_text: String,
        at: DateTime<Utc>,
    },
    EtaUpdated {
        expected_travel_secs: i64,
        has_route: bool,
        sampled_at: DateTime<Utc>,
    },
    /// A sample older than the stored one arrived and was dropped.
    EtaSampleDiscarded {
        sampled_at: DateTime<Utc>,
        latest_sampled_at: DateTime<Utc>,
    },
    PositionRecorded {
        coordinate: Coordinate,
        trace_len: usize,
    },
    SessionStarted {
        session_id: String,
        at: DateTime<Utc>,
    },
    SessionEnded {
        session_id: String,
        at: DateTime<Utc>,
    },
}
