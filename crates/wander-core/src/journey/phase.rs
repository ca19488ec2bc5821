use serde::{Deserialize, Serialize};
use std::fmt;

use super::model::Timing;

/// Where the walker stands relative to the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No ETA sample has arrived yet.
    CalculatingDirections,
    Travelling,
    /// The walk home now eats into the buffer.
    Returning,
    /// The walk home alone exceeds the time left.
    Late,
}

impl Phase {
    /// Entering one of these phases raises the alarm.
    pub fn is_alarming(self) -> bool {
        matches!(self, Phase::Returning | Phase::Late)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::CalculatingDirections => "calculating_directions",
            Phase::Travelling => "travelling",
            Phase::Returning => "returning",
            Phase::Late => "late",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The phase rule.
///
/// Ties resolve to the earlier warning: `eta == remaining` is `Returning`.
pub fn classify(eta_secs: Option<i64>, timing: &Timing) -> Phase {
    let Some(eta) = eta_secs else {
        return Phase::CalculatingDirections;
    };
    if eta < timing.remaining_secs {
        Phase::Travelling
    } else if timing.remaining_without_buffer_secs < eta {
        Phase::Late
    } else {
        Phase::Returning
    }
}
