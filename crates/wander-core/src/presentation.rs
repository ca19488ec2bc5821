//! Human-readable projection of the engine state.
//!
//! Everything here is pure and cheap enough to recompute on every tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::journey::{EtaSample, Journey, Phase};

const CALCULATING_TEXT: &str = "Calculating...";

/// Status colour shown behind the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Amber,
    Green,
    Blue,
    Red,
}

impl StatusColor {
    pub fn hex(self) -> &'static str {
        match self {
            StatusColor::Amber => "#FFD500",
            StatusColor::Green => "#29BF12",
            StatusColor::Blue => "#4361EE",
            StatusColor::Red => "#F95738",
        }
    }
}

impl From<Phase> for StatusColor {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::CalculatingDirections => StatusColor::Amber,
            Phase::Travelling => StatusColor::Green,
            Phase::Returning => StatusColor::Blue,
            Phase::Late => StatusColor::Red,
        }
    }
}

/// Title for a phase. There is none while directions are still being calculated.
pub fn title_for(phase: Phase) -> Option<&'static str> {
    match phase {
        Phase::CalculatingDirections => None,
        Phase::Travelling => Some("Enjoy"),
        Phase::Returning => Some("Time to Head Back"),
        Phase::Late => Some("You're running late"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub elapsed_text: String,
    pub remaining_text: String,
    pub eta_text: String,
    pub status_color: StatusColor,
    pub title_text: Option<String>,
    /// Remaining time as `H:MM:SS`.
    pub clock_text: String,
}

/// Derive display values from the engine's numeric state.
pub fn project(
    journey: &Journey,
    phase: Phase,
    eta: Option<&EtaSample>,
    now: DateTime<Utc>,
) -> Projection {
    let timing = journey.timing_at(now);
    let remaining = remaining_for(phase, timing.remaining_secs, timing.remaining_without_buffer_secs);

    Projection {
        elapsed_text: duration_text(timing.elapsed_secs),
        remaining_text: duration_text(remaining),
        eta_text: eta
            .map(|sample| duration_text(sample.expected_travel_secs))
            .unwrap_or_else(|| CALCULATING_TEXT.to_string()),
        status_color: phase.into(),
        title_text: title_for(phase).map(str::to_string),
        clock_text: clock_text(remaining),
    }
}

/// Once late, the buffer is already spent, so the figure shown is the time to the
/// real deadline.
pub(crate) fn remaining_for(phase: Phase, remaining_secs: i64, remaining_without_buffer_secs: i64) -> i64 {
    if phase == Phase::Late {
        remaining_without_buffer_secs
    } else {
        remaining_secs
    }
}

/// Relative phrasing with the direction left in: `"in 12 minutes"`, `"3 hours ago"`.
pub fn relative_text(secs: i64) -> String {
    if secs == 0 {
        return "now".to_string();
    }
    let magnitude = magnitude_text(secs.unsigned_abs());
    if secs > 0 {
        format!("in {magnitude}")
    } else {
        format!("{magnitude} ago")
    }
}

/// Relative phrasing without direction: `"12 minutes"`.
pub fn duration_text(secs: i64) -> String {
    strip_direction(&relative_text(secs)).to_string()
}

/// Remove a leading `"in "` and a trailing `" ago"`.
pub fn strip_direction(text: &str) -> &str {
    let text = text.strip_prefix("in ").unwrap_or(text);
    text.strip_suffix(" ago").unwrap_or(text)
}

fn magnitude_text(secs: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "day"), (3_600, "hour"), (60, "minute"), (1, "second")];
    let (size, name) = UNITS
        .iter()
        .copied()
        .find(|(size, _)| secs >= *size)
        .unwrap_or((1, "second"));
    let count = secs / size;
    if count == 1 {
        format!("1 {name}")
    } else {
        format!("{count} {name}s")
    }
}

/// `H:MM:SS`, with a leading `-` for negative values.
pub fn clock_text(secs: i64) -> String {
    let sign = if secs < 0 { "-" } else { "" };
    let total = secs.unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{sign}{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use chrono::TimeZone;

    fn journey() -> Journey {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        Journey::new(3600, 300, Coordinate::new(0.0, 0.0).unwrap(), t0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        journey().start_time() + chrono::Duration::seconds(secs)
    }

    fn sample(eta: i64) -> EtaSample {
        EtaSample {
            expected_travel_secs: eta,
            route: Vec::new(),
            sampled_at: at(0),
        }
    }

    #[test]
    fn relative_phrasing_picks_largest_unit() {
        assert_eq!(relative_text(720), "in 12 minutes");
        assert_eq!(relative_text(-7200), "2 hours ago");
        assert_eq!(relative_text(59), "in 59 seconds");
        assert_eq!(relative_text(60), "in 1 minute");
        assert_eq!(relative_text(90_000), "in 1 day");
        assert_eq!(relative_text(0), "now");
    }

    #[test]
    fn duration_text_has_no_direction() {
        assert_eq!(duration_text(720), "12 minutes");
        assert_eq!(duration_text(-720), "12 minutes");
        assert_eq!(strip_direction("in 5 seconds"), "5 seconds");
        assert_eq!(strip_direction("inland"), "inland");
    }

    #[test]
    fn clock_text_pads_minutes_and_seconds() {
        assert_eq!(clock_text(3661), "1:01:01");
        assert_eq!(clock_text(59), "0:00:59");
        assert_eq!(clock_text(-250), "-0:04:10");
    }

    #[test]
    fn calculating_projection() {
        let p = project(&journey(), Phase::CalculatingDirections, None, at(60));
        assert_eq!(p.status_color, StatusColor::Amber);
        assert_eq!(p.title_text, None);
        assert_eq!(p.eta_text, "Calculating...");
        assert_eq!(p.elapsed_text, "1 minute");
        assert_eq!(p.remaining_text, "54 minutes");
    }

    #[test]
    fn phase_colours_and_titles() {
        let s = sample(400);
        let travelling = project(&journey(), Phase::Travelling, Some(&s), at(0));
        assert_eq!(travelling.status_color, StatusColor::Green);
        assert_eq!(travelling.title_text.as_deref(), Some("Enjoy"));
        assert_eq!(travelling.eta_text, "6 minutes");

        let returning = project(&journey(), Phase::Returning, Some(&s), at(3050));
        assert_eq!(returning.status_color, StatusColor::Blue);
        assert_eq!(returning.title_text.as_deref(), Some("Time to Head Back"));
        assert_eq!(returning.remaining_text, "4 minutes");
        assert_eq!(returning.clock_text, "0:04:10");
    }

    #[test]
    fn late_projection_counts_down_to_the_real_deadline() {
        let s = sample(400);
        let late = project(&journey(), Phase::Late, Some(&s), at(3300));
        assert_eq!(late.status_color, StatusColor::Red);
        assert_eq!(late.title_text.as_deref(), Some("You're running late"));
        assert_eq!(late.remaining_text, "5 minutes");
        assert_eq!(late.clock_text, "0:05:00");
        assert_eq!(StatusColor::Red.hex(), "#F95738");
    }
}
