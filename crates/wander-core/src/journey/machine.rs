//! Journey state machine.
//!
//! The machine is a transition function over three inputs: clock ticks, ETA
//! samples and position samples. Each entry point updates the state and
//! returns the [`Event`]s the update produced; it performs no I/O. The caller
//! owns the clock and passes `now` in, so replaying the same inputs always
//! yields the same phase.
//!
//! ## Phases
//!
//! ```text
//! CalculatingDirections -> Travelling <-> Returning <-> Late
//! ```
//!
//! Phases are re-derived from the current inputs on every update. The only
//! edge-triggered behaviour is the alarm, which fires on the first entry into
//! `Returning` or `Late` and never again for the same journey.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{EtaSample, Journey, Timing};
use super::path::PathTrace;
use super::phase::{classify, Phase};
use crate::events::Event;
use crate::geo::Coordinate;
use crate::presentation::{self, Projection};

/// Input to [`JourneyMachine::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Tick { now: DateTime<Utc> },
    EtaSample { sample: EtaSample, now: DateTime<Utc> },
    Position { coordinate: Coordinate },
}

/// Point-in-time view of the machine, suitable for display or JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub timing: Timing,
    pub alarm_triggered: bool,
    pub expected_travel_secs: Option<i64>,
    pub eta_sampled_at: Option<DateTime<Utc>>,
    pub trace_len: usize,
    pub projection: Projection,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JourneyMachine {
    journey: Journey,
    phase: Phase,
    timing: Timing,
    eta: Option<EtaSample>,
    alarm_triggered: bool,
    trace: PathTrace,
}

impl JourneyMachine {
    /// Starts in `CalculatingDirections` with timing evaluated at the journey's
    /// start time.
    pub fn new(journey: Journey) -> Self {
        let timing = journey.timing_at(journey.start_time());
        Self {
            journey,
            phase: Phase::CalculatingDirections,
            timing,
            eta: None,
            alarm_triggered: false,
            trace: PathTrace::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn journey(&self) -> &Journey {
        &self.journey
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn eta(&self) -> Option<&EtaSample> {
        self.eta.as_ref()
    }

    pub fn alarm_triggered(&self) -> bool {
        self.alarm_triggered
    }

    pub fn trace(&self) -> &PathTrace {
        &self.trace
    }

    /// Origin for the next ETA request.
    pub fn last_position(&self) -> Option<Coordinate> {
        self.trace.last()
    }

    pub fn projection(&self, now: DateTime<Utc>) -> Projection {
        presentation::project(&self.journey, self.phase, self.eta.as_ref(), now)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            phase: self.phase,
            timing: self.timing,
            alarm_triggered: self.alarm_triggered,
            expected_travel_secs: self.eta.as_ref().map(|s| s.expected_travel_secs),
            eta_sampled_at: self.eta.as_ref().map(|s| s.sampled_at),
            trace_len: self.trace.len(),
            projection: self.projection(now),
            at: now,
        }
    }

    // ── Inputs ───────────────────────────────────────────────────────

    pub fn handle(&mut self, input: Input) -> Vec<Event> {
        match input {
            Input::Tick { now } => self.on_tick(now),
            Input::EtaSample { sample, now } => self.on_eta_sample(sample, now),
            Input::Position { coordinate } => self.on_position_sample(coordinate),
        }
    }

    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        self.recompute(now, &mut events);
        events
    }

    /// Store the sample unless a newer one is already held, then recompute.
    pub fn on_eta_sample(&mut self, sample: EtaSample, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = Vec::new();
        match &self.eta {
            Some(latest) if sample.sampled_at < latest.sampled_at => {
                events.push(Event::EtaSampleDiscarded {
                    sampled_at: sample.sampled_at,
                    latest_sampled_at: latest.sampled_at,
                });
            }
            _ => {
                events.push(Event::EtaUpdated {
                    expected_travel_secs: sample.expected_travel_secs,
                    has_route: !sample.route.is_empty(),
                    sampled_at: sample.sampled_at,
                });
                self.eta = Some(sample);
            }
        }
        self.recompute(now, &mut events);
        events
    }

    /// Positions only feed the trace; they never change the phase.
    pub fn on_position_sample(&mut self, coordinate: Coordinate) -> Vec<Event> {
        self.trace.push(coordinate);
        vec![Event::PositionRecorded {
            coordinate,
            trace_len: self.trace.len(),
        }]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn recompute(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        self.timing = self.journey.timing_at(now);
        let next = classify(self.eta.as_ref().map(|s| s.expected_travel_secs), &self.timing);

        if next != self.phase {
            events.push(Event::PhaseChanged {
                from: self.phase,
                to: next,
                timing: self.timing,
                at: now,
            });
            self.phase = next;
        }

        if next.is_alarming() && !self.alarm_triggered {
            self.alarm_triggered = true;
            let remaining_secs = presentation::remaining_for(
                next,
                self.timing.remaining_secs,
                self.timing.remaining_without_buffer_secs,
            );
            events.push(Event::AlertRequested {
                phase: next,
                remaining_secs,
                remaining_text: presentation::duration_text(remaining_secs),
                at: now,
            });
        }
    }
}
