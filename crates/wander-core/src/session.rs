//! Session runtime.
//!
//! A session owns one [`JourneyMachine`] and drives it from three tokio tasks:
//!
//! - **tick**: recomputes the phase at a fixed cadence; never waits on I/O
//! - **location**: appends positions from the location collaborator
//! - **refresh**: asks the router for a fresh ETA, one request at a time
//!
//! All three go through a single mutex, so every recomputation sees a
//! consistent machine. The lock is never held across an `.await`.
//!
//! Ending a session stops the tasks, clears its notifications and drops the
//! machine; a callback that races the shutdown finds nothing to mutate.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::alert::{AlertDispatcher, Notifier};
use crate::clock::Clock;
use crate::error::{CoreError, RoutingError};
use crate::events::Event;
use crate::geo::Coordinate;
use crate::journey::{EtaSample, Input, Journey, JourneyMachine, Snapshot, MAX_JOURNEY_SECS};
use crate::location::LocationUpdate;
use crate::routing::{RouteDetail, RouteEstimate, RouteRequest, Router};
use crate::storage::config::{Config, NotificationsConfig};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub refresh_interval: Duration,
    pub routing_timeout: Duration,
    pub notifications: NotificationsConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_interval: config.engine.tick_interval(),
            refresh_interval: config.engine.refresh_interval(),
            routing_timeout: Duration::from_secs(config.routing.timeout_secs),
            notifications: config.notifications.clone(),
        }
    }
}

/// Everything a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub router: Arc<dyn Router>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

struct Shared {
    machine: Option<JourneyMachine>,
    dispatcher: AlertDispatcher,
    location_authorized: bool,
}

struct Inner {
    id: Uuid,
    clock: Arc<dyn Clock>,
    shared: Mutex<Shared>,
    events: broadcast::Sender<Event>,
    snapshots: watch::Sender<Option<Snapshot>>,
    position_ready: Notify,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Feed one input to the machine and act on the resulting events.
    /// Returns `false` once the journey has been discarded.
    fn apply(&self, input: Input, now: DateTime<Utc>) -> bool {
        let (events, snapshot) = {
            let mut shared = self.lock();
            let Shared {
                machine, dispatcher, ..
            } = &mut *shared;
            let Some(machine) = machine.as_mut() else {
                return false;
            };

            let events = machine.handle(input);
            for event in &events {
                match event {
                    Event::AlertRequested {
                        phase,
                        remaining_text,
                        ..
                    } => {
                        dispatcher.dispatch(*phase, remaining_text);
                    }
                    Event::PhaseChanged { from, to, timing, .. } => {
                        tracing::info!(
                            session = %self.id,
                            %from,
                            %to,
                            remaining_secs = timing.remaining_secs,
                            "phase changed"
                        );
                    }
                    Event::EtaSampleDiscarded { sampled_at, .. } => {
                        tracing::debug!(session = %self.id, %sampled_at, "stale ETA sample discarded");
                    }
                    _ => {}
                }
            }
            (events, machine.snapshot(now))
        };

        self.snapshots.send_replace(Some(snapshot));
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        true
    }

    /// Origin, destination and detail for the next ETA request, once a position
    /// is known.
    fn next_request(&self) -> Option<RouteRequest> {
        let shared = self.lock();
        let machine = shared.machine.as_ref()?;
        let origin: Coordinate = machine.last_position()?;
        let detail = if machine.phase().is_alarming() {
            RouteDetail::FullRoute
        } else {
            RouteDetail::EtaOnly
        };
        Some(RouteRequest::walking(
            origin,
            machine.journey().return_location(),
            detail,
        ))
    }

    fn set_location_authorized(&self, granted: bool) {
        let mut shared = self.lock();
        if shared.location_authorized == granted {
            return;
        }
        shared.location_authorized = granted;
        if granted {
            tracing::info!(session = %self.id, "location authorization granted");
        } else {
            let err = CoreError::LocationUnavailable("authorization revoked".into());
            tracing::warn!(session = %self.id, error = %err, "keeping last known position");
        }
    }
}

pub struct Session {
    inner: Arc<Inner>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Start a session for `journey`. Must be called from within a tokio runtime.
    pub fn start(
        journey: Journey,
        collaborators: Collaborators,
        config: SessionConfig,
        locations: mpsc::Receiver<LocationUpdate>,
    ) -> Session {
        let id = Uuid::new_v4();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshots, _) = watch::channel(None);
        let (shutdown, _) = watch::channel(false);

        let dispatcher = AlertDispatcher::new(
            collaborators.notifier.clone(),
            id,
            config.notifications.clone(),
        );
        let inner = Arc::new(Inner {
            id,
            clock: collaborators.clock.clone(),
            shared: Mutex::new(Shared {
                machine: Some(JourneyMachine::new(journey)),
                dispatcher,
                location_authorized: true,
            }),
            events,
            snapshots,
            position_ready: Notify::new(),
        });

        tracing::info!(session = %id, "session started");
        let _ = inner.events.send(Event::SessionStarted {
            session_id: id.to_string(),
            at: inner.clock.now(),
        });

        let tasks = vec![
            tokio::spawn(run_ticks(
                inner.clone(),
                config.tick_interval,
                shutdown.subscribe(),
            )),
            tokio::spawn(run_locations(inner.clone(), locations, shutdown.subscribe())),
            tokio::spawn(run_refresh(
                inner.clone(),
                collaborators.router,
                config.refresh_interval,
                config.routing_timeout,
                shutdown.subscribe(),
            )),
        ];

        Session {
            inner,
            shutdown,
            tasks,
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Fresh snapshot at the clock's current time, without mutating the machine.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let now = self.inner.clock.now();
        self.inner.lock().machine.as_ref().map(|m| m.snapshot(now))
    }

    /// Snapshot published after the most recent update.
    pub fn watch(&self) -> watch::Receiver<Option<Snapshot>> {
        self.inner.snapshots.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// Stop all tasks, clear notifications and discard the journey.
    ///
    /// Returns the machine as it stood when the session ended.
    pub async fn end(mut self) -> Option<JourneyMachine> {
        self.shutdown.send_replace(true);
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!(session = %self.inner.id, error = %e, "session task panicked");
                }
            }
        }

        let machine = {
            let mut shared = self.inner.lock();
            shared.dispatcher.clear();
            shared.machine.take()
        };
        self.inner.snapshots.send_replace(None);

        tracing::info!(session = %self.inner.id, "session ended");
        let _ = self.inner.events.send(Event::SessionEnded {
            session_id: self.inner.id.to_string(),
            at: self.inner.clock.now(),
        });
        machine
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        self.shutdown.send_replace(true);
        for task in &self.tasks {
            task.abort();
        }
        let mut shared = self.inner.lock();
        shared.dispatcher.clear();
        shared.machine = None;
    }
}

async fn run_ticks(inner: Arc<Inner>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = inner.clock.now();
                if !inner.apply(Input::Tick { now }, now) {
                    break;
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn run_locations(
    inner: Arc<Inner>,
    mut locations: mpsc::Receiver<LocationUpdate>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            update = locations.recv() => match update {
                Some(LocationUpdate::Position(coordinate)) => {
                    inner.set_location_authorized(true);
                    let now = inner.clock.now();
                    if !inner.apply(Input::Position { coordinate }, now) {
                        break;
                    }
                    inner.position_ready.notify_one();
                }
                Some(LocationUpdate::Authorization(granted)) => {
                    inner.set_location_authorized(granted);
                }
                None => {
                    tracing::info!(session = %inner.id, "location stream closed");
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
}

/// Whole seconds of a routing estimate. NaN, negative and absurdly long
/// durations count as routing failures.
fn checked_estimate(estimate: RouteEstimate) -> Result<(i64, Vec<Coordinate>), RoutingError> {
    let secs = estimate.duration_secs;
    if !(0.0..=MAX_JOURNEY_SECS as f64).contains(&secs) {
        return Err(RoutingError::InvalidResponse(format!(
            "travel duration out of range: {secs}"
        )));
    }
    Ok((secs.round() as i64, estimate.polyline))
}

/// One request at a time: the next refresh is only scheduled once the previous
/// one has resolved, successfully or not.
async fn run_refresh(
    inner: Arc<Inner>,
    router: Arc<dyn Router>,
    refresh_interval: Duration,
    routing_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut consecutive_failures: u32 = 0;
    loop {
        if *shutdown.borrow() {
            break;
        }

        let request = match inner.next_request() {
            Some(request) => request,
            None => {
                tracing::debug!(session = %inner.id, "waiting for a first position");
                tokio::select! {
                    _ = inner.position_ready.notified() => {}
                    _ = shutdown.changed() => break,
                }
                continue;
            }
        };

        let requested_at = inner.clock.now();
        let outcome = tokio::select! {
            result = tokio::time::timeout(routing_timeout, router.estimate(&request)) => {
                result.unwrap_or_else(|_| Err(RoutingError::Timeout {
                    timeout_secs: routing_timeout.as_secs(),
                }))
            }
            _ = shutdown.changed() => break,
        };

        match outcome.and_then(checked_estimate) {
            Ok((expected_travel_secs, route)) => {
                consecutive_failures = 0;
                let sample = EtaSample {
                    expected_travel_secs,
                    route,
                    sampled_at: requested_at,
                };
                tracing::debug!(
                    session = %inner.id,
                    router = router.name(),
                    eta_secs = sample.expected_travel_secs,
                    "ETA refreshed"
                );
                let now = inner.clock.now();
                if !inner.apply(Input::EtaSample { sample, now }, now) {
                    break;
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                let err = CoreError::from(e);
                tracing::warn!(
                    session = %inner.id,
                    router = router.name(),
                    consecutive_failures,
                    error = %err,
                    "ETA refresh failed, keeping last sample"
                );
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(refresh_interval) => {}
            _ = shutdown.changed() => break,
        }
    }
}
