//! Integration tests for the session runtime.
//!
//! Time runs on a paused tokio clock; the journey clock is a `ManualClock`, so
//! every scenario is deterministic.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use wander_core::{
    Collaborators, Coordinate, Event, Journey, LocationUpdate, ManualClock, NotificationError,
    NotificationRequest, Notifier, Phase, RouteDetail, RouteEstimate, RouteRequest, Router,
    RoutingError, Session, SessionConfig,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn home() -> Coordinate {
    Coordinate::new(-37.8136, 144.9631).unwrap()
}

fn out_there() -> Coordinate {
    Coordinate::new(-37.8236, 144.9731).unwrap()
}

fn journey() -> Journey {
    Journey::new(3600, 300, home(), t0()).unwrap()
}

fn config() -> SessionConfig {
    SessionConfig {
        tick_interval: Duration::from_secs(1),
        refresh_interval: Duration::from_secs(15),
        routing_timeout: Duration::from_secs(10),
        ..SessionConfig::default()
    }
}

#[derive(Default)]
struct ScriptedRouter {
    script: Mutex<VecDeque<Result<f64, String>>>,
    /// Used once the script runs out.
    fallback_secs: f64,
    latency: Duration,
    requests: Mutex<Vec<RouteRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedRouter {
    fn new(script: Vec<Result<f64, String>>, fallback_secs: f64) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback_secs,
            ..Default::default()
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Router for ScriptedRouter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn estimate(&self, request: &RouteRequest) -> Result<RouteEstimate, RoutingError> {
        self.requests.lock().unwrap().push(request.clone());
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback_secs));
        next.map(|duration_secs| RouteEstimate {
            duration_secs,
            polyline: vec![request.origin, request.destination],
        })
        .map_err(RoutingError::Unavailable)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    scheduled: Mutex<Vec<NotificationRequest>>,
    cleared: Mutex<Vec<Uuid>>,
}

impl Notifier for RecordingNotifier {
    fn schedule(&self, request: NotificationRequest) -> Result<(), NotificationError> {
        self.scheduled.lock().unwrap().push(request);
        Ok(())
    }

    fn clear_all(&self, session_id: Uuid) -> Result<(), NotificationError> {
        self.cleared.lock().unwrap().push(session_id);
        Ok(())
    }
}

struct Harness {
    session: Session,
    router: Arc<ScriptedRouter>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
    locations: mpsc::Sender<LocationUpdate>,
}

fn start(router: ScriptedRouter, now: DateTime<Utc>) -> Harness {
    let router = Arc::new(router);
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(now));
    let (locations, rx) = mpsc::channel(16);
    let session = Session::start(
        journey(),
        Collaborators {
            router: router.clone(),
            notifier: notifier.clone(),
            clock: clock.clone(),
        },
        config(),
        rx,
    );
    Harness {
        session,
        router,
        notifier,
        clock,
        locations,
    }
}

async fn settle(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

fn phase(h: &Harness) -> Phase {
    h.session.snapshot().expect("session is live").phase
}

#[tokio::test(start_paused = true)]
async fn routing_failures_keep_previous_state_and_refresh_continues() {
    let router = ScriptedRouter::new(
        vec![Err("offline".into()), Err("offline".into()), Err("offline".into())],
        500.0,
    );
    let h = start(router, t0());
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(40).await;
    assert_eq!(h.router.calls(), 3);
    assert_eq!(phase(&h), Phase::CalculatingDirections);

    settle(10).await;
    assert_eq!(h.router.calls(), 4);
    assert_eq!(phase(&h), Phase::Travelling);

    h.session.end().await;
}

#[tokio::test(start_paused = true)]
async fn routing_failures_after_a_sample_keep_that_sample() {
    let router = ScriptedRouter::new(
        vec![
            Ok(500.0),
            Err("offline".into()),
            Err("offline".into()),
            Err("offline".into()),
        ],
        450.0,
    );
    let h = start(router, t0());
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(1).await;
    assert_eq!(h.router.calls(), 1);
    assert_eq!(phase(&h), Phase::Travelling);
    h.clock.advance_secs(100);

    // Failures at 15, 30 and 45 seconds.
    settle(49).await;
    assert_eq!(h.router.calls(), 4);
    let snapshot = h.session.snapshot().unwrap();
    assert_eq!(snapshot.phase, Phase::Travelling);
    assert_eq!(snapshot.expected_travel_secs, Some(500));
    assert_eq!(snapshot.eta_sampled_at, Some(t0()));
    assert_eq!(snapshot.timing.elapsed_secs, 100);

    // The refresh keeps its cadence and the next success replaces the sample.
    settle(11).await;
    assert_eq!(h.router.calls(), 5);
    let snapshot = h.session.snapshot().unwrap();
    assert_eq!(snapshot.expected_travel_secs, Some(450));
    assert_eq!(snapshot.eta_sampled_at, Some(t0() + chrono::Duration::seconds(100)));

    let machine = h.session.end().await.unwrap();
    assert_eq!(machine.eta().map(|s| s.expected_travel_secs), Some(450));
}

#[tokio::test(start_paused = true)]
async fn unusable_durations_count_as_routing_failures() {
    let router = ScriptedRouter::new(vec![Ok(f64::NAN), Ok(-5.0), Ok(f64::INFINITY)], 500.0);
    let h = start(router, t0());
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(40).await;
    assert_eq!(h.router.calls(), 3);
    let snapshot = h.session.snapshot().unwrap();
    assert_eq!(snapshot.phase, Phase::CalculatingDirections);
    assert_eq!(snapshot.expected_travel_secs, None);

    settle(10).await;
    assert_eq!(h.router.calls(), 4);
    assert_eq!(phase(&h), Phase::Travelling);

    h.session.end().await;
}

#[tokio::test(start_paused = true)]
async fn returning_alerts_exactly_once_and_end_clears_notifications() {
    let h = start(ScriptedRouter::new(vec![], 400.0), t0() + chrono::Duration::seconds(3050));
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(2).await;
    assert_eq!(phase(&h), Phase::Returning);
    assert_eq!(h.notifier.scheduled.lock().unwrap().len(), 2);

    // Keep ticking and refreshing well into Late.
    for _ in 0..10 {
        h.clock.advance_secs(30);
        settle(20).await;
    }
    assert_eq!(phase(&h), Phase::Late);
    assert_eq!(h.notifier.scheduled.lock().unwrap().len(), 2);

    let id = h.session.id();
    let machine = h.session.end().await.expect("machine handed back");
    assert!(machine.alarm_triggered());
    assert_eq!(h.notifier.cleared.lock().unwrap().as_slice(), &[id]);
}

#[tokio::test(start_paused = true)]
async fn no_position_means_no_requests_and_no_alarm() {
    let h = start(ScriptedRouter::new(vec![], 400.0), t0());

    for _ in 0..5 {
        h.clock.advance_secs(1200);
        settle(60).await;
    }
    assert_eq!(h.router.calls(), 0);
    let snapshot = h.session.snapshot().unwrap();
    assert_eq!(snapshot.phase, Phase::CalculatingDirections);
    assert!(!snapshot.alarm_triggered);
    assert!(h.notifier.scheduled.lock().unwrap().is_empty());

    h.session.end().await;
}

#[tokio::test(start_paused = true)]
async fn never_more_than_one_request_in_flight() {
    let router = ScriptedRouter::new(vec![], 500.0).with_latency(Duration::from_secs(20));
    let h = start(router, t0());
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(200).await;
    assert!(h.router.calls() >= 5, "calls = {}", h.router.calls());
    assert_eq!(h.router.max_in_flight.load(Ordering::SeqCst), 1);

    h.session.end().await;
}

#[tokio::test(start_paused = true)]
async fn response_after_end_is_never_applied() {
    let router = ScriptedRouter::new(vec![], 500.0).with_latency(Duration::from_secs(60));
    let h = start(router, t0());
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(1).await;
    assert_eq!(h.router.calls(), 1);

    let router = h.router.clone();
    let machine = h.session.end().await.expect("machine handed back");
    assert!(machine.eta().is_none());
    assert_eq!(machine.phase(), Phase::CalculatingDirections);

    settle(120).await;
    assert_eq!(router.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn full_route_is_requested_once_alarming() {
    let h = start(ScriptedRouter::new(vec![], 400.0), t0() + chrono::Duration::seconds(3050));
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();

    settle(20).await;
    let requests = h.router.requests.lock().unwrap().clone();
    assert!(requests.len() >= 2);
    assert_eq!(requests[0].detail, RouteDetail::EtaOnly);
    assert_eq!(requests[1].detail, RouteDetail::FullRoute);
    assert_eq!(requests[0].origin, out_there());
    assert_eq!(requests[0].destination, home());

    h.session.end().await;
}

#[tokio::test(start_paused = true)]
async fn positions_are_traced_and_broadcast() {
    let h = start(ScriptedRouter::new(vec![], 500.0), t0());
    let mut events = h.session.subscribe();

    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();
    h.locations.send(LocationUpdate::Authorization(false)).await.unwrap();
    h.locations.send(LocationUpdate::Position(home())).await.unwrap();
    settle(1).await;

    let mut recorded = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::PositionRecorded { coordinate, trace_len } = event {
            recorded.push((coordinate, trace_len));
        }
    }
    assert_eq!(recorded, vec![(out_there(), 1), (home(), 2)]);

    let machine = h.session.end().await.unwrap();
    assert_eq!(machine.trace().points(), &[out_there(), home()]);
}

#[tokio::test(start_paused = true)]
async fn watch_channel_publishes_latest_snapshot() {
    let h = start(ScriptedRouter::new(vec![], 500.0), t0());
    let mut watch = h.session.watch();
    h.locations.send(LocationUpdate::Position(out_there())).await.unwrap();
    settle(2).await;

    watch.mark_changed();
    let snapshot = watch.borrow_and_update().clone().expect("snapshot published");
    assert_eq!(snapshot.phase, Phase::Travelling);
    assert_eq!(snapshot.projection.title_text.as_deref(), Some("Enjoy"));

    h.session.end().await;
    assert!(watch.borrow().is_none());
}
