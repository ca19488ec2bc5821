//! # Wander Core Library
//!
//! This library provides the return-timing engine for Wander: given when a walk
//! started, how long it may last, a safety buffer, and a regularly refreshed
//! estimate of the walk home, it decides whether the walker can keep going,
//! should head back, or is already late, and raises a single alert when it is
//! time to turn around.
//!
//! ## Architecture
//!
//! - **Journey State Machine**: a pure transition function over clock ticks,
//!   ETA samples and position samples that returns the events each update produced
//! - **Session Runtime**: tokio tasks that feed the machine from a clock, a
//!   location stream and a router, and hand alerts to a notifier
//! - **Routing**: an OSRM HTTP client and an offline straight-line estimator
//! - **Storage**: TOML configuration and a SQLite record of the last journey
//!
//! ## Key Components
//!
//! - [`JourneyMachine`]: Core state machine
//! - [`Session`]: Async runtime around one machine
//! - [`Router`] / [`Notifier`] / [`Clock`]: Collaborator traits
//! - [`Config`]: Application configuration management
//! - [`Database`]: Last-journey persistence

pub mod alert;
pub mod clock;
pub mod error;
pub mod events;
pub mod geo;
pub mod journey;
pub mod location;
pub mod presentation;
pub mod routing;
pub mod session;
pub mod storage;

pub use alert::{AlertDispatcher, NotificationRequest, Notifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, NotificationError, RoutingError, ValidationError};
pub use events::Event;
pub use geo::Coordinate;
pub use journey::{EtaSample, Journey, JourneyMachine, JourneyRecord, Phase, Snapshot, Timing};
pub use location::LocationUpdate;
pub use presentation::{Projection, StatusColor};
pub use routing::{OsrmRouter, RouteDetail, RouteEstimate, RouteRequest, Router, StraightLineRouter};
pub use session::{Collaborators, Session, SessionConfig};
pub use storage::{Config, Database};
