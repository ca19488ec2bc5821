//! Routing collaborators.
//!
//! The engine only needs one thing from a router: how long it will take to walk
//! from here back to the return location. Implementations are injected as
//! `Arc<dyn Router>` so tests can substitute scripted fakes.

mod osrm;
mod straight_line;

pub use osrm::OsrmRouter;
pub use straight_line::StraightLineRouter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::RoutingError;
use crate::geo::Coordinate;
use crate::storage::config::{RoutingConfig, RoutingProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
}

/// How much of the route the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDetail {
    /// Duration only.
    EtaOnly,
    /// Duration plus the route geometry.
    FullRoute,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: TravelMode,
    pub detail: RouteDetail,
}

impl RouteRequest {
    pub fn walking(origin: Coordinate, destination: Coordinate, detail: RouteDetail) -> Self {
        Self {
            origin,
            destination,
            mode: TravelMode::Walking,
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEstimate {
    pub duration_secs: f64,
    pub polyline: Vec<Coordinate>,
}

#[async_trait]
pub trait Router: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn estimate(&self, request: &RouteRequest) -> Result<RouteEstimate, RoutingError>;
}

/// Build the router selected in the configuration.
///
/// # Errors
/// Returns an error if the OSRM base URL is invalid or its HTTP client cannot be built.
pub fn from_config(config: &RoutingConfig) -> Result<Arc<dyn Router>, RoutingError> {
    let router: Arc<dyn Router> = match config.provider {
        RoutingProvider::Osrm => Arc::new(OsrmRouter::new(
            &config.osrm_base_url,
            Duration::from_secs(config.timeout_secs),
        )?),
        RoutingProvider::StraightLine => Arc::new(StraightLineRouter::new(
            config.walking_speed_mps,
            config.detour_factor,
        )),
    };
    Ok(router)
}
