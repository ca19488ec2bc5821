//! Offline router: great-circle distance scaled by a detour factor, at walking pace.

use async_trait::async_trait;

use super::{RouteDetail, RouteEstimate, RouteRequest, Router};
use crate::error::RoutingError;

pub struct StraightLineRouter {
    walking_speed_mps: f64,
    detour_factor: f64,
}

impl Default for StraightLineRouter {
    fn default() -> Self {
        Self {
            walking_speed_mps: 1.4,
            detour_factor: 1.3,
        }
    }
}

impl StraightLineRouter {
    pub fn new(walking_speed_mps: f64, detour_factor: f64) -> Self {
        Self {
            walking_speed_mps,
            detour_factor,
        }
    }
}

#[async_trait]
impl Router for StraightLineRouter {
    fn name(&self) -> &str {
        "straight_line"
    }

    async fn estimate(&self, request: &RouteRequest) -> Result<RouteEstimate, RoutingError> {
        if !self.walking_speed_mps.is_finite() || self.walking_speed_mps <= 0.0 {
            return Err(RoutingError::Unavailable(format!(
                "walking speed must be positive (got {})",
                self.walking_speed_mps
            )));
        }
        let distance = request.origin.distance_m(&request.destination) * self.detour_factor.max(1.0);
        let polyline = match request.detail {
            RouteDetail::EtaOnly => Vec::new(),
            RouteDetail::FullRoute => vec![request.origin, request.destination],
        };
        Ok(RouteEstimate {
            duration_secs: distance / self.walking_speed_mps,
            polyline,
        })
    }
}
