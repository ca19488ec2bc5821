//! OSRM-compatible HTTP router (`/route/v1/foot/...`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{RouteDetail, RouteEstimate, RouteRequest, Router};
use crate::error::RoutingError;
use crate::geo::Coordinate;

pub struct OsrmRouter {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    duration: f64,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lon, lat]` pairs.
    coordinates: Vec<[f64; 2]>,
}

impl OsrmRouter {
    /// # Errors
    /// Returns `InvalidResponse` if `base_url` does not parse, or `Http` if the
    /// client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RoutingError::InvalidResponse(format!("invalid base url '{base_url}': {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn route_url(&self, request: &RouteRequest) -> Result<Url, RoutingError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = format!(
            "{base}/route/v1/foot/{},{};{},{}",
            request.origin.longitude,
            request.origin.latitude,
            request.destination.longitude,
            request.destination.latitude,
        );
        let mut url = Url::parse(&path).map_err(|e| RoutingError::InvalidResponse(e.to_string()))?;
        let overview = match request.detail {
            RouteDetail::EtaOnly => "false",
            RouteDetail::FullRoute => "full",
        };
        url.query_pairs_mut()
            .append_pair("overview", overview)
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

#[async_trait]
impl Router for OsrmRouter {
    fn name(&self) -> &str {
        "osrm"
    }

    async fn estimate(&self, request: &RouteRequest) -> Result<RouteEstimate, RoutingError> {
        let url = self.route_url(request)?;
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RoutingError::Status { status, body });
        }

        let body: RouteResponse = resp.json().await?;
        if body.code != "Ok" {
            return Err(RoutingError::NoRoute { code: body.code });
        }
        let route = body.routes.into_iter().next().ok_or_else(|| RoutingError::NoRoute {
            code: "EmptyRoutes".into(),
        })?;
        if !route.duration.is_finite() || route.duration < 0.0 {
            return Err(RoutingError::InvalidResponse(format!(
                "duration out of range: {}",
                route.duration
            )));
        }

        let polyline = route
            .geometry
            .map(|g| {
                g.coordinates
                    .into_iter()
                    .filter_map(|[lon, lat]| Coordinate::new(lat, lon).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(RouteEstimate {
            duration_secs: route.duration,
            polyline,
        })
    }
}
