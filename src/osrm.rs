//! OSRM HTTP adapter for route geometries.

use serde::Deserialize;

use crate::error::{Error, Provider, Result};
use crate::geo::GeoPoint;
use crate::traits::{Directions, DirectionsProvider, Leg, RouteCandidate};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| Error::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(Self { config, client })
    }

    fn route_url(&self, origin: &GeoPoint, destination: &GeoPoint) -> String {
        // OSRM wants lng,lat pairs
        let coords = [origin, destination]
            .iter()
            .map(|p| format!("{:.6},{:.6}", p.longitude(), p.latitude()))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/route/v1/{}/{}?overview=full&geometries=polyline",
            self.config.base_url, self.config.profile, coords
        )
    }
}

impl DirectionsProvider for OsrmClient {
    fn directions(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Directions> {
        let url = self.route_url(&origin, &destination);
        tracing::debug!(%url, "osrm route request");

        // OSRM answers NoRoute with a 400 and a JSON body, so the status is
        // not checked before parsing.
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.json::<OsrmRouteResponse>())
            .map_err(|err| Error::unavailable(Provider::Directions, err))?;

        body.into_directions()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    distance: f64,
    duration: f64,
}

impl OsrmRouteResponse {
    pub(crate) fn into_directions(self) -> Result<Directions> {
        match self.code.as_str() {
            "Ok" => {}
            "NoRoute" | "NoSegment" => return Ok(Directions::default()),
            other => {
                let reason = match self.message {
                    Some(message) => format!("{other}: {message}"),
                    None => other.to_string(),
                };
                return Err(Error::unavailable(Provider::Directions, reason));
            }
        }

        let routes = self
            .routes
            .into_iter()
            .map(|route| RouteCandidate {
                overview_path: route.geometry,
                legs: route
                    .legs
                    .into_iter()
                    .map(|leg| Leg {
                        distance_meters: leg.distance,
                        duration_seconds: leg.duration,
                    })
                    .collect(),
            })
            .collect();
        Ok(Directions { routes })
    }
}
