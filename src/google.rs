//! Google Maps web service adapter for directions and place lookups.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::RouteConfig;
use crate::error::{Error, Provider, Result};
use crate::geo::GeoPoint;
use crate::traits::{Directions, DirectionsProvider, Leg, PlacesProvider, RouteCandidate, Suggestion};

#[derive(Debug, Clone)]
pub struct GoogleMapsConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl From<&RouteConfig> for GoogleMapsConfig {
    fn from(config: &RouteConfig) -> Self {
        Self {
            base_url: config.maps_base_url.clone(),
            api_key: config.maps_api_key.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    config: GoogleMapsConfig,
    client: reqwest::blocking::Client,
}

impl GoogleMapsClient {
    pub fn new(config: GoogleMapsConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| Error::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(Self { config, client })
    }

    fn get<T: DeserializeOwned>(&self, provider: Provider, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.config.base_url, path);
        tracing::debug!(%url, "maps request");

        self.client
            .get(url)
            .query(query)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<T>())
            .map_err(|err| Error::unavailable(provider, err))
    }
}

impl DirectionsProvider for GoogleMapsClient {
    fn directions(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Directions> {
        let body: DirectionsResponse = self.get(
            Provider::Directions,
            "directions/json",
            &[("origin", lat_lng(&origin)), ("destination", lat_lng(&destination))],
        )?;
        body.into_directions()
    }
}

impl PlacesProvider for GoogleMapsClient {
    fn autocomplete(&self, text: &str, country: Option<&str>) -> Result<Vec<Suggestion>> {
        let mut query = vec![("input", text.to_string())];
        if let Some(country) = country {
            query.push(("components", format!("country:{country}")));
        }
        let body: AutocompleteResponse = self.get(Provider::Places, "place/autocomplete/json", &query)?;
        body.into_suggestions()
    }

    fn details(&self, id: &str) -> Result<GeoPoint> {
        let body: DetailsResponse = self.get(
            Provider::Places,
            "place/details/json",
            &[("place_id", id.to_string())],
        )?;
        body.into_point()
    }
}

fn lat_lng(point: &GeoPoint) -> String {
    format!("{:.6},{:.6}", point.latitude(), point.longitude())
}

/// Statuses that mean "nothing found" rather than a failed call.
fn is_empty_status(status: &str) -> bool {
    matches!(status, "ZERO_RESULTS" | "NOT_FOUND")
}

fn check_status(provider: Provider, status: &str, message: Option<String>) -> Result<()> {
    if status == "OK" || is_empty_status(status) {
        return Ok(());
    }
    let reason = match message {
        Some(message) => format!("{status}: {message}"),
        None => status.to_string(),
    };
    Err(Error::unavailable(provider, reason))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Debug, Deserialize)]
struct GoogleRoute {
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    legs: Vec<GoogleLeg>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct GoogleLeg {
    distance: ValueText,
    duration: ValueText,
}

#[derive(Debug, Deserialize)]
struct ValueText {
    value: f64,
}

impl DirectionsResponse {
    pub(crate) fn into_directions(self) -> Result<Directions> {
        check_status(Provider::Directions, &self.status, self.error_message)?;
        let routes = self
            .routes
            .into_iter()
            .map(|route| RouteCandidate {
                overview_path: route.overview_polyline.points,
                legs: route
                    .legs
                    .into_iter()
                    .map(|leg| Leg {
                        distance_meters: leg.distance.value,
                        duration_seconds: leg.duration.value,
                    })
                    .collect(),
            })
            .collect();
        Ok(Directions { routes })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AutocompleteResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    place_id: String,
    description: String,
}

impl AutocompleteResponse {
    pub(crate) fn into_suggestions(self) -> Result<Vec<Suggestion>> {
        check_status(Provider::Places, &self.status, self.error_message)?;
        Ok(self
            .predictions
            .into_iter()
            .map(|p| Suggestion {
                id: p.place_id,
                description: p.description,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl DetailsResponse {
    pub(crate) fn into_point(self) -> Result<GeoPoint> {
        check_status(Provider::Places, &self.status, self.error_message)?;
        let location = self
            .result
            .ok_or_else(|| Error::unavailable(Provider::Places, format!("{} without a result", self.status)))?
            .geometry
            .location;
        GeoPoint::new(location.lat, location.lng)
    }
}
