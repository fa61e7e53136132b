//! HTTP client for the ride backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RouteConfig;
use crate::error::{Error, Provider, Result};
use crate::geo::GeoPoint;
use crate::session::{format_distance, format_duration};
use crate::traits::{NewRide, Place, PositionSample, RideId, RideStore, RideSummary};

#[derive(Debug, Clone)]
pub struct RideApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Live location pushes give up sooner than other calls.
    pub location_timeout_secs: u64,
}

impl From<&RouteConfig> for RideApiConfig {
    fn from(config: &RouteConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            timeout_secs: config.request_timeout_secs,
            location_timeout_secs: config.location_timeout_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RideApiClient {
    config: RideApiConfig,
    client: reqwest::blocking::Client,
}

impl RideApiClient {
    pub fn new(config: RideApiConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| Error::Config(format!("cannot build HTTP client: {err}")))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

fn backend_error(err: reqwest::Error) -> Error {
    Error::unavailable(Provider::Backend, err)
}

impl RideStore for RideApiClient {
    fn create_ride(&self, ride: &NewRide) -> Result<RideId> {
        let body = RideBody::from(ride);
        let created: CreatedRide = self
            .client
            .post(self.url("/rides"))
            .json(&body)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(backend_error)?;

        tracing::info!(ride_id = %created.id, "ride created");
        Ok(RideId(created.id))
    }

    fn update_location(&self, ride: &RideId, sample: &PositionSample) -> Result<()> {
        self.client
            .patch(self.url(&format!("/rides/{}/location", ride.0)))
            .timeout(Duration::from_secs(self.config.location_timeout_secs))
            .json(&LocationBody::from(sample))
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(backend_error)?;
        Ok(())
    }

    fn end_ride(&self, ride: &RideId) -> Result<()> {
        self.client
            .patch(self.url(&format!("/rides/{}/end", ride.0)))
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(backend_error)?;

        tracing::info!(ride_id = %ride.0, "ride ended");
        Ok(())
    }

    fn active_rides(&self) -> Result<Vec<RideSummary>> {
        let rides: Vec<ListedRide> = self
            .client
            .get(self.url("/rides"))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())
            .map_err(backend_error)?;

        Ok(summaries(rides))
    }
}

/// Drops rides whose stored endpoints are not valid coordinates.
fn summaries(rides: Vec<ListedRide>) -> Vec<RideSummary> {
    rides
        .into_iter()
        .filter_map(|ride| {
            let id = ride.id.clone();
            match ride.into_summary() {
                Ok(summary) => Some(summary),
                Err(err) => {
                    tracing::warn!(ride_id = %id, error = %err, "skipping malformed ride");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedPlace {
    #[serde(default)]
    name: String,
    coordinates: Coordinates,
}

impl From<&Place> for NamedPlace {
    fn from(place: &Place) -> Self {
        Self {
            name: place.name.clone(),
            coordinates: Coordinates {
                latitude: place.point.latitude(),
                longitude: place.point.longitude(),
            },
        }
    }
}

impl NamedPlace {
    fn into_place(self) -> Result<Place> {
        let point = GeoPoint::new(self.coordinates.latitude, self.coordinates.longitude)?;
        Ok(Place::new(self.name, point))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RideBody {
    from: NamedPlace,
    to: NamedPlace,
    /// The backend's `totalFare` holds the per-seat amount.
    total_fare: String,
    seats: u32,
    distance: String,
    duration: String,
}

impl From<&NewRide> for RideBody {
    fn from(ride: &NewRide) -> Self {
        Self {
            from: NamedPlace::from(&ride.origin),
            to: NamedPlace::from(&ride.destination),
            total_fare: format!("{:.2}", ride.per_seat_fare),
            seats: ride.seat_count,
            distance: format_distance(ride.distance_meters),
            duration: format_duration(ride.duration_seconds),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRide {
    #[serde(rename = "_id", alias = "id")]
    id: String,
}

#[derive(Debug, Serialize)]
struct LocationBody {
    latitude: String,
    longitude: String,
    timestamp: i64,
    accuracy: Option<f64>,
    speed: Option<f64>,
}

impl From<&PositionSample> for LocationBody {
    fn from(sample: &PositionSample) -> Self {
        Self {
            latitude: format!("{:.6}", sample.point.latitude()),
            longitude: format!("{:.6}", sample.point.longitude()),
            timestamp: sample.timestamp.timestamp_millis(),
            accuracy: sample.accuracy,
            speed: sample.speed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListedRide {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    from: NamedPlace,
    to: NamedPlace,
}

impl ListedRide {
    fn into_summary(self) -> Result<RideSummary> {
        Ok(RideSummary {
            id: RideId(self.id),
            origin: self.from.into_place()?,
            destination: self.to.into_place()?,
        })
    }
}
