//! Seams to the external collaborators of a route session.
//!
//! Directions, places lookups, the ride backend and the device position
//! feed are all outside this crate. Concrete clients live in `google`,
//! `osrm` and `rides`; tests provide their own implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WatchOptions;
use crate::error::Result;
use crate::geo::GeoPoint;

/// A named location chosen by the user or seeded from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub point: GeoPoint,
}

impl Place {
    pub fn new(name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            name: name.into(),
            point,
        }
    }
}

impl From<GeoPoint> for Place {
    fn from(point: GeoPoint) -> Self {
        Self::new(String::new(), point)
    }
}

/// One autocomplete candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub description: String,
}

/// One provider-defined segment of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// One route proposed by a directions provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Encoded polyline of the whole route.
    pub overview_path: String,
    pub legs: Vec<Leg>,
}

/// Directions answer. An empty `routes` means "no route", not a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    pub routes: Vec<RouteCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RideId(pub String);

/// Ride metadata stored when tracking starts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRide {
    pub origin: Place,
    pub destination: Place,
    pub per_seat_fare: f64,
    pub seat_count: u32,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// An active ride as listed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RideSummary {
    pub id: RideId,
    pub origin: Place,
    pub destination: Place,
}

/// One reading from the device position feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub point: GeoPoint,
    /// Horizontal accuracy in meters, when reported.
    pub accuracy: Option<f64>,
    /// Ground speed in m/s, when reported.
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn at(point: GeoPoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            point,
            accuracy: None,
            speed: None,
            timestamp,
        }
    }
}

/// Computes routes between two points.
pub trait DirectionsProvider {
    fn directions(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Directions>;
}

/// Place autocomplete and lookup.
pub trait PlacesProvider {
    fn autocomplete(&self, text: &str, country: Option<&str>) -> Result<Vec<Suggestion>>;

    fn details(&self, id: &str) -> Result<GeoPoint>;
}

/// Backend that records rides and their live positions.
pub trait RideStore {
    fn create_ride(&self, ride: &NewRide) -> Result<RideId>;

    fn update_location(&self, ride: &RideId, sample: &PositionSample) -> Result<()>;

    fn end_ride(&self, ride: &RideId) -> Result<()>;

    fn active_rides(&self) -> Result<Vec<RideSummary>>;
}

/// Live device positions.
///
/// `watch` starts a fresh, possibly endless, sequence of samples. Dropping
/// the iterator unsubscribes.
pub trait PositionSource {
    type Samples: Iterator<Item = PositionSample>;

    fn watch(&mut self, options: &WatchOptions) -> Self::Samples;
}

impl<T: DirectionsProvider + ?Sized> DirectionsProvider for &T {
    fn directions(&self, origin: GeoPoint, destination: GeoPoint) -> Result<Directions> {
        (**self).directions(origin, destination)
    }
}

impl<T: PlacesProvider + ?Sized> PlacesProvider for &T {
    fn autocomplete(&self, text: &str, country: Option<&str>) -> Result<Vec<Suggestion>> {
        (**self).autocomplete(text, country)
    }

    fn details(&self, id: &str) -> Result<GeoPoint> {
        (**self).details(id)
    }
}

impl<T: RideStore + ?Sized> RideStore for &T {
    fn create_ride(&self, ride: &NewRide) -> Result<RideId> {
        (**self).create_ride(ride)
    }

    fn update_location(&self, ride: &RideId, sample: &PositionSample) -> Result<()> {
        (**self).update_location(ride, sample)
    }

    fn end_ride(&self, ride: &RideId) -> Result<()> {
        (**self).end_ride(ride)
    }

    fn active_rides(&self) -> Result<Vec<RideSummary>> {
        (**self).active_rides()
    }
}
