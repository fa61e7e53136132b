//! Real Karachi locations for realistic test fixtures.
//!
//! Coordinates sourced from OpenStreetMap. They are routable with an OSRM
//! Pakistan extract.

use ride_route::GeoPoint;
use ride_route::traits::Place;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng).expect("fixture coordinates are valid")
    }

    pub fn place(&self) -> Place {
        Place::new(self.name, self.point())
    }
}

pub const SADDAR: Location = Location::new("Empress Market, Saddar", 24.8605, 67.0290);
pub const CLIFTON: Location = Location::new("Clifton Beach", 24.7925, 67.0297);
pub const GULSHAN: Location = Location::new("Gulshan-e-Iqbal Block 6", 24.9226, 67.0937);
pub const AIRPORT: Location = Location::new("Jinnah International Airport", 24.9008, 67.1681);

/// Road-following points from Saddar to Gulshan, in driving order.
pub const SADDAR_TO_GULSHAN: &[Location] = &[
    SADDAR,
    Location::new("Shahrah-e-Quaideen", 24.8703, 67.0465),
    Location::new("Tariq Road", 24.8761, 67.0593),
    Location::new("Shaheed-e-Millat Road", 24.8869, 67.0754),
    Location::new("Hassan Square", 24.9103, 67.0859),
    GULSHAN,
];

pub fn points(locations: &[Location]) -> Vec<GeoPoint> {
    locations.iter().map(Location::point).collect()
}
