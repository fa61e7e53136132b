//! ride-route core
//!
//! Route geometry, map framing, fare pricing and live ride tracking for a
//! ride-sharing client. Directions, places, the ride backend and device
//! positions are reached through the traits in [`traits`].

pub mod error;
pub mod config;
pub mod geo;
pub mod polyline;
pub mod viewport;
pub mod fare;
pub mod traits;
pub mod google;
pub mod osrm;
pub mod rides;
pub mod picker;
pub mod playback;
pub mod session;

pub use error::{Error, Provider, Result};
pub use geo::GeoPoint;
pub use polyline::Polyline;
pub use session::{RouteSession, RouteSnapshot, SessionState};
