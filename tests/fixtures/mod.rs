//! Test fixtures for ride-route.
//!
//! Provides realistic test data including:
//! - Real Karachi locations (from OpenStreetMap)
//! - A road-following path between two of them

pub mod karachi_locations;

pub use karachi_locations::*;
