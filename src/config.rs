//! Runtime configuration handed to the session and provider clients.

use std::env;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::fare::MAX_SEATS;
use crate::geo::GeoPoint;
use crate::traits::Place;
use crate::viewport::{DEFAULT_LATITUDE_SPAN, DEFAULT_LONGITUDE_SPAN, DEFAULT_MARGIN_FACTOR, MIN_SPAN};

/// Base fuel price per km, in rupees.
pub const BASE_FUEL_PRICE: f64 = 10.0;

/// Average driving speed assumed for the straight-line fallback route.
const DEFAULT_FALLBACK_SPEED_KMH: f64 = 40.0;

#[derive(Debug, Clone)]
pub struct ViewportSettings {
    pub margin_factor: f64,
    pub min_span: f64,
    pub default_latitude_span: f64,
    pub default_longitude_span: f64,
    /// Span used while following a live position.
    pub tracking_span: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            margin_factor: DEFAULT_MARGIN_FACTOR,
            min_span: MIN_SPAN,
            default_latitude_span: DEFAULT_LATITUDE_SPAN,
            default_longitude_span: DEFAULT_LONGITUDE_SPAN,
            tracking_span: 0.005,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FareSettings {
    pub base_unit_price_per_km: f64,
    pub max_seats: u32,
}

impl Default for FareSettings {
    fn default() -> Self {
        Self {
            base_unit_price_per_km: BASE_FUEL_PRICE,
            max_seats: MAX_SEATS,
        }
    }
}

/// Options passed to a live position source.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    /// Minimum movement before a new sample is emitted.
    pub distance_filter_meters: f64,
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            distance_filter_meters: 10.0,
            interval_ms: 5000,
            fastest_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub api_base_url: String,
    pub maps_base_url: String,
    pub maps_api_key: String,
    /// ISO country code restricting place suggestions.
    pub country_filter: Option<String>,
    pub request_timeout_secs: u64,
    pub location_timeout_secs: u64,
    pub default_location: GeoPoint,
    pub default_origin: Place,
    pub default_destination: Place,
    pub viewport: ViewportSettings,
    pub fare: FareSettings,
    pub fallback_speed_kmh: f64,
    pub watch: WatchOptions,
}

impl Default for RouteConfig {
    fn default() -> Self {
        let downtown = karachi(24.8607, 67.0011);
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            maps_base_url: "https://maps.googleapis.com/maps/api".to_string(),
            maps_api_key: String::new(),
            country_filter: Some("pk".to_string()),
            request_timeout_secs: 10,
            location_timeout_secs: 3,
            default_location: downtown,
            default_origin: Place::new("Downtown Karachi", downtown),
            default_destination: Place::new("North Karachi", karachi(24.8934, 67.0281)),
            viewport: ViewportSettings::default(),
            fare: FareSettings::default(),
            fallback_speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
            watch: WatchOptions::default(),
        }
    }
}

const fn karachi(latitude: f64, longitude: f64) -> GeoPoint {
    GeoPoint::new_unchecked(latitude, longitude)
}

impl RouteConfig {
    /// Loads `.env` if present, then reads overrides from the environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from defaults overridden by `lookup(key)`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("MAPS_BASE_URL") {
            config.maps_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup("MAPS_API_KEY") {
            config.maps_api_key = key;
        }
        if let Some(country) = lookup("PLACES_COUNTRY") {
            let country = country.trim().to_lowercase();
            config.country_filter = (!country.is_empty()).then_some(country);
        }
        if let Some(value) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_var("REQUEST_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("LOCATION_TIMEOUT_SECS") {
            config.location_timeout_secs = parse_var("LOCATION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("BASE_FUEL_PRICE") {
            let price: f64 = parse_var("BASE_FUEL_PRICE", &value)?;
            if !price.is_finite() || price < 0.0 {
                return Err(Error::Config(format!("BASE_FUEL_PRICE must be non-negative, got {value}")));
            }
            config.fare.base_unit_price_per_km = price;
        }
        if let Some(value) = lookup("FALLBACK_SPEED_KMH") {
            let speed: f64 = parse_var("FALLBACK_SPEED_KMH", &value)?;
            if !speed.is_finite() || speed <= 0.0 {
                return Err(Error::Config(format!("FALLBACK_SPEED_KMH must be positive, got {value}")));
            }
            config.fallback_speed_kmh = speed;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} has unparsable value {value:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RouteConfig::default();
        assert_eq!(config.fare.base_unit_price_per_km, 10.0);
        assert_eq!(config.fare.max_seats, 100);
        assert_eq!(config.viewport.margin_factor, 1.5);
        assert_eq!(config.country_filter.as_deref(), Some("pk"));
        assert_eq!(config.default_origin.name, "Downtown Karachi");
        assert_eq!(config.default_destination.point.latitude(), 24.8934);
    }

    #[test]
    fn test_overrides() {
        let config = RouteConfig::from_lookup(lookup_from(&[
            ("API_BASE_URL", "http://10.0.0.2:3000/api/"),
            ("MAPS_API_KEY", "secret"),
            ("PLACES_COUNTRY", ""),
            ("REQUEST_TIMEOUT_SECS", "4"),
            ("BASE_FUEL_PRICE", "12.5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.2:3000/api");
        assert_eq!(config.maps_api_key, "secret");
        assert_eq!(config.country_filter, None);
        assert_eq!(config.request_timeout_secs, 4);
        assert_eq!(config.fare.base_unit_price_per_km, 12.5);
    }

    #[test]
    fn test_unparsable_value() {
        let err = RouteConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = RouteConfig::from_lookup(lookup_from(&[("FALLBACK_SPEED_KMH", "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
