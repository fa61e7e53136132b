//! Per-seat fare from route distance, seat count and fuel price.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Upper bound on seats a driver may offer.
pub const MAX_SEATS: u32 = 100;

/// Validated inputs of a fare computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareInputs {
    pub distance_meters: f64,
    pub seat_count: u32,
    pub unit_price_per_km: f64,
}

impl FareInputs {
    pub fn new(distance_meters: f64, seat_count: u32, unit_price_per_km: f64) -> Result<Self> {
        check_non_negative("distance", distance_meters)?;
        check_non_negative("unit price", unit_price_per_km)?;
        check_seat_count(i64::from(seat_count), MAX_SEATS)?;
        Ok(Self {
            distance_meters,
            seat_count,
            unit_price_per_km,
        })
    }

    pub fn fare(&self) -> Result<Fare> {
        compute_fare(self.distance_meters, self.seat_count, self.unit_price_per_km)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fare {
    /// Amount each passenger pays, rounded to 2 decimals.
    pub per_seat_amount: f64,
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.per_seat_amount)
    }
}

/// `round2(unit_price_per_km * km / seat_count)`.
pub fn compute_fare(distance_meters: f64, seat_count: u32, unit_price_per_km: f64) -> Result<Fare> {
    check_non_negative("distance", distance_meters)?;
    check_non_negative("unit price", unit_price_per_km)?;
    check_seat_count(i64::from(seat_count), MAX_SEATS)?;

    let trip_cost = unit_price_per_km * (distance_meters / 1000.0);
    Ok(Fare {
        per_seat_amount: round2(trip_cost / f64::from(seat_count)),
    })
}

/// Rounds half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parses a seat count typed by the driver. Blank input is an error,
/// never an implicit single seat.
pub fn parse_seat_count(text: &str, max_seats: u32) -> Result<u32> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!("seat count {text:?} is not a number")));
    }
    let count: i64 = trimmed
        .parse()
        .map_err(|_| Error::InvalidSeatCount { count: i64::MAX, max: max_seats })?;
    check_seat_count(count, max_seats)?;
    Ok(count as u32)
}

/// Parses a fuel price per km. Blank input falls back to `default`.
pub fn parse_unit_price(text: &str, default: f64) -> Result<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(Error::InvalidInput(format!("unit price {text:?} is not a number")));
    }
    let price: f64 = trimmed
        .parse()
        .map_err(|_| Error::InvalidInput(format!("unit price {text:?} is not a number")))?;
    check_non_negative("unit price", price)?;
    Ok(price)
}

fn check_seat_count(count: i64, max_seats: u32) -> Result<()> {
    if count < 1 || count > i64::from(max_seats) {
        return Err(Error::InvalidSeatCount {
            count,
            max: max_seats,
        });
    }
    Ok(())
}

fn check_non_negative(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidInput(format!("{what} must be a non-negative number, got {value}")));
    }
    Ok(())
}
