//! Route geometries and the encoded polyline format.
//!
//! Directions providers ship geometries as encoded polylines: each
//! coordinate is scaled by 1e5, delta-coded against the previous point,
//! zig-zag signed and split into 5-bit groups offset by 63 into printable
//! ASCII. [`decode`] turns such a string into a [`Polyline`]; [`encode`] is
//! the inverse.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

const PRECISION: f64 = 1e5;
const ASCII_OFFSET: u8 = 63;
const CONTINUATION_BIT: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;
/// More groups than this cannot come from a coordinate in range.
const MAX_SHIFT: u32 = 35;

/// A route geometry as an ordered sequence of points, origin first.
///
/// A polyline is never edited in place; a new route produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<GeoPoint>,
}

impl Polyline {
    /// Creates a new Polyline from decoded coordinate points.
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    /// Two-point straight line between the endpoints, used when no road
    /// geometry is available.
    pub fn straight_line(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self::new(vec![origin, destination])
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// An empty polyline means "no route available".
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&GeoPoint> {
        self.points.last()
    }

    /// Sum of great-circle distances between consecutive points.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].haversine_km(&pair[1]))
            .sum()
    }
}

/// Decodes an encoded polyline.
///
/// The whole string must be consumed: a trailing partial group or a
/// latitude without its longitude is rejected rather than dropped.
pub fn decode(encoded: &str) -> Result<Polyline> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += next_value(bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(Error::MalformedPath {
                offset: index,
                reason: "latitude without longitude",
            });
        }
        lng += next_value(bytes, &mut index)?;

        let point = GeoPoint::new(lat as f64 / PRECISION, lng as f64 / PRECISION).map_err(|_| {
            Error::MalformedPath {
                offset: index,
                reason: "coordinate out of range",
            }
        })?;
        points.push(point);
    }

    Ok(Polyline::new(points))
}

/// Reads one zig-zag varint starting at `index`, advancing past it.
fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(Error::MalformedPath {
                offset: *index,
                reason: "truncated chunk",
            });
        };
        if !(ASCII_OFFSET..=ASCII_OFFSET + 63).contains(&byte) {
            return Err(Error::MalformedPath {
                offset: *index,
                reason: "character outside the encoding alphabet",
            });
        }
        if shift > MAX_SHIFT {
            return Err(Error::MalformedPath {
                offset: *index,
                reason: "value too long",
            });
        }
        *index += 1;

        let chunk = i64::from(byte - ASCII_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION_BIT {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encodes points with the same scheme [`decode`] reads.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.latitude() * PRECISION).round() as i64;
        let lng = (point.longitude() * PRECISION).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn push_value(out: &mut String, delta: i64) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        out.push(char::from(((CONTINUATION_BIT | (value & CHUNK_MASK)) as u8) + ASCII_OFFSET));
        value >>= 5;
    }
    out.push(char::from(value as u8 + ASCII_OFFSET));
}

/// Decodes several geometries in parallel. Each entry fails or succeeds
/// on its own.
pub fn decode_many<S>(encoded: &[S]) -> Vec<Result<Polyline>>
where
    S: AsRef<str> + Sync,
{
    encoded.par_iter().map(|path| decode(path.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn assert_close(actual: &GeoPoint, lat: f64, lng: f64) {
        assert!(
            (actual.latitude() - lat).abs() < 1e-5 && (actual.longitude() - lng).abs() < 1e-5,
            "expected ({}, {}), got {:?}",
            lat,
            lng,
            actual
        );
    }

    #[test]
    fn test_decode_reference_path() {
        let polyline = decode(REFERENCE).unwrap();
        assert_eq!(polyline.len(), 3);
        assert_close(&polyline.points()[0], 38.5, -120.2);
        assert_close(&polyline.points()[1], 40.7, -120.95);
        assert_close(&polyline.points()[2], 43.252, -126.453);
    }

    #[test]
    fn test_decode_empty() {
        let polyline = decode("").unwrap();
        assert!(polyline.is_empty());
    }

    #[test]
    fn test_decode_truncated_chunk() {
        // drop the final byte so the last longitude group is cut short
        let truncated = &REFERENCE[..REFERENCE.len() - 1];
        let err = decode(truncated).unwrap_err();
        assert!(matches!(err, Error::MalformedPath { .. }), "got {:?}", err);
    }

    #[test]
    fn test_decode_latitude_without_longitude() {
        // "_p~iF" is a complete latitude value on its own
        let err = decode("_p~iF").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedPath {
                reason: "latitude without longitude",
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        let err = decode("_p~iF ps|U").unwrap_err();
        assert!(matches!(err, Error::MalformedPath { offset: 5, .. }), "got {:?}", err);
    }

    #[test]
    fn test_encode_reference_path() {
        let points = vec![point(38.5, -120.2), point(40.7, -120.95), point(43.252, -126.453)];
        assert_eq!(encode(&points), REFERENCE);
    }

    #[test]
    fn test_round_trip_within_precision() {
        let points = vec![
            point(24.8607, 67.0011),
            point(24.86123, 67.00457),
            point(24.8934, 67.0281),
            point(-33.86785, 151.20732),
            point(0.0, 0.0),
        ];
        let decoded = decode(&encode(&points)).unwrap();
        assert_eq!(decoded.len(), points.len());
        for (actual, expected) in decoded.points().iter().zip(&points) {
            assert_close(actual, expected.latitude(), expected.longitude());
        }
    }

    #[test]
    fn test_decode_many_independent_results() {
        let inputs = vec![REFERENCE.to_string(), String::new(), "_p~iF".to_string()];
        let results = decode_many(&inputs);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().len(), 3);
        assert!(results[1].as_ref().unwrap().is_empty());
        assert!(results[2].is_err());
    }

    #[test]
    fn test_straight_line_length() {
        let line = Polyline::straight_line(point(24.8607, 67.0011), point(24.8934, 67.0281));
        assert_eq!(line.len(), 2);
        let km = line.length_km();
        assert!(km > 4.0 && km < 5.0, "expected ~4.5 km, got {}", km);
    }

    #[test]
    fn test_into_points() {
        let points = vec![point(38.5, -120.2), point(40.7, -120.95)];
        let polyline = Polyline::new(points.clone());
        assert_eq!(polyline.first(), Some(&points[0]));
        assert_eq!(polyline.last(), Some(&points[1]));
        assert_eq!(polyline.into_points(), points);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_point() -> impl Strategy<Value = GeoPoint> {
            (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lng)| point(lat, lng))
        }

        proptest! {
            #[test]
            fn prop_round_trip_within_precision(points in prop::collection::vec(valid_point(), 0..40)) {
                let decoded = decode(&encode(&points)).unwrap();
                prop_assert_eq!(decoded.len(), points.len());
                for (actual, expected) in decoded.points().iter().zip(&points) {
                    prop_assert!((actual.latitude() - expected.latitude()).abs() <= 1e-5);
                    prop_assert!((actual.longitude() - expected.longitude()).abs() <= 1e-5);
                }
            }

            #[test]
            fn prop_prefix_ending_mid_chunk_is_malformed(points in prop::collection::vec(valid_point(), 1..10)) {
                let encoded = encode(&points);
                for cut in 1..encoded.len() {
                    let last = encoded.as_bytes()[cut - 1] - ASCII_OFFSET;
                    if i64::from(last) >= CONTINUATION_BIT {
                        let result = decode(&encoded[..cut]);
                        prop_assert!(matches!(result, Err(Error::MalformedPath { .. })), "prefix {:?}", &encoded[..cut]);
                    }
                }
            }
        }
    }
}
