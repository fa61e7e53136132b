//! Simulated position feed that drives along a route, looping forever.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::WatchOptions;
use crate::geo::GeoPoint;
use crate::polyline::Polyline;
use crate::traits::{PositionSample, PositionSource};

/// Replays the points of a path as live samples.
///
/// Each `watch` restarts from the first point. Samples are spaced
/// `interval_ms` apart; points closer than the distance filter to the last
/// emitted one are skipped.
#[derive(Debug, Clone)]
pub struct RoutePlayback {
    path: Arc<Polyline>,
    start: DateTime<Utc>,
}

impl RoutePlayback {
    pub fn new(path: Arc<Polyline>) -> Self {
        Self {
            path,
            start: Utc::now(),
        }
    }

    /// Fixes the timestamp of the first sample.
    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }
}

impl PositionSource for RoutePlayback {
    type Samples = PlaybackSamples;

    fn watch(&mut self, options: &WatchOptions) -> PlaybackSamples {
        PlaybackSamples {
            path: Arc::clone(&self.path),
            index: 0,
            last: None,
            timestamp: self.start,
            interval: Duration::milliseconds(options.interval_ms as i64),
            distance_filter_meters: options.distance_filter_meters,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackSamples {
    path: Arc<Polyline>,
    index: usize,
    last: Option<GeoPoint>,
    timestamp: DateTime<Utc>,
    interval: Duration,
    distance_filter_meters: f64,
}

impl Iterator for PlaybackSamples {
    type Item = PositionSample;

    fn next(&mut self) -> Option<PositionSample> {
        let path = Arc::clone(&self.path);
        let points = path.points();
        if points.is_empty() {
            return None;
        }

        // one full lap of skips means every point is inside the filter
        for _ in 0..points.len() {
            let point = points[self.index % points.len()];
            self.index = (self.index + 1) % points.len();

            let moved = match self.last {
                Some(last) => last.haversine_meters(&point),
                None => f64::INFINITY,
            };
            if moved >= self.distance_filter_meters {
                return Some(self.emit(point, moved));
            }
        }

        let point = points[self.index];
        self.index = (self.index + 1) % points.len();
        Some(self.emit(point, 0.0))
    }
}

impl PlaybackSamples {
    fn emit(&mut self, point: GeoPoint, moved: f64) -> PositionSample {
        let timestamp = match self.last {
            Some(_) => self.timestamp + self.interval,
            None => self.timestamp,
        };
        let seconds = self.interval.num_milliseconds() as f64 / 1000.0;
        let speed = match self.last {
            Some(_) if seconds > 0.0 && moved.is_finite() => Some(moved / seconds),
            _ => None,
        };

        self.timestamp = timestamp;
        self.last = Some(point);
        PositionSample {
            point,
            accuracy: None,
            speed,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_loops_over_path() {
        let path = Arc::new(Polyline::new(vec![point(24.86, 67.00), point(24.87, 67.01), point(24.88, 67.02)]));
        let mut playback = RoutePlayback::new(path.clone()).starting_at(start());
        let samples: Vec<_> = playback.watch(&WatchOptions::default()).take(5).collect();

        let visited: Vec<GeoPoint> = samples.iter().map(|s| s.point).collect();
        assert_eq!(
            visited,
            vec![path.points()[0], path.points()[1], path.points()[2], path.points()[0], path.points()[1]]
        );
        assert_eq!(samples[0].timestamp, start());
        assert_eq!(samples[4].timestamp, start() + Duration::milliseconds(4 * 5000));
        assert!(samples[0].speed.is_none());
        assert!(samples[1].speed.unwrap() > 0.0);
    }

    #[test]
    fn test_watch_restarts() {
        let path = Arc::new(Polyline::new(vec![point(24.86, 67.00), point(24.87, 67.01)]));
        let mut playback = RoutePlayback::new(path.clone()).starting_at(start());
        let first: Vec<_> = playback.watch(&WatchOptions::default()).take(3).collect();
        let again = playback.watch(&WatchOptions::default()).next().unwrap();
        assert_eq!(first[2].point, path.points()[0]);
        assert_eq!(again.point, path.points()[0]);
        assert_eq!(again.timestamp, start());
    }

    #[test]
    fn test_distance_filter_skips_close_points() {
        // second point is ~1 m from the first
        let path = Arc::new(Polyline::new(vec![
            point(24.86, 67.00),
            point(24.86001, 67.00),
            point(24.87, 67.01),
        ]));
        let mut playback = RoutePlayback::new(path.clone()).starting_at(start());
        let samples: Vec<_> = playback.watch(&WatchOptions::default()).take(2).collect();
        assert_eq!(samples[0].point, path.points()[0]);
        assert_eq!(samples[1].point, path.points()[2]);
    }

    #[test]
    fn test_stationary_path_still_emits() {
        let p = point(24.86, 67.00);
        let path = Arc::new(Polyline::new(vec![p, p]));
        let mut playback = RoutePlayback::new(path).starting_at(start());
        let samples: Vec<_> = playback.watch(&WatchOptions::default()).take(3).collect();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.point == p));
    }

    #[test]
    fn test_empty_path_ends() {
        let mut playback = RoutePlayback::new(Arc::new(Polyline::new(vec![])));
        assert!(playback.watch(&WatchOptions::default()).next().is_none());
    }
}
