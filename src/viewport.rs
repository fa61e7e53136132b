//! Map regions framing one or more points.

use serde::{Deserialize, Serialize};

use crate::config::ViewportSettings;
use crate::geo::GeoPoint;
use crate::polyline::Polyline;

/// Multiplier applied to the raw extent of the framed points.
pub const DEFAULT_MARGIN_FACTOR: f64 = 1.5;
/// Smallest span ever produced; map renderers reject zero-area regions.
pub const MIN_SPAN: f64 = 0.005;
pub const DEFAULT_LATITUDE_SPAN: f64 = 0.0922;
pub const DEFAULT_LONGITUDE_SPAN: f64 = 0.0421;

/// A map region: center plus angular span on each axis. Spans are > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: GeoPoint,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

impl Viewport {
    /// True when `point` lies inside the region.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (point.latitude() - self.center.latitude()).abs() <= self.latitude_span / 2.0
            && (point.longitude() - self.center.longitude()).abs() <= self.longitude_span / 2.0
    }
}

/// Frames two points, centred on their midpoint.
pub fn fit_two_points(a: GeoPoint, b: GeoPoint, margin_factor: f64) -> Viewport {
    fit_two_points_with(a, b, margin_factor, MIN_SPAN)
}

fn fit_two_points_with(a: GeoPoint, b: GeoPoint, margin_factor: f64, min_span: f64) -> Viewport {
    Viewport {
        center: a.midpoint(&b),
        latitude_span: clamp_span((a.latitude() - b.latitude()).abs() * margin_factor, min_span),
        longitude_span: clamp_span((a.longitude() - b.longitude()).abs() * margin_factor, min_span),
    }
}

/// Close zoom on a single location with the default spans.
pub fn fit_one_point(p: GeoPoint) -> Viewport {
    fit_one_point_with(p, DEFAULT_LATITUDE_SPAN, DEFAULT_LONGITUDE_SPAN)
}

pub fn fit_one_point_with(p: GeoPoint, latitude_span: f64, longitude_span: f64) -> Viewport {
    Viewport {
        center: p,
        latitude_span: clamp_span(latitude_span, MIN_SPAN),
        longitude_span: clamp_span(longitude_span, MIN_SPAN),
    }
}

/// Frames the bounding box of a whole path. `None` for an empty path.
pub fn fit_path(path: &Polyline, margin_factor: f64) -> Option<Viewport> {
    let first = *path.first()?;
    let (mut min_lat, mut max_lat) = (first.latitude(), first.latitude());
    let (mut min_lng, mut max_lng) = (first.longitude(), first.longitude());

    for point in &path.points()[1..] {
        min_lat = min_lat.min(point.latitude());
        max_lat = max_lat.max(point.latitude());
        min_lng = min_lng.min(point.longitude());
        max_lng = max_lng.max(point.longitude());
    }

    let south_west = GeoPoint::new(min_lat, min_lng).ok()?;
    let north_east = GeoPoint::new(max_lat, max_lng).ok()?;
    Some(fit_two_points(south_west, north_east, margin_factor))
}

/// Close zoom that follows a live position.
pub fn follow(position: GeoPoint, span: f64) -> Viewport {
    fit_one_point_with(position, span, span)
}

fn clamp_span(span: f64, min_span: f64) -> f64 {
    if span.is_finite() && span > min_span {
        span
    } else {
        min_span
    }
}

/// Viewport rules bound to one configuration.
#[derive(Debug, Clone)]
pub struct ViewportFitter {
    settings: ViewportSettings,
}

impl ViewportFitter {
    pub fn new(settings: ViewportSettings) -> Self {
        Self { settings }
    }

    pub fn two_points(&self, a: GeoPoint, b: GeoPoint) -> Viewport {
        fit_two_points_with(a, b, self.settings.margin_factor, self.settings.min_span)
    }

    pub fn one_point(&self, p: GeoPoint) -> Viewport {
        fit_one_point_with(
            p,
            self.settings.default_latitude_span,
            self.settings.default_longitude_span,
        )
    }

    pub fn follow(&self, p: GeoPoint) -> Viewport {
        follow(p, self.settings.tracking_span)
    }
}
