//! Route session: endpoints, route, viewport, fare and live tracking for
//! one open route screen.
//!
//! Every transition builds a new [`RouteSnapshot`] from the current one and
//! swaps it in only once all fallible work has succeeded, so a failed
//! transition leaves the previous snapshot untouched. Paths are shared
//! behind an `Arc` and replaced wholesale, never edited.

use std::fmt;
use std::sync::Arc;

use crate::config::RouteConfig;
use crate::error::{Error, Result};
use crate::fare::{Fare, FareInputs, compute_fare};
use crate::geo::{GeoPoint, travel_seconds};
use crate::picker::Endpoint;
use crate::playback::RoutePlayback;
use crate::polyline::{self, Polyline};
use crate::traits::{
    DirectionsProvider, NewRide, Place, PositionSample, PositionSource, RideId, RideStore, RouteCandidate,
};
use crate::viewport::{Viewport, ViewportFitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    EndpointsPartial,
    EndpointsComplete,
    RouteReady,
    Tracking,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Empty => "empty",
            SessionState::EndpointsPartial => "waiting for an endpoint",
            SessionState::EndpointsComplete => "waiting for a route",
            SessionState::RouteReady => "ready",
            SessionState::Tracking => "tracking",
        };
        f.write_str(name)
    }
}

/// Where the current path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Directions,
    /// Straight line between the endpoints.
    Fallback,
}

/// Totals summed over every leg of a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMetrics {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

impl RouteMetrics {
    fn from_candidate(candidate: &RouteCandidate) -> Result<Self> {
        let metrics = candidate.legs.iter().fold(
            RouteMetrics {
                distance_meters: 0.0,
                duration_seconds: 0.0,
            },
            |acc, leg| RouteMetrics {
                distance_meters: acc.distance_meters + leg.distance_meters,
                duration_seconds: acc.duration_seconds + leg.duration_seconds,
            },
        );
        let valid = |v: f64| v.is_finite() && v >= 0.0;
        if !valid(metrics.distance_meters) || !valid(metrics.duration_seconds) {
            return Err(Error::InvalidInput(format!(
                "route legs report distance {} m and duration {} s",
                metrics.distance_meters, metrics.duration_seconds
            )));
        }
        Ok(metrics)
    }

    pub fn distance_label(&self) -> String {
        format_distance(self.distance_meters)
    }

    pub fn duration_label(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

/// "850 meters" below a kilometer, "12.3 km" above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} meters", meters)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// "21 mins" below an hour, "1h 5m" above.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 3600.0 {
        format!("{:.0} mins", (seconds / 60.0).round())
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).round();
        format!("{:.0}h {:.0}m", hours, minutes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    path: Arc<Polyline>,
    metrics: RouteMetrics,
    source: RouteSource,
}

impl Route {
    pub fn path(&self) -> &Arc<Polyline> {
        &self.path
    }

    pub fn metrics(&self) -> RouteMetrics {
        self.metrics
    }

    pub fn source(&self) -> RouteSource {
        self.source
    }
}

/// Identifies one tracking run. Samples tagged with an older token are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackingToken(u64);

#[derive(Debug, Clone, PartialEq)]
struct ActiveRide {
    id: RideId,
    token: TrackingToken,
}

/// What happened to one live position sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Forwarded,
    /// Recorded locally but the backend push failed.
    SinkFailed,
    /// Not tracking, or the sample belongs to an earlier tracking run.
    Ignored,
}

/// Immutable view of a session at one point in time.
#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    origin: Option<Place>,
    destination: Option<Place>,
    focus: Option<GeoPoint>,
    route: Option<Route>,
    viewport: Viewport,
    seat_count: u32,
    unit_price_per_km: f64,
    fare: Option<Fare>,
    ride: Option<ActiveRide>,
    last_position: Option<PositionSample>,
    using_default_route: bool,
    advisory: Option<String>,
}

impl RouteSnapshot {
    pub fn state(&self) -> SessionState {
        if self.ride.is_some() {
            return SessionState::Tracking;
        }
        if self.route.is_some() {
            return SessionState::RouteReady;
        }
        match (&self.origin, &self.destination) {
            (Some(_), Some(_)) => SessionState::EndpointsComplete,
            (None, None) => SessionState::Empty,
            _ => SessionState::EndpointsPartial,
        }
    }

    pub fn origin(&self) -> Option<&Place> {
        self.origin.as_ref()
    }

    pub fn destination(&self) -> Option<&Place> {
        self.destination.as_ref()
    }

    pub fn focus(&self) -> Option<GeoPoint> {
        self.focus
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn path(&self) -> Option<&Arc<Polyline>> {
        self.route.as_ref().map(Route::path)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn seat_count(&self) -> u32 {
        self.seat_count
    }

    pub fn unit_price_per_km(&self) -> f64 {
        self.unit_price_per_km
    }

    /// Full fare inputs, once a route distance is known.
    pub fn fare_inputs(&self) -> Option<FareInputs> {
        self.route.as_ref().map(|route| FareInputs {
            distance_meters: route.metrics.distance_meters,
            seat_count: self.seat_count,
            unit_price_per_km: self.unit_price_per_km,
        })
    }

    pub fn fare(&self) -> Option<Fare> {
        self.fare
    }

    pub fn is_tracking(&self) -> bool {
        self.ride.is_some()
    }

    pub fn ride_id(&self) -> Option<&RideId> {
        self.ride.as_ref().map(|ride| &ride.id)
    }

    pub fn last_position(&self) -> Option<&PositionSample> {
        self.last_position.as_ref()
    }

    pub fn using_fallback_route(&self) -> bool {
        matches!(&self.route, Some(route) if route.source == RouteSource::Fallback)
    }

    /// Endpoints came from configuration rather than the user or backend.
    pub fn using_default_route(&self) -> bool {
        self.using_default_route
    }

    /// Single notice for the user about a degraded result.
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }
}

pub struct RouteSession<D, R> {
    config: RouteConfig,
    fitter: ViewportFitter,
    directions: D,
    rides: R,
    snapshot: RouteSnapshot,
    next_token: u64,
}

impl<D, R> RouteSession<D, R>
where
    D: DirectionsProvider,
    R: RideStore,
{
    /// Empty session framing the configured default location.
    pub fn new(config: RouteConfig, directions: D, rides: R) -> Self {
        let fitter = ViewportFitter::new(config.viewport.clone());
        let snapshot = RouteSnapshot {
            origin: None,
            destination: None,
            focus: None,
            route: None,
            viewport: fitter.one_point(config.default_location),
            seat_count: 1,
            unit_price_per_km: config.fare.base_unit_price_per_km,
            fare: None,
            ride: None,
            last_position: None,
            using_default_route: false,
            advisory: None,
        };

        Self {
            config,
            fitter,
            directions,
            rides,
            snapshot,
            next_token: 0,
        }
    }

    /// Session routed between the configured default endpoints.
    pub fn open_default(config: RouteConfig, directions: D, rides: R) -> Result<Self> {
        let mut session = Self::new(config, directions, rides);
        session.load_default_route(None)?;
        Ok(session)
    }

    /// Session seeded from the first active ride on the backend, or from the
    /// default endpoints when there is none or the ride list cannot be
    /// loaded.
    pub fn open_from_rides(config: RouteConfig, directions: D, rides: R) -> Result<Self> {
        let mut session = Self::new(config, directions, rides);
        match session.rides.active_rides() {
            Ok(active) => match active.into_iter().next() {
                Some(ride) => {
                    tracing::info!(ride_id = %ride.id.0, "seeding session from active ride");
                    session.set_endpoints(Some(ride.origin), Some(ride.destination))?;
                }
                None => session.load_default_route(None)?,
            },
            Err(err) => {
                tracing::warn!(error = %err, "active rides unavailable, using default route");
                session.load_default_route(Some(
                    "Showing demonstration route. Real-time data unavailable.".to_string(),
                ))?;
            }
        }
        Ok(session)
    }

    fn load_default_route(&mut self, advisory: Option<String>) -> Result<()> {
        let origin = self.config.default_origin.clone();
        let destination = self.config.default_destination.clone();
        self.set_endpoints(Some(origin), Some(destination))?;
        self.snapshot.using_default_route = true;
        if advisory.is_some() {
            self.snapshot.advisory = advisory;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> &RouteSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.state()
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn set_origin(&mut self, place: impl Into<Place>) -> Result<&RouteSnapshot> {
        self.set_endpoint(Endpoint::Origin, place)
    }

    pub fn set_destination(&mut self, place: impl Into<Place>) -> Result<&RouteSnapshot> {
        self.set_endpoint(Endpoint::Destination, place)
    }

    /// Records one endpoint; once both are known a route is computed.
    pub fn set_endpoint(&mut self, endpoint: Endpoint, place: impl Into<Place>) -> Result<&RouteSnapshot> {
        let place = place.into();
        let (origin, destination) = match endpoint {
            Endpoint::Origin => (Some(place), self.snapshot.destination.clone()),
            Endpoint::Destination => (self.snapshot.origin.clone(), Some(place)),
        };
        self.set_endpoints(origin, destination)
    }

    pub fn clear_endpoint(&mut self, endpoint: Endpoint) -> Result<&RouteSnapshot> {
        let (origin, destination) = match endpoint {
            Endpoint::Origin => (None, self.snapshot.destination.clone()),
            Endpoint::Destination => (self.snapshot.origin.clone(), None),
        };
        self.set_endpoints(origin, destination)
    }

    fn set_endpoints(&mut self, origin: Option<Place>, destination: Option<Place>) -> Result<&RouteSnapshot> {
        self.ensure_not_tracking("change endpoints")?;

        let mut next = self.snapshot.clone();
        next.origin = origin;
        next.destination = destination;
        next.using_default_route = false;
        next.advisory = None;
        // a new selection replaces any single-location focus
        next.focus = None;
        next.route = None;
        next.fare = None;

        if let (Some(origin), Some(destination)) = (&next.origin, &next.destination) {
            let (route, advisory) = self.compute_route(origin.point, destination.point)?;
            next.fare = Some(compute_fare(
                route.metrics.distance_meters,
                next.seat_count,
                next.unit_price_per_km,
            )?);
            next.route = Some(route);
            next.advisory = advisory;
        }
        next.viewport = self.viewport_for(&next);

        tracing::debug!(state = %next.state(), "endpoints updated");
        Ok(self.commit(next))
    }

    /// Asks the directions provider again for the current endpoints.
    pub fn recompute_route(&mut self) -> Result<&RouteSnapshot> {
        if self.snapshot.origin.is_none() || self.snapshot.destination.is_none() {
            return Err(self.invalid("compute a route"));
        }
        let origin = self.snapshot.origin.clone();
        let destination = self.snapshot.destination.clone();
        let using_default_route = self.snapshot.using_default_route;
        self.set_endpoints(origin, destination)?;
        self.snapshot.using_default_route = using_default_route;
        Ok(&self.snapshot)
    }

    /// Updates seats and fuel price. The fare follows when a route is known;
    /// path and viewport are left alone.
    pub fn set_fare_inputs(&mut self, seat_count: u32, unit_price_per_km: f64) -> Result<&RouteSnapshot> {
        if seat_count < 1 || seat_count > self.config.fare.max_seats {
            return Err(Error::InvalidSeatCount {
                count: i64::from(seat_count),
                max: self.config.fare.max_seats,
            });
        }
        if !unit_price_per_km.is_finite() || unit_price_per_km < 0.0 {
            return Err(Error::InvalidInput(format!(
                "unit price must be a non-negative number, got {unit_price_per_km}"
            )));
        }

        let mut next = self.snapshot.clone();
        next.seat_count = seat_count;
        next.unit_price_per_km = unit_price_per_km;
        if let Some(inputs) = next.fare_inputs() {
            next.fare = Some(inputs.fare()?);
        }
        Ok(self.commit(next))
    }

    pub fn set_seat_count(&mut self, seat_count: u32) -> Result<&RouteSnapshot> {
        let price = self.snapshot.unit_price_per_km;
        self.set_fare_inputs(seat_count, price)
    }

    pub fn set_unit_price(&mut self, unit_price_per_km: f64) -> Result<&RouteSnapshot> {
        let seats = self.snapshot.seat_count;
        self.set_fare_inputs(seats, unit_price_per_km)
    }

    /// Zooms the map onto a single location.
    pub fn focus(&mut self, point: GeoPoint) -> &RouteSnapshot {
        let mut next = self.snapshot.clone();
        next.focus = Some(point);
        next.viewport = self.viewport_for(&next);
        self.commit(next)
    }

    pub fn clear_focus(&mut self) -> &RouteSnapshot {
        let mut next = self.snapshot.clone();
        next.focus = None;
        next.viewport = self.viewport_for(&next);
        self.commit(next)
    }

    /// Stores the ride on the backend and starts accepting position samples.
    pub fn start_tracking(&mut self) -> Result<TrackingToken> {
        let state = self.state();
        if !matches!(state, SessionState::EndpointsComplete | SessionState::RouteReady) {
            return Err(self.invalid("start tracking"));
        }
        let (Some(origin), Some(destination)) = (&self.snapshot.origin, &self.snapshot.destination) else {
            return Err(self.invalid("start tracking"));
        };

        let metrics = self.snapshot.route.as_ref().map(|route| route.metrics);
        let ride = NewRide {
            origin: origin.clone(),
            destination: destination.clone(),
            per_seat_fare: self.snapshot.fare.map_or(0.0, |fare| fare.per_seat_amount),
            seat_count: self.snapshot.seat_count,
            distance_meters: metrics.map_or(0.0, |m| m.distance_meters),
            duration_seconds: metrics.map_or(0.0, |m| m.duration_seconds),
        };
        let id = self.rides.create_ride(&ride)?;

        self.next_token += 1;
        let token = TrackingToken(self.next_token);
        let mut next = self.snapshot.clone();
        next.ride = Some(ActiveRide { id, token });
        next.last_position = None;
        self.commit(next);

        tracing::info!(token = token.0, "tracking started");
        Ok(token)
    }

    /// Records a live position and pushes it to the backend. Path, fare and
    /// viewport are not touched.
    pub fn on_position_sample(&mut self, token: TrackingToken, sample: PositionSample) -> SampleOutcome {
        let Some(ride) = &self.snapshot.ride else {
            tracing::debug!("position sample while not tracking");
            return SampleOutcome::Ignored;
        };
        if ride.token != token {
            tracing::debug!(token = token.0, "stale position sample dropped");
            return SampleOutcome::Ignored;
        }

        let outcome = match self.rides.update_location(&ride.id, &sample) {
            Ok(()) => SampleOutcome::Forwarded,
            Err(err) => {
                tracing::warn!(ride_id = %ride.id.0, error = %err, "live location update failed");
                SampleOutcome::SinkFailed
            }
        };

        let mut next = self.snapshot.clone();
        next.last_position = Some(sample);
        self.commit(next);
        outcome
    }

    /// Pulls up to `limit` samples from a fresh subscription to `source`.
    /// The subscription is dropped before returning.
    pub fn follow<P: PositionSource>(&mut self, token: TrackingToken, source: &mut P, limit: usize) -> usize {
        let mut delivered = 0;
        for sample in source.watch(&self.config.watch).take(limit) {
            if self.on_position_sample(token, sample) == SampleOutcome::Ignored {
                break;
            }
            delivered += 1;
        }
        delivered
    }

    /// Ends the ride and returns to the route view.
    ///
    /// Tracking stops locally even when the backend cannot close the ride;
    /// that failure is still returned.
    pub fn stop_tracking(&mut self) -> Result<&RouteSnapshot> {
        let Some(ride) = self.snapshot.ride.clone() else {
            return Err(self.invalid("stop tracking"));
        };

        let mut next = self.snapshot.clone();
        next.ride = None;
        self.commit(next);

        self.rides.end_ride(&ride.id)?;
        tracing::info!(ride_id = %ride.id.0, "tracking stopped");
        Ok(&self.snapshot)
    }

    /// Close-up viewport on the live position while tracking.
    pub fn tracking_viewport(&self) -> Option<Viewport> {
        if !self.snapshot.is_tracking() {
            return None;
        }
        self.snapshot
            .last_position
            .as_ref()
            .map(|sample| self.fitter.follow(sample.point))
    }

    /// Simulated position feed along the current path.
    pub fn playback(&self) -> Option<RoutePlayback> {
        self.snapshot
            .path()
            .filter(|path| !path.is_empty())
            .map(|path| RoutePlayback::new(Arc::clone(path)))
    }

    /// Discards the session, closing any ride still being tracked.
    pub fn close(mut self) {
        if self.snapshot.is_tracking() {
            if let Err(err) = self.stop_tracking() {
                tracing::warn!(error = %err, "ride could not be closed");
            }
        }
    }

    fn compute_route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<(Route, Option<String>)> {
        tracing::debug!(?origin, ?destination, "requesting directions");

        let candidate = match self.directions.directions(origin, destination) {
            Ok(directions) => directions.routes.into_iter().next(),
            Err(err) if err.is_provider_failure() => {
                tracing::warn!(error = %err, "directions failed");
                None
            }
            Err(err) => return Err(err),
        };

        if let Some(candidate) = candidate {
            let path = polyline::decode(&candidate.overview_path)?;
            if !path.is_empty() {
                let metrics = RouteMetrics::from_candidate(&candidate)?;
                tracing::info!(
                    points = path.len(),
                    distance = %metrics.distance_label(),
                    duration = %metrics.duration_label(),
                    "route ready"
                );
                let route = Route {
                    path: Arc::new(path),
                    metrics,
                    source: RouteSource::Directions,
                };
                return Ok((route, None));
            }
        }

        Ok((self.fallback_route(origin, destination), Some(FALLBACK_ADVISORY.to_string())))
    }

    fn fallback_route(&self, origin: GeoPoint, destination: GeoPoint) -> Route {
        let km = origin.haversine_km(&destination);
        tracing::warn!(distance_km = km, "no route from provider, using straight line");
        Route {
            path: Arc::new(Polyline::straight_line(origin, destination)),
            metrics: RouteMetrics {
                distance_meters: km * 1000.0,
                duration_seconds: travel_seconds(km, self.config.fallback_speed_kmh),
            },
            source: RouteSource::Fallback,
        }
    }

    fn viewport_for(&self, snapshot: &RouteSnapshot) -> Viewport {
        if let Some(point) = snapshot.focus {
            return self.fitter.one_point(point);
        }
        match (&snapshot.origin, &snapshot.destination) {
            (Some(a), Some(b)) => self.fitter.two_points(a.point, b.point),
            (Some(one), None) | (None, Some(one)) => self.fitter.one_point(one.point),
            (None, None) => self.fitter.one_point(self.config.default_location),
        }
    }

    fn ensure_not_tracking(&self, action: &'static str) -> Result<()> {
        if self.snapshot.is_tracking() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state().to_string(),
        }
    }

    fn commit(&mut self, next: RouteSnapshot) -> &RouteSnapshot {
        self.snapshot = next;
        &self.snapshot
    }
}

const FALLBACK_ADVISORY: &str = "Could not find a road route; showing a straight line between the locations.";
