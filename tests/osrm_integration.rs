mod fixtures;
mod support;

use std::env;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, ReuseDirective, TestcontainersError};

use ride_route::config::RouteConfig;
use ride_route::error::Result;
use ride_route::osrm::{OsrmClient, OsrmConfig};
use ride_route::session::{RouteSession, RouteSource, SessionState};
use ride_route::traits::{Directions, DirectionsProvider, NewRide, PositionSample, RideId, RideStore, RideSummary};

use fixtures::{GULSHAN, SADDAR};
use support::osrm_dataset::{Dataset, PAKISTAN};

fn osrm_container() -> std::result::Result<(Container<GenericImage>, String), TestcontainersError> {
    let data_root = env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data".to_string());
    let dataset = Dataset::prepare(&PAKISTAN, &PathBuf::from(data_root))
        .map_err(|err| TestcontainersError::other(format!("OSRM dataset: {err:?}")))?;

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(dataset.data_dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{}", dataset.graph_file),
        ])
        .with_container_name("osrm-pakistan-mld")
        .with_startup_timeout(Duration::from_secs(60))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{port}")))
}

/// Polls until the server has loaded its graph.
fn first_route(client: &OsrmClient) -> Directions {
    let start = Instant::now();
    loop {
        match client.directions(SADDAR.point(), GULSHAN.point()) {
            Ok(directions) if !directions.routes.is_empty() => return directions,
            result if start.elapsed() > Duration::from_secs(20) => {
                panic!("OSRM never returned a route: {result:?}")
            }
            _ => std::thread::sleep(Duration::from_millis(500)),
        }
    }
}

struct NoBackend;

impl RideStore for NoBackend {
    fn create_ride(&self, _ride: &NewRide) -> Result<RideId> {
        Ok(RideId("local".to_string()))
    }

    fn update_location(&self, _ride: &RideId, _sample: &PositionSample) -> Result<()> {
        Ok(())
    }

    fn end_ride(&self, _ride: &RideId) -> Result<()> {
        Ok(())
    }

    fn active_rides(&self) -> Result<Vec<RideSummary>> {
        Ok(Vec::new())
    }
}

#[test]
#[ignore = "requires docker and an OSRM dataset"]
fn osrm_route_drives_session() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = OsrmClient::new(OsrmConfig {
        base_url,
        ..OsrmConfig::default()
    })
    .expect("build OSRM client");

    let directions = first_route(&client);
    let leg_distance: f64 = directions.routes[0].legs.iter().map(|leg| leg.distance_meters).sum();
    // road distance is always longer than the great circle
    assert!(leg_distance > SADDAR.point().haversine_meters(&GULSHAN.point()));

    let mut session = RouteSession::new(RouteConfig::default(), &client, NoBackend);
    session.set_origin(SADDAR.place()).expect("origin");
    let snapshot = session.set_destination(GULSHAN.place()).expect("destination");

    assert_eq!(snapshot.state(), SessionState::RouteReady);
    let route = snapshot.route().expect("route");
    assert_eq!(route.source(), RouteSource::Directions);
    assert!(route.path().len() > 2);
    assert!(snapshot.fare().expect("fare").per_seat_amount > 0.0);

    drop(container);
}
