//! Joins live feed entities against the static [`RouteIndex`].

use serde::Serialize;
use tracing::debug;

use crate::feed::Snapshot;
use crate::static_data::RouteIndex;

/// A positioned, labeled vehicle as returned by `/getVehicles`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleReport {
    pub lat: f64,
    pub lon: f64,
    pub route_short_name: String,
    pub route_long_name: String,
    pub direction: String,
}

/// The static data and the live feed disagree about a known route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("couldn't find matching direction for route id {route_id}, direction id {direction_id}")]
    DirectionMismatch { route_id: String, direction_id: u32 },

    #[error("vehicle on route id {route_id} has no direction id")]
    MissingDirection { route_id: String },
}

/// Labels every vehicle in `snapshot`, preserving feed order.
///
/// Vehicles on routes missing from `index` are skipped: the feed routinely
/// runs ahead of the published static data. A known route with an unknown
/// direction fails the whole call. `route_filter` matches the route short
/// name and is applied before the direction lookup.
pub fn reconcile(
    snapshot: &Snapshot,
    index: &RouteIndex,
    route_filter: Option<&str>,
) -> Result<Vec<VehicleReport>, ReconcileError> {
    let mut vehicles = Vec::new();
    let mut unknown_routes = 0usize;

    for entity in snapshot.entities() {
        if entity.is_deleted() {
            continue;
        }
        let Some(vehicle) = &entity.vehicle else {
            continue;
        };
        let Some(trip) = &vehicle.trip else {
            continue;
        };
        let Some(route_id) = trip.route_id.as_deref() else {
            continue;
        };

        let Some(route) = index.lookup(route_id) else {
            debug!(entity_id = %entity.id, route_id, "No static route for vehicle, skipping");
            unknown_routes += 1;
            continue;
        };

        if route_filter.is_some_and(|selected| route.short_name != selected) {
            continue;
        }

        let direction_id = trip
            .direction_id
            .ok_or_else(|| ReconcileError::MissingDirection {
                route_id: route_id.to_string(),
            })?;
        let direction = route
            .direction(direction_id)
            .ok_or_else(|| ReconcileError::DirectionMismatch {
                route_id: route_id.to_string(),
                direction_id,
            })?;

        let Some(position) = &vehicle.position else {
            debug!(entity_id = %entity.id, "Vehicle has no position, skipping");
            continue;
        };

        vehicles.push(VehicleReport {
            lat: f64::from(position.latitude),
            lon: f64::from(position.longitude),
            route_short_name: route.short_name.clone(),
            route_long_name: route.long_name.clone(),
            direction: direction.text.clone(),
        });
    }

    debug!(
        entities = snapshot.entities().len(),
        vehicles = vehicles.len(),
        unknown_routes,
        route_filter,
        "Reconciled snapshot"
    );

    Ok(vehicles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{
        FeedEntity, FeedHeader, FeedMessage, Position, TripDescriptor, VehiclePosition,
    };
    use crate::static_data::{Direction, RouteRecord};

    #[test]
    fn test_unknown_route_is_skipped() {
        let snapshot = snapshot(vec![
            vehicle("a", "R1", Some(0), 49.0, -123.0),
            vehicle("b", "NEW", Some(0), 49.1, -123.1),
            vehicle("c", "R2", Some(1), 49.2, -123.2),
        ]);

        let vehicles = reconcile(&snapshot, &index(), None).unwrap();

        assert_eq!(vehicles.len(), 2);
        assert_eq!(vehicles[0].route_short_name, "9");
        assert_eq!(vehicles[0].direction, "East");
        assert_eq!(vehicles[1].route_short_name, "3");
        assert_eq!(vehicles[1].route_long_name, "Main");
        assert_eq!(vehicles[1].direction, "South");
    }

    #[test]
    fn test_all_known_routes_keeps_every_entity() {
        let snapshot = snapshot(vec![
            vehicle("a", "R2", Some(1), 49.0, -123.0),
            vehicle("b", "R1", Some(1), 49.1, -123.1),
        ]);

        let vehicles = reconcile(&snapshot, &index(), None).unwrap();
        assert_eq!(vehicles.len(), snapshot.entities().len());
    }

    #[test]
    fn test_route_filter_preserves_order() {
        let snapshot = snapshot(vec![
            vehicle("a", "R1", Some(0), 1.0, 1.0),
            vehicle("b", "R2", Some(1), 2.0, 2.0),
            vehicle("c", "R1", Some(1), 3.0, 3.0),
            vehicle("d", "R1", Some(0), 4.0, 4.0),
        ]);

        let vehicles = reconcile(&snapshot, &index(), Some("9")).unwrap();

        let lats: Vec<f64> = vehicles.iter().map(|v| v.lat).collect();
        assert_eq!(lats, vec![1.0, 3.0, 4.0]);
        assert!(vehicles.iter().all(|v| v.route_short_name == "9"));
    }

    #[test]
    fn test_direction_mismatch_fails_whole_request() {
        let snapshot = snapshot(vec![
            vehicle("a", "R1", Some(0), 1.0, 1.0),
            vehicle("b", "R1", Some(7), 2.0, 2.0),
        ]);

        let err = reconcile(&snapshot, &index(), None).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::DirectionMismatch {
                route_id: "R1".to_string(),
                direction_id: 7,
            }
        );
    }

    #[test]
    fn test_filtered_out_route_skips_direction_check() {
        let snapshot = snapshot(vec![
            vehicle("a", "R1", Some(7), 1.0, 1.0),
            vehicle("b", "R2", Some(0), 2.0, 2.0),
        ]);

        let vehicles = reconcile(&snapshot, &index(), Some("3")).unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].direction, "North");
    }

    #[test]
    fn test_missing_direction_id_fails() {
        let snapshot = snapshot(vec![vehicle("a", "R2", None, 1.0, 1.0)]);

        let err = reconcile(&snapshot, &index(), None).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingDirection { .. }));
    }

    #[test]
    fn test_non_vehicle_and_deleted_entities_are_skipped() {
        let mut deleted = vehicle("gone", "R1", Some(0), 1.0, 1.0);
        deleted.is_deleted = Some(true);
        let alert_only = FeedEntity {
            id: "alert".to_string(),
            ..Default::default()
        };
        let snapshot = snapshot(vec![deleted, alert_only, vehicle("a", "R2", Some(0), 2.0, 2.0)]);

        let vehicles = reconcile(&snapshot, &index(), None).unwrap();
        assert_eq!(vehicles.len(), 1);
        assert_eq!(vehicles[0].lat, 2.0);
    }

    #[test]
    fn test_vehicle_without_position_is_skipped() {
        let mut entity = vehicle("a", "R1", Some(0), 1.0, 1.0);
        entity.vehicle.as_mut().unwrap().position = None;

        let vehicles = reconcile(&snapshot(vec![entity]), &index(), None).unwrap();
        assert!(vehicles.is_empty());
    }

    #[test]
    fn test_empty_snapshot() {
        let vehicles = reconcile(&snapshot(vec![]), &index(), None).unwrap();
        assert!(vehicles.is_empty());
    }

    // Helper functions for tests
    fn index() -> RouteIndex {
        let routes = vec![route("R1", "9", "Broadway"), route("R2", "3", "Main")];
        let directions = vec![
            direction("R1", 0, "East"),
            direction("R1", 1, "West"),
            direction("R2", 0, "North"),
            direction("R2", 1, "South"),
        ];
        RouteIndex::from_records(routes, directions)
    }

    fn route(id: &str, short_name: &str, long_name: &str) -> RouteRecord {
        RouteRecord {
            route_id: id.to_string(),
            agency_id: "TL".to_string(),
            route_short_name: short_name.to_string(),
            route_long_name: long_name.to_string(),
        }
    }

    fn direction(route_id: &str, id: u32, text: &str) -> Direction {
        Direction {
            text: text.to_string(),
            id,
            route_id: route_id.to_string(),
        }
    }

    fn vehicle(id: &str, route_id: &str, direction_id: Option<u32>, lat: f32, lon: f32) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            vehicle: Some(VehiclePosition {
                trip: Some(TripDescriptor {
                    route_id: Some(route_id.to_string()),
                    direction_id,
                    ..Default::default()
                }),
                position: Some(Position {
                    latitude: lat,
                    longitude: lon,
                    bearing: None,
                    odometer: None,
                    speed: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn snapshot(entity: Vec<FeedEntity>) -> Snapshot {
        Snapshot::new(FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                incrementality: None,
                timestamp: Some(1_730_000_000),
                feed_version: None,
            },
            entity,
        })
    }
}
