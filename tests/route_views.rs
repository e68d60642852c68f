mod common;

use std::collections::HashSet;

use bus_tracker::entities::user::UserRole;
use bus_tracker::services::mutation::{self, BusChanges, RouteChanges, TelemetryReport};
use bus_tracker::services::{aggregation, store};

use common::{seed_account, seed_bus, seed_driver, seed_route, setup_db};

#[tokio::test]
async fn test_routes_group_their_buses() {
    let db = setup_db().await;
    let r1 = seed_route(&db, "101", "Central - Airport").await;
    let r2 = seed_route(&db, "102", "Station - Mall").await;
    let b1 = seed_bus(&db, "BUS-001", r1.id).await;
    let b2 = seed_bus(&db, "BUS-002", r1.id).await;

    let views = aggregation::route_views(&db).await.unwrap();
    assert_eq!(views.len(), 2);

    let first = views.iter().find(|v| v.id == r1.id).unwrap();
    let ids: HashSet<_> = first.buses.iter().map(|b| b.id).collect();
    assert_eq!(ids, HashSet::from([b1.id, b2.id]));

    let second = views.iter().find(|v| v.id == r2.id).unwrap();
    assert!(second.buses.is_empty());
    assert_eq!(second.origin, "Station");
    assert_eq!(second.destination, "Mall");
}

#[tokio::test]
async fn test_every_active_bus_appears_once() {
    let db = setup_db().await;
    let r1 = seed_route(&db, "101", "Central - Airport").await;
    let r2 = seed_route(&db, "102", "Station - Mall").await;
    for (number, route) in [("BUS-001", &r1), ("BUS-002", &r2), ("BUS-003", &r2)] {
        seed_bus(&db, number, route.id).await;
    }
    let parked = seed_bus(&db, "BUS-004", r1.id).await;
    mutation::toggle_bus_status(&db, parked.id).await.unwrap();

    let views = aggregation::route_views(&db).await.unwrap();
    let listed: Vec<_> = views.iter().flat_map(|v| &v.buses).map(|b| b.id).collect();
    let unique: HashSet<_> = listed.iter().copied().collect();

    assert_eq!(listed.len(), 3);
    assert_eq!(unique.len(), 3);
    assert!(!unique.contains(&parked.id));
}

#[tokio::test]
async fn test_deleted_route_leaves_bus_out_of_views() {
    let db = setup_db().await;
    let kept = seed_route(&db, "101", "Central - Airport").await;
    let doomed = seed_route(&db, "102", "Station - Mall").await;
    let orphan = seed_bus(&db, "BUS-001", doomed.id).await;
    seed_bus(&db, "BUS-002", kept.id).await;

    mutation::delete_route(&db, doomed.id).await.unwrap();

    // The bus row survives with its dangling reference.
    let resolved = store::find_resolved_bus(&db, orphan.id).await.unwrap();
    assert!(resolved.route.is_none());

    let views = aggregation::route_views(&db).await.unwrap();
    assert_eq!(views.len(), 1);
    assert!(views[0].buses.iter().all(|b| b.id != orphan.id));
}

#[tokio::test]
async fn test_inactive_route_is_hidden() {
    let db = setup_db().await;
    let route = seed_route(&db, "101", "Central - Airport").await;
    seed_bus(&db, "BUS-001", route.id).await;

    mutation::update_route(
        &db,
        route.id,
        RouteChanges {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(aggregation::route_views(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_views_are_stable_without_writes() {
    let db = setup_db().await;
    let route = seed_route(&db, "101", "Central - Airport").await;
    seed_bus(&db, "BUS-001", route.id).await;
    seed_bus(&db, "BUS-002", route.id).await;

    let first = aggregation::route_views(&db).await.unwrap();
    let second = aggregation::route_views(&db).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_inactive_bus_excluded_until_reactivated() {
    let db = setup_db().await;
    let route = seed_route(&db, "101", "Central - Airport").await;
    let bus = seed_bus(&db, "BUS-001", route.id).await;

    mutation::update_bus(
        &db,
        bus.id,
        BusChanges {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(aggregation::route_views(&db).await.unwrap()[0].buses.is_empty());

    mutation::toggle_bus_status(&db, bus.id).await.unwrap();
    assert_eq!(aggregation::route_views(&db).await.unwrap()[0].buses[0].id, bus.id);
}

#[tokio::test]
async fn test_dashboard_stats_count_active_fleet() {
    let db = setup_db().await;
    let route = seed_route(&db, "101", "Central - Airport").await;
    let idle = seed_route(&db, "102", "Station - Mall").await;
    mutation::update_route(
        &db,
        idle.id,
        RouteChanges {
            active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let running = seed_bus(&db, "BUS-001", route.id).await;
    let parked = seed_bus(&db, "BUS-002", route.id).await;
    mutation::report_telemetry(
        &db,
        running.id,
        TelemetryReport {
            lat: 21.25,
            lng: 81.63,
            current_passengers: 17,
            eta: 3.0,
        },
    )
    .await
    .unwrap();
    mutation::toggle_bus_status(&db, parked.id).await.unwrap();

    seed_driver(&db, "Ravi", "ravi@bus.com").await;
    seed_account(&db, "Asha", "asha@mail.com", UserRole::User).await;
    seed_account(&db, "Admin", "admin@bus.com", UserRole::Admin).await;

    let stats = store::dashboard_stats(&db).await.unwrap();
    assert_eq!(stats.total_buses, 1);
    assert_eq!(stats.total_routes, 1);
    assert_eq!(stats.total_drivers, 1);
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_passengers, 17);
}
