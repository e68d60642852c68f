//! Views derived from a snapshot. None of these modify the snapshot.

use crate::services::aggregation::{BusSummary, RouteView};

/// Case-insensitive substring match on name, number, origin and destination.
/// A blank query matches everything.
pub fn search<'a>(routes: &'a [RouteView], query: &str) -> Vec<&'a RouteView> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return routes.iter().collect();
    }

    routes
        .iter()
        .filter(|route| {
            [&route.name, &route.number, &route.origin, &route.destination]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

pub fn favorites(routes: &[RouteView]) -> Vec<&RouteView> {
    routes.iter().filter(|route| route.favorite).collect()
}

/// The bus with the lowest ETA; the first one wins a tie.
pub fn nearest_bus(route: &RouteView) -> Option<&BusSummary> {
    route
        .buses
        .iter()
        .reduce(|best, bus| if bus.eta < best.eta { bus } else { best })
}

/// Whole minutes for display. Negative reports show as 0.
pub fn display_eta(eta: f64) -> i64 {
    eta.max(0.0).round() as i64
}

/// Load as a percentage of capacity, clamped to 0..=100.
pub fn occupancy_percent(bus: &BusSummary) -> u8 {
    if bus.capacity <= 0 {
        return 0;
    }

    let passengers = bus.passengers.clamp(0, bus.capacity);
    (f64::from(passengers) / f64::from(bus.capacity) * 100.0).round() as u8
}
