//! Route views: every active route with the active buses running on it.

use std::collections::HashMap;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{bus, route};
use crate::error::AppResult;
use crate::services::store::{self, ResolvedBus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSummary {
    pub id: Uuid,
    pub number: String,
    pub eta: f64,
    pub passengers: i32,
    pub capacity: i32,
    pub lat: f64,
    pub lng: f64,
}

impl From<&bus::Model> for BusSummary {
    fn from(bus: &bus::Model) -> Self {
        Self {
            id: bus.id,
            number: bus.number.clone(),
            eta: bus.eta,
            passengers: bus.current_passengers,
            capacity: bus.capacity,
            lat: bus.lat,
            lng: bus.lng,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteView {
    pub id: Uuid,
    pub number: String,
    pub name: String,
    #[serde(rename = "from")]
    pub origin: String,
    #[serde(rename = "to")]
    pub destination: String,
    pub distance: String,
    pub duration: String,
    pub frequency: String,
    pub buses: Vec<BusSummary>,
    /// Always false from the server; only the client view model sets it.
    #[serde(default)]
    pub favorite: bool,
}

impl RouteView {
    fn new(route: &route::Model, buses: Vec<BusSummary>) -> Self {
        Self {
            id: route.id,
            number: route.number.clone(),
            name: route.name.clone(),
            origin: route.origin.clone(),
            destination: route.destination.clone(),
            distance: route.distance.clone(),
            duration: route.duration.clone(),
            frequency: route.frequency.clone(),
            buses,
            favorite: false,
        }
    }
}

/// Groups `buses` under `routes`.
///
/// Output order follows `routes`; bus order within a route follows `buses`.
/// Buses whose route did not resolve, or resolved to a route that is not in
/// `routes`, are dropped. Inactive records are skipped on both sides.
pub fn aggregate(routes: &[route::Model], buses: &[ResolvedBus]) -> Vec<RouteView> {
    let mut by_route: HashMap<Uuid, Vec<BusSummary>> = HashMap::with_capacity(routes.len());

    for resolved in buses.iter().filter(|r| r.bus.active) {
        let Some(route) = &resolved.route else {
            continue;
        };
        by_route
            .entry(route.id)
            .or_default()
            .push(BusSummary::from(&resolved.bus));
    }

    routes
        .iter()
        .filter(|r| r.active)
        .map(|route| RouteView::new(route, by_route.remove(&route.id).unwrap_or_default()))
        .collect()
}

pub async fn route_views(db: &DatabaseConnection) -> AppResult<Vec<RouteView>> {
    let routes = store::find_active_routes(db).await?;
    let buses = store::find_active_buses(db).await?;

    let views = aggregate(&routes, &buses);
    tracing::debug!(
        routes = views.len(),
        buses = views.iter().map(|v| v.buses.len()).sum::<usize>(),
        "Aggregated route views"
    );

    Ok(views)
}
