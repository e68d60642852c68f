//! Read side of the entity store.
//!
//! Bus records only carry ids for their route and driver. Everything that
//! needs the referenced records goes through [`resolve`] so the lookups
//! happen once per request instead of at each call site.

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::entities::{bus, route, user};
use crate::error::{AppError, AppResult};

/// A bus with its route and driver looked up.
///
/// `route` is `None` when the bus points at a route that no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBus {
    pub bus: bus::Model,
    pub route: Option<route::Model>,
    pub driver: Option<user::Model>,
}

pub async fn find_active_routes(db: &DatabaseConnection) -> AppResult<Vec<route::Model>> {
    let routes = route::Entity::find()
        .filter(route::Column::Active.eq(true))
        .order_by_asc(route::Column::CreatedAt)
        .order_by_asc(route::Column::Number)
        .all(db)
        .await?;

    Ok(routes)
}

pub async fn find_active_buses(db: &DatabaseConnection) -> AppResult<Vec<ResolvedBus>> {
    let buses = bus::Entity::find()
        .filter(bus::Column::Active.eq(true))
        .order_by_asc(bus::Column::Number)
        .all(db)
        .await?;

    resolve(db, buses).await
}

pub async fn find_all_buses(db: &DatabaseConnection) -> AppResult<Vec<ResolvedBus>> {
    let buses = bus::Entity::find()
        .order_by_asc(bus::Column::Number)
        .all(db)
        .await?;

    resolve(db, buses).await
}

pub async fn find_buses_for_driver(
    db: &DatabaseConnection,
    driver_id: Uuid,
) -> AppResult<Vec<ResolvedBus>> {
    let buses = bus::Entity::find()
        .filter(bus::Column::DriverId.eq(driver_id))
        .order_by_asc(bus::Column::Number)
        .all(db)
        .await?;

    resolve(db, buses).await
}

pub async fn find_resolved_bus(db: &DatabaseConnection, id: Uuid) -> AppResult<ResolvedBus> {
    let bus = find_bus(db, id).await?;
    resolve_one(db, bus).await
}

pub async fn find_bus(db: &DatabaseConnection, id: Uuid) -> AppResult<bus::Model> {
    bus::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus not found".to_string()))
}

pub async fn find_route(db: &DatabaseConnection, id: Uuid) -> AppResult<route::Model> {
    route::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))
}

pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_drivers(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Driver))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await?)
}

pub async fn resolve_one(db: &DatabaseConnection, bus: bus::Model) -> AppResult<ResolvedBus> {
    let mut resolved = resolve(db, vec![bus]).await?;
    resolved
        .pop()
        .ok_or_else(|| AppError::Internal("Bus resolution returned nothing".to_string()))
}

/// Looks up the routes and drivers referenced by `buses`, preserving the
/// order of the input.
pub async fn resolve(
    db: &DatabaseConnection,
    buses: Vec<bus::Model>,
) -> AppResult<Vec<ResolvedBus>> {
    if buses.is_empty() {
        return Ok(Vec::new());
    }

    let mut route_ids: Vec<Uuid> = buses.iter().map(|b| b.route_id).collect();
    route_ids.sort();
    route_ids.dedup();

    let mut driver_ids: Vec<Uuid> = buses.iter().filter_map(|b| b.driver_id).collect();
    driver_ids.sort();
    driver_ids.dedup();

    let routes: HashMap<Uuid, route::Model> = route::Entity::find()
        .filter(route::Column::Id.is_in(route_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let drivers: HashMap<Uuid, user::Model> = if driver_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(driver_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };

    Ok(buses
        .into_iter()
        .map(|bus| ResolvedBus {
            route: routes.get(&bus.route_id).cloned(),
            driver: bus.driver_id.and_then(|id| drivers.get(&id).cloned()),
            bus,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_buses: u64,
    pub total_routes: u64,
    pub total_drivers: u64,
    pub total_users: u64,
    pub total_passengers: i64,
}

pub async fn dashboard_stats(db: &DatabaseConnection) -> AppResult<DashboardStats> {
    let active_buses = bus::Entity::find()
        .filter(bus::Column::Active.eq(true))
        .all(db)
        .await?;

    let total_routes = route::Entity::find()
        .filter(route::Column::Active.eq(true))
        .count(db)
        .await?;

    let total_drivers = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Driver))
        .count(db)
        .await?;

    let total_users = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::User))
        .count(db)
        .await?;

    Ok(DashboardStats {
        total_buses: active_buses.len() as u64,
        total_routes,
        total_drivers,
        total_users,
        total_passengers: active_buses
            .iter()
            .map(|b| i64::from(b.current_passengers))
            .sum(),
    })
}
