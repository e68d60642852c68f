use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::error::{AppError, AppJson, AppResult};
use crate::services::mutation::{self, BusChanges, NewBus, TelemetryReport};
use crate::services::store::{self, ResolvedBus};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub id: Uuid,
    pub number: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DriverInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// A bus with its route and driver embedded
#[derive(Debug, Serialize)]
pub struct BusResponse {
    pub id: Uuid,
    pub number: String,
    pub route_id: Uuid,
    pub route: Option<RouteInfo>,
    pub driver: Option<DriverInfo>,
    pub capacity: i32,
    pub current_passengers: i32,
    pub location: Location,
    pub eta: f64,
    pub active: bool,
    pub last_updated: DateTime<Utc>,
}

impl From<ResolvedBus> for BusResponse {
    fn from(resolved: ResolvedBus) -> Self {
        let ResolvedBus { bus, route, driver } = resolved;

        Self {
            id: bus.id,
            number: bus.number,
            route_id: bus.route_id,
            route: route.map(|r| RouteInfo {
                id: r.id,
                number: r.number,
                name: r.name,
            }),
            driver: driver.map(|d| DriverInfo {
                id: d.id,
                name: d.name,
                email: d.email,
            }),
            capacity: bus.capacity,
            current_passengers: bus.current_passengers,
            location: Location {
                lat: bus.lat,
                lng: bus.lng,
            },
            eta: bus.eta,
            active: bus.active,
            last_updated: bus.last_updated.with_timezone(&Utc),
        }
    }
}

/// List every bus, active or not (admin)
pub async fn list_buses(State(state): State<AppState>) -> AppResult<Json<Vec<BusResponse>>> {
    let buses = store::find_all_buses(&state.db).await?;
    Ok(Json(buses.into_iter().map(BusResponse::from).collect()))
}

pub async fn create_bus(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NewBus>,
) -> AppResult<(StatusCode, Json<BusResponse>)> {
    let bus = mutation::create_bus(&state.db, payload).await?;
    let resolved = store::resolve_one(&state.db, bus).await?;
    Ok((StatusCode::CREATED, Json(resolved.into())))
}

pub async fn update_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<BusChanges>,
) -> AppResult<Json<BusResponse>> {
    let bus = mutation::update_bus(&state.db, id, payload).await?;
    Ok(Json(store::resolve_one(&state.db, bus).await?.into()))
}

pub async fn delete_bus(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    mutation::delete_bus(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "message": "Bus deleted successfully" })))
}

pub async fn toggle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BusResponse>> {
    let bus = mutation::toggle_bus_status(&state.db, id).await?;
    Ok(Json(store::resolve_one(&state.db, bus).await?.into()))
}

/// Position, load and ETA report from the driver of the bus
pub async fn report_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    AppJson(report): AppJson<TelemetryReport>,
) -> AppResult<Json<BusResponse>> {
    if claims.role == UserRole::Driver {
        let bus = store::find_bus(&state.db, id).await?;
        if bus.driver_id != Some(claims.sub) {
            return Err(AppError::Forbidden(
                "You are not assigned to this bus".to_string(),
            ));
        }
    }

    let bus = mutation::report_telemetry(&state.db, id, report).await?;
    Ok(Json(store::resolve_one(&state.db, bus).await?.into()))
}
