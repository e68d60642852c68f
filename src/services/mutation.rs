//! Writes to routes, buses and driver accounts.
//!
//! Each call touches one entity (deleting a driver also clears the driver
//! from its buses). Telemetry reports are last-write-wins and are not
//! range-checked against capacity.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, Value,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::entities::{bus, route, user};
use crate::error::{AppError, AppResult};
use crate::services::store;
use crate::utils::password::hash_password;

pub const DEFAULT_CAPACITY: i32 = 40;

// Column widths from the migrations.
const NUMBER_LEN: usize = 20;
const ROUTE_TEXT_LEN: usize = 120;
const ROUTE_DETAIL_LEN: usize = 50;
const EMAIL_LEN: usize = 255;
const USER_NAME_LEN: usize = 100;

// ============ Routes ============

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoute {
    pub number: String,
    pub name: String,
    #[serde(rename = "from")]
    pub origin: String,
    #[serde(rename = "to")]
    pub destination: String,
    pub distance: String,
    pub duration: String,
    pub frequency: String,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteChanges {
    pub number: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "from")]
    pub origin: Option<String>,
    #[serde(rename = "to")]
    pub destination: Option<String>,
    pub distance: Option<String>,
    pub duration: Option<String>,
    pub frequency: Option<String>,
    pub active: Option<bool>,
}

pub async fn create_route(db: &DatabaseConnection, payload: NewRoute) -> AppResult<route::Model> {
    require("number", &payload.number, NUMBER_LEN)?;
    require("name", &payload.name, ROUTE_TEXT_LEN)?;
    require("from", &payload.origin, ROUTE_TEXT_LEN)?;
    require("to", &payload.destination, ROUTE_TEXT_LEN)?;
    require("distance", &payload.distance, ROUTE_DETAIL_LEN)?;
    require("duration", &payload.duration, ROUTE_DETAIL_LEN)?;
    require("frequency", &payload.frequency, ROUTE_DETAIL_LEN)?;

    ensure_route_number_free(db, &payload.number, None).await?;

    let route = route::ActiveModel {
        id: Set(Uuid::new_v4()),
        number: Set(payload.number.trim().to_string()),
        name: Set(payload.name),
        origin: Set(payload.origin),
        destination: Set(payload.destination),
        distance: Set(payload.distance),
        duration: Set(payload.duration),
        frequency: Set(payload.frequency),
        active: Set(payload.active.unwrap_or(true)),
        created_at: Set(Utc::now().into()),
    };

    let created = route.insert(db).await?;
    tracing::info!(route_id = %created.id, number = %created.number, "Route created");
    Ok(created)
}

pub async fn update_route(
    db: &DatabaseConnection,
    id: Uuid,
    payload: RouteChanges,
) -> AppResult<route::Model> {
    let route = store::find_route(db, id).await?;
    let mut active: route::ActiveModel = route.into();

    if let Some(number) = payload.number {
        require("number", &number, NUMBER_LEN)?;
        ensure_route_number_free(db, &number, Some(id)).await?;
        active.number = Set(number.trim().to_string());
    }

    // Remaining text fields share the same blank check.
    let text_fields = [
        ("name", payload.name, ROUTE_TEXT_LEN, &mut active.name),
        ("from", payload.origin, ROUTE_TEXT_LEN, &mut active.origin),
        ("to", payload.destination, ROUTE_TEXT_LEN, &mut active.destination),
        ("distance", payload.distance, ROUTE_DETAIL_LEN, &mut active.distance),
        ("duration", payload.duration, ROUTE_DETAIL_LEN, &mut active.duration),
        ("frequency", payload.frequency, ROUTE_DETAIL_LEN, &mut active.frequency),
    ];
    for (field, value, max_len, slot) in text_fields {
        if let Some(value) = value {
            require(field, &value, max_len)?;
            *slot = Set(value);
        }
    }

    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }

    Ok(active.update(db).await?)
}

pub async fn delete_route(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    let result = route::Entity::delete_by_id(id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Route not found".to_string()));
    }

    tracing::info!(route_id = %id, "Route deleted");
    Ok(())
}

// ============ Buses ============

#[derive(Debug, Clone, Deserialize)]
pub struct NewBus {
    pub number: String,
    pub route_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub capacity: Option<i32>,
    pub current_passengers: Option<i32>,
    pub lat: f64,
    pub lng: f64,
    pub eta: Option<f64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusChanges {
    pub number: Option<String>,
    pub route_id: Option<Uuid>,
    pub capacity: Option<i32>,
    pub current_passengers: Option<i32>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub eta: Option<f64>,
    pub active: Option<bool>,
}

/// A driver's position, load and ETA report.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryReport {
    pub lat: f64,
    pub lng: f64,
    pub current_passengers: i32,
    pub eta: f64,
}

pub async fn create_bus(db: &DatabaseConnection, payload: NewBus) -> AppResult<bus::Model> {
    require("number", &payload.number, NUMBER_LEN)?;
    let capacity = payload.capacity.unwrap_or(DEFAULT_CAPACITY);
    require_positive_capacity(capacity)?;

    ensure_route_exists(db, payload.route_id).await?;
    if let Some(driver_id) = payload.driver_id {
        ensure_driver(db, driver_id).await?;
    }
    ensure_bus_number_free(db, &payload.number, None).await?;

    let bus = bus::ActiveModel {
        id: Set(Uuid::new_v4()),
        number: Set(payload.number.trim().to_string()),
        route_id: Set(payload.route_id),
        driver_id: Set(payload.driver_id),
        capacity: Set(capacity),
        current_passengers: Set(payload.current_passengers.unwrap_or(0)),
        lat: Set(payload.lat),
        lng: Set(payload.lng),
        eta: Set(payload.eta.unwrap_or(0.0)),
        active: Set(payload.active.unwrap_or(true)),
        last_updated: Set(Utc::now().into()),
    };

    let created = bus.insert(db).await?;
    tracing::info!(bus_id = %created.id, number = %created.number, "Bus created");
    Ok(created)
}

pub async fn update_bus(
    db: &DatabaseConnection,
    id: Uuid,
    payload: BusChanges,
) -> AppResult<bus::Model> {
    let bus = store::find_bus(db, id).await?;
    let mut active: bus::ActiveModel = bus.into();

    if let Some(number) = payload.number {
        require("number", &number, NUMBER_LEN)?;
        ensure_bus_number_free(db, &number, Some(id)).await?;
        active.number = Set(number.trim().to_string());
    }

    if let Some(route_id) = payload.route_id {
        ensure_route_exists(db, route_id).await?;
        active.route_id = Set(route_id);
    }

    if let Some(capacity) = payload.capacity {
        require_positive_capacity(capacity)?;
        active.capacity = Set(capacity);
    }

    if let Some(passengers) = payload.current_passengers {
        active.current_passengers = Set(passengers);
    }
    if let Some(lat) = payload.lat {
        active.lat = Set(lat);
    }
    if let Some(lng) = payload.lng {
        active.lng = Set(lng);
    }
    if let Some(eta) = payload.eta {
        active.eta = Set(eta);
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }

    active.last_updated = Set(Utc::now().into());
    Ok(active.update(db).await?)
}

pub async fn delete_bus(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    let result = bus::Entity::delete_by_id(id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Bus not found".to_string()));
    }

    tracing::info!(bus_id = %id, "Bus deleted");
    Ok(())
}

pub async fn toggle_bus_status(db: &DatabaseConnection, id: Uuid) -> AppResult<bus::Model> {
    let bus = store::find_bus(db, id).await?;
    let next = !bus.active;

    let mut active: bus::ActiveModel = bus.into();
    active.active = Set(next);

    let updated = active.update(db).await?;
    tracing::info!(bus_id = %id, active = updated.active, "Bus status toggled");
    Ok(updated)
}

pub async fn report_telemetry(
    db: &DatabaseConnection,
    id: Uuid,
    report: TelemetryReport,
) -> AppResult<bus::Model> {
    let bus = store::find_bus(db, id).await?;

    let mut active: bus::ActiveModel = bus.into();
    active.lat = Set(report.lat);
    active.lng = Set(report.lng);
    active.current_passengers = Set(report.current_passengers);
    active.eta = Set(report.eta);
    active.last_updated = Set(Utc::now().into());

    let updated = active.update(db).await?;
    tracing::debug!(
        bus_id = %id,
        lat = updated.lat,
        lng = updated.lng,
        passengers = updated.current_passengers,
        eta = updated.eta,
        "Telemetry recorded"
    );
    Ok(updated)
}

/// Sets or clears the driver of a bus. The driver is checked before the bus.
pub async fn assign_driver(
    db: &DatabaseConnection,
    bus_id: Uuid,
    driver_id: Option<Uuid>,
) -> AppResult<bus::Model> {
    if let Some(driver_id) = driver_id {
        ensure_driver(db, driver_id).await?;
    }

    let bus = store::find_bus(db, bus_id).await?;
    let mut active: bus::ActiveModel = bus.into();
    active.driver_id = Set(driver_id);

    let updated = active.update(db).await?;
    match driver_id {
        Some(driver_id) => tracing::info!(bus_id = %bus_id, driver_id = %driver_id, "Driver assigned"),
        None => tracing::info!(bus_id = %bus_id, "Driver unassigned"),
    }
    Ok(updated)
}

// ============ Accounts ============

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn create_account(
    db: &DatabaseConnection,
    payload: NewAccount,
    role: UserRole,
) -> AppResult<user::Model> {
    require("name", &payload.name, USER_NAME_LEN)?;
    require("email", &payload.email, EMAIL_LEN)?;
    require("password", &payload.password, usize::MAX)?;

    let email = payload.email.trim().to_lowercase();
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let account = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        name: Set(payload.name.trim().to_string()),
        role: Set(role),
        created_at: Set(Utc::now().into()),
    };

    Ok(account.insert(db).await?)
}

pub async fn create_driver(db: &DatabaseConnection, payload: NewAccount) -> AppResult<user::Model> {
    let driver = create_account(db, payload, UserRole::Driver).await?;
    tracing::info!(driver_id = %driver.id, email = %driver.email, "Driver created");
    Ok(driver)
}

/// Clears the driver from every bus it is assigned to, then removes the
/// account. Returns how many buses were unassigned.
pub async fn delete_driver(db: &DatabaseConnection, id: Uuid) -> AppResult<u64> {
    let driver = user::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|u| u.is_driver())
        .ok_or_else(|| AppError::NotFound("Driver not found".to_string()))?;

    let unassigned = bus::Entity::update_many()
        .col_expr(bus::Column::DriverId, Expr::value(Value::Uuid(None)))
        .filter(bus::Column::DriverId.eq(driver.id))
        .exec(db)
        .await?
        .rows_affected;

    user::Entity::delete_by_id(driver.id).exec(db).await?;

    tracing::info!(driver_id = %id, unassigned, "Driver deleted");
    Ok(unassigned)
}

// ============ Checks ============

/// Non-blank and within the column width.
fn require(field: &str, value: &str, max_len: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

fn require_positive_capacity(capacity: i32) -> AppResult<()> {
    if capacity <= 0 {
        return Err(AppError::Validation(
            "capacity must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

async fn ensure_driver(db: &DatabaseConnection, id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .filter(|u| u.is_driver())
        .ok_or_else(|| AppError::InvalidAssignment("Invalid driver".to_string()))
}

async fn ensure_route_exists(db: &DatabaseConnection, id: Uuid) -> AppResult<()> {
    route::Entity::find_by_id(id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::Validation("route does not exist".to_string()))
}

async fn ensure_route_number_free(
    db: &DatabaseConnection,
    number: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let existing = route::Entity::find()
        .filter(route::Column::Number.eq(number.trim()))
        .one(db)
        .await?;

    match existing {
        Some(r) if Some(r.id) != except => Err(AppError::Conflict(format!(
            "Route number {} already exists",
            r.number
        ))),
        _ => Ok(()),
    }
}

async fn ensure_bus_number_free(
    db: &DatabaseConnection,
    number: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let existing = bus::Entity::find()
        .filter(bus::Column::Number.eq(number.trim()))
        .one(db)
        .await?;

    match existing {
        Some(b) if Some(b.id) != except => Err(AppError::Conflict(format!(
            "Bus number {} already exists",
            b.number
        ))),
        _ => Ok(()),
    }
}
