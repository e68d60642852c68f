use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppJson, AppResult};
use crate::handlers::buses::BusResponse;
use crate::services::mutation::{self, NewAccount};
use crate::services::store::{self, DashboardStats};
use crate::AppState;

// ============ Users & Drivers ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

/// List all users (admin)
pub async fn list_all_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = store::list_users(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// List all drivers (admin)
pub async fn list_drivers(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let drivers = store::list_drivers(&state.db).await?;
    Ok(Json(drivers.into_iter().map(UserResponse::from).collect()))
}

/// Create a driver account (admin)
pub async fn create_driver(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NewAccount>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let driver = mutation::create_driver(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(driver.into())))
}

/// Delete a driver, unassigning it from its buses first (admin)
pub async fn delete_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let unassigned = mutation::delete_driver(&state.db, id).await?;

    Ok(Json(serde_json::json!({
        "message": "Driver deleted successfully",
        "unassigned_buses": unassigned,
    })))
}

// ============ Assignment ============

/// `driver_id: null` (or omitted) clears the assignment
#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Option<Uuid>,
}

pub async fn assign_driver(
    State(state): State<AppState>,
    Path(bus_id): Path<Uuid>,
    AppJson(payload): AppJson<AssignDriverRequest>,
) -> AppResult<Json<BusResponse>> {
    let bus = mutation::assign_driver(&state.db, bus_id, payload.driver_id).await?;
    Ok(Json(store::resolve_one(&state.db, bus).await?.into()))
}

// ============ Stats ============

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<DashboardStats>> {
    Ok(Json(store::dashboard_stats(&state.db).await?))
}
