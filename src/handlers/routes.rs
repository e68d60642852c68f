use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::entities::route;
use crate::error::{AppJson, AppResult};
use crate::services::aggregation::{self, RouteView};
use crate::services::mutation::{self, NewRoute, RouteChanges};
use crate::services::store;
use crate::AppState;

/// Active routes with their live buses, polled by every dashboard
pub async fn list_route_views(State(state): State<AppState>) -> AppResult<Json<Vec<RouteView>>> {
    Ok(Json(aggregation::route_views(&state.db).await?))
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<route::Model>> {
    Ok(Json(store::find_route(&state.db, id).await?))
}

pub async fn create_route(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NewRoute>,
) -> AppResult<(StatusCode, Json<route::Model>)> {
    let route = mutation::create_route(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

pub async fn update_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<RouteChanges>,
) -> AppResult<Json<route::Model>> {
    Ok(Json(mutation::update_route(&state.db, id, payload).await?))
}

pub async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    mutation::delete_route(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "message": "Route deleted successfully" })))
}
