use axum::{extract::State, Extension, Json};

use crate::error::AppResult;
use crate::handlers::buses::BusResponse;
use crate::services::store;
use crate::utils::jwt::Claims;
use crate::AppState;

/// List buses assigned to the logged-in driver
pub async fn my_buses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BusResponse>>> {
    let buses = store::find_buses_for_driver(&state.db, claims.sub).await?;
    Ok(Json(buses.into_iter().map(BusResponse::from).collect()))
}
