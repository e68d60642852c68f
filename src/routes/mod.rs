use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::handlers::{admin, auth, buses, driver, routes};
use crate::middleware::auth::{auth_middleware, require_admin, require_driver, require_reporter};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::create_driver_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let driver_governor = create_driver_governor();
    let public_governor = create_public_governor();

    // Public routes (rate limited per IP)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    let public_route_views = Router::new()
        .route("/", get(routes::list_route_views))
        .route("/{id}", get(routes::get_route))
        .layer(public_governor);

    // Route management (admin)
    let admin_route_routes = Router::new()
        .route("/", post(routes::create_route))
        .route("/{id}", put(routes::update_route))
        .route("/{id}", delete(routes::delete_route))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Bus management (admin)
    let admin_bus_routes = Router::new()
        .route("/", get(buses::list_buses))
        .route("/", post(buses::create_bus))
        .route("/{id}", put(buses::update_bus))
        .route("/{id}", delete(buses::delete_bus))
        .route("/{id}/toggle-status", patch(buses::toggle_status))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Telemetry (driver of the bus, or admin)
    let telemetry_routes = Router::new()
        .route("/{id}/location", put(buses::report_location))
        .layer(driver_governor.clone())
        .layer(middleware::from_fn(require_reporter))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver self-service
    let driver_routes = Router::new()
        .route("/buses", get(driver::my_buses))
        .layer(driver_governor)
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin dashboard
    let admin_routes = Router::new()
        .route("/drivers", get(admin::list_drivers))
        .route("/drivers", post(admin::create_driver))
        .route("/drivers/{id}", delete(admin::delete_driver))
        .route("/users", get(admin::list_all_users))
        .route("/buses/{id}/assign", put(admin::assign_driver))
        .route("/stats", get(admin::stats))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/routes", public_route_views.merge(admin_route_routes))
        .nest("/api/buses", admin_bus_routes.merge(telemetry_routes))
        .nest("/api/driver", driver_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
