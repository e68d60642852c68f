//! Startup data: the admin account, plus an optional demo network.

use rand::Rng;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};

use crate::config::Config;
use crate::entities::route;
use crate::entities::user::{self, UserRole};
use crate::error::AppResult;
use crate::services::mutation::{self, NewAccount, NewBus, NewRoute};

// Raipur city centre.
const CENTER_LAT: f64 = 21.2514;
const CENTER_LNG: f64 = 81.6296;

/// Create the admin account if it doesn't exist
pub async fn seed_admin(db: &DatabaseConnection, config: &Config) -> AppResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(config.admin_email.to_lowercase()))
        .one(db)
        .await?;

    if existing.is_none() {
        mutation::create_account(
            db,
            NewAccount {
                name: "Admin User".to_string(),
                email: config.admin_email.clone(),
                password: config.admin_password.clone(),
            },
            UserRole::Admin,
        )
        .await?;
        tracing::info!("Admin account created: {}", config.admin_email);
    }

    Ok(())
}

/// Seed routes, drivers and buses when the route table is empty.
pub async fn seed_demo(db: &DatabaseConnection) -> AppResult<()> {
    if route::Entity::find().count(db).await? > 0 {
        tracing::debug!("Routes already present, skipping demo seed");
        return Ok(());
    }

    let routes = [
        ("101", "City Center - Airport", "City Center", "Airport", "15 km", "45 min", "Every 15 min"),
        ("102", "Downtown - Railway Station", "Downtown", "Railway Station", "8 km", "30 min", "Every 10 min"),
        ("103", "University - Mall", "University", "Shopping Mall", "12 km", "35 min", "Every 20 min"),
    ];

    let mut created_routes = Vec::with_capacity(routes.len());
    for (number, name, origin, destination, distance, duration, frequency) in routes {
        let route = mutation::create_route(
            db,
            NewRoute {
                number: number.to_string(),
                name: name.to_string(),
                origin: origin.to_string(),
                destination: destination.to_string(),
                distance: distance.to_string(),
                duration: duration.to_string(),
                frequency: frequency.to_string(),
                active: None,
            },
        )
        .await?;
        created_routes.push(route);
    }

    let drivers = [
        ("Rajesh Kumar", "rajesh@bus.com"),
        ("Amit Singh", "amit@bus.com"),
        ("Priya Sharma", "priya@bus.com"),
        ("Vijay Patel", "vijay@bus.com"),
    ];

    let mut driver_ids = Vec::with_capacity(drivers.len());
    for (name, email) in drivers {
        let driver = mutation::create_driver(
            db,
            NewAccount {
                name: name.to_string(),
                email: email.to_string(),
                password: "driver123".to_string(),
            },
        )
        .await?;
        driver_ids.push(driver.id);
    }

    // Two buses on the first and last routes, one on the middle route.
    let mut placements = Vec::new();
    for (index, route) in created_routes.iter().enumerate() {
        let count = if index == 1 { 1 } else { 2 };
        placements.extend(std::iter::repeat_n(route.id, count));
    }

    for (index, route_id) in placements.into_iter().enumerate() {
        let (lat, lng, passengers, eta) = {
            let mut rng = rand::thread_rng();
            (
                CENTER_LAT + rng.gen_range(-0.05..0.05),
                CENTER_LNG + rng.gen_range(-0.05..0.05),
                rng.gen_range(5..35),
                f64::from(rng.gen_range(5..25_i32)),
            )
        };

        mutation::create_bus(
            db,
            NewBus {
                number: format!("BUS-{:03}", index + 1),
                route_id,
                driver_id: driver_ids.get(index).copied(),
                capacity: Some(mutation::DEFAULT_CAPACITY),
                current_passengers: Some(passengers),
                lat,
                lng,
                eta: Some(eta),
                active: None,
            },
        )
        .await?;
    }

    tracing::info!("Demo routes, drivers and buses seeded");
    Ok(())
}
