#![allow(dead_code)]

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use uuid::Uuid;

use bus_tracker::entities::user::UserRole;
use bus_tracker::entities::{bus, route, user};
use bus_tracker::services::mutation::{self, NewAccount, NewBus, NewRoute};

/// Fresh in-memory database with the tables created straight from the
/// entities.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.expect("in-memory sqlite");
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(route::Entity),
        schema.create_table_from_entity(bus::Entity),
    ];
    for table in tables {
        db.execute(backend.build(&table)).await.expect("create table");
    }

    db
}

pub fn new_route(number: &str, name: &str) -> NewRoute {
    let (origin, destination) = name.split_once(" - ").unwrap_or((name, name));

    NewRoute {
        number: number.to_string(),
        name: name.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        distance: "10 km".to_string(),
        duration: "30 min".to_string(),
        frequency: "Every 10 min".to_string(),
        active: None,
    }
}

pub async fn seed_route(db: &DatabaseConnection, number: &str, name: &str) -> route::Model {
    mutation::create_route(db, new_route(number, name))
        .await
        .expect("create route")
}

pub fn new_bus(number: &str, route_id: Uuid) -> NewBus {
    NewBus {
        number: number.to_string(),
        route_id,
        driver_id: None,
        capacity: Some(40),
        current_passengers: Some(0),
        lat: 21.2514,
        lng: 81.6296,
        eta: Some(10.0),
        active: None,
    }
}

pub async fn seed_bus(db: &DatabaseConnection, number: &str, route_id: Uuid) -> bus::Model {
    mutation::create_bus(db, new_bus(number, route_id))
        .await
        .expect("create bus")
}

pub async fn seed_account(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    role: UserRole,
) -> user::Model {
    mutation::create_account(
        db,
        NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        },
        role,
    )
    .await
    .expect("create account")
}

pub async fn seed_driver(db: &DatabaseConnection, name: &str, email: &str) -> user::Model {
    seed_account(db, name, email, UserRole::Driver).await
}
