pub mod admin;
pub mod auth;
pub mod buses;
pub mod driver;
pub mod routes;
