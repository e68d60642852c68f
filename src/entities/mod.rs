pub mod bus;
pub mod route;
pub mod user;
