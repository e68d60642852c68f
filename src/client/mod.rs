//! Polling client for the route-view endpoint.
//!
//! [`RouteViewModel`] owns the refresh timer and the latest [`Snapshot`];
//! [`views`] derives the search, favorites and nearest-bus views from it.

pub mod feed;
pub mod view_model;
pub mod views;

pub use feed::{FeedError, HttpRouteFeed, RouteFeed};
pub use view_model::{RouteViewModel, Snapshot, ViewState};
