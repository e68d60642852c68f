pub mod aggregation;
pub mod mutation;
pub mod store;
