pub mod authorization;
pub mod models;
pub mod mutation;
pub mod query_planner;
