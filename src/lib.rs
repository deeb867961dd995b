pub mod api;
pub mod config;
pub mod error;
pub mod ml;
pub mod models;
pub mod observability;
