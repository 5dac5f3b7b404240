pub mod cli;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod params;
pub mod query;
pub mod view;
