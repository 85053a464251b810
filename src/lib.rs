pub mod api;
pub mod auth;
pub mod blob;
pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod integrations;
pub mod models;
pub mod observability;
pub mod providers;
pub mod queue;
pub mod realtime;
pub mod state;
pub mod store;
pub mod workers;
