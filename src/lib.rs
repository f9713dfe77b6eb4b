pub mod attendance;
pub mod auth;
pub mod config;
pub mod db;
pub mod directory;
pub mod engine;
pub mod error;
pub mod mail;
pub mod models;
pub mod notify;
pub mod roster;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod views;
