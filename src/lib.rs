pub mod app;
pub mod auth;
pub mod balance;
pub mod config;
pub mod error;
pub mod functions;
pub mod state;
pub mod store;
