pub mod ai;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod migration;
pub mod routes;
pub mod state;
pub mod types;
pub mod usage;
pub mod validation;

pub use routes::app;
pub use state::AppState;
