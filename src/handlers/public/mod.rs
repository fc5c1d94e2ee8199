// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service discovery, liveness and the template catalog. Nothing here reads user data.

pub mod health;
pub mod root;
pub mod templates;
