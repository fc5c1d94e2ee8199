pub mod auth;
pub mod response;

pub use auth::{identity_middleware, AuthUser, Identity};
pub use response::{ApiResponse, ApiResult, Deleted};
