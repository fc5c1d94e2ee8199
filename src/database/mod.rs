pub mod backend;
pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod schema;

pub use backend::{Backend, Row};
pub use manager::{Database, DatabaseError};
pub use memory::MemoryBackend;
pub use repository::{Model, Repository};
pub use schema::{Table, View};
