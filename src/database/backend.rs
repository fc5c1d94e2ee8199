use async_trait::async_trait;
use serde_json::{Map, Value};

use super::manager::DatabaseError;
use super::schema::{Table, View};
use crate::filter::FilterData;

/// A row as returned by a backend, before it is parsed into a typed model.
pub type Row = Map<String, Value>;

/// Table-oriented persistence interface.
///
/// Implementations: [`PostgresBackend`](super::postgres::PostgresBackend) for the hosted
/// database and [`MemoryBackend`](super::memory::MemoryBackend) for local development and tests.
/// Every method is a single statement; nothing spans a transaction.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, table: Table, filter: &FilterData) -> Result<Vec<Row>, DatabaseError>;

    /// Inserts one row and returns it as stored (defaults applied).
    async fn insert(&self, table: Table, row: Row) -> Result<Row, DatabaseError>;

    /// Applies `changes` to every row matching `filter`; returns the updated rows.
    async fn update(&self, table: Table, filter: &FilterData, changes: Row) -> Result<Vec<Row>, DatabaseError>;

    /// Deletes matching rows, letting the schema's foreign keys cascade. Returns rows removed.
    async fn delete(&self, table: Table, filter: &FilterData) -> Result<u64, DatabaseError>;

    /// Atomic `column = column + 1` on matching rows.
    async fn increment(&self, table: Table, filter: &FilterData, column: &str) -> Result<Vec<Row>, DatabaseError>;

    /// Insert or replace the non-key columns on primary key conflict.
    async fn upsert(&self, table: Table, row: Row) -> Result<Row, DatabaseError>;

    async fn select_view(&self, view: View, filter: &FilterData) -> Result<Vec<Row>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
