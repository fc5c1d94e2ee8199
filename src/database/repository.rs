use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::backend::{Backend, Row};
use super::manager::DatabaseError;
use super::schema::{Table, View};
use crate::filter::FilterData;

/// A typed row of one application table.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: Table;
}

/// User-scoped access to one table.
///
/// Every statement is AND-ed with `user_id = <owner>`, and inserts are stamped with the owner,
/// so a repository cannot read or write another user's rows.
pub struct Repository<T> {
    backend: Arc<dyn Backend>,
    user_id: Uuid,
    _phantom: PhantomData<T>,
}

impl<T: Model> Repository<T> {
    pub fn new(backend: Arc<dyn Backend>, user_id: Uuid) -> Self {
        Self {
            backend,
            user_id,
            _phantom: PhantomData,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn scoped(&self, filter_data: FilterData) -> FilterData {
        let owner = json!({ "user_id": self.user_id });
        let where_clause = match filter_data.where_clause {
            Some(existing) => json!({ "$and": [owner, existing] }),
            None => owner,
        };
        FilterData {
            where_clause: Some(where_clause),
            ..filter_data
        }
    }

    fn by_id(id: Uuid) -> FilterData {
        FilterData::new().eq(T::TABLE.primary_key(), id)
    }

    fn parse(row: Row) -> Result<T, DatabaseError> {
        serde_json::from_value(Value::Object(row)).map_err(|e| DatabaseError::Decode {
            table: T::TABLE.name(),
            message: e.to_string(),
        })
    }

    fn to_row(record: impl Serialize) -> Result<Row, DatabaseError> {
        match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(DatabaseError::QueryError(format!("expected a record, got {}", other))),
            Err(e) => Err(DatabaseError::QueryError(e.to_string())),
        }
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, DatabaseError> {
        self.backend
            .select(T::TABLE, &self.scoped(filter_data))
            .await?
            .into_iter()
            .map(Self::parse)
            .collect()
    }

    pub async fn select_one(&self, filter_data: FilterData) -> Result<Option<T>, DatabaseError> {
        let mut rows = self.select_any(filter_data.limit(1)).await?;
        Ok(rows.pop())
    }

    pub async fn select_404(&self, filter_data: FilterData) -> Result<T, DatabaseError> {
        self.select_one(filter_data)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} record not found", T::TABLE.name())))
    }

    pub async fn get(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.select_404(Self::by_id(id)).await
    }

    /// Inserts `record` for the owner, stamping creation and modification times.
    pub async fn insert(&self, record: impl Serialize) -> Result<T, DatabaseError> {
        let mut row = Self::to_row(record)?;
        row.insert("user_id".to_string(), json!(self.user_id));
        let now = json!(Utc::now());
        for column in [T::TABLE.created_column(), T::TABLE.touch_column()].into_iter().flatten() {
            row.entry(column.to_string()).or_insert_with(|| now.clone());
        }
        Self::parse(self.backend.insert(T::TABLE, row).await?)
    }

    /// Partial update of the owner's row `id`; `NotFound` when nothing matched.
    pub async fn update(&self, id: Uuid, changes: Row) -> Result<T, DatabaseError> {
        let mut changes = changes;
        // ownership is never reassignable
        changes.remove("user_id");
        changes.remove("id");
        if let Some(column) = T::TABLE.touch_column() {
            changes.insert(column.to_string(), json!(Utc::now()));
        }
        let mut rows = self
            .backend
            .update(T::TABLE, &self.scoped(Self::by_id(id)), changes)
            .await?;
        match rows.pop() {
            Some(row) => Self::parse(row),
            None => Err(DatabaseError::NotFound(format!("{} record not found", T::TABLE.name()))),
        }
    }

    /// Deletes the owner's row `id`. Returns how many rows went away (0 or 1).
    pub async fn delete(&self, id: Uuid) -> Result<u64, DatabaseError> {
        self.backend.delete(T::TABLE, &self.scoped(Self::by_id(id))).await
    }

    /// Atomic `column = column + 1` on the owner's row `id`.
    pub async fn increment(&self, id: Uuid, column: &str) -> Result<T, DatabaseError> {
        let mut rows = self
            .backend
            .increment(T::TABLE, &self.scoped(Self::by_id(id)), column)
            .await?;
        match rows.pop() {
            Some(row) => Self::parse(row),
            None => Err(DatabaseError::NotFound(format!("{} record not found", T::TABLE.name()))),
        }
    }

    /// Insert-or-replace keyed by the table's primary key.
    pub async fn upsert(&self, record: impl Serialize) -> Result<T, DatabaseError> {
        let mut row = Self::to_row(record)?;
        row.insert("user_id".to_string(), json!(self.user_id));
        if let Some(column) = T::TABLE.touch_column() {
            row.insert(column.to_string(), json!(Utc::now()));
        }
        Self::parse(self.backend.upsert(T::TABLE, row).await?)
    }

    /// Reads the owner's rows from an aggregation view.
    pub async fn view<R: DeserializeOwned>(&self, view: View) -> Result<Vec<R>, DatabaseError> {
        self.backend
            .select_view(view, &self.scoped(FilterData::new()))
            .await?
            .into_iter()
            .map(|row| {
                serde_json::from_value(Value::Object(row)).map_err(|e| DatabaseError::Decode {
                    table: view.name(),
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryBackend;
    use crate::database::models::Project;

    fn repos() -> (Repository<Project>, Repository<Project>) {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        (
            Repository::new(backend.clone(), Uuid::new_v4()),
            Repository::new(backend, Uuid::new_v4()),
        )
    }

    #[tokio::test]
    async fn rows_are_invisible_to_other_users() {
        let (alice, bob) = repos();
        let project = alice.insert(json!({ "name": "Acme" })).await.unwrap();
        assert_eq!(project.user_id, alice.user_id());

        assert!(matches!(bob.get(project.id).await, Err(DatabaseError::NotFound(_))));
        assert!(bob.select_any(FilterData::new()).await.unwrap().is_empty());
        assert_eq!(bob.delete(project.id).await.unwrap(), 0);

        let changes = json!({ "name": "Hijacked" }).as_object().cloned().unwrap();
        assert!(matches!(bob.update(project.id, changes).await, Err(DatabaseError::NotFound(_))));
        assert_eq!(alice.get(project.id).await.unwrap().name, "Acme");
    }

    #[tokio::test]
    async fn update_cannot_reassign_owner() {
        let (alice, bob) = repos();
        let project = alice.insert(json!({ "name": "Acme" })).await.unwrap();
        let changes = json!({ "name": "Renamed", "user_id": bob.user_id() })
            .as_object()
            .cloned()
            .unwrap();
        let updated = alice.update(project.id, changes).await.unwrap();
        assert_eq!(updated.user_id, alice.user_id());
        assert_eq!(updated.name, "Renamed");
        assert!(updated.updated_at >= project.updated_at);
    }

    #[tokio::test]
    async fn malformed_rows_are_decode_errors() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new());
        let owner = Uuid::new_v4();
        let row = json!({ "user_id": owner, "name": 42 }).as_object().cloned().unwrap();
        backend.insert(Table::Projects, row).await.unwrap();

        let repo: Repository<Project> = Repository::new(backend, owner);
        assert!(matches!(
            repo.select_any(FilterData::new()).await,
            Err(DatabaseError::Decode { table: "projects", .. })
        ));
    }
}
