use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::backend::{Backend, Row};
use super::manager::DatabaseError;
use super::schema::{referencing, OnDelete, Table, View, FOREIGN_KEYS};
use crate::filter::{Filter, FilterData, FilterMatch};

/// Process-local tables with the same filter semantics as the Postgres backend.
///
/// Foreign keys, cascades and the usage views are emulated from [`FOREIGN_KEYS`] so
/// handlers behave identically on either backend.
pub struct MemoryBackend {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    insert_faults: Mutex<Vec<(Table, String, Value)>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            insert_faults: Mutex::new(Vec::new()),
        }
    }

    /// Makes every later insert into `table` whose `column` equals `value` fail.
    pub async fn fail_inserts_matching(&self, table: Table, column: &str, value: Value) {
        self.insert_faults.lock().await.push((table, column.to_string(), value));
    }

    async fn check_fault(&self, table: Table, row: &Row) -> Result<(), DatabaseError> {
        let faults = self.insert_faults.lock().await;
        let tripped = faults
            .iter()
            .any(|(t, column, value)| *t == table && row.get(column) == Some(value));
        if tripped {
            return Err(DatabaseError::QueryError(format!(
                "injected insert failure on {}",
                table.name()
            )));
        }
        Ok(())
    }

    fn compile(relation: &str, filter: &FilterData) -> Result<Filter, DatabaseError> {
        let mut compiled = Filter::new(relation)?;
        compiled.assign(filter)?;
        Ok(compiled)
    }

    /// Filters, sorts and pages `rows` the way the generated SQL would.
    fn query(relation: &str, rows: &[Row], filter: &FilterData) -> Result<Vec<Row>, DatabaseError> {
        let compiled = Self::compile(relation, filter)?;
        let node = compiled.where_node()?;
        let mut matched = Vec::new();
        for row in rows {
            if FilterMatch::matches(&node, row)? {
                matched.push(row.clone());
            }
        }
        FilterMatch::sort(&mut matched, compiled.order_info());

        let (limit, offset) = compiled.limit_offset();
        let offset = offset.unwrap_or(0).max(0) as usize;
        let iter = matched.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        })
    }

    fn check_foreign_keys(
        tables: &HashMap<Table, Vec<Row>>,
        table: Table,
        row: &Row,
    ) -> Result<(), DatabaseError> {
        for fk in FOREIGN_KEYS.iter().filter(|fk| fk.child == table) {
            let Some(value) = row.get(fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let parent_key = fk.parent.primary_key();
            let exists = tables
                .get(&fk.parent)
                .map(|rows| rows.iter().any(|r| r.get(parent_key) == Some(value)))
                .unwrap_or(false);
            if !exists {
                return Err(DatabaseError::Constraint(format!(
                    "{}.{} references missing {} row",
                    table.name(),
                    fk.column,
                    fk.parent.name()
                )));
            }
        }
        Ok(())
    }

    fn key_of(table: Table, row: &Row) -> Option<Value> {
        row.get(table.primary_key()).filter(|v| !v.is_null()).cloned()
    }

    fn now() -> Value {
        Value::String(Utc::now().to_rfc3339())
    }

    /// Removes the keyed rows from `table` and follows foreign keys the way the schema does.
    fn remove_with_cascade(tables: &mut HashMap<Table, Vec<Row>>, table: Table, keys: Vec<Value>) {
        let mut pending = vec![(table, keys)];
        while let Some((table, keys)) = pending.pop() {
            if keys.is_empty() {
                continue;
            }
            let key_column = table.primary_key();
            if let Some(rows) = tables.get_mut(&table) {
                rows.retain(|r| !r.get(key_column).map(|k| keys.contains(k)).unwrap_or(false));
            }
            for fk in referencing(table) {
                let Some(children) = tables.get_mut(&fk.child) else {
                    continue;
                };
                match fk.on_delete {
                    OnDelete::Cascade => {
                        let doomed: Vec<Value> = children
                            .iter()
                            .filter(|r| r.get(fk.column).map(|v| keys.contains(v)).unwrap_or(false))
                            .filter_map(|r| Self::key_of(fk.child, r))
                            .collect();
                        pending.push((fk.child, doomed));
                    }
                    OnDelete::SetNull => {
                        for child in children.iter_mut() {
                            if child.get(fk.column).map(|v| keys.contains(v)).unwrap_or(false) {
                                child.insert(fk.column.to_string(), Value::Null);
                            }
                        }
                    }
                }
            }
        }
    }

    fn aggregate_usage(logs: &[Row], since: Option<DateTime<Utc>>) -> Vec<Row> {
        #[derive(Default)]
        struct Totals {
            calls: i64,
            input: i64,
            output: i64,
            cost: Decimal,
            last: Option<DateTime<Utc>>,
        }

        let mut by_user: BTreeMap<String, Totals> = BTreeMap::new();
        for log in logs {
            let Some(user_id) = log.get("user_id").and_then(Value::as_str) else {
                continue;
            };
            let at = log
                .get("timestamp")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            if let (Some(since), Some(at)) = (since, at) {
                if at < since {
                    continue;
                }
            }
            let totals = by_user.entry(user_id.to_string()).or_default();
            totals.calls += 1;
            totals.input += log.get("input_tokens").and_then(Value::as_i64).unwrap_or(0);
            totals.output += log.get("output_tokens").and_then(Value::as_i64).unwrap_or(0);
            totals.cost += log
                .get("cost_usd")
                .and_then(|v| match v {
                    Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
                    Value::String(s) => Decimal::from_str(s).ok(),
                    _ => None,
                })
                .unwrap_or_default();
            totals.last = totals.last.max(at);
        }

        by_user
            .into_iter()
            .filter_map(|(user_id, t)| {
                // numeric columns come back from row_to_json as JSON numbers
                let total_cost: Value = serde_json::from_str(&t.cost.normalize().to_string()).ok()?;
                let row = json!({
                    "user_id": user_id,
                    "total_calls": t.calls,
                    "total_input_tokens": t.input,
                    "total_output_tokens": t.output,
                    "total_tokens": t.input + t.output,
                    "total_cost": total_cost,
                    "last_call_at": t.last.map(|dt| dt.to_rfc3339()),
                });
                row.as_object().cloned()
            })
            .collect()
    }

    fn month_start(now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0).single()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, table: Table, filter: &FilterData) -> Result<Vec<Row>, DatabaseError> {
        let tables = self.tables.read().await;
        let rows = tables.get(&table).map(Vec::as_slice).unwrap_or(&[]);
        Self::query(table.name(), rows, filter)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, DatabaseError> {
        self.check_fault(table, &row).await?;

        let mut stored = table.column_defaults();
        for (column, value) in row {
            stored.insert(column, value);
        }
        let key_column = table.primary_key();
        if Self::key_of(table, &stored).is_none() {
            if key_column != "id" {
                return Err(DatabaseError::Constraint(format!(
                    "{}.{} must not be null",
                    table.name(),
                    key_column
                )));
            }
            stored.insert("id".to_string(), json!(Uuid::new_v4()));
        }

        let mut tables = self.tables.write().await;
        Self::check_foreign_keys(&tables, table, &stored)?;
        let rows = tables.entry(table).or_default();
        let key = stored.get(key_column);
        if rows.iter().any(|r| r.get(key_column) == key) {
            return Err(DatabaseError::Constraint(format!(
                "duplicate key in {}",
                table.name()
            )));
        }
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, table: Table, filter: &FilterData, changes: Row) -> Result<Vec<Row>, DatabaseError> {
        if changes.is_empty() {
            return Err(DatabaseError::QueryError("update with no changes".to_string()));
        }
        let mut tables = self.tables.write().await;
        let targets = {
            let rows = tables.get(&table).map(Vec::as_slice).unwrap_or(&[]);
            Self::query(table.name(), rows, filter)?
        };
        let key_column = table.primary_key();

        let mut updated = Vec::with_capacity(targets.len());
        for target in targets {
            let mut next = target.clone();
            for (column, value) in &changes {
                next.insert(column.clone(), value.clone());
            }
            Self::check_foreign_keys(&tables, table, &next)?;
            updated.push(next);
        }

        if let Some(rows) = tables.get_mut(&table) {
            for next in &updated {
                let key = next.get(key_column);
                if let Some(slot) = rows.iter_mut().find(|r| r.get(key_column) == key) {
                    *slot = next.clone();
                }
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filter: &FilterData) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        let keys: Vec<Value> = {
            let rows = tables.get(&table).map(Vec::as_slice).unwrap_or(&[]);
            Self::query(table.name(), rows, filter)?
                .iter()
                .filter_map(|r| Self::key_of(table, r))
                .collect()
        };
        let removed = keys.len() as u64;
        Self::remove_with_cascade(&mut tables, table, keys);
        Ok(removed)
    }

    async fn increment(&self, table: Table, filter: &FilterData, column: &str) -> Result<Vec<Row>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let keys: Vec<Value> = {
            let rows = tables.get(&table).map(Vec::as_slice).unwrap_or(&[]);
            Self::query(table.name(), rows, filter)?
                .iter()
                .filter_map(|r| Self::key_of(table, r))
                .collect()
        };
        let key_column = table.primary_key();
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut() {
                if !row.get(key_column).map(|k| keys.contains(k)).unwrap_or(false) {
                    continue;
                }
                let current = row.get(column).and_then(Value::as_i64).unwrap_or(0);
                row.insert(column.to_string(), json!(current + 1));
                if let Some(touch) = table.touch_column() {
                    row.insert(touch.to_string(), Self::now());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn upsert(&self, table: Table, row: Row) -> Result<Row, DatabaseError> {
        let key_column = table.primary_key();
        let Some(key) = Self::key_of(table, &row) else {
            return Err(DatabaseError::Constraint(format!(
                "upsert into {} without {}",
                table.name(),
                key_column
            )));
        };
        {
            let mut tables = self.tables.write().await;
            Self::check_foreign_keys(&tables, table, &row)?;
            if let Some(existing) = tables
                .get_mut(&table)
                .and_then(|rows| rows.iter_mut().find(|r| r.get(key_column) == Some(&key)))
            {
                for (column, value) in row {
                    existing.insert(column, value);
                }
                return Ok(existing.clone());
            }
        }
        self.insert(table, row).await
    }

    async fn select_view(&self, view: View, filter: &FilterData) -> Result<Vec<Row>, DatabaseError> {
        let tables = self.tables.read().await;
        let logs = tables.get(&Table::ApiUsageLogs).map(Vec::as_slice).unwrap_or(&[]);
        let since = match view {
            View::UsageByUser => None,
            View::UsageByUserCurrentMonth => Self::month_start(Utc::now()),
        };
        let rows = Self::aggregate_usage(logs, since);
        Self::query(view.name(), &rows, filter)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_applies_defaults_and_rejects_duplicates() {
        let backend = MemoryBackend::new();
        let project = backend
            .insert(Table::Projects, row(json!({ "id": "p1", "user_id": "u1", "name": "Acme" })))
            .await
            .unwrap();
        assert_eq!(project["name"], json!("Acme"));

        let snippet = backend
            .insert(Table::Snippets, row(json!({ "project_id": "p1", "user_id": "u1", "name": "CTA" })))
            .await
            .unwrap();
        assert_eq!(snippet["usage_count"], json!(0));
        assert!(snippet["id"].is_string());

        let dup = backend
            .insert(Table::Projects, row(json!({ "id": "p1", "user_id": "u1", "name": "Again" })))
            .await;
        assert!(matches!(dup, Err(DatabaseError::Constraint(_))));
    }

    #[tokio::test]
    async fn rejects_dangling_foreign_key() {
        let backend = MemoryBackend::new();
        let result = backend
            .insert(Table::Folders, row(json!({ "project_id": "missing", "user_id": "u1", "name": "F" })))
            .await;
        assert!(matches!(result, Err(DatabaseError::Constraint(_))));
    }

    #[tokio::test]
    async fn deleting_project_cascades_and_nulls() {
        let backend = MemoryBackend::new();
        backend
            .insert(Table::Projects, row(json!({ "id": "p1", "user_id": "u1", "name": "Acme" })))
            .await
            .unwrap();
        backend
            .insert(Table::Folders, row(json!({ "id": "f1", "project_id": "p1", "user_id": "u1", "name": "A" })))
            .await
            .unwrap();
        backend
            .insert(
                Table::Folders,
                row(json!({ "id": "f2", "project_id": "p1", "user_id": "u1", "name": "B", "parent_folder_id": "f1" })),
            )
            .await
            .unwrap();
        backend
            .insert(
                Table::Documents,
                row(json!({ "id": "d1", "project_id": "p1", "user_id": "u1", "base_title": "Hero", "title": "Hero v1" })),
            )
            .await
            .unwrap();
        backend
            .upsert(Table::UserSettings, row(json!({ "user_id": "u1", "active_project_id": "p1" })))
            .await
            .unwrap();

        let removed = backend
            .delete(Table::Projects, &FilterData::new().eq("id", "p1"))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        for table in [Table::Folders, Table::Documents] {
            assert!(backend.select(table, &FilterData::new()).await.unwrap().is_empty());
        }
        let settings = backend.select(Table::UserSettings, &FilterData::new()).await.unwrap();
        assert!(settings[0]["active_project_id"].is_null());
    }

    #[tokio::test]
    async fn deleting_folder_nulls_document_folder() {
        let backend = MemoryBackend::new();
        backend
            .insert(Table::Projects, row(json!({ "id": "p1", "user_id": "u1", "name": "Acme" })))
            .await
            .unwrap();
        backend
            .insert(Table::Folders, row(json!({ "id": "f1", "project_id": "p1", "user_id": "u1", "name": "A" })))
            .await
            .unwrap();
        backend
            .insert(
                Table::Documents,
                row(json!({ "id": "d1", "project_id": "p1", "user_id": "u1", "folder_id": "f1", "base_title": "X", "title": "X v1" })),
            )
            .await
            .unwrap();

        backend.delete(Table::Folders, &FilterData::new().eq("id", "f1")).await.unwrap();
        let docs = backend.select(Table::Documents, &FilterData::new()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0]["folder_id"].is_null());
    }

    #[tokio::test]
    async fn increment_is_applied_per_call() {
        let backend = MemoryBackend::new();
        backend
            .insert(Table::Projects, row(json!({ "id": "p1", "user_id": "u1", "name": "Acme" })))
            .await
            .unwrap();
        backend
            .insert(Table::Snippets, row(json!({ "id": "s1", "project_id": "p1", "user_id": "u1", "name": "CTA" })))
            .await
            .unwrap();
        let filter = FilterData::new().eq("id", "s1");
        backend.increment(Table::Snippets, &filter, "usage_count").await.unwrap();
        let rows = backend.increment(Table::Snippets, &filter, "usage_count").await.unwrap();
        assert_eq!(rows[0]["usage_count"], json!(2));
    }

    #[tokio::test]
    async fn usage_view_sums_exactly() {
        let backend = MemoryBackend::new();
        let now = Utc::now().to_rfc3339();
        for (input, output, cost) in [(100, 50, 0.00105), (200, 150, 0.00285)] {
            backend
                .insert(
                    Table::ApiUsageLogs,
                    row(json!({
                        "user_id": "u1", "timestamp": now, "model": "claude-sonnet-4-20250514",
                        "input_tokens": input, "output_tokens": output, "feature": "tone_shift", "cost_usd": cost
                    })),
                )
                .await
                .unwrap();
        }
        let rows = backend
            .select_view(View::UsageByUser, &FilterData::new().eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["total_calls"], json!(2));
        assert_eq!(rows[0]["total_tokens"], json!(500));
        assert_eq!(rows[0]["total_cost"].to_string(), "0.0039");

        let month = backend
            .select_view(View::UsageByUserCurrentMonth, &FilterData::new())
            .await
            .unwrap();
        assert_eq!(month[0]["total_calls"], json!(2));
    }

    #[tokio::test]
    async fn injected_insert_failure() {
        let backend = MemoryBackend::new();
        backend.fail_inserts_matching(Table::Projects, "name", json!("Broken")).await;
        let result = backend
            .insert(Table::Projects, row(json!({ "user_id": "u1", "name": "Broken" })))
            .await;
        assert!(matches!(result, Err(DatabaseError::QueryError(_))));
    }
}
