use async_trait::async_trait;
use serde_json::Value;
use sqlx::{self, postgres::PgArguments, PgPool, Row as _};

use super::backend::{Backend, Row};
use super::manager::DatabaseError;
use super::schema::{Table, View};
use crate::filter::types::validate_column_name;
use crate::filter::{Filter, FilterData};

/// Backend for the hosted Postgres database.
///
/// Reads come back through `row_to_json`, writes go through `jsonb_populate_record`,
/// so column typing is left to the schema and rows cross the boundary as JSON.
pub struct PostgresBackend {
    pool: PgPool,
    log_queries: bool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool, log_queries: bool) -> Self {
        Self { pool, log_queries }
    }

    fn compile(relation: &str, filter: &FilterData) -> Result<Filter, DatabaseError> {
        let mut compiled = Filter::new(relation)?;
        compiled.assign(filter)?;
        Ok(compiled)
    }

    fn column_list(row: &Row) -> Result<Vec<String>, DatabaseError> {
        row.keys()
            .map(|c| {
                validate_column_name(c)?;
                Ok(format!("\"{}\"", c))
            })
            .collect()
    }

    async fn fetch_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        if self.log_queries {
            tracing::debug!(sql = %sql, params = params.len(), "postgres query");
        }
        let mut q = sqlx::query(sql);
        for p in params {
            q = bind_param_query(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| {
                let v: Value = r.try_get("row")?;
                match v {
                    Value::Object(map) => Ok(map),
                    other => Err(DatabaseError::QueryError(format!("unexpected row format: {}", other))),
                }
            })
            .collect()
    }

    async fn select_relation(&self, relation: &str, filter: &FilterData) -> Result<Vec<Row>, DatabaseError> {
        let sql_result = Self::compile(relation, filter)?
            .to_sql()
            .map_err(DatabaseError::from)?;
        self.fetch_rows(&sql_result.query, &sql_result.params).await
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn select(&self, table: Table, filter: &FilterData) -> Result<Vec<Row>, DatabaseError> {
        self.select_relation(table.name(), filter).await
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row, DatabaseError> {
        let columns = Self::column_list(&row)?.join(", ");
        let sql = format!(
            "INSERT INTO \"{t}\" AS t ({c}) SELECT {c} FROM jsonb_populate_record(NULL::\"{t}\", $1) RETURNING row_to_json(t) AS row",
            t = table.name(),
            c = columns
        );
        let mut rows = self.fetch_rows(&sql, &[Value::Object(row)]).await?;
        rows.pop()
            .ok_or_else(|| DatabaseError::QueryError(format!("insert into {} returned no row", table.name())))
    }

    async fn update(&self, table: Table, filter: &FilterData, changes: Row) -> Result<Vec<Row>, DatabaseError> {
        if changes.is_empty() {
            return Err(DatabaseError::QueryError("update with no changes".to_string()));
        }
        let assignments = Self::column_list(&changes)?
            .into_iter()
            .map(|c| {
                format!(
                    "{c} = (SELECT r.{c} FROM jsonb_populate_record(NULL::\"{t}\", $1) r)",
                    c = c,
                    t = table.name()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let where_result = Self::compile(table.name(), filter)?.to_where_sql(1)?;
        let sql = format!(
            "UPDATE \"{}\" AS t SET {} WHERE {} RETURNING row_to_json(t) AS row",
            table.name(),
            assignments,
            where_result.query
        );
        let mut params = vec![Value::Object(changes)];
        params.extend(where_result.params);
        self.fetch_rows(&sql, &params).await
    }

    async fn delete(&self, table: Table, filter: &FilterData) -> Result<u64, DatabaseError> {
        let where_result = Self::compile(table.name(), filter)?.to_where_sql(0)?;
        let sql = format!("DELETE FROM \"{}\" WHERE {}", table.name(), where_result.query);
        if self.log_queries {
            tracing::debug!(sql = %sql, "postgres delete");
        }
        let mut q = sqlx::query(&sql);
        for p in where_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn increment(&self, table: Table, filter: &FilterData, column: &str) -> Result<Vec<Row>, DatabaseError> {
        validate_column_name(column)?;
        let where_result = Self::compile(table.name(), filter)?.to_where_sql(0)?;
        let touch = table
            .touch_column()
            .map(|c| format!(", \"{}\" = now()", c))
            .unwrap_or_default();
        let sql = format!(
            "UPDATE \"{t}\" AS t SET \"{c}\" = COALESCE(\"{c}\", 0) + 1{touch} WHERE {w} RETURNING row_to_json(t) AS row",
            t = table.name(),
            c = column,
            touch = touch,
            w = where_result.query
        );
        self.fetch_rows(&sql, &where_result.params).await
    }

    async fn upsert(&self, table: Table, row: Row) -> Result<Row, DatabaseError> {
        let key = table.primary_key();
        let columns = Self::column_list(&row)?;
        let updates = columns
            .iter()
            .filter(|c| c.trim_matches('"') != key)
            .map(|c| format!("{c} = EXCLUDED.{c}", c = c))
            .collect::<Vec<_>>();
        let conflict_action = if updates.is_empty() {
            // RETURNING needs a row even when nothing changes
            format!("DO UPDATE SET \"{k}\" = EXCLUDED.\"{k}\"", k = key)
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };
        let sql = format!(
            "INSERT INTO \"{t}\" AS t ({c}) SELECT {c} FROM jsonb_populate_record(NULL::\"{t}\", $1) ON CONFLICT (\"{k}\") {action} RETURNING row_to_json(t) AS row",
            t = table.name(),
            c = columns.join(", "),
            k = key,
            action = conflict_action
        );
        let mut rows = self.fetch_rows(&sql, &[Value::Object(row)]).await?;
        rows.pop()
            .ok_or_else(|| DatabaseError::QueryError(format!("upsert into {} returned no row", table.name())))
    }

    async fn select_view(&self, view: View, filter: &FilterData) -> Result<Vec<Row>, DatabaseError> {
        self.select_relation(view.name(), filter).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Records and arrays travel as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}
