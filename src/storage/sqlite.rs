//! SQLite document tables
//!
//! Each registered table is stored as `(pk TEXT PRIMARY KEY, doc TEXT)`
//! where `pk` is derived from the table's conflict key and `doc` is the
//! row as JSON. Upserts merge with `json_patch`, matching the partial-row
//! semantics of the hosted store.

use std::{path::Path, sync::Mutex};

use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection};
use serde_json::Value;

use super::{is_identifier, schema::TABLES, EntityStore, Filter, Page, Row};
use crate::error::{Result, SyncError};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store file and ensure all tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        for table in TABLES {
            conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        pk TEXT PRIMARY KEY,
                        doc TEXT NOT NULL
                    )",
                    table.name
                ),
                [],
            )?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SyncError::Store {
            message: "sqlite connection poisoned".to_string(),
        })
    }

    /// Number of rows in `table`.
    pub fn count(&self, table: &str) -> Result<usize> {
        check_table(table)?;
        let conn = self.lock()?;
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
            r.get(0)
        })?;
        Ok(n as usize)
    }
}

fn check_table(table: &str) -> Result<()> {
    if TABLES.iter().any(|t| t.name == table) {
        Ok(())
    } else {
        Err(SyncError::UnknownTable {
            name: table.to_string(),
        })
    }
}

/// `WHERE` clause and bound values for an equality filter.
fn where_clause(filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    for (column, value) in &filter.eq {
        if !is_identifier(column) {
            return Err(SyncError::Store {
                message: format!("invalid column name: {column}"),
            });
        }
        match to_sql_value(value) {
            None => clauses.push(format!("json_extract(doc, '$.{column}') IS NULL")),
            Some(v) => {
                clauses.push(format!("json_extract(doc, '$.{column}') = ?"));
                values.push(v);
            }
        }
    }
    if clauses.is_empty() {
        Ok((String::new(), values))
    } else {
        Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
    }
}

/// What `json_extract` would return for this JSON value.
fn to_sql_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(*b as i64)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        }),
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

/// Primary key text for a row under `conflict_key`.
fn primary_key(row: &Row, conflict_key: &[&str]) -> Result<String> {
    let mut parts = Vec::with_capacity(conflict_key.len());
    for column in conflict_key {
        match row.get(*column) {
            Some(v) if !v.is_null() => parts.push(v.to_string()),
            _ => {
                return Err(SyncError::Store {
                    message: format!("row is missing conflict column {column}"),
                })
            }
        }
    }
    Ok(parts.join("|"))
}

impl EntityStore for SqliteStore {
    async fn select(&self, table: &str, filter: &Filter, page: Page) -> Result<Vec<Row>> {
        check_table(table)?;
        let (where_sql, mut values) = where_clause(filter)?;
        values.push(SqlValue::Integer(page.limit as i64));
        values.push(SqlValue::Integer(page.offset as i64));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT doc FROM {table}{where_sql} ORDER BY rowid LIMIT ? OFFSET ?"
        ))?;
        let docs = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;

        let mut rows = Vec::new();
        for doc in docs {
            match serde_json::from_str::<Value>(&doc?)? {
                Value::Object(map) => rows.push(map),
                other => {
                    return Err(SyncError::Store {
                        message: format!("non-object document in {table}: {other}"),
                    })
                }
            }
        }
        Ok(rows)
    }

    async fn upsert(&self, table: &str, rows: &[Row], conflict_key: &[&str]) -> Result<usize> {
        check_table(table)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} (pk, doc) VALUES (?1, json(?2))
                 ON CONFLICT(pk) DO UPDATE SET doc = json_patch({table}.doc, excluded.doc)"
            ))?;
            for row in rows {
                let pk = primary_key(row, conflict_key)?;
                stmt.execute(params![pk, serde_json::to_string(row)?])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        check_table(table)?;
        if filter.is_empty() {
            return Err(SyncError::Store {
                message: format!("refusing unfiltered delete on {table}"),
            });
        }
        let (where_sql, values) = where_clause(filter)?;
        let conn = self.lock()?;
        let removed = conn.execute(
            &format!("DELETE FROM {table}{where_sql}"),
            params_from_iter(values),
        )?;
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
        Ok(())
    }
}
