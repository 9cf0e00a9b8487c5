//! Storage layer for teams, squads and the rest of the entity graph
//!
//! The sync engine only talks to the store through [`EntityStore`]: a
//! generic `select` / `upsert` / `delete` interface over JSON rows.
//! - `models`: typed rows (leagues, teams, squads, rating votes)
//! - `schema`: table registry with conflict keys, in dependency order
//! - `sqlite`: rusqlite-backed document tables (local mirror, tests)
//! - `rest`: hosted PostgREST-style service over reqwest
//! - `backend`: runtime selection between the two
//! - `queries`: typed helpers built on the generic interface

pub mod backend;
pub mod models;
pub mod queries;
pub mod rest;
pub mod schema;
pub mod sqlite;


use serde_json::{Map, Value};

use crate::error::Result;

pub use backend::StoreBackend;
pub use models::*;
pub use rest::RestStore;
pub use schema::{table_spec, TableSpec, TABLES};
pub use sqlite::SqliteStore;

/// One stored row, column name to JSON value.
pub type Row = Map<String, Value>;

/// Equality filter; every condition must hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub eq: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.eq.is_empty()
    }
}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Upsert-capable row store.
///
/// Upserts merge: columns present in the row overwrite the stored ones,
/// columns absent from the row are left untouched. Arrays are replaced
/// wholesale.
#[allow(async_fn_in_trait)]
pub trait EntityStore {
    /// Rows matching `filter`, in a stable order, restricted to `page`.
    async fn select(&self, table: &str, filter: &Filter, page: Page) -> Result<Vec<Row>>;

    /// Insert-or-merge `rows` keyed on `conflict_key`. Returns rows written.
    async fn upsert(&self, table: &str, rows: &[Row], conflict_key: &[&str]) -> Result<usize>;

    /// Delete rows matching a non-empty `filter`. Returns rows removed.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize>;

    /// Cheap reachability probe used at startup.
    async fn ping(&self) -> Result<()>;
}

/// Validate a column name before it is spliced into a query.
pub(crate) fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}
