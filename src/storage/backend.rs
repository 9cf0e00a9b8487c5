//! Runtime choice of store implementation.

use super::{EntityStore, Filter, Page, RestStore, Row, SqliteStore};
use crate::error::Result;

/// Either a local SQLite mirror or the hosted service, chosen from
/// `STORE_URL` (`sqlite:<path>` vs. an http(s) base URL).
pub enum StoreBackend {
    Sqlite(SqliteStore),
    Rest(RestStore),
}

impl EntityStore for StoreBackend {
    async fn select(&self, table: &str, filter: &Filter, page: Page) -> Result<Vec<Row>> {
        match self {
            StoreBackend::Sqlite(s) => s.select(table, filter, page).await,
            StoreBackend::Rest(s) => s.select(table, filter, page).await,
        }
    }

    async fn upsert(&self, table: &str, rows: &[Row], conflict_key: &[&str]) -> Result<usize> {
        match self {
            StoreBackend::Sqlite(s) => s.upsert(table, rows, conflict_key).await,
            StoreBackend::Rest(s) => s.upsert(table, rows, conflict_key).await,
        }
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize> {
        match self {
            StoreBackend::Sqlite(s) => s.delete(table, filter).await,
            StoreBackend::Rest(s) => s.delete(table, filter).await,
        }
    }

    async fn ping(&self) -> Result<()> {
        match self {
            StoreBackend::Sqlite(s) => s.ping().await,
            StoreBackend::Rest(s) => s.ping().await,
        }
    }
}
