//! Snapshot import.
//!
//! Tables are upserted in registry order (referenced before referencing)
//! in fixed-size batches. A failed batch is counted and skipped; the rest
//! of the table and the remaining tables still go through. Re-running a
//! restore is safe since every write is an upsert on the table's key.

use std::fs;
use std::path::Path;

use serde::Serialize;

use super::backup::{Manifest, MANIFEST_FILE};
use crate::{
    config::Settings,
    error::{Result, SyncError},
    storage::{schema::ordered_subset, EntityStore, Row, TableSpec},
};

pub const RESTORE_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRestore {
    pub table: String,
    pub inserted: usize,
    pub errors: usize,
}

pub fn read_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let raw = fs::read(&path).map_err(|e| SyncError::InvalidSnapshot {
        message: format!("{}: {e}", path.display()),
    })?;
    serde_json::from_slice(&raw).map_err(|e| SyncError::InvalidSnapshot {
        message: format!("{}: {e}", path.display()),
    })
}

fn read_rows(dir: &Path, file: &str) -> Result<Vec<Row>> {
    let path = dir.join(file);
    let raw = fs::read(&path)?;
    serde_json::from_slice(&raw).map_err(|e| SyncError::InvalidSnapshot {
        message: format!("{}: {e}", path.display()),
    })
}

/// Restore `tables` from the snapshot in `dir`. Tables missing from the
/// snapshot are skipped with a warning.
pub async fn restore<S: EntityStore>(
    store: &S,
    dir: &Path,
    tables: &[&TableSpec],
    batch_size: usize,
) -> Result<Vec<TableRestore>> {
    let manifest = read_manifest(dir)?;
    let mut report = Vec::with_capacity(tables.len());

    for spec in tables {
        let Some(entry) = manifest.tables.iter().find(|e| e.table == spec.name) else {
            tracing::warn!(table = spec.name, "Table not in snapshot, skipping");
            continue;
        };
        let rows = read_rows(dir, &entry.file)?;
        if rows.len() != entry.rows {
            tracing::warn!(
                table = spec.name,
                expected = entry.rows,
                found = rows.len(),
                "Row count differs from manifest"
            );
        }

        let mut result = TableRestore {
            table: spec.name.to_string(),
            inserted: 0,
            errors: 0,
        };
        for (i, batch) in rows.chunks(batch_size.max(1)).enumerate() {
            match store.upsert(spec.name, batch, spec.conflict_key).await {
                Ok(n) => result.inserted += n,
                Err(e) => {
                    result.errors += batch.len();
                    tracing::warn!(table = spec.name, batch = i, error = %e, "Batch failed");
                }
            }
        }
        tracing::info!(
            table = spec.name,
            inserted = result.inserted,
            errors = result.errors,
            "Table restored"
        );
        report.push(result);
    }
    Ok(report)
}

pub async fn handle_restore(settings: &Settings, dir: &Path, tables: Vec<String>) -> Result<()> {
    let specs = ordered_subset(&tables)?;
    let store = settings.open_store()?;
    store.ping().await?;

    let report = restore(&store, dir, &specs, RESTORE_BATCH_SIZE).await?;
    println!("✓ Restored from {}", dir.display());
    for table in &report {
        println!(
            "  {:<16} {:>8} upserted {:>6} errors",
            table.table, table.inserted, table.errors
        );
    }
    Ok(())
}
