//! Snapshot export.
//!
//! A snapshot is a write-once directory `backup-<timestamp>/` holding one
//! `<table>.json` per table, a consolidated `all.json` and a
//! `manifest.json` with per-table row counts. Tables are walked in
//! registry order so the manifest doubles as the restore order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::Settings,
    error::Result,
    storage::{
        queries::{fetch_all, DEFAULT_PAGE_SIZE},
        schema::ordered_subset,
        EntityStore, Filter, TableSpec,
    },
};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const CONSOLIDATED_FILE: &str = "all.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub table: String,
    pub rows: usize,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: DateTime<Utc>,
    /// In restore order
    pub tables: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|e| e.table == table).map(|e| e.rows)
    }
}

pub fn table_file(table: &str) -> String {
    format!("{table}.json")
}

/// Dump `tables` into a new snapshot directory under `out_root`.
pub async fn backup<S: EntityStore>(
    store: &S,
    out_root: &Path,
    tables: &[&TableSpec],
    page_size: usize,
) -> Result<(PathBuf, Manifest)> {
    let created_at = Utc::now();
    fs::create_dir_all(out_root)?;
    let dir = out_root.join(format!("backup-{}", created_at.format("%Y%m%dT%H%M%S%.3fZ")));
    // create_dir, not create_dir_all: snapshots are never written into twice
    fs::create_dir(&dir)?;

    let mut manifest = Manifest {
        created_at,
        tables: Vec::with_capacity(tables.len()),
    };
    let mut consolidated = Map::new();

    for spec in tables {
        let rows = fetch_all(store, spec.name, &Filter::all(), page_size).await?;
        let file = table_file(spec.name);
        fs::write(dir.join(&file), serde_json::to_vec_pretty(&rows)?)?;
        tracing::info!(table = spec.name, rows = rows.len(), "Table exported");

        manifest.tables.push(ManifestEntry {
            table: spec.name.to_string(),
            rows: rows.len(),
            file,
        });
        consolidated.insert(
            spec.name.to_string(),
            Value::Array(rows.into_iter().map(Value::Object).collect()),
        );
    }

    let all = serde_json::json!({
        "created_at": created_at,
        "tables": consolidated,
    });
    fs::write(dir.join(CONSOLIDATED_FILE), serde_json::to_vec(&all)?)?;
    fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;
    Ok((dir, manifest))
}

pub async fn handle_backup(
    settings: &Settings,
    out: Option<PathBuf>,
    tables: Vec<String>,
) -> Result<()> {
    let specs = ordered_subset(&tables)?;
    let store = settings.open_store()?;
    store.ping().await?;

    let out_root = out.unwrap_or_else(|| settings.backup_dir());
    let (dir, manifest) = backup(&store, &out_root, &specs, DEFAULT_PAGE_SIZE).await?;

    println!("✓ Backup written to {}", dir.display());
    for entry in &manifest.tables {
        println!("  {:<16} {:>8} rows", entry.table, entry.rows);
    }
    Ok(())
}
