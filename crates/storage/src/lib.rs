use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::sync::Mutex;

use shared::domain::{EntryId, FieldId, FieldKey};

mod field_store;

pub use field_store::{FieldChange, FieldHandle, FieldStore};

/// Summary of one stored field, without its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredField {
    pub key: FieldKey,
    pub updated_at: DateTime<Utc>,
}

/// Durable home of field values. Implementations only move raw JSON; they
/// never interpret the table inside.
#[async_trait]
pub trait FieldBackend: Send + Sync {
    async fn load_value(&self, key: &FieldKey) -> Result<Option<Value>>;
    async fn save_value(&self, key: &FieldKey, value: &Value) -> Result<()>;
    async fn list_fields(&self) -> Result<Vec<StoredField>>;
}

#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<FieldKey, (Value, DateTime<Utc>)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FieldBackend for MemoryBackend {
    async fn load_value(&self, key: &FieldKey) -> Result<Option<Value>> {
        let values = self.values.lock().await;
        Ok(values.get(key).map(|(value, _)| value.clone()))
    }

    async fn save_value(&self, key: &FieldKey, value: &Value) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key.clone(), (value.clone(), Utc::now()));
        Ok(())
    }

    async fn list_fields(&self) -> Result<Vec<StoredField>> {
        let values = self.values.lock().await;
        let mut fields: Vec<StoredField> = values
            .iter()
            .map(|(key, (_, updated_at))| StoredField {
                key: key.clone(),
                updated_at: *updated_at,
            })
            .collect();
        fields.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(fields)
    }
}

#[derive(Clone)]
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
}

impl SqliteBackend {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;

        let backend = Self { pool };
        backend.ensure_schema().await?;
        Ok(backend)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS field_values (
                entry_id   TEXT NOT NULL,
                field_id   TEXT NOT NULL,
                value_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (entry_id, field_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure field_values table exists")?;
        Ok(())
    }
}

#[async_trait]
impl FieldBackend for SqliteBackend {
    async fn load_value(&self, key: &FieldKey) -> Result<Option<Value>> {
        let row = sqlx::query(
            "SELECT value_json FROM field_values WHERE entry_id = ? AND field_id = ?",
        )
        .bind(key.entry_id.as_str())
        .bind(key.field_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load field {key}"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("value_json")?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("stored value of field {key} is not valid JSON"))?;
        Ok(Some(value))
    }

    async fn save_value(&self, key: &FieldKey, value: &Value) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            "INSERT INTO field_values (entry_id, field_id, value_json, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(entry_id, field_id) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at",
        )
        .bind(key.entry_id.as_str())
        .bind(key.field_id.as_str())
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save field {key}"))?;
        Ok(())
    }

    async fn list_fields(&self) -> Result<Vec<StoredField>> {
        let rows = sqlx::query(
            "SELECT entry_id, field_id, updated_at FROM field_values ORDER BY entry_id, field_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list stored fields")?;

        rows.into_iter()
            .map(|row| -> Result<StoredField> {
                Ok(StoredField {
                    key: FieldKey {
                        entry_id: EntryId(row.try_get("entry_id")?),
                        field_id: FieldId(row.try_get("field_id")?),
                    },
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
