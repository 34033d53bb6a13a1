use super::Pool;
use crate::error::Result;
use crate::model::{FormData, Setting};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::Row;
use tracing::instrument;

#[instrument(skip_all)]
pub async fn get_setting(pool: &Pool, key: &str) -> Result<Option<Setting>> {
    let row = sqlx::query("SELECT id, key, value, updated_at FROM app_settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let value: Json<FormData> = row.try_get("value")?;
    Ok(Some(Setting {
        id: row.try_get("id")?,
        key: row.try_get("key")?,
        value: value.0,
        updated_at: row.try_get("updated_at")?,
    }))
}

/// Insert or replace the value stored under `key`; the row id is kept on conflict.
#[instrument(skip_all)]
pub async fn upsert_setting(
    pool: &Pool,
    id: &str,
    key: &str,
    value: &FormData,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO app_settings (id, key, value, updated_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(id)
    .bind(key)
    .bind(Json(value))
    .bind(updated_at)
    .execute(pool)
    .await?;
    Ok(())
}
