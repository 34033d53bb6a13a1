use super::Pool;
use crate::error::Result;
use crate::model::Upload;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::Row;
use tracing::instrument;

/// Counters written once an upload has been processed.
#[derive(Debug, Clone)]
pub struct UploadProgress<'a> {
    pub records_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub errors: &'a [String],
    pub status: &'a str,
    pub processed_at: DateTime<Utc>,
}

fn upload_from_row(row: &SqliteRow) -> std::result::Result<Upload, sqlx::Error> {
    let errors: Json<Vec<String>> = row.try_get("errors")?;
    Ok(Upload {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        file_url: row.try_get("file_url")?,
        category: row.try_get("category")?,
        uploaded_by: row.try_get("uploaded_by")?,
        status: row.try_get("status")?,
        records_count: row.try_get("records_count")?,
        success_count: row.try_get("success_count")?,
        error_count: row.try_get("error_count")?,
        errors: errors.0,
        uploaded_at: row.try_get("uploaded_at")?,
        processed_at: row.try_get("processed_at")?,
    })
}

#[instrument(skip_all)]
pub async fn insert_upload(pool: &Pool, upload: &Upload) -> Result<()> {
    sqlx::query(
        "INSERT INTO excel_uploads (id, file_name, file_url, category, uploaded_by, status, uploaded_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&upload.id)
    .bind(&upload.file_name)
    .bind(&upload.file_url)
    .bind(&upload.category)
    .bind(&upload.uploaded_by)
    .bind(&upload.status)
    .bind(upload.uploaded_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn update_upload_progress(
    pool: &Pool,
    id: &str,
    progress: &UploadProgress<'_>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE excel_uploads SET records_count = ?, success_count = ?, error_count = ?, \
         errors = ?, status = ?, processed_at = ? WHERE id = ?",
    )
    .bind(progress.records_count)
    .bind(progress.success_count)
    .bind(progress.error_count)
    .bind(Json(progress.errors))
    .bind(progress.status)
    .bind(progress.processed_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[instrument(skip_all)]
pub async fn query_uploads(pool: &Pool) -> Result<Vec<Upload>> {
    let rows = sqlx::query(
        "SELECT id, file_name, file_url, category, uploaded_by, status, records_count, \
         success_count, error_count, errors, uploaded_at, processed_at \
         FROM excel_uploads ORDER BY uploaded_at DESC, rowid DESC",
    )
    .fetch_all(pool)
    .await?;
    let uploads = rows
        .iter()
        .map(upload_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(uploads)
}
