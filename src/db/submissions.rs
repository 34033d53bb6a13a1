use super::{decode_enum, Pool};
use crate::error::Result;
use crate::model::{FormData, Submission, SubmissionStatus};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor};
use tracing::instrument;

const SUBMISSION_COLUMNS: &str = "id, type, form_data, attachments, status, submitted_at, \
     reviewed_at, reviewed_by, review_notes";

/// Review metadata written together with a status change.
#[derive(Debug, Clone)]
pub struct Review<'a> {
    pub status: SubmissionStatus,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: &'a str,
    pub notes: &'a str,
}

fn submission_from_row(row: &SqliteRow) -> std::result::Result<Submission, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let form_data: Json<FormData> = row.try_get("form_data")?;
    let attachments: Json<Vec<String>> = row.try_get("attachments")?;
    Ok(Submission {
        id: row.try_get("id")?,
        submission_type: row.try_get("type")?,
        form_data: form_data.0,
        attachments: attachments.0,
        status: decode_enum("status", &status, SubmissionStatus::parse)?,
        submitted_at: row.try_get("submitted_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
        reviewed_by: row.try_get("reviewed_by")?,
        review_notes: row.try_get("review_notes")?,
    })
}

#[instrument(skip_all)]
pub async fn insert_submission(pool: &Pool, submission: &Submission) -> Result<()> {
    sqlx::query(
        "INSERT INTO form_submissions (id, type, form_data, attachments, status, submitted_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&submission.id)
    .bind(&submission.submission_type)
    .bind(Json(&submission.form_data))
    .bind(Json(&submission.attachments))
    .bind(submission.status.as_str())
    .bind(submission.submitted_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn get_submission<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
) -> Result<Option<Submission>> {
    let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM form_submissions WHERE id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_optional(exec).await?;
    Ok(row.as_ref().map(submission_from_row).transpose()?)
}

/// Newest first.
#[instrument(skip_all)]
pub async fn query_submissions(
    pool: &Pool,
    submission_type: Option<&str>,
    status: Option<SubmissionStatus>,
) -> Result<Vec<Submission>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {SUBMISSION_COLUMNS} FROM form_submissions WHERE 1=1"
    ));
    if let Some(t) = submission_type {
        qb.push(" AND type = ").push_bind(t);
    }
    if let Some(s) = status {
        qb.push(" AND status = ").push_bind(s.as_str());
    }
    qb.push(" ORDER BY submitted_at DESC, rowid DESC");

    let rows = qb.build().fetch_all(pool).await?;
    let submissions = rows
        .iter()
        .map(submission_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(submissions)
}

/// Record a moderation decision on a submission that is still pending.
/// Zero rows means the id is missing or the submission was already reviewed.
#[instrument(skip_all)]
pub async fn review_if_pending<'e, E: SqliteExecutor<'e>>(
    exec: E,
    id: &str,
    review: &Review<'_>,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE form_submissions SET status = ?, reviewed_at = ?, reviewed_by = ?, review_notes = ? \
         WHERE id = ? AND status = 'pending'",
    )
    .bind(review.status.as_str())
    .bind(review.reviewed_at)
    .bind(review.reviewed_by)
    .bind(review.notes)
    .bind(id)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}
