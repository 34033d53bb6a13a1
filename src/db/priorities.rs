use super::{decode_enum, Pool};
use crate::error::Result;
use crate::model::{DurationUnit, Priority, PriorityKind, PriorityStatus};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::instrument;

const PRIORITY_COLUMNS: &str = "id, company_id, company_name, category, position, priority_type, \
     duration, duration_type, expires_at, status, created_at, created_by";

/// Matches a priority that still holds its slot at the bound instant.
const EFFECTIVE: &str = "status = 'active' AND (expires_at IS NULL OR expires_at > ?)";

fn priority_from_row(row: &SqliteRow) -> std::result::Result<Priority, sqlx::Error> {
    let kind: String = row.try_get("priority_type")?;
    let status: String = row.try_get("status")?;
    let unit: Option<String> = row.try_get("duration_type")?;
    let duration_type = match unit.as_deref().filter(|u| !u.is_empty()) {
        Some(u) => Some(decode_enum("duration_type", u, DurationUnit::parse)?),
        None => None,
    };
    Ok(Priority {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        company_name: row.try_get("company_name")?,
        category: row.try_get("category")?,
        position: row.try_get("position")?,
        priority_type: decode_enum("priority_type", &kind, PriorityKind::parse)?,
        duration: row.try_get("duration")?,
        duration_type,
        expires_at: row.try_get("expires_at")?,
        status: decode_enum("status", &status, PriorityStatus::parse)?,
        created_at: row.try_get("created_at")?,
        created_by: row.try_get("created_by")?,
    })
}

/// Insert unless another effective priority already holds the same
/// category/position at `now`. Returns the affected row count.
#[instrument(skip_all)]
pub async fn insert_priority_if_free(
    pool: &Pool,
    priority: &Priority,
    now: DateTime<Utc>,
) -> Result<u64> {
    let sql = format!(
        "INSERT INTO priorities ({PRIORITY_COLUMNS}) \
         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ? \
         WHERE ? <> 'active' OR NOT EXISTS ( \
             SELECT 1 FROM priorities WHERE LOWER(category) = LOWER(?) AND position = ? AND {EFFECTIVE})"
    );
    let result = sqlx::query(&sql)
        .bind(&priority.id)
        .bind(&priority.company_id)
        .bind(&priority.company_name)
        .bind(&priority.category)
        .bind(priority.position)
        .bind(priority.priority_type.as_str())
        .bind(priority.duration)
        .bind(priority.duration_type.map(|u| u.as_str()))
        .bind(priority.expires_at)
        .bind(priority.status.as_str())
        .bind(priority.created_at)
        .bind(&priority.created_by)
        .bind(priority.status.as_str())
        .bind(&priority.category)
        .bind(priority.position)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[instrument(skip_all)]
pub async fn get_priority(pool: &Pool, id: &str) -> Result<Option<Priority>> {
    let sql = format!("SELECT {PRIORITY_COLUMNS} FROM priorities WHERE id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(priority_from_row).transpose()?)
}

/// Replace the mutable columns of `priority.id`, leaving `expires_at`,
/// `created_at` and `created_by` untouched. Zero rows means the id is
/// missing or the target slot is taken by another effective priority.
#[instrument(skip_all)]
pub async fn update_priority_if_free(
    pool: &Pool,
    priority: &Priority,
    now: DateTime<Utc>,
) -> Result<u64> {
    let sql = "UPDATE priorities SET company_id = ?, company_name = ?, category = ?, position = ?, \
         priority_type = ?, duration = ?, duration_type = ?, status = ? \
         WHERE id = ? AND (? <> 'active' OR NOT EXISTS ( \
             SELECT 1 FROM priorities other WHERE other.id <> ? \
             AND LOWER(other.category) = LOWER(?) AND other.position = ? \
             AND other.status = 'active' \
             AND (other.expires_at IS NULL OR other.expires_at > ?)))";
    let result = sqlx::query(sql)
        .bind(&priority.company_id)
        .bind(&priority.company_name)
        .bind(&priority.category)
        .bind(priority.position)
        .bind(priority.priority_type.as_str())
        .bind(priority.duration)
        .bind(priority.duration_type.map(|u| u.as_str()))
        .bind(priority.status.as_str())
        .bind(&priority.id)
        .bind(priority.status.as_str())
        .bind(&priority.id)
        .bind(&priority.category)
        .bind(priority.position)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[instrument(skip_all)]
pub async fn priority_exists(pool: &Pool, id: &str) -> Result<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM priorities WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

#[instrument(skip_all)]
pub async fn delete_priority(pool: &Pool, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM priorities WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Effective priorities at `now`, ascending by position.
#[instrument(skip_all)]
pub async fn query_effective(
    pool: &Pool,
    category: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<Priority>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {PRIORITY_COLUMNS} FROM priorities \
         WHERE status = 'active' AND (expires_at IS NULL OR expires_at > "
    ));
    qb.push_bind(now).push(")");
    if let Some(category) = category {
        qb.push(" AND LOWER(category) = LOWER(").push_bind(category).push(")");
    }
    qb.push(" ORDER BY position ASC, created_at ASC, rowid ASC");

    let rows = qb.build().fetch_all(pool).await?;
    let priorities = rows
        .iter()
        .map(priority_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(priorities)
}

/// Priorities still flagged active whose expiry has passed at `now`.
#[instrument(skip_all)]
pub async fn query_lapsed(pool: &Pool, now: DateTime<Utc>) -> Result<Vec<Priority>> {
    let sql = format!(
        "SELECT {PRIORITY_COLUMNS} FROM priorities \
         WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= ? \
         ORDER BY expires_at ASC"
    );
    let rows = sqlx::query(&sql).bind(now).fetch_all(pool).await?;
    let priorities = rows
        .iter()
        .map(priority_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(priorities)
}

#[instrument(skip_all)]
pub async fn count_effective(pool: &Pool, now: DateTime<Utc>) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM priorities WHERE {EFFECTIVE}");
    let count: i64 = sqlx::query_scalar(&sql).bind(now).fetch_one(pool).await?;
    Ok(count)
}
