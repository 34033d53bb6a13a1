use super::Pool;
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::instrument;

/// One (month, type) bucket; `month` is `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendRow {
    pub month: String,
    pub submission_type: String,
    pub count: i64,
}

#[instrument(skip_all)]
pub async fn count(pool: &Pool, sql: &str) -> Result<i64> {
    let n: i64 = sqlx::query_scalar(sql).fetch_one(pool).await?;
    Ok(n)
}

/// Run a `SELECT key, COUNT(*) ... GROUP BY key` query into a sorted map.
#[instrument(skip_all)]
pub async fn group_counts(pool: &Pool, sql: &str) -> Result<BTreeMap<String, i64>> {
    let rows = sqlx::query(sql).fetch_all(pool).await?;
    let mut counts = BTreeMap::new();
    for row in rows {
        let key: String = row.try_get(0)?;
        let n: i64 = row.try_get(1)?;
        counts.insert(key, n);
    }
    Ok(counts)
}

/// Submissions at or after `since`, bucketed by month and type, newest month first.
#[instrument(skip_all)]
pub async fn submission_trends(pool: &Pool, since: DateTime<Utc>) -> Result<Vec<TrendRow>> {
    let rows = sqlx::query(
        "SELECT substr(submitted_at, 1, 7) AS month, type, COUNT(*) AS count \
         FROM form_submissions WHERE submitted_at >= ? \
         GROUP BY month, type ORDER BY month DESC, type ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;
    let mut trends = Vec::with_capacity(rows.len());
    for row in rows {
        trends.push(TrendRow {
            month: row.try_get("month")?,
            submission_type: row.try_get("type")?,
            count: row.try_get("count")?,
        });
    }
    Ok(trends)
}
