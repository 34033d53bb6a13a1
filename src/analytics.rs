//! Read-side reporting over listings, submissions and priorities.
//!
//! Every figure is computed from storage at call time. The counts are separate
//! queries, so a concurrent write may land between them.
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::db::analytics::{count, group_counts, submission_trends};
use crate::db::{priorities, Pool};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_companies: i64,
    pub active_companies: i64,
    pub total_submissions: i64,
    pub pending_submissions: i64,
    pub active_priorities: i64,
    pub companies_by_status: BTreeMap<String, i64>,
    /// Active listings only, keyed by lowercased category.
    pub companies_by_category: BTreeMap<String, i64>,
    pub submissions_by_type: BTreeMap<String, i64>,
    pub submissions_by_status: BTreeMap<String, i64>,
}

pub async fn dashboard(pool: &Pool) -> Result<DashboardStats> {
    dashboard_at(pool, Utc::now()).await
}

#[instrument(skip_all)]
pub async fn dashboard_at(pool: &Pool, now: DateTime<Utc>) -> Result<DashboardStats> {
    let stats = DashboardStats {
        total_companies: count(pool, "SELECT COUNT(*) FROM companies").await?,
        active_companies: count(pool, "SELECT COUNT(*) FROM companies WHERE status = 'active'")
            .await?,
        total_submissions: count(pool, "SELECT COUNT(*) FROM form_submissions").await?,
        pending_submissions: count(
            pool,
            "SELECT COUNT(*) FROM form_submissions WHERE status = 'pending'",
        )
        .await?,
        active_priorities: priorities::count_effective(pool, now).await?,
        companies_by_status: group_counts(
            pool,
            "SELECT status, COUNT(*) FROM companies GROUP BY status",
        )
        .await?,
        companies_by_category: group_counts(
            pool,
            "SELECT LOWER(category), COUNT(*) FROM companies \
             WHERE status = 'active' GROUP BY LOWER(category)",
        )
        .await?,
        submissions_by_type: group_counts(
            pool,
            "SELECT type, COUNT(*) FROM form_submissions GROUP BY type",
        )
        .await?,
        submissions_by_status: group_counts(
            pool,
            "SELECT status, COUNT(*) FROM form_submissions GROUP BY status",
        )
        .await?,
    };
    debug!(?stats, "dashboard computed");
    Ok(stats)
}

/// Submissions of one type within one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    /// First day of the month (UTC).
    pub month: NaiveDate,
    #[serde(rename = "type")]
    pub submission_type: String,
    pub count: i64,
}

/// Monthly submission counts over the trailing `months`, newest month first.
/// A non-positive window falls back to `default_months`.
pub async fn trends(pool: &Pool, months: i64, default_months: u32) -> Result<Vec<TrendBucket>> {
    trends_at(pool, months, default_months, Utc::now()).await
}

#[instrument(skip_all, fields(months = months))]
pub async fn trends_at(
    pool: &Pool,
    months: i64,
    default_months: u32,
    now: DateTime<Utc>,
) -> Result<Vec<TrendBucket>> {
    let window = u32::try_from(months)
        .ok()
        .filter(|m| *m > 0)
        .unwrap_or(default_months);
    let since = now
        .checked_sub_months(Months::new(window))
        .ok_or_else(|| CatalogError::validation(format!("trend window of {window} months is too large")))?;

    submission_trends(pool, since)
        .await?
        .into_iter()
        .map(|row| {
            Ok(TrendBucket {
                month: month_start(&row.month)?,
                submission_type: row.submission_type,
                count: row.count,
            })
        })
        .collect()
}

fn month_start(month: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").map_err(|e| {
        CatalogError::Storage(sqlx::Error::ColumnDecode {
            index: "month".to_string(),
            source: Box::new(e),
        })
    })
}
