//! Priority engine: paid placement records with calendar-based expiry.
use chrono::{DateTime, Days, Months, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::priorities;
use crate::db::Pool;
use crate::error::{expect_affected, CatalogError, Result};
use crate::identity::Identity;
use crate::model::{DurationUnit, Priority, PriorityInput, PriorityKind, PriorityStatus};

const ENTITY: &str = "priority";

/// Expiry for a new priority created at `now`.
///
/// Temporary priorities with a positive duration expire `duration` calendar
/// units after `now`; month and year steps clamp to the last day of a shorter
/// target month. Everything else never expires.
pub fn compute_expiry(
    kind: PriorityKind,
    duration: i64,
    unit: Option<DurationUnit>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    if kind != PriorityKind::Temporary || duration <= 0 {
        return Ok(None);
    }
    let unit = unit.ok_or_else(|| {
        CatalogError::validation("temporary priority needs a durationType (days, months or years)")
    })?;
    let n = u32::try_from(duration)
        .map_err(|_| CatalogError::validation(format!("duration {duration} is out of range")))?;

    let expiry = match unit {
        DurationUnit::Days => now.checked_add_days(Days::new(u64::from(n))),
        DurationUnit::Months => now.checked_add_months(Months::new(n)),
        DurationUnit::Years => n
            .checked_mul(12)
            .and_then(|months| now.checked_add_months(Months::new(months))),
    };
    expiry
        .map(Some)
        .ok_or_else(|| CatalogError::validation(format!("duration {duration} {unit} overflows")))
}

/// Create a placement stamped with the creator; expiry is computed once here.
pub async fn create(pool: &Pool, input: PriorityInput, creator: &Identity) -> Result<Priority> {
    create_at(pool, input, creator, Utc::now()).await
}

#[instrument(skip_all, fields(by = %creator.username))]
pub async fn create_at(
    pool: &Pool,
    input: PriorityInput,
    creator: &Identity,
    now: DateTime<Utc>,
) -> Result<Priority> {
    let expires_at = compute_expiry(input.priority_type, input.duration, input.duration_type, now)?;
    let priority = Priority {
        id: Uuid::new_v4().to_string(),
        company_id: input.company_id,
        company_name: input.company_name,
        category: input.category,
        position: input.position,
        priority_type: input.priority_type,
        duration: input.duration,
        duration_type: input.duration_type,
        expires_at,
        status: PriorityStatus::Active,
        created_at: now,
        created_by: creator.username.clone(),
    };

    let inserted = priorities::insert_priority_if_free(pool, &priority, now).await?;
    if inserted == 0 {
        return Err(slot_taken(&priority));
    }
    info!(id = %priority.id, category = %priority.category, position = priority.position, "priority created");
    Ok(priority)
}

/// Effectively active priorities, ascending by position.
pub async fn list(pool: &Pool, category: Option<&str>) -> Result<Vec<Priority>> {
    list_at(pool, category, Utc::now()).await
}

#[instrument(skip_all)]
pub async fn list_at(
    pool: &Pool,
    category: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<Priority>> {
    priorities::query_effective(pool, category.filter(|c| !c.is_empty()), now).await
}

pub async fn by_category(pool: &Pool, category: &str) -> Result<Vec<Priority>> {
    list(pool, Some(category)).await
}

/// Priorities still marked active whose expiry has already passed.
#[instrument(skip_all)]
pub async fn lapsed(pool: &Pool, now: DateTime<Utc>) -> Result<Vec<Priority>> {
    let lapsed = priorities::query_lapsed(pool, now).await?;
    for p in &lapsed {
        warn!(id = %p.id, expires_at = ?p.expires_at, "priority active but expired");
    }
    Ok(lapsed)
}

pub async fn get(pool: &Pool, id: &str) -> Result<Priority> {
    priorities::get_priority(pool, id)
        .await?
        .ok_or_else(|| CatalogError::not_found(ENTITY, id))
}

/// Replace all mutable fields. The expiry fixed at creation is kept as is.
pub async fn update(
    pool: &Pool,
    id: &str,
    input: PriorityInput,
    identity: &Identity,
) -> Result<Priority> {
    update_at(pool, id, input, identity, Utc::now()).await
}

#[instrument(skip_all, fields(by = %identity.username))]
pub async fn update_at(
    pool: &Pool,
    id: &str,
    input: PriorityInput,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<Priority> {
    let existing = get(pool, id).await?;
    let updated = Priority {
        id: existing.id,
        company_id: input.company_id,
        company_name: input.company_name,
        category: input.category,
        position: input.position,
        priority_type: input.priority_type,
        duration: input.duration,
        duration_type: input.duration_type,
        expires_at: existing.expires_at,
        status: input.status.unwrap_or(existing.status),
        created_at: existing.created_at,
        created_by: existing.created_by,
    };

    let affected = priorities::update_priority_if_free(pool, &updated, now).await?;
    if affected == 0 {
        if !priorities::priority_exists(pool, id).await? {
            return Err(CatalogError::not_found(ENTITY, id));
        }
        return Err(slot_taken(&updated));
    }
    Ok(updated)
}

#[instrument(skip_all, fields(by = %identity.username))]
pub async fn delete(pool: &Pool, id: &str, identity: &Identity) -> Result<()> {
    let affected = priorities::delete_priority(pool, id).await?;
    expect_affected(affected, ENTITY, id)
}

fn slot_taken(p: &Priority) -> CatalogError {
    CatalogError::ResourceConstraint(format!(
        "position {} in category {:?} is already held by an active priority",
        p.position, p.category
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn one_month_keeps_day_of_month() {
        let exp = compute_expiry(PriorityKind::Temporary, 1, Some(DurationUnit::Months), at(2024, 3, 15))
            .unwrap();
        assert_eq!(exp, Some(at(2024, 4, 15)));
    }

    #[test]
    fn month_end_clamps() {
        let exp = compute_expiry(PriorityKind::Temporary, 1, Some(DurationUnit::Months), at(2023, 1, 31))
            .unwrap();
        assert_eq!(exp, Some(at(2023, 2, 28)));
        let exp = compute_expiry(PriorityKind::Temporary, 1, Some(DurationUnit::Years), at(2024, 2, 29))
            .unwrap();
        assert_eq!(exp, Some(at(2025, 2, 28)));
    }

    #[test]
    fn days_are_calendar_days() {
        let exp = compute_expiry(PriorityKind::Temporary, 30, Some(DurationUnit::Days), at(2024, 1, 15))
            .unwrap();
        assert_eq!(exp, Some(at(2024, 2, 14)));
    }

    #[test]
    fn permanent_or_non_positive_never_expires() {
        let now = at(2024, 1, 1);
        assert_eq!(
            compute_expiry(PriorityKind::Permanent, 5, Some(DurationUnit::Days), now).unwrap(),
            None
        );
        assert_eq!(
            compute_expiry(PriorityKind::Temporary, 0, Some(DurationUnit::Days), now).unwrap(),
            None
        );
        assert_eq!(
            compute_expiry(PriorityKind::Temporary, -3, None, now).unwrap(),
            None
        );
    }

    #[test]
    fn temporary_without_unit_is_rejected() {
        let err = compute_expiry(PriorityKind::Temporary, 2, None, at(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
