use chrono::{DateTime, Duration, TimeZone, Utc};
use knitinfo::model::{DurationUnit, PriorityInput, PriorityKind, PriorityStatus};
use knitinfo::{priority, CatalogError, Identity};

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn admin() -> Identity {
    Identity {
        id: "1".into(),
        username: "admin".into(),
        role: "admin".into(),
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
}

fn input(category: &str, position: i64, kind: PriorityKind) -> PriorityInput {
    PriorityInput {
        company_id: format!("co-{category}-{position}"),
        company_name: "Acme".into(),
        category: category.into(),
        position,
        priority_type: kind,
        duration: 0,
        duration_type: None,
        status: None,
    }
}

fn temporary(category: &str, position: i64, duration: i64, unit: DurationUnit) -> PriorityInput {
    PriorityInput {
        duration,
        duration_type: Some(unit),
        ..input(category, position, PriorityKind::Temporary)
    }
}

#[tokio::test]
async fn one_month_expiry_clamps_to_month_end() {
    let pool = setup_pool().await;
    let p = priority::create_at(&pool, temporary("Yarn", 1, 1, DurationUnit::Months), &admin(), t0())
        .await
        .unwrap();
    assert_eq!(p.expires_at, Some(Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()));
    assert_eq!(p.status, PriorityStatus::Active);
    assert_eq!(p.created_by, "admin");

    let stored = priority::get(&pool, &p.id).await.unwrap();
    assert_eq!(stored.expires_at, p.expires_at);
}

#[tokio::test]
async fn expired_priority_drops_out_at_the_boundary_instant() {
    let pool = setup_pool().await;
    let p = priority::create_at(&pool, temporary("Yarn", 1, 1, DurationUnit::Days), &admin(), t0())
        .await
        .unwrap();
    let expiry = p.expires_at.unwrap();

    let just_before = priority::list_at(&pool, Some("yarn"), expiry - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(just_before.len(), 1);

    assert!(just_before[0].is_effectively_active(expiry - Duration::seconds(1)));

    let at_expiry = priority::list_at(&pool, Some("yarn"), expiry).await.unwrap();
    assert!(at_expiry.is_empty());
    assert!(!p.is_effectively_active(expiry));

    let lapsed = priority::lapsed(&pool, expiry).await.unwrap();
    assert_eq!(lapsed.len(), 1);
    assert_eq!(lapsed[0].id, p.id);
}

#[tokio::test]
async fn inactive_status_removes_from_listing() {
    let pool = setup_pool().await;
    let who = admin();
    let p = priority::create_at(&pool, temporary("Yarn", 1, 3, DurationUnit::Days), &who, t0())
        .await
        .unwrap();
    let inside = t0() + Duration::days(1);
    assert_eq!(priority::list_at(&pool, None, inside).await.unwrap().len(), 1);

    let mut change = temporary("Yarn", 1, 3, DurationUnit::Days);
    change.status = Some(PriorityStatus::Inactive);
    let updated = priority::update_at(&pool, &p.id, change, &who, inside).await.unwrap();
    assert!(!updated.is_effectively_active(inside));
    assert!(priority::list_at(&pool, None, inside).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_orders_by_position_and_filters_category() {
    let pool = setup_pool().await;
    let who = admin();
    for pos in [3, 1, 2] {
        priority::create_at(&pool, input("Yarn", pos, PriorityKind::Permanent), &who, t0())
            .await
            .unwrap();
    }
    priority::create_at(&pool, input("Dyes", 1, PriorityKind::Permanent), &who, t0())
        .await
        .unwrap();

    let yarn = priority::list_at(&pool, Some("YARN"), t0()).await.unwrap();
    let positions: Vec<i64> = yarn.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert!(yarn.iter().all(|p| p.expires_at.is_none()));

    let all = priority::list_at(&pool, None, t0()).await.unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn update_keeps_expiry_fixed() {
    let pool = setup_pool().await;
    let who = admin();
    let p = priority::create_at(&pool, temporary("Yarn", 1, 1, DurationUnit::Months), &who, t0())
        .await
        .unwrap();

    let updated = priority::update_at(
        &pool,
        &p.id,
        temporary("Yarn", 4, 2, DurationUnit::Years),
        &who,
        t0(),
    )
    .await
    .unwrap();
    assert_eq!(updated.position, 4);
    assert_eq!(updated.duration, 2);
    assert_eq!(updated.expires_at, p.expires_at);
    assert_eq!(priority::get(&pool, &p.id).await.unwrap().expires_at, p.expires_at);
}

#[tokio::test]
async fn double_booking_is_a_resource_constraint() {
    let pool = setup_pool().await;
    let who = admin();
    let first = priority::create_at(&pool, input("Yarn", 1, PriorityKind::Permanent), &who, t0())
        .await
        .unwrap();

    let err = priority::create_at(&pool, input("yarn", 1, PriorityKind::Permanent), &who, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ResourceConstraint(_)));

    let second = priority::create_at(&pool, input("Yarn", 2, PriorityKind::Permanent), &who, t0())
        .await
        .unwrap();
    let err = priority::update_at(
        &pool,
        &second.id,
        input("Yarn", 1, PriorityKind::Permanent),
        &who,
        t0(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CatalogError::ResourceConstraint(_)));

    // once the holder is deleted the slot frees up
    priority::delete(&pool, &first.id, &who).await.unwrap();
    priority::update_at(
        &pool,
        &second.id,
        input("Yarn", 1, PriorityKind::Permanent),
        &who,
        t0(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn expired_holder_does_not_block_the_slot() {
    let pool = setup_pool().await;
    let who = admin();
    priority::create_at(&pool, temporary("Yarn", 1, 1, DurationUnit::Days), &who, t0())
        .await
        .unwrap();
    let later = t0() + Duration::days(2);
    priority::create_at(&pool, input("Yarn", 1, PriorityKind::Permanent), &who, later)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_ids_are_not_found() {
    let pool = setup_pool().await;
    let who = admin();
    let err = priority::update_at(&pool, "nope", input("Yarn", 1, PriorityKind::Permanent), &who, t0())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(priority::delete(&pool, "nope", &who).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn temporary_without_unit_is_rejected() {
    let pool = setup_pool().await;
    let mut bad = input("Yarn", 1, PriorityKind::Temporary);
    bad.duration = 2;
    let err = priority::create_at(&pool, bad, &admin(), t0()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
    assert!(priority::list_at(&pool, None, t0()).await.unwrap().is_empty());
}
