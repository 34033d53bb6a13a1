use knitinfo::model::{
    FormData, FormValue, ListingStatus, NewSubmission, SubmissionStatus,
};
use knitinfo::{listing, submission, CatalogError, Identity};

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

fn moderator() -> Identity {
    Identity {
        id: "7".into(),
        username: "moderator".into(),
        role: "admin".into(),
    }
}

fn acme_form() -> FormData {
    let mut data = FormData::new();
    data.insert("companyName".into(), FormValue::String("Acme".into()));
    data.insert("email".into(), FormValue::String("a@b.com".into()));
    data
}

async fn submit(pool: &sqlx::SqlitePool, kind: &str, form_data: FormData) -> String {
    submission::create(
        pool,
        NewSubmission {
            submission_type: kind.into(),
            form_data,
            attachments: vec![],
        },
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn create_always_starts_pending() {
    let pool = setup_pool().await;
    let id = submit(&pool, "contact", FormData::new()).await;
    let s = submission::get(&pool, &id).await.unwrap();
    assert_eq!(s.status, SubmissionStatus::Pending);
    assert!(s.reviewed_at.is_none());
    assert!(s.reviewed_by.is_none());
    assert!(s.review_notes.is_none());

    let err = submission::create(&pool, NewSubmission::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));
}

#[tokio::test]
async fn approving_add_data_creates_the_listing() {
    let pool = setup_pool().await;
    let id = submit(&pool, "add-data", acme_form()).await;

    let approved = submission::approve(&pool, &id, &moderator()).await.unwrap();
    assert_eq!(approved.status, SubmissionStatus::Approved);
    assert_eq!(approved.reviewed_by.as_deref(), Some("moderator"));
    assert_eq!(approved.review_notes.as_deref(), Some("Approved and processed"));

    let stored = submission::get(&pool, &id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::Approved);
    assert_eq!(stored.reviewed_by.as_deref(), Some("moderator"));
    assert!(stored.reviewed_at.is_some());

    let listings = listing::list(&pool, None, None, None).await.unwrap();
    assert_eq!(listings.len(), 1);
    let l = &listings[0];
    assert_eq!(l.company_name, "Acme");
    assert_eq!(l.email, "a@b.com");
    assert_eq!(l.contact_person, "");
    assert_eq!(l.phone, "");
    assert_eq!(l.address, "");
    assert_eq!(l.category, "");
    assert_eq!(l.description, "");
    assert_eq!(l.status, ListingStatus::Active);
}

#[tokio::test]
async fn approving_other_types_has_no_side_effect() {
    let pool = setup_pool().await;
    let id = submit(&pool, "contact", acme_form()).await;
    submission::approve(&pool, &id, &moderator()).await.unwrap();
    assert!(listing::list(&pool, None, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_listing_insert_leaves_submission_pending() {
    let pool = setup_pool().await;
    let id = submit(&pool, "add-data", acme_form()).await;

    sqlx::query(
        "CREATE TRIGGER reject_companies BEFORE INSERT ON companies \
         BEGIN SELECT RAISE(ABORT, 'companies are read-only'); END;",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = submission::approve(&pool, &id, &moderator()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Storage(_)));

    let s = submission::get(&pool, &id).await.unwrap();
    assert_eq!(s.status, SubmissionStatus::Pending);
    assert!(s.reviewed_at.is_none());
    assert!(s.reviewed_by.is_none());
}

#[tokio::test]
async fn reviewed_submissions_are_terminal() {
    let pool = setup_pool().await;
    let who = moderator();
    let id = submit(&pool, "add-data", acme_form()).await;
    submission::approve(&pool, &id, &who).await.unwrap();

    let err = submission::approve(&pool, &id, &who).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidTransition { from: "approved", .. }));
    assert_eq!(listing::list(&pool, None, None, None).await.unwrap().len(), 1);

    let err = submission::reject(&pool, &id, None, &who).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidTransition { .. }));
}

#[tokio::test]
async fn update_status_records_review_metadata() {
    let pool = setup_pool().await;
    let who = moderator();
    let id = submit(&pool, "feedback", FormData::new()).await;

    let s = submission::update_status(
        &pool,
        &id,
        SubmissionStatus::Rejected,
        Some("   "),
        Some("duplicate entry"),
        &who,
    )
    .await
    .unwrap();
    assert_eq!(s.status, SubmissionStatus::Rejected);
    assert_eq!(s.reviewed_by.as_deref(), Some("moderator"));
    assert_eq!(s.review_notes.as_deref(), Some("duplicate entry"));
    assert!(s.reviewed_at.is_some());

    let other = submit(&pool, "feedback", FormData::new()).await;
    let s = submission::update_status(&pool, &other, SubmissionStatus::Approved, Some("lead"), None, &who)
        .await
        .unwrap();
    assert_eq!(s.reviewed_by.as_deref(), Some("lead"));
    assert_eq!(s.review_notes.as_deref(), Some(""));
}

#[tokio::test]
async fn invalid_targets_and_missing_ids() {
    let pool = setup_pool().await;
    let who = moderator();
    let id = submit(&pool, "feedback", FormData::new()).await;

    let err = submission::update_status(&pool, &id, SubmissionStatus::Pending, None, None, &who)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation(_)));

    let err = submission::approve(&pool, "missing", &who).await.unwrap_err();
    assert!(err.is_not_found());
    let err = submission::reject(&pool, "missing", None, &who).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn list_filters_by_type_and_status() {
    let pool = setup_pool().await;
    let who = moderator();
    let a = submit(&pool, "add-data", acme_form()).await;
    let _b = submit(&pool, "contact", FormData::new()).await;
    let c = submit(&pool, "add-data", FormData::new()).await;
    submission::reject(&pool, &a, Some("spam"), &who).await.unwrap();

    let add_data = submission::by_type(&pool, "add-data", &who).await.unwrap();
    let ids: Vec<&str> = add_data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![c.as_str(), a.as_str()]);

    let pending = submission::list(&pool, None, Some(SubmissionStatus::Pending), &who)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);

    let rejected_add = submission::list(
        &pool,
        Some("add-data"),
        Some(SubmissionStatus::Rejected),
        &who,
    )
    .await
    .unwrap();
    assert_eq!(rejected_add.len(), 1);
    assert_eq!(rejected_add[0].review_notes.as_deref(), Some("spam"));
}
