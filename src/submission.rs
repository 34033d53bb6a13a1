//! Moderation state machine for user-submitted forms.
//!
//! A submission starts `pending` and moves exactly once to `approved` or
//! `rejected`. Approving an `add-data` submission materializes a listing from
//! its form fields inside the same transaction as the status change, so an
//! approved submission always has its listing.
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::submissions::{self, Review};
use crate::db::{listings, Pool};
use crate::error::{CatalogError, Result};
use crate::identity::Identity;
use crate::listing::new_active_listing;
use crate::model::{form_string, ListingInput, NewSubmission, Submission, SubmissionStatus};

const ENTITY: &str = "submission";

/// Submission type whose approval creates a listing.
pub const LISTING_SUBMISSION_TYPE: &str = "add-data";

pub const APPROVAL_NOTE: &str = "Approved and processed";

/// Store a new submission. Caller-supplied status is never honored.
#[instrument(skip_all)]
pub async fn create(pool: &Pool, new: NewSubmission) -> Result<Submission> {
    let submission_type = new.submission_type.trim().to_string();
    if submission_type.is_empty() {
        return Err(CatalogError::validation("submission type is required"));
    }
    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        submission_type,
        form_data: new.form_data,
        attachments: new.attachments,
        status: SubmissionStatus::Pending,
        submitted_at: Utc::now(),
        reviewed_at: None,
        reviewed_by: None,
        review_notes: None,
    };
    submissions::insert_submission(pool, &submission).await?;
    info!(id = %submission.id, kind = %submission.submission_type, "submission received");
    Ok(submission)
}

pub async fn get(pool: &Pool, id: &str) -> Result<Submission> {
    submissions::get_submission(pool, id)
        .await?
        .ok_or_else(|| CatalogError::not_found(ENTITY, id))
}

/// Newest first, narrowed by the supplied type and status.
pub async fn list(
    pool: &Pool,
    submission_type: Option<&str>,
    status: Option<SubmissionStatus>,
    _caller: &Identity,
) -> Result<Vec<Submission>> {
    submissions::query_submissions(pool, submission_type.filter(|t| !t.is_empty()), status).await
}

pub async fn by_type(pool: &Pool, submission_type: &str, caller: &Identity) -> Result<Vec<Submission>> {
    list(pool, Some(submission_type), None, caller).await
}

/// Record a moderation decision.
///
/// `reviewer` falls back to the caller's username when absent or blank;
/// `notes` are stored verbatim.
#[instrument(skip_all, fields(id = %id, status = %new_status))]
pub async fn update_status(
    pool: &Pool,
    id: &str,
    new_status: SubmissionStatus,
    reviewer: Option<&str>,
    notes: Option<&str>,
    caller: &Identity,
) -> Result<Submission> {
    if new_status == SubmissionStatus::Pending {
        return Err(CatalogError::validation(
            "status must be approved or rejected",
        ));
    }
    let reviewer = reviewer
        .filter(|r| !r.trim().is_empty())
        .unwrap_or(caller.username.as_str());
    let now = Utc::now();
    let review = Review {
        status: new_status,
        reviewed_at: now,
        reviewed_by: reviewer,
        notes: notes.unwrap_or_default(),
    };

    let affected = submissions::review_if_pending(pool, id, &review).await?;
    if affected == 0 {
        return Err(invalid_transition(get(pool, id).await?, new_status));
    }
    info!("submission reviewed");
    get(pool, id).await
}

pub async fn reject(
    pool: &Pool,
    id: &str,
    notes: Option<&str>,
    caller: &Identity,
) -> Result<Submission> {
    update_status(pool, id, SubmissionStatus::Rejected, None, notes, caller).await
}

/// Approve a pending submission, creating its listing first when the type
/// asks for one. Everything commits together or not at all.
#[instrument(skip_all, fields(id = %id, by = %acting.username))]
pub async fn approve(pool: &Pool, id: &str, acting: &Identity) -> Result<Submission> {
    let mut tx = pool.begin().await?;
    match approve_in(&mut tx, id, acting).await {
        Ok((approved, created_listing)) => {
            tx.commit().await?;
            if let Some(listing_id) = created_listing {
                info!(%listing_id, "company created from submission");
            }
            info!("submission approved");
            Ok(approved)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(err)
        }
    }
}

async fn approve_in(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
    acting: &Identity,
) -> Result<(Submission, Option<String>)> {
    let submission = submissions::get_submission(&mut **tx, id)
        .await?
        .ok_or_else(|| CatalogError::not_found(ENTITY, id))?;
    if submission.status != SubmissionStatus::Pending {
        return Err(invalid_transition(submission, SubmissionStatus::Approved));
    }

    let mut created_listing = None;
    if submission.submission_type == LISTING_SUBMISSION_TYPE {
        let listing = new_active_listing(listing_input_from_form(&submission));
        listings::insert_listing(&mut **tx, &listing).await?;
        created_listing = Some(listing.id);
    }

    let review = Review {
        status: SubmissionStatus::Approved,
        reviewed_at: Utc::now(),
        reviewed_by: &acting.username,
        notes: APPROVAL_NOTE,
    };
    if submissions::review_if_pending(&mut **tx, id, &review).await? == 0 {
        return Err(CatalogError::InvalidTransition {
            id: id.to_string(),
            from: "reviewed",
            to: SubmissionStatus::Approved.as_str(),
        });
    }
    let approved = apply_review(submission, &review);
    Ok((approved, created_listing))
}

/// Map the fixed form keys onto listing fields; missing keys become "".
fn listing_input_from_form(submission: &Submission) -> ListingInput {
    let data = &submission.form_data;
    ListingInput {
        company_name: form_string(data, "companyName"),
        contact_person: form_string(data, "contactPerson"),
        email: form_string(data, "email"),
        phone: form_string(data, "phone"),
        address: form_string(data, "address"),
        category: form_string(data, "category"),
        description: form_string(data, "description"),
        ..Default::default()
    }
}

fn apply_review(mut submission: Submission, review: &Review<'_>) -> Submission {
    submission.status = review.status;
    submission.reviewed_at = Some(review.reviewed_at);
    submission.reviewed_by = Some(review.reviewed_by.to_string());
    submission.review_notes = Some(review.notes.to_string());
    submission
}

fn invalid_transition(current: Submission, to: SubmissionStatus) -> CatalogError {
    CatalogError::InvalidTransition {
        id: current.id,
        from: current.status.as_str(),
        to: to.as_str(),
    }
}
