//! Listing filter engine and listing CRUD.
use chrono::Utc;
use std::io::Write;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::listings::{self, ListingFilter};
use crate::db::Pool;
use crate::error::{expect_affected, CatalogError, Result};
use crate::identity::Identity;
use crate::model::{Listing, ListingInput, ListingStatus};

const ENTITY: &str = "company";

/// Listings matching every supplied predicate, newest first.
/// `limit` truncates only when positive.
#[instrument(skip_all)]
pub async fn list(
    pool: &Pool,
    category: Option<&str>,
    status: Option<ListingStatus>,
    limit: Option<i64>,
) -> Result<Vec<Listing>> {
    let filter = ListingFilter {
        category: category.filter(|c| !c.is_empty()),
        status,
        limit,
        ..Default::default()
    };
    listings::query_listings(pool, &filter).await
}

/// Active listings whose name, description or address contains `text`
/// (case-insensitive), optionally within one category.
#[instrument(skip_all)]
pub async fn search(pool: &Pool, text: Option<&str>, category: Option<&str>) -> Result<Vec<Listing>> {
    let filter = ListingFilter {
        category: category.filter(|c| !c.is_empty()),
        status: Some(ListingStatus::Active),
        text: text.filter(|t| !t.is_empty()),
        limit: None,
    };
    listings::query_listings(pool, &filter).await
}

pub async fn by_category(pool: &Pool, category: &str) -> Result<Vec<Listing>> {
    search(pool, None, Some(category)).await
}

pub async fn count_in_category(pool: &Pool, category: &str) -> Result<i64> {
    listings::count_active_in_category(pool, category).await
}

pub async fn get(pool: &Pool, id: &str) -> Result<Listing> {
    listings::get_listing(pool, id)
        .await?
        .ok_or_else(|| CatalogError::not_found(ENTITY, id))
}

/// Create a listing; status is always active on creation.
#[instrument(skip_all, fields(by = %identity.username))]
pub async fn create(pool: &Pool, input: ListingInput, identity: &Identity) -> Result<Listing> {
    let listing = new_active_listing(input);
    listings::insert_listing(pool, &listing).await?;
    info!(id = %listing.id, "company created");
    Ok(listing)
}

/// Build an active listing with a fresh id, stamped now.
pub(crate) fn new_active_listing(input: ListingInput) -> Listing {
    let mut listing = Listing::from_input(Uuid::new_v4().to_string(), input, Utc::now());
    listing.status = ListingStatus::Active;
    listing
}

/// Replace every mutable field of an existing listing.
#[instrument(skip_all, fields(by = %identity.username))]
pub async fn update(
    pool: &Pool,
    id: &str,
    input: ListingInput,
    identity: &Identity,
) -> Result<Listing> {
    let existing = get(pool, id).await?;
    let mut listing = Listing::from_input(id.to_string(), input, Utc::now());
    listing.created_at = existing.created_at;
    let affected = listings::update_listing(pool, &listing).await?;
    expect_affected(affected, ENTITY, id)?;
    Ok(listing)
}

#[instrument(skip_all, fields(by = %identity.username))]
pub async fn delete(pool: &Pool, id: &str, identity: &Identity) -> Result<()> {
    let affected = listings::delete_listing(pool, id).await?;
    expect_affected(affected, ENTITY, id)?;
    info!(id, "company deleted");
    Ok(())
}

/// Write listings as CSV with a fixed header.
pub fn export_csv<W: Write>(listings: &[Listing], writer: W) -> std::result::Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "Company Name",
        "Contact Person",
        "Email",
        "Phone",
        "Category",
        "Address",
    ])?;
    for l in listings {
        out.write_record([
            &l.company_name,
            &l.contact_person,
            &l.email,
            &l.phone,
            &l.category,
            &l.address,
        ])?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_quotes_embedded_commas() {
        let mut l = new_active_listing(ListingInput {
            company_name: "Acme, Inc".into(),
            address: "1 Mill Rd".into(),
            category: "Yarn".into(),
            ..Default::default()
        });
        l.email = "a@b.com".into();
        let mut buf = Vec::new();
        export_csv(&[l], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Company Name,Contact Person,Email,Phone,Category,Address")
        );
        assert_eq!(lines.next(), Some("\"Acme, Inc\",,a@b.com,,Yarn,1 Mill Rd"));
    }

    #[test]
    fn new_listing_is_forced_active() {
        let l = new_active_listing(ListingInput {
            status: Some(ListingStatus::Inactive),
            ..Default::default()
        });
        assert_eq!(l.status, ListingStatus::Active);
        assert_eq!(l.created_at, l.updated_at);
    }
}
