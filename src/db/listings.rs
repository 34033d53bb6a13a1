use super::{decode_enum, Pool};
use crate::error::Result;
use crate::model::{Listing, ListingStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor};
use tracing::instrument;

const LISTING_COLUMNS: &str = "id, company_name, contact_person, email, phone, website, address, \
     category, description, products, certifications, gst_number, status, created_at, updated_at";

/// Conjunctive filter over `companies`. `None` fields impose no constraint.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter<'a> {
    pub category: Option<&'a str>,
    pub status: Option<ListingStatus>,
    /// Case-insensitive substring over name, description and address.
    pub text: Option<&'a str>,
    pub limit: Option<i64>,
}

fn listing_from_row(row: &SqliteRow) -> std::result::Result<Listing, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let products: Json<Vec<String>> = row.try_get("products")?;
    Ok(Listing {
        id: row.try_get("id")?,
        company_name: row.try_get("company_name")?,
        contact_person: row.try_get("contact_person")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        website: row.try_get("website")?,
        address: row.try_get("address")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        products: products.0,
        certifications: row.try_get("certifications")?,
        gst_number: row.try_get("gst_number")?,
        status: decode_enum("status", &status, ListingStatus::parse)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[instrument(skip_all)]
pub async fn insert_listing<'e, E: SqliteExecutor<'e>>(exec: E, listing: &Listing) -> Result<()> {
    sqlx::query(
        "INSERT INTO companies (id, company_name, contact_person, email, phone, website, address, \
         category, description, products, certifications, gst_number, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&listing.id)
    .bind(&listing.company_name)
    .bind(&listing.contact_person)
    .bind(&listing.email)
    .bind(&listing.phone)
    .bind(&listing.website)
    .bind(&listing.address)
    .bind(&listing.category)
    .bind(&listing.description)
    .bind(Json(&listing.products))
    .bind(&listing.certifications)
    .bind(&listing.gst_number)
    .bind(listing.status.as_str())
    .bind(listing.created_at)
    .bind(listing.updated_at)
    .execute(exec)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn get_listing(pool: &Pool, id: &str) -> Result<Option<Listing>> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM companies WHERE id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(listing_from_row).transpose()?)
}

/// Replace every mutable column. `created_at` is left alone.
#[instrument(skip_all)]
pub async fn update_listing(pool: &Pool, listing: &Listing) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE companies SET company_name = ?, contact_person = ?, email = ?, phone = ?, \
         website = ?, address = ?, category = ?, description = ?, products = ?, \
         certifications = ?, gst_number = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&listing.company_name)
    .bind(&listing.contact_person)
    .bind(&listing.email)
    .bind(&listing.phone)
    .bind(&listing.website)
    .bind(&listing.address)
    .bind(&listing.category)
    .bind(&listing.description)
    .bind(Json(&listing.products))
    .bind(&listing.certifications)
    .bind(&listing.gst_number)
    .bind(listing.status.as_str())
    .bind(listing.updated_at)
    .bind(&listing.id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[instrument(skip_all)]
pub async fn delete_listing(pool: &Pool, id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM companies WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Newest first; ties fall back to insertion order.
#[instrument(skip_all)]
pub async fn query_listings(pool: &Pool, filter: &ListingFilter<'_>) -> Result<Vec<Listing>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {LISTING_COLUMNS} FROM companies WHERE 1=1"));

    if let Some(category) = filter.category {
        qb.push(" AND LOWER(category) = LOWER(").push_bind(category).push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(text) = filter.text.filter(|t| !t.is_empty()) {
        qb.push(" AND (instr(LOWER(company_name), LOWER(")
            .push_bind(text)
            .push(")) > 0 OR instr(LOWER(description), LOWER(")
            .push_bind(text)
            .push(")) > 0 OR instr(LOWER(address), LOWER(")
            .push_bind(text)
            .push(")) > 0)");
    }

    qb.push(" ORDER BY created_at DESC, rowid DESC");

    if let Some(limit) = filter.limit.filter(|l| *l > 0) {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows = qb.build().fetch_all(pool).await?;
    let listings = rows
        .iter()
        .map(listing_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(listings)
}

#[instrument(skip_all)]
pub async fn count_active_in_category(pool: &Pool, category: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM companies WHERE LOWER(category) = LOWER(?) AND status = 'active'",
    )
    .bind(category)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
