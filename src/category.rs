//! Category catalog with derived listing counts.
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{categories, Pool};
use crate::error::{CatalogError, Result};
use crate::identity::Identity;
use crate::model::Category;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern compiles"));

/// Lowercase, collapse every run of non-alphanumerics to `-`, trim dashes.
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

#[instrument(skip_all, fields(by = %identity.username))]
pub async fn create(
    pool: &Pool,
    name: &str,
    display_order: i64,
    identity: &Identity,
) -> Result<Category> {
    let name = name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(CatalogError::validation(format!(
            "category name {name:?} has no url-safe characters"
        )));
    }
    let category = Category {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        slug,
        display_order,
        is_active: true,
        created_at: Utc::now(),
        count: 0,
    };
    if categories::insert_category_if_free(pool, &category).await? == 0 {
        return Err(CatalogError::ResourceConstraint(format!(
            "category slug {:?} already exists",
            category.slug
        )));
    }
    info!(slug = %category.slug, "category created");
    Ok(category)
}

/// The first `limit` active categories; a non-positive limit returns all.
pub async fn featured(pool: &Pool, limit: i64) -> Result<Vec<Category>> {
    categories::query_active_with_counts(pool, Some(limit)).await
}

pub async fn all(pool: &Pool) -> Result<Vec<Category>> {
    categories::query_active_with_counts(pool, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Yarn & Fibre"), "yarn-fibre");
        assert_eq!(slugify("  Knitting Machines!! "), "knitting-machines");
        assert_eq!(slugify("Dyes/Chemicals 2024"), "dyes-chemicals-2024");
        assert_eq!(slugify("***"), "");
    }
}
