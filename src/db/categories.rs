use super::Pool;
use crate::error::Result;
use crate::model::Category;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::instrument;

fn category_from_row(row: &SqliteRow) -> std::result::Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        display_order: row.try_get("display_order")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        count: row.try_get("count")?,
    })
}

/// Insert unless the slug already exists. Returns the affected row count.
#[instrument(skip_all)]
pub async fn insert_category_if_free(pool: &Pool, category: &Category) -> Result<u64> {
    let result = sqlx::query(
        "INSERT INTO categories (id, name, slug, display_order, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT(slug) DO NOTHING",
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.display_order)
    .bind(category.is_active)
    .bind(category.created_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Active categories by display order, each with its active listing count.
#[instrument(skip_all)]
pub async fn query_active_with_counts(pool: &Pool, limit: Option<i64>) -> Result<Vec<Category>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT c.id, c.name, c.slug, c.display_order, c.is_active, c.created_at, \
         (SELECT COUNT(*) FROM companies co \
          WHERE LOWER(co.category) = LOWER(c.name) AND co.status = 'active') AS count \
         FROM categories c WHERE c.is_active = 1 \
         ORDER BY c.display_order ASC, c.rowid ASC",
    );
    if let Some(limit) = limit.filter(|l| *l > 0) {
        qb.push(" LIMIT ").push_bind(limit);
    }
    let rows = qb.build().fetch_all(pool).await?;
    let categories = rows
        .iter()
        .map(category_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}
