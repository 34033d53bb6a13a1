//! Keyed application settings holding dynamic values.
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{settings, Pool};
use crate::error::{CatalogError, Result};
use crate::identity::Identity;
use crate::model::{FormData, Setting};

pub async fn get(pool: &Pool, key: &str) -> Result<Setting> {
    settings::get_setting(pool, key)
        .await?
        .ok_or_else(|| CatalogError::not_found("setting", key))
}

/// Store `value` under `key`, replacing any previous value.
#[instrument(skip_all, fields(key = %key, by = %identity.username))]
pub async fn put(pool: &Pool, key: &str, value: FormData, identity: &Identity) -> Result<Setting> {
    let key = key.trim();
    if key.is_empty() {
        return Err(CatalogError::validation("setting key is required"));
    }
    settings::upsert_setting(pool, &Uuid::new_v4().to_string(), key, &value, Utc::now()).await?;
    get(pool, key).await
}
