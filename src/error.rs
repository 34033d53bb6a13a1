//! Error taxonomy shared by every engine.
use thiserror::Error;

use crate::ingest::IngestError;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("submission {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error("resource constraint: {0}")]
    ResourceConstraint(String),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CatalogError::Validation(msg.into())
    }

    /// Response status class for the surrounding HTTP layer.
    pub fn http_status(&self) -> u16 {
        match self {
            CatalogError::NotFound { .. } => 404,
            CatalogError::Validation(_)
            | CatalogError::InvalidTransition { .. }
            | CatalogError::Ingest(_) => 400,
            CatalogError::ResourceConstraint(_) => 409,
            CatalogError::Storage(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Turn an affected-row count into NotFound when nothing matched.
pub(crate) fn expect_affected(affected: u64, entity: &'static str, id: &str) -> Result<()> {
    if affected == 0 {
        return Err(CatalogError::not_found(entity, id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(CatalogError::not_found("company", "x").http_status(), 404);
        assert_eq!(CatalogError::validation("bad").http_status(), 400);
        assert_eq!(
            CatalogError::ResourceConstraint("taken".into()).http_status(),
            409
        );
        assert_eq!(
            CatalogError::Storage(sqlx::Error::RowNotFound).http_status(),
            500
        );
    }

    #[test]
    fn zero_rows_is_not_found() {
        assert!(expect_affected(0, "priority", "p1").unwrap_err().is_not_found());
        assert!(expect_affected(1, "priority", "p1").is_ok());
    }
}
