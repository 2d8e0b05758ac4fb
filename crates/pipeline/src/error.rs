use storyforge_comfyui::catalog::CatalogError;
use storyforge_core::error::CoreError;

/// Failures of the task ledger backend.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("Duplicate value violates {0}")]
    Duplicate(String),
}

impl LedgerError {
    /// Map a sqlx error, lifting `uq_*` unique violations into
    /// [`LedgerError::Duplicate`].
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                if let Some(constraint) = db_err.constraint().filter(|c| c.starts_with("uq_")) {
                    return LedgerError::Duplicate(constraint.to_string());
                }
            }
        }
        LedgerError::Database(err)
    }
}

/// Errors surfaced synchronously by "create task" and task lookups.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<CatalogError> for OrchestrationError {
    fn from(err: CatalogError) -> Self {
        OrchestrationError::Core(CoreError::Validation(err.to_string()))
    }
}
