use thiserror::Error;

/// Caller-facing error kinds. Each maps to a stable status class in the
/// api layer: `NotFound` to 404, `InvalidSortKey`/`Conflict`/`Validation`
/// to 400, `Store` to 500.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidSortKey(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Errors surfaced by a storage backend. Unique-constraint violations are
/// kept distinct so catalog operations can turn them into a `Conflict`
/// with the operation's own message; everything else is opaque backend
/// failure and is not reinterpreted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    UniqueViolation(&'static str),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => {
                CatalogError::Conflict(format!("unique constraint violated on {constraint}"))
            }
            StoreError::Backend(err) => CatalogError::Store(err),
        }
    }
}
