//! Application-wide error types.

use std::time::Duration;

use thiserror::Error;

use crate::checkout::CheckoutViolation;
use crate::store::Collection;

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Document {id} not found in {collection}")]
    NotFound { collection: Collection, id: String },

    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// The write deadline elapsed before the store answered; the record may
    /// or may not have been persisted.
    #[error("Write to {collection} did not settle within {deadline:?}; outcome unknown")]
    OutcomeUnknown {
        collection: Collection,
        deadline: Duration,
    },
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Why a registration or checkout submission did not complete.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Submission is only possible from the final step (currently at step {step})")]
    NotAtFinalStep { step: u8 },

    #[error("A submission is already in progress")]
    InProgress,

    #[error("This form has already been submitted")]
    AlreadySubmitted,

    #[error("Step {step} is incomplete: missing {}", missing.join(", "))]
    Incomplete {
        step: u8,
        missing: Vec<&'static str>,
    },

    #[error(transparent)]
    Checkout(#[from] CheckoutViolation),

    #[error(transparent)]
    Store(#[from] StorefrontError),
}

impl SubmitError {
    /// Store failures leave the draft untouched so the user can simply retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmitError::Store(
                StorefrontError::Unavailable(_)
                    | StorefrontError::Database(_)
                    | StorefrontError::OutcomeUnknown { .. }
            )
        )
    }
}
