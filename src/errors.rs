use serde::Serialize;
use uuid::Uuid;

/// Error taxonomy for the inventory core.
///
/// Every caller-visible failure shape gets its own variant so the external
/// layer (HTTP, gRPC, whatever drives this crate) can map errors without
/// string matching. Invariant violations reject the operation with no partial
/// state; processing failures are recorded on the transaction itself before
/// being surfaced.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum InventoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Insufficient available quantity: {0}")]
    InsufficientAvailable(String),

    #[error("Over-release of reserved quantity: {0}")]
    OverRelease(String),

    #[error("Transaction {0} not found")]
    TransactionNotFound(Uuid),

    #[error("Transaction {0} is not pending")]
    NotPending(Uuid),

    #[error("Transaction {0} must be approved before processing")]
    MustBeApproved(Uuid),

    #[error("Transaction {0} has already been completed")]
    AlreadyCompleted(Uuid),

    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for InventoryError {
    fn from(err: validator::ValidationErrors) -> Self {
        InventoryError::ValidationError(err.to_string())
    }
}

impl InventoryError {
    pub fn not_found(message: impl Into<String>) -> Self {
        InventoryError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        InventoryError::ValidationError(message.into())
    }

    pub fn external(message: impl Into<String>) -> Self {
        InventoryError::ExternalServiceError(message.into())
    }

    /// True when the failure is a rejected precondition rather than a fault.
    /// Rejected operations leave no partial state behind.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InsufficientStock(_)
                | Self::InsufficientAvailable(_)
                | Self::OverRelease(_)
                | Self::NotPending(_)
                | Self::MustBeApproved(_)
                | Self::AlreadyCompleted(_)
                | Self::InsufficientHistory(_)
        )
    }
}
