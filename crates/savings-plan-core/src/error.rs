use thiserror::Error;

#[derive(Debug, Error)]
pub enum SavingsPlanError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SavingsPlanError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SavingsPlanError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SavingsPlanError {
    fn from(e: serde_json::Error) -> Self {
        SavingsPlanError::SerializationError(e.to_string())
    }
}
