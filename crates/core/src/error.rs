use crate::validation::ValidationResult;
use fhir::FhirError;

/// Failure category reported by a referral store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("referral document id is not a GUID: {0}")]
    InvalidId(String),
    #[error("referral document not found: {0}")]
    NotFound(String),
    #[error("referral document already exists: {0}")]
    Conflict(String),
    #[error("too many requests to the referral store: {0}")]
    Throttled(String),
    #[error("referral store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to access referral store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialise referral document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("failed to deserialise bundle: {0}")]
    Deserialization(String),
    #[error("referral validation failed: {}", .0.summary())]
    Validation(ValidationResult),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("failed to build bundle: {0}")]
    Translation(String),
    #[error("failed to enrich bundle: {0}")]
    Enrichment(String),
}

impl From<FhirError> for ReferralError {
    fn from(err: FhirError) -> Self {
        match err {
            FhirError::InvalidJson(msg) => ReferralError::InvalidJson(msg),
            FhirError::Deserialization(msg) | FhirError::InvalidInput(msg) => {
                ReferralError::Deserialization(msg)
            }
            FhirError::Translation(msg) => ReferralError::Translation(msg),
        }
    }
}

pub type ReferralResult<T> = std::result::Result<T, ReferralError>;
