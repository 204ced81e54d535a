//! Problem bodies for failed requests.
//!
//! Every core error maps to exactly one title and status here, so all transports report the
//! same failure the same way.

use referrals_core::{ReferralError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TITLE_INVALID_JSON: &str = "Invalid JSON";
pub const TITLE_DESERIALIZATION: &str = "Failed to deserialize bundle";
pub const TITLE_VALIDATION: &str = "Validation Failed";
pub const TITLE_INVALID_ID: &str = "Invalid id";
pub const TITLE_NOT_FOUND: &str = "Storage: Document not found";
pub const TITLE_THROTTLED: &str = "Storage: Too many requests";
pub const TITLE_STORAGE: &str = "Storage failure";
pub const TITLE_UNEXPECTED: &str = "Unexpected error";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrorRes {
    pub property_name: String,
    pub error_message: String,
}

impl From<&ValidationError> for ValidationErrorRes {
    fn from(err: &ValidationError) -> Self {
        Self {
            property_name: err.property_name.clone(),
            error_message: err.error_message.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationErrorRes>>,
}

impl ProblemDetails {
    pub fn new(title: &str, status: u16, detail: Option<String>) -> Self {
        Self {
            title: title.to_string(),
            status,
            detail,
            validation_errors: None,
        }
    }

    /// A 400 for a path id that is not a GUID.
    pub fn invalid_id(id: &str) -> Self {
        Self::new(
            TITLE_INVALID_ID,
            400,
            Some(format!("'{id}' is not a valid GUID")),
        )
    }

    pub fn from_error(err: &ReferralError) -> Self {
        match err {
            ReferralError::InvalidJson(msg) => {
                Self::new(TITLE_INVALID_JSON, 400, Some(msg.clone()))
            }
            ReferralError::Deserialization(msg) | ReferralError::InvalidInput(msg) => {
                Self::new(TITLE_DESERIALIZATION, 400, Some(msg.clone()))
            }
            ReferralError::Validation(result) => Self {
                title: TITLE_VALIDATION.to_string(),
                status: 400,
                detail: None,
                validation_errors: Some(result.errors.iter().map(Into::into).collect()),
            },
            ReferralError::Storage(storage) => Self::from_storage_error(storage),
            ReferralError::Translation(msg) | ReferralError::Enrichment(msg) => {
                Self::new(TITLE_UNEXPECTED, 500, Some(msg.clone()))
            }
        }
    }

    fn from_storage_error(err: &StorageError) -> Self {
        match err {
            StorageError::InvalidId(id) => Self::invalid_id(id),
            StorageError::NotFound(_) => Self::new(TITLE_NOT_FOUND, 404, Some(err.to_string())),
            StorageError::Throttled(_) => Self::new(TITLE_THROTTLED, 429, Some(err.to_string())),
            StorageError::Conflict(_)
            | StorageError::Unavailable(_)
            | StorageError::Io(_)
            | StorageError::Serialization(_) => {
                Self::new(TITLE_STORAGE, 500, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use referrals_core::ValidationResult;

    #[test]
    fn validation_failure_lists_every_error() {
        let err = ReferralError::Validation(ValidationResult {
            errors: vec![
                ValidationError {
                    property_name: "NhsNumber".into(),
                    error_message: "'Nhs Number' must not be empty.".into(),
                },
                ValidationError {
                    property_name: "CaseNumber".into(),
                    error_message: "'Case Number' must be a valid GUID.".into(),
                },
            ],
        });

        let problem = ProblemDetails::from_error(&err);
        assert_eq!(problem.status, 400);
        assert_eq!(problem.title, TITLE_VALIDATION);

        let body = serde_json::to_value(&problem).expect("serialise");
        assert_eq!(body["validationErrors"][1]["propertyName"], "CaseNumber");
        assert!(body.get("detail").is_none());
    }

    #[test]
    fn storage_categories_keep_their_status() {
        let cases = [
            (StorageError::NotFound("x".into()), 404, TITLE_NOT_FOUND),
            (StorageError::Throttled("x".into()), 429, TITLE_THROTTLED),
            (StorageError::Unavailable("x".into()), 500, TITLE_STORAGE),
            (StorageError::InvalidId("x".into()), 400, TITLE_INVALID_ID),
        ];

        for (storage, status, title) in cases {
            let problem = ProblemDetails::from_error(&ReferralError::Storage(storage));
            assert_eq!((problem.status, problem.title.as_str()), (status, title));
        }
    }

    #[test]
    fn malformed_input_keeps_parser_message() {
        let problem =
            ProblemDetails::from_error(&ReferralError::InvalidJson("EOF while parsing".into()));
        assert_eq!(problem.status, 400);
        assert_eq!(problem.title, TITLE_INVALID_JSON);
        assert_eq!(problem.detail.as_deref(), Some("EOF while parsing"));
    }
}
