//! Referral record validation.
//!
//! Every field carries an ordered list of rules. Validation visits every field and
//! collects every failure; within one field the first failing rule ends that field's checks,
//! so a missing value reports "must not be empty" and nothing else.

use crate::codes::{RepeatPeriod, PRIORITY_TABLE};
use crate::record::ReferralRecord;
use fhir::primitives::is_valid_date_time;
use serde::Serialize;

/// One failed rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub property_name: String,
    pub error_message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All messages joined with `;`, for logging.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.error_message.as_str())
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn errors_for(&self, property_name: &str) -> impl Iterator<Item = &ValidationError> {
        let property_name = property_name.to_owned();
        self.errors
            .iter()
            .filter(move |e| e.property_name == property_name)
    }
}

/// A pluggable rule checker for referral records.
pub trait RecordValidator: Send + Sync {
    fn validate(&self, record: &ReferralRecord) -> ValidationResult;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    NotEmpty,
    MaxLength(usize),
    Guid,
    DateTime,
    PriorityLetter,
    RepeatPeriod,
}

impl Rule {
    /// `None` when `value` passes, otherwise the error message.
    fn check(self, display_name: &str, value: Option<&str>) -> Option<String> {
        match self {
            Rule::NotEmpty => value
                .map_or(true, |v| v.trim().is_empty())
                .then(|| format!("'{display_name}' must not be empty.")),
            Rule::MaxLength(max) => {
                let len = value.map_or(0, |v| v.chars().count());
                (len > max).then(|| {
                    format!(
                        "The length of '{display_name}' must be {max} characters or fewer. You entered {len} characters."
                    )
                })
            }
            Rule::Guid => (!value.is_some_and(|v| uuid::Uuid::parse_str(v).is_ok()))
                .then(|| format!("'{display_name}' must be a valid GUID.")),
            Rule::DateTime => (!value.is_some_and(is_valid_date_time))
                .then(|| format!("'{display_name}' must be a valid FHIR dateTime.")),
            Rule::PriorityLetter => {
                let known = value.is_some_and(|v| {
                    PRIORITY_TABLE
                        .iter()
                        .any(|(letter, _)| v.eq_ignore_ascii_case(&letter.to_string()))
                });
                (!known).then(|| format!("'{display_name}' must be one of U, A, R, S."))
            }
            Rule::RepeatPeriod => (!value.is_some_and(|v| RepeatPeriod::parse(v).is_some()))
                .then(|| {
                    format!(
                        "'{display_name}' must be a number followed by one of A, D, H, M, S, W."
                    )
                }),
        }
    }
}

struct FieldRules {
    property_name: &'static str,
    value: fn(&ReferralRecord) -> Option<&str>,
    rules: &'static [Rule],
}

const GUID: &[Rule] = &[Rule::NotEmpty, Rule::Guid];
const DATE_TIME: &[Rule] = &[Rule::NotEmpty, Rule::DateTime];

fn field_rules() -> [FieldRules; 26] {
    use Rule::{MaxLength, NotEmpty};

    [
        FieldRules {
            property_name: "Id",
            value: |r| Some(r.id.as_str()),
            rules: GUID,
        },
        FieldRules {
            property_name: "CaseNumber",
            value: |r| r.case_number.as_deref(),
            rules: GUID,
        },
        FieldRules {
            property_name: "NhsNumber",
            value: |r| r.nhs_number.as_deref(),
            rules: &[NotEmpty, MaxLength(17)],
        },
        FieldRules {
            property_name: "CreationDate",
            value: |r| r.creation_date.as_deref(),
            rules: DATE_TIME,
        },
        FieldRules {
            property_name: "WaitingList",
            value: |r| r.waiting_list.as_deref(),
            rules: &[NotEmpty, MaxLength(2)],
        },
        FieldRules {
            property_name: "IntendedManagement",
            value: |r| r.intended_management.as_deref(),
            rules: &[NotEmpty, MaxLength(1)],
        },
        FieldRules {
            property_name: "Referrer",
            value: |r| r.referrer.as_deref(),
            rules: &[NotEmpty, MaxLength(8)],
        },
        FieldRules {
            property_name: "ReferrerAddress",
            value: |r| r.referrer_address.as_deref(),
            rules: &[NotEmpty, MaxLength(6)],
        },
        FieldRules {
            property_name: "PatientGpCode",
            value: |r| r.patient_gp_code.as_deref(),
            rules: &[NotEmpty, MaxLength(8)],
        },
        FieldRules {
            property_name: "PatientGpPracticeCode",
            value: |r| r.patient_gp_practice_code.as_deref(),
            rules: &[NotEmpty, MaxLength(6)],
        },
        FieldRules {
            property_name: "PatientPostcode",
            value: |r| r.patient_postcode.as_deref(),
            rules: &[NotEmpty, MaxLength(8)],
        },
        FieldRules {
            property_name: "PatientHealthBoardAreaCode",
            value: |r| r.patient_health_board_area_code.as_deref(),
            rules: &[NotEmpty, MaxLength(3)],
        },
        FieldRules {
            property_name: "ReferrerSourceType",
            value: |r| r.referrer_source_type.as_deref(),
            rules: &[NotEmpty, MaxLength(2)],
        },
        FieldRules {
            property_name: "LetterPriority",
            value: |r| r.letter_priority.as_deref(),
            rules: &[NotEmpty, MaxLength(1)],
        },
        FieldRules {
            property_name: "HealthBoardReceiveDate",
            value: |r| r.health_board_receive_date.as_deref(),
            rules: DATE_TIME,
        },
        FieldRules {
            property_name: "ReferralAssignedConsultant",
            value: |r| r.referral_assigned_consultant.as_deref(),
            rules: &[NotEmpty, MaxLength(5)],
        },
        FieldRules {
            property_name: "ReferralAssignedLocation",
            value: |r| r.referral_assigned_location.as_deref(),
            rules: &[NotEmpty, MaxLength(5)],
        },
        FieldRules {
            property_name: "PatientCategory",
            value: |r| r.patient_category.as_deref(),
            rules: &[NotEmpty, MaxLength(2)],
        },
        FieldRules {
            property_name: "Priority",
            value: |r| r.priority.as_deref(),
            rules: &[NotEmpty, MaxLength(1), Rule::PriorityLetter],
        },
        FieldRules {
            property_name: "BookingDate",
            value: |r| r.booking_date.as_deref(),
            rules: DATE_TIME,
        },
        FieldRules {
            property_name: "TreatmentDate",
            value: |r| r.treatment_date.as_deref(),
            rules: DATE_TIME,
        },
        FieldRules {
            property_name: "SpecialityIdentifier",
            value: |r| r.speciality_identifier.as_deref(),
            rules: &[NotEmpty, MaxLength(20)],
        },
        FieldRules {
            property_name: "RepeatPeriod",
            value: |r| r.repeat_period.as_deref(),
            rules: &[NotEmpty, MaxLength(3), Rule::RepeatPeriod],
        },
        FieldRules {
            property_name: "FirstAppointmentDate",
            value: |r| r.first_appointment_date.as_deref(),
            rules: DATE_TIME,
        },
        FieldRules {
            property_name: "HealthRiskFactor",
            value: |r| r.health_risk_factor.as_deref(),
            rules: &[NotEmpty, MaxLength(2)],
        },
        FieldRules {
            property_name: "ReferralId",
            value: |r| r.referral_id.as_deref(),
            rules: GUID,
        },
    ]
}

/// `CaseNumber` -> `Case Number`.
fn display_name(property_name: &str) -> String {
    let mut out = String::with_capacity(property_name.len() + 4);
    for (i, ch) in property_name.chars().enumerate() {
        if i > 0 && ch.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Field-by-field rule checker for [`ReferralRecord`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferralRecordValidator;

impl RecordValidator for ReferralRecordValidator {
    fn validate(&self, record: &ReferralRecord) -> ValidationResult {
        let mut errors = Vec::new();

        for field in field_rules() {
            let value = (field.value)(record);
            let display = display_name(field.property_name);

            if let Some(error_message) = field
                .rules
                .iter()
                .find_map(|rule| rule.check(&display, value))
            {
                errors.push(ValidationError {
                    property_name: field.property_name.to_string(),
                    error_message,
                });
            }
        }

        ValidationResult { errors }
    }
}
