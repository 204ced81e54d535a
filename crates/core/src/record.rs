//! The flat referral record persisted for each accepted referral.
//!
//! Every business field is carried as an optional string exactly as extracted from (or
//! destined for) the bundle. Interpretation of letters, periods and dates belongs to the
//! validator and the bundle synthesizer.
//!
//! The serialised field names are the storage schema and must not change.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    /// Document id in the store.
    #[serde(rename = "iD")]
    pub id: String,

    #[serde(rename = "caseno", default)]
    pub case_number: Option<String>,

    #[serde(rename = "nhs", default)]
    pub nhs_number: Option<String>,

    #[serde(rename = "datRef", default)]
    pub creation_date: Option<String>,

    #[serde(rename = "wlist", default)]
    pub waiting_list: Option<String>,

    #[serde(rename = "intentRefer", default)]
    pub intended_management: Option<String>,

    #[serde(rename = "gpRef", default)]
    pub referrer: Option<String>,

    #[serde(rename = "gpPrac", default)]
    pub referrer_address: Option<String>,

    #[serde(rename = "regGp", default)]
    pub patient_gp_code: Option<String>,

    #[serde(rename = "regPrac", default)]
    pub patient_gp_practice_code: Option<String>,

    #[serde(rename = "postcode", default)]
    pub patient_postcode: Option<String>,

    #[serde(rename = "dhaCode", default)]
    pub patient_health_board_area_code: Option<String>,

    #[serde(rename = "sourceRefer", default)]
    pub referrer_source_type: Option<String>,

    #[serde(rename = "lttrPrty", default)]
    pub letter_priority: Option<String>,

    #[serde(rename = "datonsys", default)]
    pub health_board_receive_date: Option<String>,

    #[serde(rename = "cons", default)]
    pub referral_assigned_consultant: Option<String>,

    #[serde(rename = "loc", default)]
    pub referral_assigned_location: Option<String>,

    #[serde(rename = "category", default)]
    pub patient_category: Option<String>,

    #[serde(rename = "consPrty", default)]
    pub priority: Option<String>,

    #[serde(rename = "dateBooked", default)]
    pub booking_date: Option<String>,

    #[serde(rename = "trtDate", default)]
    pub treatment_date: Option<String>,

    #[serde(rename = "spec", default)]
    pub speciality_identifier: Option<String>,

    /// Magnitude followed by a unit letter, e.g. `6D`.
    #[serde(rename = "firstApproxFreq", default)]
    pub repeat_period: Option<String>,

    #[serde(rename = "firstApproxAppt", default)]
    pub first_appointment_date: Option<String>,

    #[serde(rename = "healthRiskFactor", default)]
    pub health_risk_factor: Option<String>,

    #[serde(rename = "uniqueReferralId", default)]
    pub referral_id: Option<String>,
}
