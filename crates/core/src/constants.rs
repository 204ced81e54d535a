//! Constants used throughout the referrals core crate.
//!
//! This module contains the coding-system URIs, role markers, profile URIs, and storage
//! names shared by the mapper, the bundle synthesizer, and the enricher, so that the read
//! and write sides of the mapping agree on every literal.

// ============================================================================
// STORAGE
// ============================================================================

/// Default directory for referral document storage when no explicit directory is configured.
pub const DEFAULT_REFERRAL_DATA_DIR: &str = "referral_data";

/// Filename for a stored referral document.
pub const REFERRAL_JSON_FILENAME: &str = "referral.json";

// ============================================================================
// IDENTIFIER AND CODE SYSTEMS
// ============================================================================

pub const NHS_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/nhs-number";
pub const PAS_IDENTIFIER_SYSTEM: &str = "https://fhir.hduhb.nhs.wales/Id/pas-identifier";
pub const GMC_NUMBER_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/gmc-number";
pub const ODS_ORGANIZATION_CODE_SYSTEM: &str = "https://fhir.nhs.uk/Id/ods-organization-code";
pub const GDC_NUMBER_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/gdc-number";
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";
pub const MESSAGE_EVENTS_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/message-events-bars";
pub const MESSAGE_REASON_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/message-reason-bars";
pub const SERVICE_REQUEST_CATEGORY_SYSTEM: &str =
    "https://fhir.nhs.uk/CodeSystem/message-category-servicerequest";
pub const VERIFICATION_STATUS_SYSTEM: &str =
    "https://fhir.hl7.org.uk/CodeSystem/UKCore-NHSNumberVerificationStatusEngland";

/// Identifier system carrying the server-assigned referral id on the ServiceRequest.
pub const REFERRAL_ID_SYSTEM: &str = "ReferralUniqueId";
pub const RISK_FACTOR_SYSTEM: &str = "dhcw/optom/hrf";
pub const SPECIALITY_IDENTIFIER_SYSTEM: &str = "dhcw/SPEC";
pub const LETTER_PRIORITY_SYSTEM: &str = "DHCW/lttrPriority";
pub const PATIENT_CATEGORY_SYSTEM: &str = "dhcw/patientCategory";
pub const WAITING_LIST_SYSTEM: &str = "dhcw/WlistCodes";
pub const INTENT_REFER_SYSTEM: &str = "dhcw/IntentReferValues";
pub const DATONSYS_SYSTEM: &str = "dhcw/Datonsys";

// ============================================================================
// ROLE MARKERS (local resource ids)
// ============================================================================

pub const REQUESTING_PRACTITIONER_ID: &str = "RequestingPractitioner";
pub const RECEIVING_CLINICIAN_ID: &str = "ReceivingClinician";
pub const REFERRING_PRACTICE_ID: &str = "ReferringPractice";
pub const DESTINATION_ID: &str = "Destination";
pub const DHA_CODE_ID: &str = "DhaCode";

// ============================================================================
// EXTENSIONS AND REFERENCE TYPES
// ============================================================================

/// Appointment extension pointing at the organisation that booked it.
pub const BOOKING_ORGANIZATION_EXTENSION: &str = "BookingOrganization";

/// Element of an extension value that holds the referenced URL.
pub const REFERENCE_ELEMENT_NAME: &str = "reference";

pub const PRACTITIONER_TYPE: &str = "Practitioner";
pub const ORGANIZATION_TYPE: &str = "Organization";

pub const SOURCE_OF_SERVICE_REQUEST_EXTENSION: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-SourceOfServiceRequest";
pub const NHS_NUMBER_VERIFICATION_STATUS_EXTENSION: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-NHSNumberVerificationStatus";

// ============================================================================
// PROFILES
// ============================================================================

pub const SERVICE_REQUEST_PROFILE: &str =
    "https://fhir.nhs.uk/StructureDefinition/BARSServiceRequest-request-referral";
pub const PATIENT_PROFILE: &str =
    "https://fhir.nhs.wales/StructureDefinition/DataStandardsWales-Patient";
pub const PRACTITIONER_PROFILE: &str =
    "https://fhir.nhs.wales/StructureDefinition/DataStandardsWales-Practitioner";
pub const ORGANIZATION_PROFILE: &str =
    "https://fhir.nhs.wales/StructureDefinition/DataStandardsWales-Organization";
pub const ENCOUNTER_PROFILE: &str =
    "https://fhir.nhs.wales/StructureDefinition/DataStandardsWales-Encounter";
pub const APPOINTMENT_PROFILE: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/UKCore-Appointment";
pub const CARE_PLAN_PROFILE: &str = "https://fhir.hl7.org.uk/StructureDefinition/UKCore-CarePlan";

pub const MESSAGE_DEFINITION: &str =
    "https://fhir.nhs.uk/MessageDefinition/bars-message-servicerequest-request-referral";

// ============================================================================
// FIXED VALUES
// ============================================================================

/// Waiting list code assigned to every inbound referral.
pub const WAITING_LIST_CODE: &str = "O";

/// Intended management code assigned to every inbound referral.
pub const INTENDED_MANAGEMENT_CODE: &str = "6";

/// Referrer source type for dental practice referrals.
pub const REFERRER_SOURCE_TYPE_CODE: &str = "DE";
pub const REFERRER_SOURCE_TYPE_DISPLAY: &str = "General Dental Practice";

/// ODS code of the organisation that receives synthesized referrals.
pub const DESTINATION_ODS_CODE: &str = "L5X6M";

/// Service id appended to the destination endpoint.
pub const SERVICE_ID: &str = "0123456789";

pub const MESSAGE_EVENT_CODE: &str = "servicerequest-request";
pub const MESSAGE_REASON_CODE: &str = "new";
pub const REFERRAL_CATEGORY_CODE: &str = "referral";
pub const REFERRAL_CATEGORY_DISPLAY: &str = "Transfer of Care";
pub const VERIFICATION_STATUS_CODE: &str = "01";

pub const REFERRAL_ENCOUNTER_CLASS_CODE: &str = "327121000000104";
pub const REFERRAL_ENCOUNTER_CLASS_DISPLAY: &str = "Referral to dental service";
pub const OUTPATIENT_ENCOUNTER_CLASS_CODE: &str = "373864002";
pub const OUTPATIENT_ENCOUNTER_CLASS_DISPLAY: &str = "outpatient";
pub const SERVICE_TYPE_DISPLAY: &str = "Referral to dental service";

pub const BUNDLE_TYPE_MESSAGE: &str = "message";
