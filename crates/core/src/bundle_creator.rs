//! Record-to-bundle synthesis.
//!
//! Builds a fresh 13-entry referral message bundle from a stored [`ReferralRecord`]. Values
//! are written to exactly the places the mapper reads them from, so mapping a synthesized
//! bundle gives back the record's shared fields.
//!
//! Entry layout:
//!
//! ```text
//! MessageHeader ──focus──▶ ServiceRequest
//! ServiceRequest ──subject──▶ Patient
//!                ──basedOn──▶ CarePlan
//!                ──requester──▶ Practitioner (RequestingPractitioner)
//!                ──performer──▶ Organization (DhaCode)
//!                ──encounter──▶ Encounter (finished) ──▶ Appointment (fulfilled)
//! Encounter (planned) ──▶ Appointment (waitlist) ──participants──▶ Patient, ReceivingClinician
//! ```
//!
//! Only the entry URLs and the bundle/waitlist timestamps vary between calls.

use crate::codes::{priority_from_letter, RepeatPeriod};
use crate::config::BundleCreationConfig;
use crate::constants::*;
use crate::record::ReferralRecord;
use crate::{ReferralError, ReferralResult};
use chrono::{DateTime, SecondsFormat, Utc};
use fhir::{
    Address, Appointment, AppointmentParticipant, Bundle, BundleEntry, CarePlan, CodeableConcept,
    Coding, Encounter, Extension, Identifier, MessageDestination, MessageHeader, MessageSource,
    Meta, Organization, Patient, Practitioner, Reference, RequestPriority, ServiceRequest, Timing,
    TimingRepeat,
};
use uuid::Uuid;

/// Local URLs for every entry of one synthesized bundle.
struct EntryUrls {
    message_header: String,
    service_request: String,
    patient: String,
    receiving_clinician: String,
    requesting_practitioner: String,
    dha: String,
    referring_practice: String,
    destination: String,
    referral_encounter: String,
    referral_appointment: String,
    care_plan: String,
    planned_encounter: String,
    planned_appointment: String,
}

fn new_full_url() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

impl EntryUrls {
    fn generate() -> Self {
        Self {
            message_header: new_full_url(),
            service_request: new_full_url(),
            patient: new_full_url(),
            receiving_clinician: new_full_url(),
            requesting_practitioner: new_full_url(),
            dha: new_full_url(),
            referring_practice: new_full_url(),
            destination: new_full_url(),
            referral_encounter: new_full_url(),
            referral_appointment: new_full_url(),
            care_plan: new_full_url(),
            planned_encounter: new_full_url(),
            planned_appointment: new_full_url(),
        }
    }
}

/// Builds referral message bundles from stored records.
pub struct BundleCreator;

impl BundleCreator {
    /// Synthesize a bundle for `record`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ReferralError::Translation`] if the record's priority or repeat period is
    /// present but holds a letter outside the translation tables.
    pub fn create_bundle(
        record: &ReferralRecord,
        config: &BundleCreationConfig,
    ) -> ReferralResult<Bundle> {
        Self::create_bundle_at(record, config, Utc::now())
    }

    pub fn create_bundle_at(
        record: &ReferralRecord,
        config: &BundleCreationConfig,
        now: DateTime<Utc>,
    ) -> ReferralResult<Bundle> {
        let priority = translate_priority(record.priority.as_deref())?;
        let repeat = translate_repeat_period(record.repeat_period.as_deref())?;
        let now = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let urls = EntryUrls::generate();

        let entry = vec![
            BundleEntry::new(&urls.message_header, message_header(&urls, config)),
            BundleEntry::new(
                &urls.service_request,
                service_request(&urls, record, priority, repeat),
            ),
            BundleEntry::new(&urls.patient, patient(record)),
            BundleEntry::new(
                &urls.receiving_clinician,
                practitioner(
                    RECEIVING_CLINICIAN_ID,
                    GDC_NUMBER_SYSTEM,
                    &record.referral_assigned_consultant,
                ),
            ),
            BundleEntry::new(
                &urls.requesting_practitioner,
                practitioner(REQUESTING_PRACTITIONER_ID, GMC_NUMBER_SYSTEM, &record.referrer),
            ),
            BundleEntry::new(
                &urls.dha,
                organization(DHA_CODE_ID, record.patient_health_board_area_code.clone()),
            ),
            BundleEntry::new(
                &urls.referring_practice,
                organization(REFERRING_PRACTICE_ID, record.referrer_address.clone()),
            ),
            BundleEntry::new(
                &urls.destination,
                organization(DESTINATION_ID, Some(DESTINATION_ODS_CODE.to_string())),
            ),
            BundleEntry::new(
                &urls.referral_encounter,
                encounter(
                    record,
                    "finished",
                    Coding::new(SNOMED_SYSTEM, Some(REFERRAL_ENCOUNTER_CLASS_CODE.into()))
                        .with_display(REFERRAL_ENCOUNTER_CLASS_DISPLAY),
                    None,
                    &urls.referral_appointment,
                ),
            ),
            BundleEntry::new(&urls.referral_appointment, referral_appointment(&urls, record)),
            BundleEntry::new(&urls.care_plan, care_plan(&urls)),
            BundleEntry::new(
                &urls.planned_encounter,
                encounter(
                    record,
                    "planned",
                    Coding::new(SNOMED_SYSTEM, Some(OUTPATIENT_ENCOUNTER_CLASS_CODE.into()))
                        .with_display(OUTPATIENT_ENCOUNTER_CLASS_DISPLAY),
                    Some(Reference::to(&urls.patient)),
                    &urls.planned_appointment,
                ),
            ),
            BundleEntry::new(
                &urls.planned_appointment,
                planned_appointment(&urls, now.clone()),
            ),
        ];

        tracing::debug!(record_id = %record.id, entries = entry.len(), "synthesized referral bundle");

        Ok(Bundle {
            bundle_type: Some(BUNDLE_TYPE_MESSAGE.to_string()),
            timestamp: Some(now),
            entry,
            ..Default::default()
        })
    }
}

fn translate_priority(letter: Option<&str>) -> ReferralResult<Option<RequestPriority>> {
    let Some(value) = letter else {
        return Ok(None);
    };
    value
        .chars()
        .next()
        .and_then(priority_from_letter)
        .map(Some)
        .ok_or_else(|| ReferralError::Translation(format!("unknown priority code '{value}'")))
}

fn translate_repeat_period(value: Option<&str>) -> ReferralResult<Option<RepeatPeriod>> {
    let Some(value) = value else {
        return Ok(None);
    };
    RepeatPeriod::parse(value)
        .map(Some)
        .ok_or_else(|| ReferralError::Translation(format!("unknown repeat period '{value}'")))
}

fn coded(system: &str, code: Option<String>) -> CodeableConcept {
    CodeableConcept::single(Coding::new(system, code))
}

fn message_header(urls: &EntryUrls, config: &BundleCreationConfig) -> MessageHeader {
    MessageHeader {
        event_coding: Some(Coding::new(
            MESSAGE_EVENTS_SYSTEM,
            Some(MESSAGE_EVENT_CODE.into()),
        )),
        destination: vec![MessageDestination {
            endpoint: Some(format!("{}|{}", config.destination_endpoint(), SERVICE_ID)),
            receiver: Some(Reference::to(&urls.destination)),
            ..Default::default()
        }],
        sender: Some(Reference::to(&urls.referring_practice)),
        source: Some(MessageSource {
            endpoint: Some(config.dental_ui_base_url().to_string()),
            ..Default::default()
        }),
        reason: Some(coded(MESSAGE_REASON_SYSTEM, Some(MESSAGE_REASON_CODE.into()))),
        focus: vec![Reference::to(&urls.service_request)],
        definition: Some(MESSAGE_DEFINITION.to_string()),
        ..Default::default()
    }
}

fn service_request(
    urls: &EntryUrls,
    record: &ReferralRecord,
    priority: Option<RequestPriority>,
    repeat: Option<RepeatPeriod>,
) -> ServiceRequest {
    let timing = Timing {
        event: record.first_appointment_date.iter().cloned().collect(),
        repeat: repeat.map(|repeat| TimingRepeat {
            period: Some(repeat.magnitude),
            period_unit: Some(repeat.unit),
            ..Default::default()
        }),
        ..Default::default()
    };

    ServiceRequest {
        meta: Some(Meta::profile(SERVICE_REQUEST_PROFILE)),
        extension: vec![Extension::codeable_concept(
            SOURCE_OF_SERVICE_REQUEST_EXTENSION,
            CodeableConcept::single(
                Coding::new(SNOMED_SYSTEM, record.referrer_source_type.clone())
                    .with_display(REFERRER_SOURCE_TYPE_DISPLAY),
            ),
        )],
        identifier: vec![Identifier::new(
            REFERRAL_ID_SYSTEM,
            record.referral_id.clone(),
        )],
        based_on: vec![Reference::to(&urls.care_plan)],
        status: Some("active".into()),
        intent: Some("plan".into()),
        category: vec![CodeableConcept::single(
            Coding::new(
                SERVICE_REQUEST_CATEGORY_SYSTEM,
                Some(REFERRAL_CATEGORY_CODE.into()),
            )
            .with_display(REFERRAL_CATEGORY_DISPLAY),
        )],
        priority,
        order_detail: vec![
            coded(WAITING_LIST_SYSTEM, record.waiting_list.clone()),
            coded(INTENT_REFER_SYSTEM, record.intended_management.clone()),
            coded(PATIENT_CATEGORY_SYSTEM, record.patient_category.clone()),
            coded(DATONSYS_SYSTEM, record.health_board_receive_date.clone()),
            coded(RISK_FACTOR_SYSTEM, record.health_risk_factor.clone()),
        ],
        subject: Some(Reference::to(&urls.patient)),
        encounter: Some(Reference::to(&urls.referral_encounter)),
        occurrence_timing: Some(timing),
        authored_on: record.creation_date.clone(),
        requester: Some(Reference::to(&urls.requesting_practitioner)),
        performer: vec![Reference::to(&urls.dha)],
        location_code: vec![coded(
            ODS_ORGANIZATION_CODE_SYSTEM,
            record.referral_assigned_location.clone(),
        )],
        ..Default::default()
    }
}

fn patient(record: &ReferralRecord) -> Patient {
    let mut nhs_number = Identifier::new(NHS_NUMBER_SYSTEM, record.nhs_number.clone());
    nhs_number.extension = vec![Extension::codeable_concept(
        NHS_NUMBER_VERIFICATION_STATUS_EXTENSION,
        coded(
            VERIFICATION_STATUS_SYSTEM,
            Some(VERIFICATION_STATUS_CODE.into()),
        ),
    )];

    Patient {
        meta: Some(Meta::profile(PATIENT_PROFILE)),
        identifier: vec![
            nhs_number,
            Identifier::new(PAS_IDENTIFIER_SYSTEM, record.case_number.clone()),
        ],
        address: vec![Address {
            postal_code: record.patient_postcode.clone(),
            ..Default::default()
        }],
        general_practitioner: vec![
            Reference::logical(
                ORGANIZATION_TYPE,
                Identifier::new(
                    ODS_ORGANIZATION_CODE_SYSTEM,
                    record.patient_gp_practice_code.clone(),
                ),
            ),
            Reference::logical(
                PRACTITIONER_TYPE,
                Identifier::new(GMC_NUMBER_SYSTEM, record.patient_gp_code.clone()),
            ),
        ],
        ..Default::default()
    }
}

fn practitioner(role: &str, system: &str, value: &Option<String>) -> Practitioner {
    Practitioner {
        id: Some(role.to_string()),
        meta: Some(Meta::profile(PRACTITIONER_PROFILE)),
        identifier: vec![Identifier::new(system, value.clone())],
        ..Default::default()
    }
}

fn organization(role: &str, ods_code: Option<String>) -> Organization {
    Organization {
        id: Some(role.to_string()),
        meta: Some(Meta::profile(ORGANIZATION_PROFILE)),
        identifier: vec![Identifier::new(ODS_ORGANIZATION_CODE_SYSTEM, ods_code)],
        ..Default::default()
    }
}

fn encounter(
    record: &ReferralRecord,
    status: &str,
    class: Coding,
    subject: Option<Reference>,
    appointment_url: &str,
) -> Encounter {
    Encounter {
        meta: Some(Meta::profile(ENCOUNTER_PROFILE)),
        status: Some(status.to_string()),
        class: Some(class),
        service_type: Some(CodeableConcept::single(
            Coding::new(
                SPECIALITY_IDENTIFIER_SYSTEM,
                record.speciality_identifier.clone(),
            )
            .with_display(SERVICE_TYPE_DISPLAY),
        )),
        priority: Some(coded(LETTER_PRIORITY_SYSTEM, record.letter_priority.clone())),
        subject,
        appointment: vec![Reference::to(appointment_url)],
        ..Default::default()
    }
}

fn accepted(actor_url: &str) -> AppointmentParticipant {
    AppointmentParticipant {
        actor: Some(Reference::to(actor_url)),
        status: Some("accepted".into()),
        ..Default::default()
    }
}

fn referral_appointment(urls: &EntryUrls, record: &ReferralRecord) -> Appointment {
    Appointment {
        meta: Some(Meta::profile(APPOINTMENT_PROFILE)),
        extension: vec![Extension::reference(
            BOOKING_ORGANIZATION_EXTENSION,
            Reference::to(&urls.referring_practice),
        )],
        status: Some("fulfilled".into()),
        created: record.booking_date.clone(),
        participant: vec![accepted(&urls.patient)],
        ..Default::default()
    }
}

fn care_plan(urls: &EntryUrls) -> CarePlan {
    CarePlan {
        meta: Some(Meta::profile(CARE_PLAN_PROFILE)),
        status: Some("completed".into()),
        intent: Some("plan".into()),
        subject: Some(Reference::to(&urls.patient)),
        encounter: Some(Reference::to(&urls.referral_encounter)),
        ..Default::default()
    }
}

fn planned_appointment(urls: &EntryUrls, now: String) -> Appointment {
    Appointment {
        meta: Some(Meta::profile(APPOINTMENT_PROFILE)),
        status: Some("waitlist".into()),
        created: Some(now),
        participant: vec![accepted(&urls.patient), accepted(&urls.receiving_clinician)],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::ReferralMapper;
    use chrono::TimeZone;
    use fhir::{BundleResource, UnitsOfTime};
    use serde_json::Number;

    fn config() -> BundleCreationConfig {
        BundleCreationConfig::new(
            "https://ereferrals.example".into(),
            "/api/referrals".into(),
            "https://dental-ui.example".into(),
        )
        .expect("valid config")
    }

    fn record() -> ReferralRecord {
        ReferralRecord {
            id: "0f3f7a4e-33a4-4a49-9c52-3b1b3ad1c7b1".into(),
            case_number: Some("5b0ad6c1-30a2-4e3c-9a8d-6f7c7f0a8e21".into()),
            nhs_number: Some("9449305552".into()),
            creation_date: Some("2024-03-01T10:15:00+00:00".into()),
            waiting_list: Some("O".into()),
            intended_management: Some("6".into()),
            referrer: Some("G1234567".into()),
            referrer_address: Some("W12345".into()),
            patient_gp_code: Some("G7654321".into()),
            patient_gp_practice_code: Some("W98006".into()),
            patient_postcode: Some("CF14 4XW".into()),
            patient_health_board_area_code: Some("7A4".into()),
            referrer_source_type: Some("DE".into()),
            letter_priority: Some("R".into()),
            health_board_receive_date: Some("2024-03-02T08:00:00.000Z".into()),
            referral_assigned_consultant: Some("81234".into()),
            referral_assigned_location: Some("7A3C7".into()),
            patient_category: Some("01".into()),
            priority: Some("U".into()),
            booking_date: Some("2024-03-02T08:00:00.000Z".into()),
            treatment_date: Some("2024-03-02T08:00:00.000Z".into()),
            speciality_identifier: Some("140".into()),
            repeat_period: Some("6D".into()),
            first_appointment_date: Some("2024-06-03".into()),
            health_risk_factor: Some("1".into()),
            referral_id: Some("c6a8a5f2-2f0c-4a53-8f0a-7d2b9e0e4d11".into()),
        }
    }

    fn count<T: BundleResource>(bundle: &Bundle) -> usize {
        bundle
            .resources()
            .filter(|resource| T::from_resource(resource).is_some())
            .count()
    }

    #[test]
    fn builds_thirteen_entry_message_bundle() {
        let bundle = BundleCreator::create_bundle(&record(), &config()).expect("bundle");

        assert_eq!(bundle.entry.len(), 13);
        assert_eq!(bundle.bundle_type.as_deref(), Some("message"));
        assert!(bundle
            .entry
            .iter()
            .all(|e| e.full_url.as_deref().is_some_and(|u| u.starts_with("urn:uuid:"))));

        assert_eq!(count::<MessageHeader>(&bundle), 1);
        assert_eq!(count::<ServiceRequest>(&bundle), 1);
        assert_eq!(count::<Patient>(&bundle), 1);
        assert_eq!(count::<Practitioner>(&bundle), 2);
        assert_eq!(count::<Organization>(&bundle), 3);
        assert_eq!(count::<Encounter>(&bundle), 2);
        assert_eq!(count::<Appointment>(&bundle), 2);
        assert_eq!(count::<CarePlan>(&bundle), 1);
    }

    #[test]
    fn message_header_uses_configured_endpoints() {
        let bundle = BundleCreator::create_bundle(&record(), &config()).expect("bundle");
        let header = bundle.resource_by_type::<MessageHeader>().expect("header");

        assert_eq!(
            header.destination[0].endpoint.as_deref(),
            Some("https://ereferrals.example/api/referrals|0123456789")
        );
        assert_eq!(
            header.source.as_ref().and_then(|s| s.endpoint.as_deref()),
            Some("https://dental-ui.example")
        );

        let receiver = header.destination[0]
            .receiver
            .as_ref()
            .and_then(|r| r.reference.as_deref());
        let destination = bundle
            .resource_by_url::<Organization>(receiver)
            .expect("destination organization");
        assert_eq!(destination.id.as_deref(), Some(DESTINATION_ID));
        assert_eq!(destination.identifier[0].value.as_deref(), Some(DESTINATION_ODS_CODE));

        let focus = bundle.resource_by_url::<ServiceRequest>(header.focus[0].reference.as_deref());
        assert!(focus.is_some());
    }

    #[test]
    fn repeat_period_becomes_timing() {
        let bundle = BundleCreator::create_bundle(&record(), &config()).expect("bundle");
        let sr = bundle.resource_by_type::<ServiceRequest>().expect("service request");

        let timing = sr.occurrence_timing.as_ref().expect("timing");
        let repeat = timing.repeat.as_ref().expect("repeat");
        assert_eq!(repeat.period, Some(Number::from(6u64)));
        assert_eq!(repeat.period_unit, Some(UnitsOfTime::Day));
        assert_eq!(timing.event, vec!["2024-06-03".to_string()]);
        assert_eq!(sr.priority, Some(RequestPriority::Urgent));
    }

    #[test]
    fn rejects_unknown_priority_letter() {
        let mut record = record();
        record.priority = Some("X".into());

        let err = BundleCreator::create_bundle(&record, &config()).expect_err("unknown priority");
        assert!(matches!(err, ReferralError::Translation(_)), "got {err:?}");
    }

    #[test]
    fn rejects_unknown_frequency_letter() {
        let mut record = record();
        record.repeat_period = Some("6X".into());

        let err = BundleCreator::create_bundle(&record, &config()).expect_err("unknown unit");
        assert!(matches!(err, ReferralError::Translation(_)), "got {err:?}");
    }

    #[test]
    fn timestamps_use_one_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid time");
        let bundle = BundleCreator::create_bundle_at(&record(), &config(), now).expect("bundle");

        assert_eq!(bundle.timestamp.as_deref(), Some("2024-05-01T12:00:00.000Z"));
        let waitlist = bundle
            .resources()
            .filter_map(Appointment::from_resource)
            .find(|a| a.status.as_deref() == Some("waitlist"))
            .expect("waitlist appointment");
        assert_eq!(waitlist.created.as_deref(), Some("2024-05-01T12:00:00.000Z"));
    }

    #[test]
    fn mapping_a_synthesized_bundle_restores_the_record() {
        let original = record();
        let bundle = BundleCreator::create_bundle(&original, &config()).expect("bundle");

        let rendered = bundle.render().expect("render");
        let parsed = Bundle::parse(&rendered).expect("parse");
        let mapped = ReferralMapper::map_from_bundle(&parsed);

        assert_eq!(mapped.nhs_number, original.nhs_number);
        assert_eq!(mapped.creation_date, original.creation_date);
        assert_eq!(mapped.waiting_list, original.waiting_list);
        assert_eq!(mapped.intended_management, original.intended_management);
        assert_eq!(mapped.referrer, original.referrer);
        assert_eq!(mapped.referrer_address, original.referrer_address);
        assert_eq!(mapped.patient_gp_code, original.patient_gp_code);
        assert_eq!(mapped.patient_gp_practice_code, original.patient_gp_practice_code);
        assert_eq!(mapped.patient_postcode, original.patient_postcode);
        assert_eq!(
            mapped.patient_health_board_area_code,
            original.patient_health_board_area_code
        );
        assert_eq!(mapped.referrer_source_type, original.referrer_source_type);
        assert_eq!(mapped.letter_priority, original.letter_priority);
        assert_eq!(
            mapped.referral_assigned_location,
            original.referral_assigned_location
        );
        assert_eq!(mapped.patient_category, original.patient_category);
        assert_eq!(mapped.priority, original.priority);
        assert_eq!(mapped.speciality_identifier, original.speciality_identifier);
        assert_eq!(mapped.repeat_period, original.repeat_period);
        assert_eq!(mapped.first_appointment_date, original.first_appointment_date);
        assert_eq!(mapped.health_risk_factor, original.health_risk_factor);
    }

    #[test]
    fn receiving_clinician_is_only_a_waitlist_participant() {
        let bundle = BundleCreator::create_bundle(&record(), &config()).expect("bundle");
        let mapped = ReferralMapper::map_from_bundle(&bundle);

        assert_eq!(mapped.referral_assigned_consultant, None);
        let clinician = bundle
            .resources()
            .filter_map(Practitioner::from_resource)
            .find(|p| p.id.as_deref() == Some(RECEIVING_CLINICIAN_ID))
            .expect("receiving clinician");
        assert_eq!(clinician.identifier[0].value.as_deref(), Some("81234"));
    }
}
