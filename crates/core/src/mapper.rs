//! Bundle-to-record mapping.
//!
//! Walks an inbound referral bundle and lifts the business fields into a flat
//! [`ReferralRecord`]. The three anchor resources (the ServiceRequest, its subject Patient
//! and its Encounter) are resolved once up front; every field is then a short lookup from
//! one of them.
//!
//! Mapping never fails. Anything absent or of the wrong shape yields `None` for the fields
//! that depend on it, and the validator decides whether that is acceptable.

use crate::codes::{priority_letter, RepeatPeriod};
use crate::constants::{
    BOOKING_ORGANIZATION_EXTENSION, DHA_CODE_ID, GDC_NUMBER_SYSTEM, GMC_NUMBER_SYSTEM,
    INTENDED_MANAGEMENT_CODE, LETTER_PRIORITY_SYSTEM, NHS_NUMBER_SYSTEM,
    ODS_ORGANIZATION_CODE_SYSTEM, ORGANIZATION_TYPE, PATIENT_CATEGORY_SYSTEM, PRACTITIONER_TYPE,
    RECEIVING_CLINICIAN_ID, REFERENCE_ELEMENT_NAME, REFERRER_SOURCE_TYPE_CODE,
    REQUESTING_PRACTITIONER_ID, RISK_FACTOR_SYSTEM, SPECIALITY_IDENTIFIER_SYSTEM,
    WAITING_LIST_CODE,
};
use chrono::{DateTime, SecondsFormat, Utc};
use fhir::search::{
    check_property_value, coding_system, concept_codings, extension_url, identifier_system,
    reference_type, select_nested_with_condition, select_with_condition,
};
use fhir::{
    Appointment, Bundle, BundleResource, Encounter, Identifier, Organization, Patient, Practitioner,
    ServiceRequest,
};
use uuid::Uuid;

use crate::record::ReferralRecord;

/// Stateless mapper from referral bundles to [`ReferralRecord`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferralMapper;

impl ReferralMapper {
    /// Map `bundle` using the current time for the server-side dates.
    pub fn map_from_bundle(bundle: &Bundle) -> ReferralRecord {
        Self::map_from_bundle_at(bundle, Utc::now())
    }

    /// Map `bundle` with an explicit `now`.
    ///
    /// `HealthBoardReceiveDate`, `BookingDate` and `TreatmentDate` all take this one value.
    /// `Id`, `CaseNumber` and `ReferralId` are fresh v4 UUIDs on every call.
    pub fn map_from_bundle_at(bundle: &Bundle, now: DateTime<Utc>) -> ReferralRecord {
        let anchors = Anchors::resolve(bundle);
        let now = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        let record = ReferralRecord {
            id: Uuid::new_v4().to_string(),
            case_number: Some(Uuid::new_v4().to_string()),
            nhs_number: anchors.nhs_number(),
            creation_date: anchors
                .service_request
                .and_then(|sr| sr.authored_on.clone()),
            waiting_list: Some(WAITING_LIST_CODE.to_string()),
            intended_management: Some(INTENDED_MANAGEMENT_CODE.to_string()),
            referrer: anchors.referrer(),
            referrer_address: anchors.referrer_address(),
            patient_gp_code: anchors.patient_gp(PRACTITIONER_TYPE, GMC_NUMBER_SYSTEM),
            patient_gp_practice_code: anchors
                .patient_gp(ORGANIZATION_TYPE, ODS_ORGANIZATION_CODE_SYSTEM),
            patient_postcode: anchors.postcode(),
            patient_health_board_area_code: anchors.health_board_area_code(),
            referrer_source_type: Some(REFERRER_SOURCE_TYPE_CODE.to_string()),
            letter_priority: anchors.letter_priority(),
            health_board_receive_date: Some(now.clone()),
            referral_assigned_consultant: anchors.assigned_consultant(),
            referral_assigned_location: anchors.assigned_location(),
            patient_category: anchors.order_detail_code(PATIENT_CATEGORY_SYSTEM),
            priority: anchors.priority(),
            booking_date: Some(now.clone()),
            treatment_date: Some(now),
            speciality_identifier: anchors.speciality_identifier(),
            repeat_period: anchors.repeat_period(),
            first_appointment_date: anchors.first_appointment_date(),
            health_risk_factor: anchors.order_detail_code(RISK_FACTOR_SYSTEM),
            referral_id: Some(Uuid::new_v4().to_string()),
        };

        tracing::debug!(record_id = %record.id, "mapped referral bundle");
        record
    }
}

/// The ServiceRequest and the resources it points at directly, resolved once.
struct Anchors<'a> {
    bundle: &'a Bundle,
    service_request: Option<&'a ServiceRequest>,
    patient: Option<&'a Patient>,
    encounter: Option<&'a Encounter>,
}

fn identifier_value(identifiers: &[Identifier], system: &str) -> Option<String> {
    select_with_condition(identifiers, identifier_system, system).and_then(|i| i.value.clone())
}

impl<'a> Anchors<'a> {
    fn resolve(bundle: &'a Bundle) -> Self {
        let service_request = bundle.resource_by_type::<ServiceRequest>();
        let patient = service_request.and_then(|sr| {
            bundle.resource_by_url::<Patient>(sr.subject.as_ref()?.reference.as_deref())
        });
        let encounter = service_request.and_then(|sr| {
            bundle.resource_by_url::<Encounter>(sr.encounter.as_ref()?.reference.as_deref())
        });

        Self {
            bundle,
            service_request,
            patient,
            encounter,
        }
    }

    fn nhs_number(&self) -> Option<String> {
        identifier_value(&self.patient?.identifier, NHS_NUMBER_SYSTEM)
    }

    /// GMC number of the requester, only if it plays the requesting-practitioner role.
    fn referrer(&self) -> Option<String> {
        let url = self.service_request?.requester.as_ref()?.reference.as_deref();
        let practitioner = check_property_value(
            self.bundle.resource_by_url::<Practitioner>(url),
            Practitioner::local_id,
            REQUESTING_PRACTITIONER_ID,
        )?;
        identifier_value(&practitioner.identifier, GMC_NUMBER_SYSTEM)
    }

    /// ODS code of the organisation that booked the encounter's first appointment.
    fn referrer_address(&self) -> Option<String> {
        let appointment_url = self.encounter?.appointment.first()?.reference.as_deref();
        let appointment = self.bundle.resource_by_url::<Appointment>(appointment_url)?;

        let organization_url = select_with_condition(
            &appointment.extension,
            extension_url,
            BOOKING_ORGANIZATION_EXTENSION,
        )?
        .value_string_by_element_name(REFERENCE_ELEMENT_NAME);
        let organization = self
            .bundle
            .resource_by_url::<Organization>(organization_url.as_deref())?;

        identifier_value(&organization.identifier, ODS_ORGANIZATION_CODE_SYSTEM)
    }

    /// Logical GP reference of `type_name`, read only if its identifier is in `system`.
    fn patient_gp(&self, type_name: &str, system: &str) -> Option<String> {
        let reference = select_with_condition(
            &self.patient?.general_practitioner,
            reference_type,
            type_name,
        )?;
        check_property_value(reference.identifier.as_ref(), identifier_system, system)?
            .value
            .clone()
    }

    fn postcode(&self) -> Option<String> {
        self.patient?.address.first()?.postal_code.clone()
    }

    fn health_board_area_code(&self) -> Option<String> {
        let organization = self.bundle.resource_by_id_from_references::<Organization>(
            &self.service_request?.performer,
            DHA_CODE_ID,
        )?;
        identifier_value(&organization.identifier, ODS_ORGANIZATION_CODE_SYSTEM)
    }

    fn assigned_consultant(&self) -> Option<String> {
        let practitioner = self.bundle.resource_by_id_from_references::<Practitioner>(
            &self.service_request?.performer,
            RECEIVING_CLINICIAN_ID,
        )?;
        identifier_value(&practitioner.identifier, GDC_NUMBER_SYSTEM)
    }

    fn assigned_location(&self) -> Option<String> {
        select_nested_with_condition(
            &self.service_request?.location_code,
            concept_codings,
            coding_system,
            ODS_ORGANIZATION_CODE_SYSTEM,
        )?
        .code
        .clone()
    }

    fn order_detail_code(&self, system: &str) -> Option<String> {
        select_nested_with_condition(
            &self.service_request?.order_detail,
            concept_codings,
            coding_system,
            system,
        )?
        .code
        .clone()
    }

    fn letter_priority(&self) -> Option<String> {
        let priority = self.encounter?.priority.as_ref()?;
        select_with_condition(&priority.coding, coding_system, LETTER_PRIORITY_SYSTEM)?
            .code
            .clone()
    }

    fn speciality_identifier(&self) -> Option<String> {
        let service_type = self.encounter?.service_type.as_ref()?;
        select_with_condition(
            &service_type.coding,
            coding_system,
            SPECIALITY_IDENTIFIER_SYSTEM,
        )?
        .code
        .clone()
    }

    fn priority(&self) -> Option<String> {
        self.service_request?
            .priority
            .map(|priority| priority_letter(priority).to_string())
    }

    /// `occurrenceTiming.repeat` as `<period><unit letter>`; needs both parts.
    fn repeat_period(&self) -> Option<String> {
        let repeat = self.service_request?.occurrence_timing.as_ref()?.repeat.as_ref()?;
        RepeatPeriod::format(repeat.period.as_ref()?, repeat.period_unit?)
    }

    fn first_appointment_date(&self) -> Option<String> {
        self.service_request?
            .occurrence_timing
            .as_ref()?
            .event
            .first()
            .cloned()
    }
}
