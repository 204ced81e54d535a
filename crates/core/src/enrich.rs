//! Patches server-assigned values back into a client-submitted bundle.
//!
//! Only scalar values in resources that are already present are touched: the Patient's PAS
//! identifier, the ServiceRequest's referral-id identifier, and `created` on the appointment
//! reached through the ServiceRequest's encounter. Identifiers are added if missing and
//! overwritten otherwise, so enriching twice is the same as enriching once.

use crate::constants::{PAS_IDENTIFIER_SYSTEM, REFERRAL_ID_SYSTEM};
use crate::record::ReferralRecord;
use crate::{ReferralError, ReferralResult};
use fhir::search::{identifier_system, select_with_condition_mut};
use fhir::{Appointment, Bundle, Encounter, Identifier, Patient, ServiceRequest};

/// Set the identifier in `system` to `value`, adding it if no such identifier exists.
fn create_or_update_identifier(identifiers: &mut Vec<Identifier>, system: &str, value: &str) {
    match select_with_condition_mut(identifiers, identifier_system, system) {
        Some(identifier) => identifier.value = Some(value.to_string()),
        None => identifiers.push(Identifier::new(system, Some(value.to_string()))),
    }
}

fn missing(what: &str) -> ReferralError {
    ReferralError::Enrichment(format!("bundle has no {what}"))
}

/// Write `record`'s case number, referral id and booking date into `bundle`.
///
/// # Errors
///
/// Returns [`ReferralError::Enrichment`] if the ServiceRequest, its subject Patient, its
/// Encounter, or that encounter's first Appointment cannot be resolved. A bundle that passed
/// mapping and validation always has all four.
pub fn enrich(bundle: &mut Bundle, record: &ReferralRecord) -> ReferralResult<()> {
    let (patient_url, encounter_url) = {
        let service_request = bundle
            .resource_by_type::<ServiceRequest>()
            .ok_or_else(|| missing("ServiceRequest"))?;
        (
            service_request
                .subject
                .as_ref()
                .and_then(|s| s.reference.clone()),
            service_request
                .encounter
                .as_ref()
                .and_then(|e| e.reference.clone()),
        )
    };

    let appointment_url = bundle
        .resource_by_url::<Encounter>(encounter_url.as_deref())
        .ok_or_else(|| missing("Encounter for the ServiceRequest"))?
        .appointment
        .first()
        .and_then(|a| a.reference.clone());

    // Resolve every target before writing so a failure leaves the bundle untouched.
    if bundle
        .resource_by_url::<Patient>(patient_url.as_deref())
        .is_none()
    {
        return Err(missing("Patient for the ServiceRequest"));
    }
    if bundle
        .resource_by_url::<Appointment>(appointment_url.as_deref())
        .is_none()
    {
        return Err(missing("Appointment for the Encounter"));
    }

    if let Some(case_number) = record.case_number.as_deref() {
        if let Some(patient) = bundle.resource_by_url_mut::<Patient>(patient_url.as_deref()) {
            create_or_update_identifier(&mut patient.identifier, PAS_IDENTIFIER_SYSTEM, case_number);
        }
    }

    if let Some(referral_id) = record.referral_id.as_deref() {
        if let Some(service_request) = bundle.resource_by_type_mut::<ServiceRequest>() {
            create_or_update_identifier(
                &mut service_request.identifier,
                REFERRAL_ID_SYSTEM,
                referral_id,
            );
        }
    }

    if let Some(appointment) = bundle.resource_by_url_mut::<Appointment>(appointment_url.as_deref())
    {
        appointment.created = record.booking_date.clone();
    }

    tracing::debug!(record_id = %record.id, "enriched referral bundle");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhir::search::select_with_condition;
    use fhir::{BundleEntry, Reference};

    const EXAMPLE_BUNDLE: &str = include_str!("../../fhir/tests/data/example-bundle.json");

    fn record() -> ReferralRecord {
        ReferralRecord {
            id: "0f3f7a4e-33a4-4a49-9c52-3b1b3ad1c7b1".into(),
            case_number: Some("5b0ad6c1-30a2-4e3c-9a8d-6f7c7f0a8e21".into()),
            booking_date: Some("2024-03-02T08:00:00.000Z".into()),
            referral_id: Some("c6a8a5f2-2f0c-4a53-8f0a-7d2b9e0e4d11".into()),
            ..Default::default()
        }
    }

    fn pas_identifiers(bundle: &Bundle) -> Vec<String> {
        bundle
            .resource_by_type::<Patient>()
            .map(|p| {
                p.identifier
                    .iter()
                    .filter(|i| i.system.as_deref() == Some(PAS_IDENTIFIER_SYSTEM))
                    .filter_map(|i| i.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn minimal_bundle(patient: Patient) -> Bundle {
        Bundle {
            entry: vec![
                BundleEntry::new(
                    "urn:uuid:sr",
                    ServiceRequest {
                        subject: Some(Reference::to("urn:uuid:patient")),
                        encounter: Some(Reference::to("urn:uuid:encounter")),
                        ..Default::default()
                    },
                ),
                BundleEntry::new("urn:uuid:patient", patient),
                BundleEntry::new(
                    "urn:uuid:encounter",
                    Encounter {
                        appointment: vec![Reference::to("urn:uuid:appointment")],
                        ..Default::default()
                    },
                ),
                BundleEntry::new("urn:uuid:appointment", Appointment::default()),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn overwrites_existing_identifiers_and_booking_date() {
        let mut bundle = Bundle::parse(EXAMPLE_BUNDLE).expect("parse");
        enrich(&mut bundle, &record()).expect("enrich");

        assert_eq!(pas_identifiers(&bundle), vec!["5b0ad6c1-30a2-4e3c-9a8d-6f7c7f0a8e21"]);

        let sr = bundle.resource_by_type::<ServiceRequest>().expect("sr");
        let referral_id = select_with_condition(&sr.identifier, identifier_system, REFERRAL_ID_SYSTEM)
            .and_then(|i| i.value.as_deref());
        assert_eq!(referral_id, Some("c6a8a5f2-2f0c-4a53-8f0a-7d2b9e0e4d11"));
        assert_eq!(sr.identifier.len(), 1);

        let encounter_url = sr.encounter.as_ref().and_then(|e| e.reference.clone());
        let encounter = bundle
            .resource_by_url::<Encounter>(encounter_url.as_deref())
            .expect("encounter");
        let appointment = bundle
            .resource_by_url::<Appointment>(encounter.appointment[0].reference.as_deref())
            .expect("appointment");
        assert_eq!(appointment.created.as_deref(), Some("2024-03-02T08:00:00.000Z"));
    }

    #[test]
    fn adds_pas_identifier_when_missing() {
        let patient = Patient {
            identifier: vec![Identifier::new(
                "https://fhir.nhs.uk/Id/nhs-number",
                Some("9449305552".into()),
            )],
            ..Default::default()
        };
        let mut bundle = minimal_bundle(patient);

        enrich(&mut bundle, &record()).expect("enrich");

        let patient = bundle.resource_by_type::<Patient>().expect("patient");
        assert_eq!(patient.identifier.len(), 2);
        assert_eq!(pas_identifiers(&bundle), vec!["5b0ad6c1-30a2-4e3c-9a8d-6f7c7f0a8e21"]);

        let sr = bundle.resource_by_type::<ServiceRequest>().expect("sr");
        assert_eq!(sr.identifier.len(), 1);
    }

    #[test]
    fn enriching_twice_equals_enriching_once() {
        let mut once = Bundle::parse(EXAMPLE_BUNDLE).expect("parse");
        enrich(&mut once, &record()).expect("enrich");

        let mut twice = once.clone();
        enrich(&mut twice, &record()).expect("enrich again");

        assert_eq!(once, twice);

        let mut fresh = minimal_bundle(Patient::default());
        enrich(&mut fresh, &record()).expect("enrich");
        let snapshot = fresh.clone();
        enrich(&mut fresh, &record()).expect("enrich again");
        assert_eq!(fresh, snapshot);
    }

    #[test]
    fn leaves_other_content_untouched() {
        let mut bundle = Bundle::parse(EXAMPLE_BUNDLE).expect("parse");
        enrich(&mut bundle, &record()).expect("enrich");

        let rendered: serde_json::Value =
            serde_json::from_str(&bundle.render().expect("render")).expect("json");
        let original: serde_json::Value = serde_json::from_str(EXAMPLE_BUNDLE).expect("json");

        assert_eq!(rendered["entry"].as_array().map(Vec::len), Some(13));
        assert_eq!(rendered["entry"][2]["resource"]["name"], original["entry"][2]["resource"]["name"]);
        assert_eq!(rendered["entry"][1]["resource"]["note"], original["entry"][1]["resource"]["note"]);
    }

    #[test]
    fn missing_encounter_is_an_error_and_nothing_is_written() {
        let mut bundle = Bundle {
            entry: vec![
                BundleEntry::new(
                    "urn:uuid:sr",
                    ServiceRequest {
                        subject: Some(Reference::to("urn:uuid:patient")),
                        ..Default::default()
                    },
                ),
                BundleEntry::new("urn:uuid:patient", Patient::default()),
            ],
            ..Default::default()
        };
        let before = bundle.clone();

        let err = enrich(&mut bundle, &record()).expect_err("no encounter");
        assert!(matches!(err, ReferralError::Enrichment(_)), "got {err:?}");
        assert_eq!(bundle, before);
    }
}
