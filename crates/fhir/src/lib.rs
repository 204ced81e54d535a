//! FHIR wire/boundary support for dental referral messaging.
//!
//! This crate provides **wire models** and **lookup helpers** for FHIR R4 message bundles
//! exchanged with the national referral service:
//! - `Bundle` JSON parse/render with path-annotated schema errors
//! - the closed set of resource kinds a referral bundle carries
//! - case-insensitive graph lookups over bundle entries
//!
//! This crate focuses on:
//! - FHIR JSON shape (no REST transport)
//! - lossless round-tripping of elements that are not modelled
//! - primitive format checks (`dateTime`)
//!
//! It knows nothing about referral records; mapping lives in `referrals-core`.

pub mod bundle;
pub mod datatypes;
pub mod primitives;
pub mod resources;
pub mod search;

// Re-export the wire model
pub use bundle::{Bundle, BundleEntry, BUNDLE_RESOURCE_TYPE, FHIR_JSON_MEDIA_TYPE};
pub use datatypes::{
    Address, CodeableConcept, Coding, Extension, Identifier, Meta, Reference, RequestPriority,
    Timing, TimingRepeat, UnitsOfTime,
};
pub use resources::{
    Appointment, AppointmentParticipant, BundleResource, CarePlan, Encounter, MessageDestination,
    MessageHeader, MessageSource, Organization, Patient, Practitioner, Resource, ServiceRequest,
};

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("deserialisation error: {0}")]
    Deserialization(String),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
