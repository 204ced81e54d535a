//! Referral request handling.
//!
//! A create request moves through a fixed pipeline:
//!
//! ```text
//! Received -> Mapped -> Validated -> Persisted -> Enriched
//! ```
//!
//! Each stage is a marker type on [`ReferralRequest`], and each transition consumes the
//! request, so a record cannot be persisted before it has been validated and a bundle cannot be
//! returned before the stored record's values have been written into it. A validation or
//! storage failure ends the request; nothing is retried.
//!
//! [`ReferralService`] wires the pipeline to a store, a validator and the bundle synthesizer.
//! It holds no mutable state of its own and can be shared freely between request handlers.

use crate::bundle_creator::BundleCreator;
use crate::config::CoreConfig;
use crate::enrich::enrich;
use crate::mapper::ReferralMapper;
use crate::record::ReferralRecord;
use crate::repositories::{FileReferralRepository, ReferralRepository};
use crate::validation::{RecordValidator, ReferralRecordValidator};
use crate::{ReferralError, ReferralResult};
use chrono::{DateTime, Utc};
use fhir::Bundle;
use std::sync::Arc;

// ============================================================================
// Request stages
// ============================================================================

/// Marker: the bundle has been parsed and nothing else has happened.
#[derive(Debug)]
pub struct Received;

/// Marker: a record has been mapped from the bundle.
#[derive(Debug)]
pub struct Mapped {
    record: ReferralRecord,
}

/// Marker: the mapped record passed validation.
#[derive(Debug)]
pub struct Validated {
    record: ReferralRecord,
}

/// Marker: the record has been written to the store.
#[derive(Debug)]
pub struct Persisted {
    record: ReferralRecord,
}

/// Marker: the stored values have been written back into the bundle.
#[derive(Debug)]
pub struct Enriched {
    record: ReferralRecord,
}

/// One create request, in stage `S`.
#[derive(Debug)]
pub struct ReferralRequest<S> {
    bundle: Bundle,
    stage: S,
}

impl ReferralRequest<Received> {
    /// Parse a request body.
    ///
    /// # Errors
    ///
    /// [`ReferralError::InvalidJson`] for broken JSON, [`ReferralError::Deserialization`] for
    /// JSON that is not a referral bundle.
    pub fn receive(body: &str) -> ReferralResult<Self> {
        let bundle = Bundle::parse(body)?;
        Ok(Self {
            bundle,
            stage: Received,
        })
    }

    pub fn from_bundle(bundle: Bundle) -> Self {
        Self {
            bundle,
            stage: Received,
        }
    }

    pub fn map(self, now: DateTime<Utc>) -> ReferralRequest<Mapped> {
        let record = ReferralMapper::map_from_bundle_at(&self.bundle, now);
        ReferralRequest {
            bundle: self.bundle,
            stage: Mapped { record },
        }
    }
}

impl ReferralRequest<Mapped> {
    pub fn record(&self) -> &ReferralRecord {
        &self.stage.record
    }

    /// # Errors
    ///
    /// [`ReferralError::Validation`] carrying every failing field.
    pub fn validate(
        self,
        validator: &dyn RecordValidator,
    ) -> ReferralResult<ReferralRequest<Validated>> {
        let result = validator.validate(&self.stage.record);
        if !result.is_valid() {
            tracing::info!(
                record_id = %self.stage.record.id,
                errors = result.errors.len(),
                "referral failed validation"
            );
            return Err(ReferralError::Validation(result));
        }

        Ok(ReferralRequest {
            bundle: self.bundle,
            stage: Validated {
                record: self.stage.record,
            },
        })
    }
}

impl ReferralRequest<Validated> {
    /// # Errors
    ///
    /// [`ReferralError::Storage`] with the store's failure category.
    pub fn persist(
        self,
        repository: &dyn ReferralRepository,
    ) -> ReferralResult<ReferralRequest<Persisted>> {
        repository.create(&self.stage.record)?;

        Ok(ReferralRequest {
            bundle: self.bundle,
            stage: Persisted {
                record: self.stage.record,
            },
        })
    }
}

impl ReferralRequest<Persisted> {
    /// # Errors
    ///
    /// [`ReferralError::Enrichment`] if the bundle lacks a resource the enricher writes to.
    pub fn enrich(mut self) -> ReferralResult<ReferralRequest<Enriched>> {
        enrich(&mut self.bundle, &self.stage.record)?;

        Ok(ReferralRequest {
            bundle: self.bundle,
            stage: Enriched {
                record: self.stage.record,
            },
        })
    }
}

impl ReferralRequest<Enriched> {
    /// Finish the request, returning the stored record and the enriched bundle.
    pub fn complete(self) -> CreatedReferral {
        CreatedReferral {
            record: self.stage.record,
            bundle: self.bundle,
        }
    }
}

/// Outcome of a successful create.
#[derive(Clone, Debug)]
pub struct CreatedReferral {
    pub record: ReferralRecord,
    pub bundle: Bundle,
}

impl CreatedReferral {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct ReferralService {
    cfg: Arc<CoreConfig>,
    repository: Arc<dyn ReferralRepository>,
    validator: Arc<dyn RecordValidator>,
}

impl std::fmt::Debug for ReferralService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferralService")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl ReferralService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        repository: Arc<dyn ReferralRepository>,
        validator: Arc<dyn RecordValidator>,
    ) -> Self {
        Self {
            cfg,
            repository,
            validator,
        }
    }

    /// A service storing documents under the configured referral data directory.
    pub fn file_backed(cfg: Arc<CoreConfig>) -> Self {
        let repository = FileReferralRepository::new(cfg.referral_data_dir());
        Self::new(
            cfg,
            Arc::new(repository),
            Arc::new(ReferralRecordValidator),
        )
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Map, validate and store a referral bundle, returning the enriched bundle.
    ///
    /// # Errors
    ///
    /// Any stage's error, unchanged. Nothing is stored unless validation passed.
    pub fn create_referral(&self, body: &str) -> ReferralResult<CreatedReferral> {
        let request = ReferralRequest::receive(body)?;
        self.create_referral_from(request, Utc::now())
    }

    pub fn create_referral_from(
        &self,
        request: ReferralRequest<Received>,
        now: DateTime<Utc>,
    ) -> ReferralResult<CreatedReferral> {
        let created = request
            .map(now)
            .validate(self.validator.as_ref())?
            .persist(self.repository.as_ref())?
            .enrich()?
            .complete();

        tracing::info!(record_id = %created.id(), "created referral");
        Ok(created)
    }

    /// Load a stored referral and synthesize its bundle.
    ///
    /// Stored records are not re-validated.
    ///
    /// # Errors
    ///
    /// [`ReferralError::Storage`] if the document cannot be read,
    /// [`ReferralError::Translation`] if it holds an untranslatable priority or repeat period.
    pub fn get_referral(&self, id: &str) -> ReferralResult<Bundle> {
        let record = self.repository.get_by_id(id)?;
        let bundle = BundleCreator::create_bundle(&record, self.cfg.bundle_creation())?;

        tracing::info!(record_id = %record.id, "synthesized referral bundle");
        Ok(bundle)
    }

    pub fn get_record(&self, id: &str) -> ReferralResult<ReferralRecord> {
        Ok(self.repository.get_by_id(id)?)
    }

    pub fn list_records(&self) -> ReferralResult<Vec<ReferralRecord>> {
        Ok(self.repository.get_all()?)
    }

    /// Replace the stored document `id` with `record`. See [`replace_record`].
    pub fn replace_record(&self, id: &str, record: &ReferralRecord) -> ReferralResult<()> {
        replace_record(self.repository.as_ref(), id, record)
    }
}

/// Replace the stored document `id` with `record`.
///
/// # Errors
///
/// [`ReferralError::InvalidInput`] if `record.id` does not name the same document as `id`,
/// or if its `iD` or `caseno` is empty.
pub fn replace_record(
    repository: &dyn ReferralRepository,
    id: &str,
    record: &ReferralRecord,
) -> ReferralResult<()> {
    if record.id.trim().is_empty() {
        return Err(ReferralError::InvalidInput("iD cannot be empty".into()));
    }
    if record
        .case_number
        .as_deref()
        .map_or(true, |c| c.trim().is_empty())
    {
        return Err(ReferralError::InvalidInput("caseno cannot be empty".into()));
    }
    if !same_document_id(id, &record.id) {
        return Err(ReferralError::InvalidInput(format!(
            "document iD {} does not match {id}",
            record.id
        )));
    }

    repository.upsert(record)?;
    tracing::info!(record_id = %record.id, "replaced referral document");
    Ok(())
}

fn same_document_id(a: &str, b: &str) -> bool {
    match (uuid::Uuid::parse_str(a.trim()), uuid::Uuid::parse_str(b.trim())) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BundleCreationConfig;
    use crate::constants::{PAS_IDENTIFIER_SYSTEM, REFERRAL_ID_SYSTEM};
    use crate::error::StorageError;
    use crate::repositories::InMemoryReferralRepository;
    use fhir::search::{identifier_system, select_with_condition};
    use fhir::{Patient, ServiceRequest};
    use std::path::PathBuf;

    const EXAMPLE_BUNDLE: &str = include_str!("../../fhir/tests/data/example-bundle.json");

    fn service() -> (ReferralService, Arc<InMemoryReferralRepository>) {
        let bundle_creation = BundleCreationConfig::new(
            "https://ereferrals.example".into(),
            "/api/referrals".into(),
            "https://dental-ui.example".into(),
        )
        .expect("config");
        let cfg = Arc::new(CoreConfig::new(PathBuf::from("unused"), bundle_creation));
        let repository = Arc::new(InMemoryReferralRepository::new());
        let service = ReferralService::new(
            cfg,
            repository.clone(),
            Arc::new(ReferralRecordValidator),
        );
        (service, repository)
    }

    #[test]
    fn create_stores_record_and_enriches_bundle() {
        let (service, repository) = service();

        let created = service.create_referral(EXAMPLE_BUNDLE).expect("create");

        let stored = repository.get_by_id(created.id()).expect("stored");
        assert_eq!(stored, created.record);

        let patient = created.bundle.resource_by_type::<Patient>().expect("patient");
        let pas = select_with_condition(&patient.identifier, identifier_system, PAS_IDENTIFIER_SYSTEM)
            .and_then(|i| i.value.as_deref());
        assert_eq!(pas, stored.case_number.as_deref());

        let sr = created
            .bundle
            .resource_by_type::<ServiceRequest>()
            .expect("service request");
        let referral_id = select_with_condition(&sr.identifier, identifier_system, REFERRAL_ID_SYSTEM)
            .and_then(|i| i.value.as_deref());
        assert_eq!(referral_id, stored.referral_id.as_deref());
    }

    #[test]
    fn invalid_json_is_rejected_before_storage() {
        let (service, repository) = service();

        let err = service.create_referral("{ not json").expect_err("invalid");
        assert!(matches!(err, ReferralError::InvalidJson(_)), "got {err:?}");
        assert!(repository.get_all().expect("all").is_empty());
    }

    #[test]
    fn validation_failure_stores_nothing() {
        let (service, repository) = service();
        let empty = r#"{"resourceType":"Bundle","type":"message","entry":[]}"#;

        let err = service.create_referral(empty).expect_err("invalid");
        match err {
            ReferralError::Validation(result) => {
                assert!(result.errors_for("NhsNumber").next().is_some());
                assert!(result.errors_for("Id").next().is_none());
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(repository.get_all().expect("all").is_empty());
    }

    #[test]
    fn get_synthesizes_bundle_for_stored_record() {
        let (service, _) = service();
        let created = service.create_referral(EXAMPLE_BUNDLE).expect("create");

        let bundle = service.get_referral(created.id()).expect("get");
        assert_eq!(bundle.entry.len(), 13);

        let mapped = ReferralMapper::map_from_bundle(&bundle);
        assert_eq!(mapped.nhs_number, created.record.nhs_number);
        assert_eq!(mapped.priority, created.record.priority);
        assert_eq!(mapped.repeat_period, created.record.repeat_period);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let (service, _) = service();

        let err = service
            .get_referral("0f3f7a4e-33a4-4a49-9c52-3b1b3ad1c7b1")
            .expect_err("missing");
        assert!(
            matches!(err, ReferralError::Storage(StorageError::NotFound(_))),
            "got {err:?}"
        );
    }

    #[test]
    fn replace_requires_matching_id_and_case_number() {
        let (service, repository) = service();
        let created = service.create_referral(EXAMPLE_BUNDLE).expect("create");

        let mut record = created.record.clone();
        record.patient_postcode = Some("CF10 1AA".into());
        service
            .replace_record(&created.id().to_uppercase(), &record)
            .expect("replace");
        assert_eq!(
            repository.get_by_id(created.id()).expect("get").patient_postcode.as_deref(),
            Some("CF10 1AA")
        );

        let err = service
            .replace_record("0f3f7a4e-33a4-4a49-9c52-3b1b3ad1c7b1", &record)
            .expect_err("mismatch");
        assert!(matches!(err, ReferralError::InvalidInput(_)));

        record.case_number = Some(" ".into());
        let err = service
            .replace_record(created.id(), &record)
            .expect_err("blank caseno");
        assert!(err.to_string().contains("caseno"));
    }
}
