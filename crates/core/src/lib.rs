//! # Referrals Core
//!
//! Core business logic for the PAS referrals service.
//!
//! This crate turns referral bundles into flat referral records and back:
//! - Mapping a referral bundle to a [`ReferralRecord`] ([`mapper`])
//! - Validating records before they are stored ([`validation`])
//! - Storing records as sharded JSON documents ([`repositories`])
//! - Writing stored values back into the submitted bundle ([`enrich`])
//! - Synthesizing a complete bundle from a stored record ([`bundle_creator`])
//!
//! **No API concerns**: HTTP servers, problem bodies and OpenAPI documents belong in
//! `api-rest` and `api-shared`.

pub mod bundle_creator;
pub mod codes;
pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod mapper;
pub mod record;
pub mod repositories;
pub mod service;
pub mod validation;

pub use bundle_creator::BundleCreator;
pub use config::{BundleCreationConfig, CoreConfig};
pub use error::{ReferralError, ReferralResult, StorageError, StorageResult};
pub use mapper::ReferralMapper;
pub use record::ReferralRecord;
pub use repositories::{FileReferralRepository, InMemoryReferralRepository, ReferralRepository};
pub use service::{CreatedReferral, ReferralService};
pub use validation::{
    RecordValidator, ReferralRecordValidator, ValidationError, ValidationResult,
};
