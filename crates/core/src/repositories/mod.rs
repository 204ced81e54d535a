//! Referral document stores.
//!
//! A store holds one [`ReferralRecord`] per document id. Callers depend on the
//! [`ReferralRepository`] trait; the file-backed store is used by the running service and the
//! operator CLI, the in-memory store by tests and ephemeral runs.

pub mod file;
pub mod memory;

pub use file::FileReferralRepository;
pub use memory::InMemoryReferralRepository;

use crate::error::{StorageError, StorageResult};
use crate::record::ReferralRecord;
use uuid::Uuid;

/// A key-addressed referral document store.
///
/// Implementations must be safe for concurrent single-document create and read.
pub trait ReferralRepository: Send + Sync {
    /// Store a new document keyed by `record.id`.
    ///
    /// # Errors
    ///
    /// [`StorageError::Conflict`] if a document with that id already exists.
    fn create(&self, record: &ReferralRecord) -> StorageResult<()>;

    /// # Errors
    ///
    /// [`StorageError::NotFound`] if no document has this id.
    fn get_by_id(&self, id: &str) -> StorageResult<ReferralRecord>;

    /// Store `record`, replacing any document with the same id.
    fn upsert(&self, record: &ReferralRecord) -> StorageResult<()>;

    /// Every stored document. Order is unspecified.
    fn get_all(&self) -> StorageResult<Vec<ReferralRecord>>;
}

/// Document ids are GUIDs; any spelling `uuid` accepts addresses the same document.
pub(crate) fn document_key(id: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| StorageError::InvalidId(id.to_string()))
}
