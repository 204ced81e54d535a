//! In-memory referral store.

use super::{document_key, ReferralRepository};
use crate::error::{StorageError, StorageResult};
use crate::record::ReferralRecord;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryReferralRepository {
    documents: RwLock<BTreeMap<Uuid, ReferralRecord>>,
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("referral store lock poisoned".into())
}

impl InMemoryReferralRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReferralRepository for InMemoryReferralRepository {
    fn create(&self, record: &ReferralRecord) -> StorageResult<()> {
        let key = document_key(&record.id)?;
        let mut documents = self.documents.write().map_err(poisoned)?;

        match documents.entry(key) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    fn get_by_id(&self, id: &str) -> StorageResult<ReferralRecord> {
        let key = document_key(id)?;
        let documents = self.documents.read().map_err(poisoned)?;

        documents
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn upsert(&self, record: &ReferralRecord) -> StorageResult<()> {
        let key = document_key(&record.id)?;
        self.documents
            .write()
            .map_err(poisoned)?
            .insert(key, record.clone());
        Ok(())
    }

    fn get_all(&self) -> StorageResult<Vec<ReferralRecord>> {
        let documents = self.documents.read().map_err(poisoned)?;
        Ok(documents.values().cloned().collect())
    }
}
