//! File-backed referral store.
//!
//! ## Storage Layout
//!
//! Each referral is one JSON document in a sharded directory structure:
//!
//! ```text
//! referral_data/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         referral.json
//! ```
//!
//! where `<uuid>` is the document id as 32 lowercase hex characters and `s1`/`s2` are its
//! first four characters. Sharding keeps any single directory small.

use super::{document_key, ReferralRepository};
use crate::constants::REFERRAL_JSON_FILENAME;
use crate::error::{StorageError, StorageResult};
use crate::record::ReferralRecord;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct FileReferralRepository {
    root: PathBuf,
}

impl FileReferralRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `root/<s1>/<s2>/<uuid>/`
    fn sharded_dir(&self, key: &Uuid) -> PathBuf {
        let canonical = key.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        self.root.join(s1).join(s2).join(&canonical)
    }

    fn document_path(&self, key: &Uuid) -> PathBuf {
        self.sharded_dir(key).join(REFERRAL_JSON_FILENAME)
    }

    fn read_document(path: &Path) -> StorageResult<ReferralRecord> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write `contents` to a uniquely named file beside the document and flush it to disk.
    ///
    /// Readers only ever see a document once it is complete. The staging file is removed if
    /// any step fails.
    fn stage(dir: &Path, contents: &[u8]) -> StorageResult<PathBuf> {
        let path = dir.join(format!(
            "{REFERRAL_JSON_FILENAME}.{}.tmp",
            Uuid::new_v4().simple()
        ));

        let written = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut file| {
                file.write_all(contents)?;
                file.sync_all()
            });

        match written {
            Ok(()) => Ok(path),
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e.into())
            }
        }
    }

    fn subdirs(path: &Path) -> impl Iterator<Item = PathBuf> {
        fs::read_dir(path)
            .into_iter()
            .flat_map(|entries| entries.flatten())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
    }
}

impl ReferralRepository for FileReferralRepository {
    fn create(&self, record: &ReferralRecord) -> StorageResult<()> {
        let key = document_key(&record.id)?;
        let dir = self.sharded_dir(&key);
        fs::create_dir_all(&dir)?;

        let staged = Self::stage(&dir, &serde_json::to_vec_pretty(record)?)?;
        // Linking never replaces an existing document.
        let linked = fs::hard_link(&staged, dir.join(REFERRAL_JSON_FILENAME));
        let _ = fs::remove_file(&staged);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Conflict(record.id.clone()))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(id = %record.id, path = %dir.display(), "created referral document");
        Ok(())
    }

    fn get_by_id(&self, id: &str) -> StorageResult<ReferralRecord> {
        let key = document_key(id)?;
        let path = self.document_path(&key);

        match Self::read_document(&path) {
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.to_string()))
            }
            other => other,
        }
    }

    fn upsert(&self, record: &ReferralRecord) -> StorageResult<()> {
        let key = document_key(&record.id)?;
        let dir = self.sharded_dir(&key);
        fs::create_dir_all(&dir)?;

        let staged = Self::stage(&dir, &serde_json::to_vec_pretty(record)?)?;
        if let Err(e) = fs::rename(&staged, dir.join(REFERRAL_JSON_FILENAME)) {
            let _ = fs::remove_file(&staged);
            return Err(e.into());
        }

        tracing::info!(id = %record.id, "upserted referral document");
        Ok(())
    }

    fn get_all(&self) -> StorageResult<Vec<ReferralRecord>> {
        let mut records = Vec::new();

        for s1 in Self::subdirs(&self.root) {
            for s2 in Self::subdirs(&s1) {
                for id_dir in Self::subdirs(&s2) {
                    let path = id_dir.join(REFERRAL_JSON_FILENAME);
                    if !path.is_file() {
                        continue;
                    }

                    match Self::read_document(&path) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            tracing::warn!("failed to read referral document {}: {}", path.display(), e)
                        }
                    }
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ID: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn record(id: &str) -> ReferralRecord {
        ReferralRecord {
            id: id.into(),
            case_number: Some("5b0ad6c1-30a2-4e3c-9a8d-6f7c7f0a8e21".into()),
            nhs_number: Some("9449305552".into()),
            ..Default::default()
        }
    }

    #[test]
    fn stores_document_under_sharded_path() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        repo.create(&record(ID)).expect("create");

        let expected = temp
            .path()
            .join("55")
            .join("0e")
            .join("550e8400e29b41d4a716446655440000")
            .join("referral.json");
        assert!(expected.is_file());

        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(expected).expect("read")).expect("json");
        assert_eq!(stored["iD"], ID);
        assert_eq!(stored["nhs"], "9449305552");
    }

    #[test]
    fn reads_back_what_was_created() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        repo.create(&record(ID)).expect("create");
        assert_eq!(repo.get_by_id(ID).expect("get"), record(ID));
        assert_eq!(repo.get_by_id(&ID.to_uppercase()).expect("get"), record(ID));
    }

    #[test]
    fn create_twice_is_a_conflict() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        repo.create(&record(ID)).expect("create");
        let err = repo.create(&record(ID)).expect_err("duplicate");
        assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn document_dir(root: &Path) -> PathBuf {
        root.join("55").join("0e").join("550e8400e29b41d4a716446655440000")
    }

    #[test]
    fn rejected_create_leaves_original_document_and_no_staging_files() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        repo.create(&record(ID)).expect("create");
        let mut other = record(ID);
        other.nhs_number = Some("1234567890".into());
        repo.create(&other).expect_err("duplicate");

        assert_eq!(files_in(&document_dir(temp.path())), ["referral.json"]);
        assert_eq!(repo.get_by_id(ID).expect("get"), record(ID));
    }

    #[test]
    fn failed_create_leaves_id_usable() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        // A directory where the document belongs makes the final link fail.
        let blocked = document_dir(temp.path()).join("referral.json");
        fs::create_dir_all(blocked.join("occupied")).expect("mkdir");
        repo.create(&record(ID)).expect_err("blocked");
        assert_eq!(files_in(&document_dir(temp.path())), ["referral.json"]);
        assert!(blocked.is_dir());

        fs::remove_dir_all(&blocked).expect("unblock");
        let err = repo.get_by_id(ID).expect_err("nothing stored");
        assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");

        repo.create(&record(ID)).expect("retry");
        assert_eq!(repo.get_by_id(ID).expect("get"), record(ID));
    }

    #[test]
    fn concurrent_creates_store_exactly_one_document() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        let results: Vec<StorageResult<()>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| repo.create(&record(ID))))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread"))
                .collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StorageError::Conflict(_))));
        assert_eq!(files_in(&document_dir(temp.path())), ["referral.json"]);
        assert_eq!(repo.get_by_id(ID).expect("get"), record(ID));
    }

    #[test]
    fn concurrent_upserts_leave_one_complete_document() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        let versions: Vec<ReferralRecord> = (0..8)
            .map(|n| {
                let mut version = record(ID);
                version.nhs_number = Some(format!("944930555{n}"));
                version
            })
            .collect();

        std::thread::scope(|scope| {
            for version in &versions {
                let repo = &repo;
                scope.spawn(move || repo.upsert(version).expect("upsert"));
            }
        });

        assert_eq!(files_in(&document_dir(temp.path())), ["referral.json"]);
        let stored = repo.get_by_id(ID).expect("get");
        assert!(versions.contains(&stored), "got {stored:?}");
    }

    #[test]
    fn missing_document_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        let err = repo.get_by_id(ID).expect_err("missing");
        assert!(matches!(err, StorageError::NotFound(_)), "got {err:?}");

        let err = repo.get_by_id("not-a-guid").expect_err("bad id");
        assert!(matches!(err, StorageError::InvalidId(_)), "got {err:?}");
    }

    #[test]
    fn upsert_replaces_document() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        repo.upsert(&record(ID)).expect("insert");
        let mut updated = record(ID);
        updated.nhs_number = Some("1234567890".into());
        repo.upsert(&updated).expect("update");

        assert_eq!(repo.get_by_id(ID).expect("get"), updated);
        assert_eq!(repo.get_all().expect("all").len(), 1);
    }

    #[test]
    fn get_all_skips_corrupt_documents() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path());

        repo.create(&record(ID)).expect("create");
        repo.create(&record("0f3f7a4e-33a4-4a49-9c52-3b1b3ad1c7b1"))
            .expect("create");

        let corrupt = temp.path().join("ab").join("cd").join("abcd0000000000000000000000000000");
        fs::create_dir_all(&corrupt).expect("mkdir");
        fs::write(corrupt.join("referral.json"), "{ not json").expect("write");

        let mut ids: Vec<_> = repo.get_all().expect("all").into_iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, ["0f3f7a4e-33a4-4a49-9c52-3b1b3ad1c7b1", ID]);
    }

    #[test]
    fn get_all_on_missing_root_is_empty() {
        let temp = TempDir::new().expect("tempdir");
        let repo = FileReferralRepository::new(temp.path().join("nothing-here"));
        assert!(repo.get_all().expect("all").is_empty());
    }
}
