//! Journal, snapshot and metadata files backing a persistent store

use super::{Change, RecordStore};
use crate::core::{DbError, Record, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Journal Entry Types
// ============================================================================

/// One committed save: the whole staged batch, written as a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub committed_at: DateTime<Utc>,
    pub changes: Vec<Change>,
}

impl JournalEntry {
    pub fn new(changes: Vec<Change>) -> Self {
        Self {
            committed_at: Utc::now(),
            changes,
        }
    }
}

// ============================================================================
// Store Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub entities: BTreeMap<String, Vec<Record>>,
    pub created_at: DateTime<Utc>,
    pub record_count: usize,
}

impl StoreSnapshot {
    pub fn new(store: &RecordStore) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            entities: store.to_snapshot(),
            created_at: Utc::now(),
            record_count: store.record_count(),
        }
    }
}

/// Human-readable identity of a store, kept next to its data files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub store_id: Uuid,
    pub model_version: u32,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Durability Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Every journal frame is fsynced before the save returns.
    Sync,
    /// Frames are flushed to the OS but not fsynced.
    #[default]
    Async,
}

// ============================================================================
// Journal Manager
// ============================================================================

pub struct JournalManager {
    path: PathBuf,
    file: BufWriter<File>,
    durability_mode: DurabilityMode,
    entries_since_checkpoint: usize,
}

impl JournalManager {
    pub fn open<P: AsRef<Path>>(path: P, durability_mode: DurabilityMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DbError::IoError(format!("Failed to open journal {}: {}", path.display(), e)))?;

        Ok(Self {
            path,
            file: BufWriter::new(file),
            durability_mode,
            entries_since_checkpoint: 0,
        })
    }

    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        let serialized = rmp_serde::to_vec(entry)?;
        let len = u32::try_from(serialized.len())
            .map_err(|_| DbError::SaveError("Journal frame exceeds 4 GiB".to_string()))?;

        self.file.write_all(&len.to_le_bytes())?;
        self.file.write_all(&serialized)?;
        self.file.flush()?;
        if self.durability_mode == DurabilityMode::Sync {
            self.file.get_mut().sync_all()?;
        }
        self.entries_since_checkpoint += 1;
        Ok(())
    }

    /// Reads every complete frame. A torn frame at the tail (a save that
    /// never finished) ends the journal.
    pub fn read_all(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.scan()?.0)
    }

    /// Complete frames plus the byte length they occupy; anything past that
    /// length is a torn tail.
    fn scan(&self) -> Result<(Vec<JournalEntry>, u64)> {
        if !self.path.exists() {
            return Ok((Vec::new(), 0));
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        let mut valid_len: u64 = 0;
        loop {
            let mut len_bytes = [0u8; 4];
            match reader.read_exact(&mut len_bytes) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            let len = u32::from_le_bytes(len_bytes) as usize;
            let mut data = vec![0u8; len];
            match reader.read_exact(&mut data) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::warn!(
                        journal = %self.path.display(),
                        frames = entries.len(),
                        "discarding torn journal frame"
                    );
                    break;
                }
                Err(e) => return Err(e.into()),
            }
            entries.push(rmp_serde::from_slice(&data)?);
            valid_len += 4 + len as u64;
        }
        Ok((entries, valid_len))
    }

    /// Cuts the file back to `len` bytes so later frames follow the last
    /// complete one.
    fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file.flush()?;
        OpenOptions::new().write(true).open(&self.path)?.set_len(len)?;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.file = BufWriter::new(file);
        Ok(())
    }

    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        let file = OpenOptions::new().write(true).truncate(true).open(&self.path)?;
        drop(file);
        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.file = BufWriter::new(file);
        self.entries_since_checkpoint = 0;
        Ok(())
    }

    pub fn entries_since_checkpoint(&self) -> usize {
        self.entries_since_checkpoint
    }

    pub(crate) fn set_entries_since_checkpoint(&mut self, entries: usize) {
        self.entries_since_checkpoint = entries;
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let serialized = rmp_serde::to_vec(snapshot)?;
        atomic_write(&self.snapshot_path, &serialized)
    }

    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let mut data = Vec::new();
        File::open(&self.snapshot_path)?.read_to_end(&mut data)?;
        let snapshot: StoreSnapshot = rmp_serde::from_slice(&data)?;
        if snapshot.version != SNAPSHOT_FORMAT_VERSION {
            return Err(DbError::SerializationError(format!(
                "Unsupported snapshot format version {}",
                snapshot.version
            )));
        }
        Ok(Some(snapshot))
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.exists()
    }
}

/// Writes `bytes` to a temp file in the target directory, fsyncs it and
/// renames it over `path`.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path)
        .map_err(|e| DbError::IoError(format!("Failed to replace {}: {}", path.display(), e.error)))?;
    Ok(())
}

// ============================================================================
// Persistence Manager
// ============================================================================

pub struct PersistenceManager {
    journal: JournalManager,
    snapshot: SnapshotManager,
    metadata: StoreMetadata,
    checkpoint_threshold: usize,
}

impl PersistenceManager {
    /// Opens (or creates) the files of store `store_name` under `data_dir`.
    /// A store written by a different model version is refused.
    pub fn open<P: AsRef<Path>>(
        data_dir: P,
        store_name: &str,
        model_version: u32,
        durability_mode: DurabilityMode,
        checkpoint_threshold: usize,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|e| {
            DbError::IoError(format!("Failed to create store directory {}: {}", data_dir.display(), e))
        })?;

        let metadata = Self::load_or_create_metadata(&data_dir.join(format!("{}.meta.json", store_name)), model_version)?;
        let journal = JournalManager::open(data_dir.join(format!("{}.journal", store_name)), durability_mode)?;
        let snapshot = SnapshotManager::new(data_dir.join(format!("{}.snapshot", store_name)));

        Ok(Self {
            journal,
            snapshot,
            metadata,
            checkpoint_threshold: checkpoint_threshold.max(1),
        })
    }

    fn load_or_create_metadata(path: &Path, model_version: u32) -> Result<StoreMetadata> {
        if path.exists() {
            let metadata: StoreMetadata = serde_json::from_slice(&fs::read(path)?)?;
            if metadata.model_version != model_version {
                return Err(DbError::SerializationError(format!(
                    "Store was written by model version {}, expected {}",
                    metadata.model_version, model_version
                )));
            }
            return Ok(metadata);
        }

        let metadata = StoreMetadata {
            store_id: Uuid::new_v4(),
            model_version,
            created_at: Utc::now(),
        };
        atomic_write(path, &serde_json::to_vec_pretty(&metadata)?)?;
        Ok(metadata)
    }

    /// Rebuilds the committed state: snapshot first, then every journal frame.
    pub fn recover(&mut self) -> Result<RecordStore> {
        let mut store = match self.snapshot.load()? {
            Some(snapshot) => RecordStore::from_snapshot(snapshot.entities),
            None => RecordStore::new(),
        };

        let (entries, valid_len) = self.journal.scan()?;
        if fs::metadata(&self.journal.path)?.len() > valid_len {
            self.journal.truncate_to(valid_len)?;
        }
        for entry in &entries {
            store.validate(&entry.changes)?;
            for change in &entry.changes {
                store.apply(change)?;
            }
        }
        self.journal.set_entries_since_checkpoint(entries.len());
        Ok(store)
    }

    pub fn log(&mut self, entry: &JournalEntry) -> Result<()> {
        self.journal.append(entry)
    }

    pub fn needs_checkpoint(&self) -> bool {
        self.journal.entries_since_checkpoint() >= self.checkpoint_threshold
    }

    pub fn checkpoint(&mut self, store: &RecordStore) -> Result<()> {
        self.snapshot.save(&StoreSnapshot::new(store))?;
        self.journal.truncate()
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }

    pub fn journal(&self) -> &JournalManager {
        &self.journal
    }

    pub fn snapshot(&self) -> &SnapshotManager {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectId;
    use crate::model::{Entity, Person};
    use tempfile::TempDir;

    fn insert_person(name: &str) -> Change {
        Change::Insert {
            record: Person::new(name).to_record(ObjectId::new()),
        }
    }

    #[test]
    fn test_journal_append_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut journal =
            JournalManager::open(temp_dir.path().join("test.journal"), DurabilityMode::Sync).unwrap();
        journal.append(&JournalEntry::new(vec![insert_person("Ann")])).unwrap();
        journal
            .append(&JournalEntry::new(vec![insert_person("Bob"), insert_person("Cid")]))
            .unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].changes.len(), 2);
    }

    #[test]
    fn test_torn_tail_frame_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.journal");
        let mut journal = JournalManager::open(&path, DurabilityMode::Sync).unwrap();
        journal.append(&JournalEntry::new(vec![insert_person("Ann")])).unwrap();

        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(&64u32.to_le_bytes()).unwrap();
        raw.write_all(&[0x90, 0x91]).unwrap();

        assert_eq!(journal.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_recover_cuts_torn_tail_before_next_frame() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("People.journal");
        {
            let mut persistence =
                PersistenceManager::open(temp_dir.path(), "People", 1, DurabilityMode::Sync, 10).unwrap();
            persistence.log(&JournalEntry::new(vec![insert_person("Ann")])).unwrap();
        }
        let clean_len = fs::metadata(&path).unwrap().len();

        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(&64u32.to_le_bytes()).unwrap();
        raw.write_all(&[0x90, 0x91]).unwrap();
        drop(raw);

        let mut persistence =
            PersistenceManager::open(temp_dir.path(), "People", 1, DurabilityMode::Sync, 10).unwrap();
        assert_eq!(persistence.recover().unwrap().record_count(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);

        persistence.log(&JournalEntry::new(vec![insert_person("Bob")])).unwrap();
        assert_eq!(persistence.recover().unwrap().record_count(), 2);
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::new(temp_dir.path().join("test.snapshot"));
        let mut store = RecordStore::new();
        store.apply(&insert_person("Ann")).unwrap();

        manager.save(&StoreSnapshot::new(&store)).unwrap();
        assert!(manager.exists());

        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded.record_count, 1);
        assert_eq!(loaded.entities["Person"].len(), 1);
    }

    #[test]
    fn test_checkpoint_clears_journal() {
        let temp_dir = TempDir::new().unwrap();
        let mut persistence =
            PersistenceManager::open(temp_dir.path(), "People", 1, DurabilityMode::Sync, 2).unwrap();
        let mut store = persistence.recover().unwrap();

        for name in ["Ann", "Bob"] {
            let change = insert_person(name);
            persistence.log(&JournalEntry::new(vec![change.clone()])).unwrap();
            store.apply(&change).unwrap();
        }
        assert!(persistence.needs_checkpoint());

        persistence.checkpoint(&store).unwrap();
        assert_eq!(persistence.journal().entries_since_checkpoint(), 0);
        assert!(persistence.journal().read_all().unwrap().is_empty());

        let recovered = persistence.recover().unwrap();
        assert_eq!(recovered.record_count(), 2);
    }

    #[test]
    fn test_model_version_mismatch_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        PersistenceManager::open(temp_dir.path(), "Dogs", 1, DurabilityMode::Async, 10).unwrap();

        let reopened = PersistenceManager::open(temp_dir.path(), "Dogs", 1, DurabilityMode::Async, 10).unwrap();
        assert_eq!(reopened.metadata().model_version, 1);

        let result = PersistenceManager::open(temp_dir.path(), "Dogs", 2, DurabilityMode::Async, 10);
        assert!(result.is_err());
    }
}
