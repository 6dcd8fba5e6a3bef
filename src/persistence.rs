// src/persistence.rs
//
// Document-store boundary for finished person records.
//
// The engine never writes while it is aggregating: summaries are built
// first, then handed to a PersonStore. Each record gets a short person id
// that is checked against the store before use, so ephemeral tracker ids
// never leak into stored data.

use crate::types::TrackId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Length of generated person ids (uppercase alphanumerics).
pub const PERSON_ID_LEN: usize = 4;

const PERSON_ID_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Person store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize person record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Person id '{0}' is already stored")]
    DuplicateId(String),

    #[error("No unique person id found after {attempts} attempts")]
    IdSpaceExhausted { attempts: u32 },
}

/// One persisted document per surviving person per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person_id: String,
    pub track_id: TrackId,
    /// Seconds inside each configured zone
    pub zone_times: BTreeMap<String, f64>,
    /// Seconds classified as moving
    pub movement_seconds: f64,
    /// Seconds classified as sitting
    pub sitting_seconds: f64,
    pub created_at: DateTime<Utc>,
}

pub trait PersonStore {
    fn contains_person_id(&self, person_id: &str) -> Result<bool, StoreError>;

    fn insert(&mut self, record: &PersonRecord) -> Result<(), StoreError>;
}

// ============================================================================
// ID ALLOCATION
// ============================================================================

pub trait IdGenerator {
    fn next_candidate(&mut self) -> String;
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn next_candidate(&mut self) -> String {
        self()
    }
}

/// Random 4-character ids over A-Z0-9, drawn from the bytes of a v4 uuid.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_candidate(&mut self) -> String {
        person_id_from_bytes(uuid::Uuid::new_v4().as_bytes())
    }
}

fn person_id_from_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(PERSON_ID_LEN)
        .map(|b| PERSON_ID_ALPHABET[*b as usize % PERSON_ID_ALPHABET.len()] as char)
        .collect()
}

/// Draw candidates until one is not present in `store`. Bounded so a full
/// id space or a stuck generator surfaces as an error instead of a hang.
pub fn allocate_unique_person_id<S, G>(
    store: &S,
    generator: &mut G,
    max_attempts: u32,
) -> Result<String, StoreError>
where
    S: PersonStore + ?Sized,
    G: IdGenerator + ?Sized,
{
    for attempt in 1..=max_attempts {
        let candidate = generator.next_candidate();
        if !store.contains_person_id(&candidate)? {
            return Ok(candidate);
        }
        warn!(
            "⚠️  person_id '{}' already exists (attempt {}/{}), generating a new one",
            candidate, attempt, max_attempts
        );
    }
    Err(StoreError::IdSpaceExhausted {
        attempts: max_attempts,
    })
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryPersonStore {
    records: Vec<PersonRecord>,
    ids: HashSet<String>,
}

impl MemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: Vec::new(),
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn records(&self) -> &[PersonRecord] {
        &self.records
    }
}

impl PersonStore for MemoryPersonStore {
    fn contains_person_id(&self, person_id: &str) -> Result<bool, StoreError> {
        Ok(self.ids.contains(person_id))
    }

    fn insert(&mut self, record: &PersonRecord) -> Result<(), StoreError> {
        if !self.ids.insert(record.person_id.clone()) {
            return Err(StoreError::DuplicateId(record.person_id.clone()));
        }
        self.records.push(record.clone());
        Ok(())
    }
}

// ============================================================================
// JSON-LINES DOCUMENT STORE
// ============================================================================

/// Append-only JSON-lines collection. Existing person ids are indexed when
/// the file is opened so collisions are detected across sessions.
pub struct JsonlPersonStore {
    path: PathBuf,
    file: File,
    ids: HashSet<String>,
}

#[derive(Deserialize)]
struct StoredId {
    person_id: String,
}

impl JsonlPersonStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut ids = HashSet::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<StoredId>(&line) {
                    Ok(doc) => {
                        ids.insert(doc.person_id);
                    }
                    Err(e) => warn!(
                        "Skipping unreadable record at {}:{}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    ),
                }
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(
            "💾 Person store {} opened ({} existing id(s))",
            path.display(),
            ids.len()
        );
        Ok(Self { path, file, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl PersonStore for JsonlPersonStore {
    fn contains_person_id(&self, person_id: &str) -> Result<bool, StoreError> {
        Ok(self.ids.contains(person_id))
    }

    fn insert(&mut self, record: &PersonRecord) -> Result<(), StoreError> {
        if self.ids.contains(&record.person_id) {
            return Err(StoreError::DuplicateId(record.person_id.clone()));
        }
        let json_line = serde_json::to_string(record)?;
        writeln!(self.file, "{}", json_line)?;
        self.file.flush()?;
        self.ids.insert(record.person_id.clone());
        debug!("💾 Stored person {} (track T{})", record.person_id, record.track_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(person_id: &str) -> PersonRecord {
        PersonRecord {
            person_id: person_id.to_string(),
            track_id: 1,
            zone_times: BTreeMap::from([("desk1".to_string(), 12.0)]),
            movement_seconds: 3.0,
            sitting_seconds: 9.0,
            created_at: Utc::now(),
        }
    }

    fn scripted(ids: &[&str]) -> impl FnMut() -> String {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        let mut i = 0;
        move || {
            let id = ids[i % ids.len()].clone();
            i += 1;
            id
        }
    }

    #[test]
    fn test_uuid_generator_format() {
        let mut gen = UuidIdGenerator;
        for _ in 0..20 {
            let id = gen.next_candidate();
            assert_eq!(id.len(), PERSON_ID_LEN);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_id_bytes_cover_full_alphabet() {
        assert_eq!(person_id_from_bytes(&[0, 25, 26, 35]), "AZ09");
        assert_eq!(person_id_from_bytes(&[16, 36, 71, 255, 9]), "QA9D");
    }

    #[test]
    fn test_allocation_skips_existing_ids() {
        let store = MemoryPersonStore::with_existing_ids(["AAAA", "BBBB"]);
        let mut gen = scripted(&["AAAA", "BBBB", "AAAA", "CCCC"]);
        let id = allocate_unique_person_id(&store, &mut gen, 10).unwrap();
        assert_eq!(id, "CCCC");
    }

    #[test]
    fn test_allocation_is_bounded() {
        let store = MemoryPersonStore::with_existing_ids(["AAAA"]);
        let mut gen = scripted(&["AAAA"]);
        let err = allocate_unique_person_id(&store, &mut gen, 5).unwrap_err();
        assert!(matches!(err, StoreError::IdSpaceExhausted { attempts: 5 }));
    }

    #[test]
    fn test_memory_store_rejects_duplicates() {
        let mut store = MemoryPersonStore::new();
        store.insert(&record("AB12")).unwrap();
        assert!(store.contains_person_id("AB12").unwrap());
        assert!(matches!(
            store.insert(&record("AB12")),
            Err(StoreError::DuplicateId(_))
        ));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_jsonl_store_indexes_existing_ids_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("person_logs.jsonl");
        {
            let mut store = JsonlPersonStore::open(&path).unwrap();
            store.insert(&record("ZZ01")).unwrap();
            store.insert(&record("ZZ02")).unwrap();
        }
        // Garbage lines are skipped, not fatal
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(f, "not json").unwrap();
        }
        let store = JsonlPersonStore::open(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.contains_person_id("ZZ01").unwrap());
        assert!(!store.contains_person_id("ZZ03").unwrap());

        let mut gen = scripted(&["ZZ01", "ZZ02", "ZZ03"]);
        assert_eq!(allocate_unique_person_id(&store, &mut gen, 3).unwrap(), "ZZ03");
    }

    #[test]
    fn test_jsonl_records_round_trip_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person_logs.jsonl");
        let mut store = JsonlPersonStore::open(&path).unwrap();
        let rec = record("Q7Q7");
        store.insert(&rec).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: PersonRecord = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed, rec);
    }
}
