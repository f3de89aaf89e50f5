//! Content-addressed duplicate detection.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extract::normalize_iban;
use crate::record::{ExtractedRecord, RecordKind};

const REMARK_KEY_CHARS: usize = 50;
const FIELD_SEPARATOR: char = '\u{1f}';

/// Hex SHA-256 of a record's canonical fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the key over (identifier, amount, date, remark prefix).
///
/// The key says nothing about the record kind. A transfer advice and the
/// statement row booking it share a key, so [`DedupPool`] keeps one key space
/// per kind.
pub fn dedup_key(record: &ExtractedRecord) -> DedupKey {
    let tuple = canonical_tuple(record);
    let mut hasher = Sha256::new();
    hasher.update(tuple.join(&FIELD_SEPARATOR.to_string()).as_bytes());
    DedupKey(hex::encode(hasher.finalize()))
}

fn canonical_tuple(record: &ExtractedRecord) -> [String; 4] {
    let identifier = record
        .counterpart_iban
        .as_deref()
        .and_then(normalize_iban)
        .or_else(|| record.counterpart_name.as_deref().map(normalize_text))
        .unwrap_or_default();

    let amount = record.amount.map(|a| a.to_string()).unwrap_or_default();
    let date = record
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let remark: String = normalize_text(&record.remark)
        .chars()
        .take(REMARK_KEY_CHARS)
        .collect();

    [identifier, amount, date, remark]
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keys seen so far in one batch, per record kind: everything persisted
/// before the batch started, plus every key accepted during it.
#[derive(Debug, Default)]
pub struct DedupPool {
    seen: HashMap<RecordKind, HashSet<DedupKey>>,
}

impl DedupPool {
    pub fn from_keys<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = (RecordKind, DedupKey)>,
    {
        let mut pool = Self::default();
        for (kind, key) in keys {
            pool.check_and_insert(kind, key);
        }
        pool
    }

    pub fn is_duplicate(&self, kind: RecordKind, key: &DedupKey) -> bool {
        self.seen.get(&kind).is_some_and(|keys| keys.contains(key))
    }

    /// Returns `true` when the key was new for this kind and has now been
    /// recorded.
    pub fn check_and_insert(&mut self, kind: RecordKind, key: DedupKey) -> bool {
        self.seen.entry(kind).or_default().insert(key)
    }

    /// Drops a key whose record could not be persisted after all.
    pub fn forget(&mut self, kind: RecordKind, key: &DedupKey) -> bool {
        self.seen
            .get_mut(&kind)
            .is_some_and(|keys| keys.remove(key))
    }

    pub fn len(&self) -> usize {
        self.seen.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
