//! The shared phrase dictionary (C2): a content-addressed set of phrases with occurrence
//! counts, safe for concurrent insertion from worker threads (SPEC_FULL.md §5, §10.4).

use std::hash::Hasher;

use ahash::AHasher;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("64-bit strong-hash collision between two distinct phrases (id {id}): {a:?} vs {b:?}")]
    HashCollision { id: u64, a: Vec<u8>, b: Vec<u8> },
    #[error("check_and_add called after sort_and_finalize()")]
    AlreadyFinalized,
    #[error("sort_and_finalize() called more than once")]
    AlreadyFinalizedTwice,
}

/// Deterministic 64-bit content hash. Uses fixed keys (not `ahash`'s default per-process
/// random seed) so a phrase's strong-hash id, and therefore the dictionary's tie-breaking
/// behavior before sorting, is stable across runs and across machines.
#[must_use]
pub fn strong_hash(bytes: &[u8]) -> u64 {
    let mut hasher = AHasher::new_with_keys(0x243F_6A88_85A3_08D3, 0x1319_8A2E_0370_7344);
    hasher.write(bytes);
    hasher.finish()
}

struct Entry {
    bytes: Vec<u8>,
    count: u64,
}

struct Inner {
    by_id: ahash::AHashMap<u64, Entry>,
    finalized: bool,
}

pub struct PhraseDictionary {
    inner: Mutex<Inner>,
}

/// The frozen, rank-ordered view produced by [`PhraseDictionary::sort_and_finalize`].
pub struct FinalizedDictionary {
    /// Phrases in ascending lexicographic order; `phrases[i]` has rank id `i + 1`.
    pub phrases: Vec<Vec<u8>>,
    pub counts: Vec<u64>,
    id_to_rank: ahash::AHashMap<u64, u32>,
}

impl FinalizedDictionary {
    /// Rebuilds a finalized view directly from an already rank-ordered phrase/count pair, as
    /// loaded back from a `.dict`/`.parse` file pair by the standalone AuPair command.
    /// `rank_of` is unusable on the result (there are no strong-hash ids to translate from);
    /// callers that reload from disk already have rank ids directly.
    #[must_use]
    pub fn from_parts(phrases: Vec<Vec<u8>>, counts: Vec<u64>) -> Self {
        Self { phrases, counts, id_to_rank: ahash::AHashMap::default() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Translates a worker-local strong-hash id into its dense 1-based rank id.
    #[must_use]
    pub fn rank_of(&self, strong_hash_id: u64) -> Option<u32> {
        self.id_to_rank.get(&strong_hash_id).copied()
    }

    #[must_use]
    pub fn phrase(&self, rank: u32) -> Option<&[u8]> {
        self.phrases.get((rank as usize).checked_sub(1)?).map(Vec::as_slice)
    }
}

impl Default for PhraseDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { by_id: ahash::AHashMap::default(), finalized: false }) }
    }

    /// Inserts `phrase` if absent, otherwise increments its occurrence count. Returns the
    /// phrase's strong-hash id either way.
    ///
    /// # Errors
    /// [`DictionaryError::HashCollision`] if `phrase` hashes to an id already bound to
    /// different bytes (fatal, SPEC_FULL.md §7 kind 4); [`DictionaryError::AlreadyFinalized`]
    /// if called after [`Self::sort_and_finalize`].
    pub fn check_and_add(&self, phrase: &[u8]) -> Result<u64, DictionaryError> {
        let id = strong_hash(phrase);
        let mut inner = self.inner.lock();
        if inner.finalized {
            return Err(DictionaryError::AlreadyFinalized);
        }
        match inner.by_id.get_mut(&id) {
            Some(entry) if entry.bytes == phrase => {
                entry.count += 1;
            }
            Some(entry) => {
                return Err(DictionaryError::HashCollision { id, a: entry.bytes.clone(), b: phrase.to_vec() });
            }
            None => {
                inner.by_id.insert(id, Entry { bytes: phrase.to_vec(), count: 1 });
            }
        }
        Ok(id)
    }

    /// Increments the occurrence count of an already-registered phrase, identified by the
    /// strong-hash id returned from an earlier [`Self::check_and_add`]. A no-op if the id is
    /// unknown. Used by the sample parser when it copies reference phrase ids in bulk instead
    /// of replaying them through `check_and_add`.
    pub fn bump(&self, id: u64) {
        if let Some(entry) = self.inner.lock().by_id.get_mut(&id) {
            entry.count += 1;
        }
    }

    #[must_use]
    pub fn contains(&self, phrase: &[u8]) -> bool {
        let id = strong_hash(phrase);
        let inner = self.inner.lock();
        inner.by_id.get(&id).is_some_and(|e| e.bytes == phrase)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.lock().by_id.len()
    }

    /// Freezes insertion, sorts phrases lexicographically, assigns dense 1-based rank ids,
    /// and builds the strong-hash-id -> rank-id translation table.
    ///
    /// # Errors
    /// [`DictionaryError::AlreadyFinalizedTwice`] if called more than once.
    pub fn sort_and_finalize(&self) -> Result<FinalizedDictionary, DictionaryError> {
        let mut inner = self.inner.lock();
        if inner.finalized {
            return Err(DictionaryError::AlreadyFinalizedTwice);
        }
        inner.finalized = true;

        let mut entries: Vec<(u64, Vec<u8>, u64)> =
            inner.by_id.iter().map(|(&id, e)| (id, e.bytes.clone(), e.count)).collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        let mut phrases = Vec::with_capacity(entries.len());
        let mut counts = Vec::with_capacity(entries.len());
        let mut id_to_rank = ahash::AHashMap::default();
        for (rank0, (id, bytes, count)) in entries.into_iter().enumerate() {
            let rank = (rank0 + 1) as u32;
            id_to_rank.insert(id, rank);
            phrases.push(bytes);
            counts.push(count);
        }
        Ok(FinalizedDictionary { phrases, counts, id_to_rank })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_and_add_is_idempotent_and_counts_occurrences() {
        let dict = PhraseDictionary::new();
        let id1 = dict.check_and_add(b"ACGTACGT").unwrap();
        let id2 = dict.check_and_add(b"ACGTACGT").unwrap();
        assert_eq!(id1, id2);
        assert!(dict.contains(b"ACGTACGT"));
        assert_eq!(dict.size(), 1);
    }

    #[test]
    fn large_insert_set_all_retrievable() {
        let dict = PhraseDictionary::new();
        for i in 0..100_000 {
            let phrase = i.to_string().into_bytes();
            dict.check_and_add(&phrase).unwrap();
        }
        assert_eq!(dict.size(), 100_000);
        for i in 0..100_000 {
            assert!(dict.contains(i.to_string().as_bytes()));
        }
    }

    #[test]
    fn sort_and_finalize_produces_lexicographic_ranks() {
        let dict = PhraseDictionary::new();
        for phrase in [&b"CCCC"[..], b"AAAA", b"BBBB"] {
            dict.check_and_add(phrase).unwrap();
        }
        let finalized = dict.sort_and_finalize().unwrap();
        assert_eq!(finalized.phrases, vec![b"AAAA".to_vec(), b"BBBB".to_vec(), b"CCCC".to_vec()]);
        assert_eq!(finalized.phrase(1), Some(&b"AAAA"[..]));
        assert_eq!(finalized.phrase(3), Some(&b"CCCC"[..]));
    }

    #[test]
    fn bump_increments_existing_entry_and_ignores_unknown_id() {
        let dict = PhraseDictionary::new();
        let id = dict.check_and_add(b"ACGTACGT").unwrap();
        dict.bump(id);
        dict.bump(id);
        let finalized = dict.sort_and_finalize().unwrap();
        assert_eq!(finalized.counts, vec![3]);
    }

    #[test]
    fn from_parts_round_trips_phrases_and_counts() {
        let phrases = vec![b"AAAA".to_vec(), b"CCCC".to_vec()];
        let counts = vec![3, 7];
        let finalized = FinalizedDictionary::from_parts(phrases.clone(), counts.clone());
        assert_eq!(finalized.phrases, phrases);
        assert_eq!(finalized.counts, counts);
        assert_eq!(finalized.phrase(1), Some(&b"AAAA"[..]));
    }

    #[test]
    fn finalize_twice_errors() {
        let dict = PhraseDictionary::new();
        dict.check_and_add(b"AAAA").unwrap();
        dict.sort_and_finalize().unwrap();
        assert_eq!(dict.sort_and_finalize().unwrap_err(), DictionaryError::AlreadyFinalizedTwice);
    }

    #[test]
    fn insert_after_finalize_errors() {
        let dict = PhraseDictionary::new();
        dict.check_and_add(b"AAAA").unwrap();
        dict.sort_and_finalize().unwrap();
        assert_eq!(dict.check_and_add(b"BBBB").unwrap_err(), DictionaryError::AlreadyFinalized);
    }
}
