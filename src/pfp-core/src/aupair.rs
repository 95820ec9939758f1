//! AuPair contractor (C7): given a finalized dictionary and parse, removes the trigger strings
//! whose elimination most shrinks total dictionary size, within a byte budget
//! (SPEC_FULL.md §4.7).
//!
//! Removing trigger string `T` merges every adjacent pair `(A, B)` in the parse where `A` ends
//! with `T` and `B` begins with `T` into `A · B[W:]`. The indexed max-PQ (C8) orders candidate
//! triggers by current gain; the linked list (C8 list) lets the parse shrink without
//! relocating surviving entries.

use ahash::AHashMap;

use crate::dictionary::FinalizedDictionary;
use crate::indexed_pq::IndexedMaxPQ;
use crate::linked_list::LinkedList;

pub struct AuPairOutput {
    /// New parse, one entry per surviving token, in order. Indexes into `phrases`.
    pub parse: Vec<u32>,
    /// Phrase table referenced by `parse` (0-based, unlike the `.dict` file's 1-based ranks).
    pub phrases: Vec<Vec<u8>>,
    /// Net dictionary bytes eliminated.
    pub removed_bytes: u64,
    pub removed_triggers: Vec<Vec<u8>>,
}

struct State {
    w: usize,
    phrase_bytes: Vec<Vec<u8>>,
    refcount: Vec<u64>,
    merged_phrase_id: AHashMap<Vec<u8>, usize>,
}

impl State {
    fn trigger_at(&self, list: &LinkedList<u32>, i: usize) -> Option<(usize, Vec<u8>)> {
        let j = list.next_at(i)?;
        let a = &self.phrase_bytes[list.value_at(i) as usize];
        let b = &self.phrase_bytes[list.value_at(j) as usize];
        if a.len() < self.w || b.len() < self.w {
            return None;
        }
        let (tail, head) = (&a[a.len() - self.w..], &b[..self.w]);
        (tail == head).then(|| (j, tail.to_vec()))
    }

    /// Computes the net dictionary-byte gain of removing every currently-valid occurrence of
    /// `trigger` at the given boundary positions, without mutating any shared state.
    fn simulate_gain(&self, list: &LinkedList<u32>, trigger: &[u8], occurrences: &[usize]) -> i64 {
        let mut refcount = self.refcount.clone();
        let mut synthesized: AHashMap<Vec<u8>, u64> = AHashMap::default();
        let mut gain = 0i64;
        for &i in occurrences {
            let Some((j, t)) = self.trigger_at(list, i) else { continue };
            if t != trigger {
                continue;
            }
            let a = list.value_at(i) as usize;
            let b = list.value_at(j) as usize;
            if refcount[a] == 0 || refcount[b] == 0 {
                continue;
            }
            refcount[a] -= 1;
            refcount[b] -= 1;
            if refcount[a] == 0 {
                gain += self.phrase_bytes[a].len() as i64;
            }
            if refcount[b] == 0 {
                gain += self.phrase_bytes[b].len() as i64;
            }
            let merged_len = self.phrase_bytes[a].len() + self.phrase_bytes[b].len() - self.w;
            let merged_key = merge_bytes(&self.phrase_bytes[a], &self.phrase_bytes[b], self.w);
            let already_known = self.merged_phrase_id.contains_key(&merged_key);
            let seen = synthesized.entry(merged_key).or_insert(0);
            if *seen == 0 && !already_known {
                gain -= merged_len as i64;
            }
            *seen += 1;
        }
        gain
    }

    /// Applies the removal of every currently-valid occurrence of `trigger`, splicing `list`
    /// in place. Returns the realized byte gain.
    fn apply(&mut self, list: &mut LinkedList<u32>, trigger: &[u8], occurrences: &[usize]) -> i64 {
        let mut gain = 0i64;
        for &i in occurrences {
            let Some((j, t)) = self.trigger_at(list, i) else { continue };
            if t != trigger {
                continue;
            }
            let a = list.value_at(i) as usize;
            let b = list.value_at(j) as usize;
            if self.refcount[a] == 0 || self.refcount[b] == 0 {
                continue;
            }
            self.refcount[a] -= 1;
            self.refcount[b] -= 1;
            if self.refcount[a] == 0 {
                gain += self.phrase_bytes[a].len() as i64;
            }
            if self.refcount[b] == 0 {
                gain += self.phrase_bytes[b].len() as i64;
            }
            let merged = merge_bytes(&self.phrase_bytes[a], &self.phrase_bytes[b], self.w);
            let merged_len = merged.len() as i64;
            let merged_id = *self.merged_phrase_id.entry(merged.clone()).or_insert_with(|| {
                self.phrase_bytes.push(merged);
                self.refcount.push(0);
                self.phrase_bytes.len() - 1
            });
            if self.refcount[merged_id] == 0 {
                gain -= merged_len;
            }
            self.refcount[merged_id] += 1;
            list.set_value(i, merged_id as u32);
            list.remove_at(j);
        }
        gain
    }
}

fn merge_bytes(a: &[u8], b: &[u8], w: usize) -> Vec<u8> {
    let mut merged = a.to_vec();
    merged.extend_from_slice(&b[w..]);
    merged
}

/// Runs AuPair to completion against `dictionary`/`parse`, stopping once the priority queue is
/// empty, its head has non-positive gain, or `budget` bytes have been removed.
#[must_use]
pub fn run(dictionary: &FinalizedDictionary, parse: &[u32], w: usize, budget: u64) -> AuPairOutput {
    let mut state = State {
        w,
        phrase_bytes: dictionary.phrases.clone(),
        refcount: dictionary.counts.clone(),
        merged_phrase_id: AHashMap::default(),
    };
    let mut list = LinkedList::filled(parse.len(), |i| parse[i] - 1);

    let mut trigger_id_of: AHashMap<Vec<u8>, usize> = AHashMap::default();
    let mut trigger_bytes: Vec<Vec<u8>> = Vec::new();
    let mut occurrences: Vec<Vec<usize>> = Vec::new();
    let capacity = parse.len().saturating_mul(4) + 16;
    let mut pq = IndexedMaxPQ::init(capacity);

    let trigger_id = |trigger_id_of: &mut AHashMap<Vec<u8>, usize>, trigger_bytes: &mut Vec<Vec<u8>>, occurrences: &mut Vec<Vec<usize>>, t: &[u8]| -> usize {
        if let Some(&id) = trigger_id_of.get(t) {
            id
        } else {
            let id = trigger_bytes.len();
            trigger_bytes.push(t.to_vec());
            occurrences.push(Vec::new());
            trigger_id_of.insert(t.to_vec(), id);
            id
        }
    };

    if parse.len() > 1 {
        for i in 0..parse.len() - 1 {
            if let Some((_, t)) = state.trigger_at(&list, i) {
                let id = trigger_id(&mut trigger_id_of, &mut trigger_bytes, &mut occurrences, &t);
                occurrences[id].push(i);
            }
        }
        for id in 0..trigger_bytes.len() {
            let gain = state.simulate_gain(&list, &trigger_bytes[id], &occurrences[id]);
            if gain > 0 {
                pq.push(id, gain).expect("freshly assigned ids are unique");
            }
        }
    }

    let mut removed_bytes = 0u64;
    let mut removed_triggers = Vec::new();

    while removed_bytes < budget {
        let Some((priority, id)) = pq.get_max() else { break };
        if priority <= 0 {
            break;
        }
        pq.pop_max();
        let fresh = state.simulate_gain(&list, &trigger_bytes[id], &occurrences[id]);
        if fresh != priority {
            if fresh > 0 {
                pq.push(id, fresh).expect("id just popped is free");
            }
            continue;
        }

        let touched: Vec<usize> = occurrences[id].clone();
        let gain = state.apply(&mut list, &trigger_bytes[id], &touched);
        removed_bytes = removed_bytes.saturating_add(gain.max(0) as u64);
        removed_triggers.push(trigger_bytes[id].clone());

        for &i in &touched {
            if list.is_removed(i) {
                continue;
            }
            let neighbors = [list.prev(i), Some(i)];
            for pair_start in neighbors.into_iter().flatten() {
                if let Some((_, t)) = state.trigger_at(&list, pair_start) {
                    let nid = trigger_id(&mut trigger_id_of, &mut trigger_bytes, &mut occurrences, &t);
                    occurrences[nid].push(pair_start);
                    let gain = state.simulate_gain(&list, &trigger_bytes[nid], &occurrences[nid]);
                    if gain > 0 {
                        if pq.contains(nid) {
                            pq.promote(nid, gain).ok();
                        } else {
                            pq.push(nid, gain).ok();
                        }
                    } else if pq.contains(nid) {
                        pq.remove(nid).ok();
                    }
                }
            }
        }
    }

    // Position 0 is never itself spliced out: `apply` only ever removes the right-hand side
    // `j` of a boundary, and 0 has no predecessor that could name it as such a `j`.
    let mut new_parse = Vec::new();
    if !list.is_empty() {
        let mut pos = 0;
        loop {
            new_parse.push(list.value_at(pos));
            match list.next_at(pos) {
                Some(next) => pos = next,
                None => break,
            }
        }
    }

    AuPairOutput { parse: new_parse, phrases: state.phrase_bytes, removed_bytes, removed_triggers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::PhraseDictionary;

    fn fixture() -> (FinalizedDictionary, Vec<u32>) {
        let dict = PhraseDictionary::new();
        let phrases: [&[u8]; 8] = [
            b"!ACCACATAGGTG",
            b"####ACCACATAGGTG",
            b"AATGTTACACTGTGTGAAAAAGTCAG",
            b"AATGTTACATTGTGTGAAAAAGTCAG",
            b"CTTGAAAATG",
            b"GGTGAACCTTG",
            b"TCAGATACAAGAGGCC!!!!",
            b"TCAGATACAAGAGGCC####",
        ];
        for p in phrases {
            dict.check_and_add(p).unwrap();
        }
        let finalized = dict.sort_and_finalize().unwrap();
        // the phrases above are already in lexicographic order, so rank == input order
        let ranks: Vec<u32> = phrases.iter().map(|p| finalized.rank_of(crate::dictionary::strong_hash(p)).unwrap()).collect();
        let parse = vec![1, 6, 5, 3, 8, 2, 6, 5, 4, 7];
        let remapped: Vec<u32> = parse.iter().map(|&r| ranks[r as usize - 1]).collect();
        (finalized, remapped)
    }

    fn expand(parse: &[u32], phrases: &[Vec<u8>], w: usize) -> Vec<u8> {
        let mut out = phrases[parse[0] as usize].clone();
        for &rank in &parse[1..] {
            out.extend_from_slice(&phrases[rank as usize][w..]);
        }
        out
    }

    #[test]
    fn contraction_preserves_the_original_sequence() {
        let (dict, parse) = fixture();
        let original = expand(&parse, &dict.phrases, 4);

        let output = run(&dict, &parse, 4, 10);
        assert!(output.removed_bytes > 0);
        assert!(!output.removed_triggers.is_empty());
        assert!(output.parse.len() < parse.len());

        let reconstructed = expand(&output.parse, &output.phrases, 4);
        assert_eq!(reconstructed, original);
    }

    #[test]
    fn zero_budget_removes_nothing() {
        let (dict, parse) = fixture();
        let output = run(&dict, &parse, 4, 0);
        assert_eq!(output.removed_bytes, 0);
        assert_eq!(output.parse, parse);
    }
}
