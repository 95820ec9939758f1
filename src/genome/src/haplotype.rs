//! The lazy haplotype byte stream (C3): materializes one sample's sequence from a contig's
//! reference bytes plus its selected variations, without ever holding the full string.
//!
//! Grounded in the reference implementation's `Contig::iterator` / `Sample::iterator`
//! state machine (cursors `ref_it_`/`var_it_`/`curr_var_it_`/`prev_variation_it`), expressed
//! here as an explicit Rust state machine per SPEC_FULL.md §9's re-architecture guidance
//! rather than the original's priming-constructor-plus-phantom-terminator idiom: `advance()`
//! simply reports "no byte produced" once the reference is exhausted, instead of reading one
//! out-of-bounds null byte to flip an `end()` flag.

use thiserror::Error;

use crate::{alphabet::DOLLAR_PRIME, alphabet::DOLLAR_SEQUENCE, sample::{ContigInstance, Sample}};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HaplotypeError {
    #[error("backward seek requested: current position {current}, requested {requested}")]
    BackwardSeek { current: usize, requested: usize },
    #[error("seek target {requested} is beyond contig length {length}")]
    SeekOutOfRange { requested: usize, length: usize },
}

/// Lazily materializes one contig-instance's haplotype bytes for a single genotype slot.
pub struct ContigIterator {
    instance: ContigInstance,
    genotype: usize,
    ref_it: usize,
    /// Index into `instance.variation_indices` / `instance.genotypes`.
    var_it: usize,
    /// Cursor within a multi-byte ALT allele currently being emitted.
    curr_var_it: usize,
    /// Index (into `instance.variation_indices`) of the most recently entered variation.
    prev_var_it: Option<usize>,
    current: Option<u8>,
    /// 1-based count of bytes emitted so far (the sample coordinate).
    sam_it: u64,
}

impl ContigIterator {
    #[must_use]
    pub fn new(instance: ContigInstance, genotype: usize) -> Self {
        let mut it = Self {
            instance,
            genotype,
            ref_it: 0,
            var_it: 0,
            curr_var_it: 0,
            prev_var_it: None,
            current: None,
            sam_it: 0,
        };
        it.skip_reference_genotypes();
        it.advance();
        it
    }

    /// Skips past any upcoming variation whose genotype selects the reference allele (index
    /// 0) — these never reach the iterator, per SPEC_FULL.md §4.3.
    fn skip_reference_genotypes(&mut self) {
        while self.var_it < self.instance.variation_indices.len() && self.instance.genotypes[self.var_it] == 0 {
            self.var_it += 1;
        }
    }

    fn variation_at(&self, i: usize) -> &crate::variation::Variation {
        let idx = self.instance.variation_indices[i];
        &self.instance.contig.variations[idx]
    }

    #[must_use]
    pub fn current(&self) -> Option<u8> {
        self.current
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    #[must_use]
    pub fn sample_coordinate(&self) -> u64 {
        self.sam_it
    }

    /// Reference-frame position of the upcoming variation, or the contig's length if none remain.
    #[must_use]
    pub fn next_variation_pos(&self) -> usize {
        if self.var_it < self.instance.variation_indices.len() {
            self.variation_at(self.var_it).pos.0 as usize
        } else {
            self.instance.contig.len()
        }
    }

    /// Reference-frame position of the most recently entered variation.
    #[must_use]
    pub fn prev_variation_pos(&self) -> Option<usize> {
        self.prev_var_it.map(|i| self.variation_at(i).pos.0 as usize)
    }

    /// Advances one byte. No-op once the contig is exhausted (`current()` becomes `None`).
    pub fn advance(&mut self) {
        if self.var_it < self.instance.variation_indices.len() {
            let pos = self.variation_at(self.var_it).pos.0 as usize;
            if self.ref_it < pos {
                self.current = Some(self.instance.contig.reference[self.ref_it]);
                self.ref_it += 1;
                self.sam_it += 1;
                return;
            }
            let genotype = self.instance.genotypes[self.var_it];
            let ref_len = self.variation_at(self.var_it).ref_len;
            let allele = self.variation_at(self.var_it).allele(genotype)
                .expect("genotype index validated during ingestion");
            if allele.len() > 1 {
                if self.curr_var_it < allele.len() - 1 {
                    self.current = Some(allele[self.curr_var_it]);
                    self.curr_var_it += 1;
                    self.sam_it += 1;
                    return;
                }
                self.current = Some(*allele.last().expect("non-empty allele"));
                self.ref_it += ref_len as usize;
            } else {
                self.current = Some(allele[0]);
                self.ref_it += ref_len as usize;
            }
            self.sam_it += 1;
            self.prev_var_it = Some(self.var_it);
            self.curr_var_it = 0;
            self.var_it += 1;
            self.skip_reference_genotypes();
            return;
        }
        if self.ref_it < self.instance.contig.len() {
            self.current = Some(self.instance.contig.reference[self.ref_it]);
            self.ref_it += 1;
            self.sam_it += 1;
        } else {
            self.current = None;
        }
    }

    /// Forward-only seek to reference-frame position `i`.
    ///
    /// # Errors
    /// [`HaplotypeError::BackwardSeek`] if `i` is behind the current reference cursor;
    /// [`HaplotypeError::SeekOutOfRange`] if `i` is beyond the contig.
    pub fn seek(&mut self, i: usize) -> Result<(), HaplotypeError> {
        let length = self.instance.contig.len();
        if i >= length {
            return Err(HaplotypeError::SeekOutOfRange { requested: i, length });
        }
        if i < self.ref_it {
            return Err(HaplotypeError::BackwardSeek { current: self.ref_it, requested: i });
        }
        while self.ref_it < i && !self.is_end() {
            self.advance();
        }
        Ok(())
    }
}

/// Composes [`ContigIterator`]s across a sample's contigs, inserting a `DOLLAR_PRIME`
/// transition byte between contigs and a `DOLLAR_SEQUENCE` byte once the last contig ends.
pub struct SampleIterator {
    contigs: std::vec::IntoIter<ContigInstance>,
    genotype: usize,
    inner: Option<ContigIterator>,
    pending: Option<u8>,
    emitted_terminator: bool,
    finished: bool,
}

impl SampleIterator {
    #[must_use]
    pub fn new(sample: Sample, genotype: usize) -> Self {
        let mut contigs = sample.contigs.into_iter();
        let inner = contigs.next().map(|c| ContigIterator::new(c, genotype));
        let finished = inner.is_none();
        Self { contigs, genotype, inner, pending: None, emitted_terminator: false, finished }
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn current(&self) -> Option<u8> {
        if self.finished {
            return None;
        }
        if let Some(byte) = self.pending {
            return Some(byte);
        }
        self.inner.as_ref().and_then(ContigIterator::current)
    }

    pub fn advance(&mut self) {
        if self.finished {
            return;
        }
        if self.pending.take().is_some() {
            // just consumed the DOLLAR_PRIME separator; fall through to advance the new contig.
        } else if let Some(it) = self.inner.as_mut() {
            it.advance();
        }
        if self.inner.as_ref().is_some_and(ContigIterator::is_end) {
            match self.contigs.next() {
                Some(next_contig) => {
                    self.inner = Some(ContigIterator::new(next_contig, self.genotype));
                    self.pending = Some(DOLLAR_PRIME);
                }
                None if !self.emitted_terminator => {
                    self.emitted_terminator = true;
                    self.pending = Some(DOLLAR_SEQUENCE);
                    self.inner = None;
                }
                None => self.finished = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::{contig::Contig, position::Position, sample::SampleTag, variation::Variation};

    fn snp_contig() -> Arc<Contig> {
        let mut contig = Contig::new("chr1", b"ACGTACGTACGT".to_vec(), Position(0));
        contig.add_variation(Variation::new(Position(4), 1, vec![b"A".to_vec(), b"G".to_vec()]));
        Arc::new(contig)
    }

    #[test]
    fn no_variations_reproduces_reference() {
        let contig = Arc::new(Contig::new("chr1", b"ACGT".to_vec(), Position(0)));
        let instance = ContigInstance::new(contig);
        let mut it = ContigIterator::new(instance, 0);
        let mut out = Vec::new();
        while let Some(b) = it.current() {
            out.push(b);
            it.advance();
        }
        assert_eq!(out, b"ACGT");
    }

    #[test]
    fn reference_genotype_is_skipped_without_touching_alt() {
        let contig = snp_contig();
        let mut instance = ContigInstance::new(contig);
        instance.select(0, 0); // selects the reference allele -> skipped by the iterator
        let mut it = ContigIterator::new(instance, 0);
        let mut out = Vec::new();
        while let Some(b) = it.current() {
            out.push(b);
            it.advance();
        }
        assert_eq!(out, b"ACGTACGTACGT");
    }

    #[test]
    fn alt_genotype_substitutes_snp() {
        let contig = snp_contig();
        let mut instance = ContigInstance::new(contig);
        instance.select(0, 1); // selects alt[1] = "G"
        let mut it = ContigIterator::new(instance, 0);
        let mut out = Vec::new();
        while let Some(b) = it.current() {
            out.push(b);
            it.advance();
        }
        assert_eq!(out, b"ACGTGCGTACGT");
    }

    #[test]
    fn multi_byte_insertion_allele() {
        let mut contig = Contig::new("chr1", b"ACGTACGT".to_vec(), Position(0));
        contig.add_variation(Variation::new(Position(4), 1, vec![b"A".to_vec(), b"AAAA".to_vec()]));
        let mut instance = ContigInstance::new(Arc::new(contig));
        instance.select(0, 1);
        let mut it = ContigIterator::new(instance, 0);
        let mut out = Vec::new();
        while let Some(b) = it.current() {
            out.push(b);
            it.advance();
        }
        assert_eq!(out, b"ACGTAAAACGT");
    }

    #[test]
    fn deletion_allele_consumes_extra_reference() {
        let mut contig = Contig::new("chr1", b"ACGTACGT".to_vec(), Position(0));
        contig.add_variation(Variation::new(Position(4), 3, vec![b"ACG".to_vec(), b"A".to_vec()]));
        let mut instance = ContigInstance::new(Arc::new(contig));
        instance.select(0, 1);
        let mut it = ContigIterator::new(instance, 0);
        let mut out = Vec::new();
        while let Some(b) = it.current() {
            out.push(b);
            it.advance();
        }
        assert_eq!(out, b"ACGTAGT");
    }

    #[test]
    fn seek_rejects_backward_motion() {
        let contig = Arc::new(Contig::new("chr1", b"ACGTACGT".to_vec(), Position(0)));
        let instance = ContigInstance::new(contig);
        let mut it = ContigIterator::new(instance, 0);
        it.seek(5).unwrap();
        assert_eq!(it.seek(2), Err(HaplotypeError::BackwardSeek { current: 5, requested: 2 }));
    }

    #[test]
    fn sample_iterator_inserts_separators_between_contigs() {
        let c1 = Arc::new(Contig::new("chr1", b"AC".to_vec(), Position(0)));
        let c2 = Arc::new(Contig::new("chr2", b"GT".to_vec(), Position(2)));
        let mut sample = Sample::new(SampleTag::from("HG00096"));
        sample.push_contig(ContigInstance::new(c1)).unwrap();
        sample.push_contig(ContigInstance::new(c2)).unwrap();

        let mut it = SampleIterator::new(sample, 0);
        let mut out = Vec::new();
        while let Some(b) = it.current() {
            out.push(b);
            it.advance();
        }
        assert_eq!(out, vec![b'A', b'C', DOLLAR_PRIME, b'G', b'T', DOLLAR_SEQUENCE]);
    }
}
