//! Reference parse (C4): pre-segments each contig of the reference so the sample parser (C5)
//! can later recognize where a sample's bytes run collinear with the reference and copy phrase
//! ids in bulk instead of re-hashing them (SPEC_FULL.md §4.4).

use std::sync::Arc;

use genome::{alphabet, Contig};

use crate::dictionary::{DictionaryError, PhraseDictionary};
use crate::segmenter::Segmenter;

/// One contig's slice of the reference parse.
#[derive(Debug, Default)]
pub struct ContigReferenceParse {
    pub name: String,
    /// Strong-hash ids of this contig's reference phrases, in order.
    pub phrase_ids: Vec<u64>,
    /// For each phrase boundary, the number of this contig's own reference bytes consumed by
    /// the time that phrase closed. Monotonically increasing; used by the sample parser to
    /// test cursor alignment before attempting acceleration.
    pub boundary_offsets: Vec<u64>,
}

/// The whole reference's phrase decomposition, one entry per contig in input order.
#[derive(Debug, Default)]
pub struct ReferenceParse {
    pub contigs: Vec<ContigReferenceParse>,
}

impl ReferenceParse {
    #[must_use]
    pub fn contig(&self, name: &str) -> Option<&ContigReferenceParse> {
        self.contigs.iter().find(|c| c.name == name)
    }
}

/// Segments `contigs` into phrases, registering each in `dictionary`.
///
/// The first contig is conceptually preceded by `w` DOLLAR bytes (seeding its first phrase);
/// every later contig is preceded by `w - 1` DOLLAR_PRIME bytes and a DOLLAR_SEQUENCE byte.
/// These framing bytes feed through the same trigger-based segmenter as real sequence bytes —
/// unlike the sample parser (C5), the reference parse never forces a cut at a contig boundary,
/// so a phrase may straddle the seam between two contigs' bytes.
///
/// # Errors
/// Propagates [`DictionaryError`] from the shared dictionary (e.g. a strong-hash collision).
pub fn build(contigs: &[Arc<Contig>], w: usize, p: u64, dictionary: &PhraseDictionary) -> Result<ReferenceParse, DictionaryError> {
    let mut result = ReferenceParse { contigs: contigs.iter().map(|c| ContigReferenceParse { name: c.name.clone(), ..Default::default() }).collect() };
    let mut segmenter = Segmenter::new(w, p);
    let mut current = 0usize;
    let mut ref_bytes_consumed = 0u64;

    let mut feed = |segmenter: &mut Segmenter, byte: u8, current: &mut usize, ref_bytes_consumed: &mut u64, counts_as_reference: bool| -> Result<(), DictionaryError> {
        if let Some(phrase) = segmenter.push_byte(byte) {
            let id = dictionary.check_and_add(&phrase)?;
            result.contigs[*current].phrase_ids.push(id);
            result.contigs[*current].boundary_offsets.push(*ref_bytes_consumed);
        }
        if counts_as_reference {
            *ref_bytes_consumed += 1;
        }
        Ok(())
    };

    for _ in 0..w {
        feed(&mut segmenter, alphabet::DOLLAR, &mut current, &mut ref_bytes_consumed, false)?;
    }
    for (index, contig) in contigs.iter().enumerate() {
        if index > 0 {
            current = index;
            ref_bytes_consumed = 0;
            for _ in 0..w.saturating_sub(1) {
                feed(&mut segmenter, alphabet::DOLLAR_PRIME, &mut current, &mut ref_bytes_consumed, false)?;
            }
            feed(&mut segmenter, alphabet::DOLLAR_SEQUENCE, &mut current, &mut ref_bytes_consumed, false)?;
        }
        for &byte in contig.reference.iter() {
            feed(&mut segmenter, byte, &mut current, &mut ref_bytes_consumed, true)?;
        }
    }
    if let Some(tail) = segmenter.force_cut() {
        let id = dictionary.check_and_add(&tail)?;
        result.contigs[current].phrase_ids.push(id);
        result.contigs[current].boundary_offsets.push(ref_bytes_consumed);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genome::Position;

    #[test]
    fn single_contig_produces_monotonic_boundaries_and_registers_phrases() {
        let reference: Vec<u8> = (0..300u32).map(|i| b"ACGT"[(i % 4) as usize]).collect();
        let contigs = vec![Arc::new(Contig::new("chr1", reference, Position(0)))];
        let dict = PhraseDictionary::new();
        let parse = build(&contigs, 8, 11, &dict).unwrap();

        assert_eq!(parse.contigs.len(), 1);
        let chr1 = parse.contig("chr1").unwrap();
        assert!(!chr1.phrase_ids.is_empty());
        assert_eq!(chr1.phrase_ids.len(), chr1.boundary_offsets.len());
        assert!(chr1.boundary_offsets.windows(2).all(|w| w[0] <= w[1]));
        assert!(*chr1.boundary_offsets.last().unwrap() <= 300);
    }

    #[test]
    fn two_contigs_each_get_their_own_relative_offsets() {
        let a: Vec<u8> = (0..120u32).map(|i| b"ACGT"[(i % 4) as usize]).collect();
        let b: Vec<u8> = (0..150u32).map(|i| b"TTGA"[(i % 4) as usize]).collect();
        let contigs = vec![Arc::new(Contig::new("a", a, Position(0))), Arc::new(Contig::new("b", b, Position(120)))];
        let dict = PhraseDictionary::new();
        let parse = build(&contigs, 8, 11, &dict).unwrap();

        assert_eq!(parse.contigs.len(), 2);
        let a_parse = parse.contig("a").unwrap();
        let b_parse = parse.contig("b").unwrap();
        assert!(*a_parse.boundary_offsets.last().unwrap() <= 120);
        assert!(*b_parse.boundary_offsets.last().unwrap() <= 150);
    }

    #[test]
    fn repeated_phrases_are_deduplicated_in_the_dictionary() {
        let reference = b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_vec();
        let contigs = vec![Arc::new(Contig::new("chr1", reference, Position(0)))];
        let dict = PhraseDictionary::new();
        build(&contigs, 4, 3, &dict).unwrap();
        assert!(dict.size() < 8);
    }
}
