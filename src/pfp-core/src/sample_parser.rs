//! Sample parser (C5): turns one phased haplotype into a sequence of phrase ids, re-using the
//! same content-defined segmentation as the reference parse (C4) so that stretches of a sample
//! that run collinear with an unmodified contig can be recognized and copied in bulk instead of
//! re-hashed (SPEC_FULL.md §4.5).
//!
//! Framing differs from the reference parse: [`genome::SampleIterator`] emits a single
//! `DOLLAR_PRIME` byte at each inter-contig transition and a single `DOLLAR_SEQUENCE` byte once
//! at the end of the sample, rather than a full `W`-byte sentinel run. The sample parser treats
//! both as forced-cut triggers: the sentinel byte is folded into the phrase it closes, and the
//! segmenter is cold-started (no carried window) for what follows. This means the first phrase
//! of a contig past the first can never be copied straight from the reference parse — its
//! leading bytes may have been hashed, on the reference side, together with trailing bytes of
//! the *previous* contig's framing. Acceleration therefore only kicks in once the contig cursor
//! has advanced at least `w` bytes past its own start, at which point the trailing window no
//! longer depends on anything but that contig's own content and is identical on both paths.

use genome::{alphabet, ContigInstance, Sample, SampleTag, SampleIterator};

use crate::dictionary::{DictionaryError, PhraseDictionary};
use crate::reference_parse::ReferenceParse;
use crate::segmenter::Segmenter;

/// One worker's parse of a single sample haplotype, still carrying strong-hash ids — the
/// dictionary isn't finalized into rank ids until every worker has finished (SPEC_FULL.md §5).
#[derive(Debug)]
pub struct WorkerSampleOutput {
    pub tag: SampleTag,
    pub genotype: usize,
    pub strong_ids: Vec<u64>,
    /// `(contig name, emitted length)` pairs in contig order. The final contig's length
    /// includes the trailing `w`-byte DOLLAR padding closed at end of sample.
    pub contig_lengths: Vec<(String, u64)>,
}

struct ContigMeta<'a> {
    name: String,
    no_variation: bool,
    reference_parse: Option<&'a crate::reference_parse::ContigReferenceParse>,
}

fn register(dictionary: &PhraseDictionary, strong_ids: &mut Vec<u64>, phrase: Vec<u8>) -> Result<(), DictionaryError> {
    strong_ids.push(dictionary.check_and_add(&phrase)?);
    Ok(())
}

/// Parses a VCF-driven sample (one phased genotype) into a worker-local phrase-id stream.
///
/// `use_acceleration` enables bulk-copying a contig-instance's phrase ids directly from
/// `reference_parse` whenever that instance retains no variations at all and the cursor has
/// advanced far enough past the contig start for the reference's and the sample's segmenter
/// states to be guaranteed identical (see module docs).
///
/// # Errors
/// Propagates [`DictionaryError`] from the shared dictionary.
pub fn parse_sample(
    sample: Sample,
    genotype: usize,
    w: usize,
    p: u64,
    dictionary: &PhraseDictionary,
    reference_parse: &ReferenceParse,
    use_acceleration: bool,
) -> Result<WorkerSampleOutput, DictionaryError> {
    let tag = sample.tag.clone();
    let metas: Vec<ContigMeta> = sample
        .contigs
        .iter()
        .map(|c: &ContigInstance| ContigMeta {
            name: c.contig.name.clone(),
            no_variation: c.variation_indices.is_empty(),
            reference_parse: reference_parse.contig(&c.contig.name),
        })
        .collect();

    let mut segmenter = Segmenter::new(w, p);
    let mut strong_ids = Vec::new();
    let mut contig_lengths = Vec::new();

    for _ in 0..w {
        if let Some(phrase) = segmenter.push_byte(alphabet::DOLLAR) {
            register(dictionary, &mut strong_ids, phrase)?;
        }
    }

    let mut it = SampleIterator::new(sample, genotype);
    let mut contig_idx = 0usize;
    let mut contig_pos = 0u64;
    let mut in_accel_tail = false;

    while let Some(byte) = it.current() {
        match byte {
            alphabet::DOLLAR_PRIME => {
                if let Some(phrase) = segmenter.push_byte(byte) {
                    register(dictionary, &mut strong_ids, phrase)?;
                }
                if let Some(phrase) = segmenter.force_cut() {
                    register(dictionary, &mut strong_ids, phrase)?;
                }
                contig_lengths.push((metas[contig_idx].name.clone(), contig_pos));
                contig_idx += 1;
                contig_pos = 0;
                in_accel_tail = false;
                it.advance();
            }
            alphabet::DOLLAR_SEQUENCE => {
                if let Some(phrase) = segmenter.push_byte(byte) {
                    register(dictionary, &mut strong_ids, phrase)?;
                }
                if let Some(phrase) = segmenter.force_cut() {
                    register(dictionary, &mut strong_ids, phrase)?;
                }
                it.advance();
                break;
            }
            real_byte => {
                if in_accel_tail {
                    it.advance();
                    continue;
                }
                if let Some(phrase) = segmenter.push_byte(real_byte) {
                    register(dictionary, &mut strong_ids, phrase)?;
                }
                contig_pos += 1;

                if use_acceleration && metas[contig_idx].no_variation {
                    if let Some(rp) = metas[contig_idx].reference_parse {
                        let hit = rp.boundary_offsets.iter().position(|&off| off == contig_pos && off >= w as u64);
                        if let Some(idx) = hit {
                            for &id in &rp.phrase_ids[idx + 1..] {
                                dictionary.bump(id);
                                strong_ids.push(id);
                            }
                            segmenter.reset();
                            in_accel_tail = true;
                        }
                    }
                }
                it.advance();
            }
        }
    }

    for _ in 0..w {
        if let Some(phrase) = segmenter.push_byte(alphabet::DOLLAR) {
            register(dictionary, &mut strong_ids, phrase)?;
        }
    }
    if let Some(phrase) = segmenter.force_cut() {
        register(dictionary, &mut strong_ids, phrase)?;
    }
    if let Some(last) = metas.last() {
        if contig_lengths.len() < metas.len() {
            // The last contig never triggered a DOLLAR_PRIME transition, so its entry wasn't
            // recorded in the loop above; its length includes the trailing DOLLAR padding.
            contig_lengths.push((last.name.clone(), contig_pos + w as u64));
        }
    }

    Ok(WorkerSampleOutput { tag, genotype, strong_ids, contig_lengths })
}

/// Parses a standalone FASTA/plain-text record list (no reference, no variations, no
/// acceleration) using the same framing convention as [`parse_sample`]: a forced cut with a
/// single `DOLLAR_PRIME` between records and a single `DOLLAR_SEQUENCE` plus trailing `w`-byte
/// DOLLAR padding at the end.
///
/// # Errors
/// Propagates [`DictionaryError`] from the shared dictionary.
pub fn parse_standalone(
    tag: SampleTag,
    records: &[Vec<u8>],
    w: usize,
    p: u64,
    dictionary: &PhraseDictionary,
) -> Result<WorkerSampleOutput, DictionaryError> {
    let mut segmenter = Segmenter::new(w, p);
    let mut strong_ids = Vec::new();
    let mut contig_lengths = Vec::new();

    for _ in 0..w {
        if let Some(phrase) = segmenter.push_byte(alphabet::DOLLAR) {
            register(dictionary, &mut strong_ids, phrase)?;
        }
    }

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            if let Some(phrase) = segmenter.push_byte(alphabet::DOLLAR_PRIME) {
                register(dictionary, &mut strong_ids, phrase)?;
            }
            if let Some(phrase) = segmenter.force_cut() {
                register(dictionary, &mut strong_ids, phrase)?;
            }
        }
        for &byte in record {
            if let Some(phrase) = segmenter.push_byte(byte) {
                register(dictionary, &mut strong_ids, phrase)?;
            }
        }
        contig_lengths.push((format!("record_{index}"), record.len() as u64));
    }

    if let Some(phrase) = segmenter.push_byte(alphabet::DOLLAR_SEQUENCE) {
        register(dictionary, &mut strong_ids, phrase)?;
    }
    if let Some(phrase) = segmenter.force_cut() {
        register(dictionary, &mut strong_ids, phrase)?;
    }
    for _ in 0..w {
        if let Some(phrase) = segmenter.push_byte(alphabet::DOLLAR) {
            register(dictionary, &mut strong_ids, phrase)?;
        }
    }
    if let Some(phrase) = segmenter.force_cut() {
        register(dictionary, &mut strong_ids, phrase)?;
    }
    if let Some(last) = contig_lengths.last_mut() {
        last.1 += w as u64;
    }

    Ok(WorkerSampleOutput { tag, genotype: 0, strong_ids, contig_lengths })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use genome::{Contig, ContigInstance as GenomeContigInstance, Position, Variation};

    fn flat_contig(name: &str, bytes: &[u8]) -> Arc<Contig> {
        Arc::new(Contig::new(name, bytes.to_vec(), Position(0)))
    }

    #[test]
    fn no_variation_sample_reuses_every_reference_phrase_but_the_last() {
        let w = 4;
        let p = 11;
        let reference: Vec<u8> = (0..120u32).map(|i| b"ACGT"[(i % 4) as usize]).collect();
        let contig = flat_contig("chr1", &reference);

        let dict = PhraseDictionary::new();
        let ref_parse = crate::reference_parse::build(&[contig.clone()], w, p, &dict).unwrap();

        let mut sample = Sample::new(SampleTag::from("HG00096"));
        sample.push_contig(GenomeContigInstance::new(contig)).unwrap();

        let out = parse_sample(sample, 0, w, p, &dict, &ref_parse, true).unwrap();
        let chr1 = ref_parse.contig("chr1").unwrap();

        // Both paths seed on w leading DOLLAR bytes and see identical contig content, so every
        // phrase but the reference's final one (closed against a DOLLAR-only tail rather than
        // the sample's DOLLAR_SEQUENCE-terminated one) must reappear in the sample's output.
        let shared = &chr1.phrase_ids[..chr1.phrase_ids.len() - 1];
        assert!(out.strong_ids.windows(shared.len()).any(|chunk| chunk == shared));
        assert_eq!(out.contig_lengths, vec![("chr1".to_string(), reference.len() as u64 + w as u64)]);
    }

    #[test]
    fn acceleration_does_not_change_output_versus_unaccelerated() {
        let w = 4;
        let p = 11;
        let reference: Vec<u8> = (0..200u32).map(|i| b"ACGT"[(i % 4) as usize]).collect();
        let contig = flat_contig("chr1", &reference);

        let dict = PhraseDictionary::new();
        let ref_parse = crate::reference_parse::build(&[contig.clone()], w, p, &dict).unwrap();

        let mut sample_a = Sample::new(SampleTag::from("A"));
        sample_a.push_contig(GenomeContigInstance::new(contig.clone())).unwrap();
        let accelerated = parse_sample(sample_a, 0, w, p, &dict, &ref_parse, true).unwrap();

        let mut sample_b = Sample::new(SampleTag::from("B"));
        sample_b.push_contig(GenomeContigInstance::new(contig)).unwrap();
        let unaccelerated = parse_sample(sample_b, 0, w, p, &dict, &ref_parse, false).unwrap();

        assert_eq!(accelerated.strong_ids, unaccelerated.strong_ids);
        assert_eq!(accelerated.contig_lengths, unaccelerated.contig_lengths);
    }

    #[test]
    fn two_contig_sample_inserts_one_separator_and_records_both_lengths() {
        let w = 4;
        let p = 11;
        let a = flat_contig("a", b"ACGTACGTACGT");
        let b = flat_contig("b", b"TTGATTGATTGA");

        let dict = PhraseDictionary::new();
        let ref_parse = crate::reference_parse::build(&[a.clone(), b.clone()], w, p, &dict).unwrap();

        let mut sample = Sample::new(SampleTag::from("HG00096"));
        sample.push_contig(GenomeContigInstance::new(a)).unwrap();
        sample.push_contig(GenomeContigInstance::new(b)).unwrap();

        let out = parse_sample(sample, 0, w, p, &dict, &ref_parse, false).unwrap();
        assert_eq!(out.contig_lengths.len(), 2);
        assert_eq!(out.contig_lengths[0], ("a".to_string(), 12));
        assert_eq!(out.contig_lengths[1].0, "b");
    }

    #[test]
    fn variation_bearing_contig_is_never_accelerated() {
        let w = 4;
        let p = 11;
        let mut raw = Contig::new("chr1", b"ACGTACGTACGTACGTACGT".to_vec(), Position(0));
        raw.add_variation(Variation::new(Position(10), 1, vec![b"A".to_vec(), b"G".to_vec()]));
        let contig = Arc::new(raw);

        let dict = PhraseDictionary::new();
        let ref_parse = crate::reference_parse::build(&[contig.clone()], w, p, &dict).unwrap();

        let mut instance = GenomeContigInstance::new(contig);
        instance.select(0, 1);
        let mut sample = Sample::new(SampleTag::from("HG00096"));
        sample.push_contig(instance).unwrap();

        let out = parse_sample(sample, 0, w, p, &dict, &ref_parse, true).unwrap();
        assert!(!out.strong_ids.is_empty());
    }

    #[test]
    fn parse_standalone_separates_records_and_pads_tail() {
        let w = 4;
        let p = 11;
        let dict = PhraseDictionary::new();
        let records = vec![b"ACGTACGTACGT".to_vec(), b"TTTTTTTTTTTT".to_vec()];
        let out = parse_standalone(SampleTag::from("sample1"), &records, w, p, &dict).unwrap();
        assert_eq!(out.contig_lengths.len(), 2);
        assert_eq!(out.contig_lengths[0], ("record_0".to_string(), 12));
        assert_eq!(out.contig_lengths[1], ("record_1".to_string(), 12 + w as u64));
        assert!(!out.strong_ids.is_empty());
    }
}
