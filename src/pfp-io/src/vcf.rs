//! VCF reader (C9): streams one or more (optionally gzip-compressed) VCF text files, populating
//! each named contig's variations and recording, per sample, which variation/genotype pairs it
//! selects. BCF is explicitly not supported (see DESIGN.md).

use std::collections::HashMap;
use std::path::Path;

use ahash::AHashMap;
use genome::{Contig, Position, Variation};
use located_error::LocatedError;
use log::warn;

use crate::open_maybe_gzip;

const CHROM: usize = 0;
const POS: usize = 1;
const REF: usize = 3;
const ALT: usize = 4;
const GENOTYPES_START: usize = 9;

/// One sample's ordered list of `(contig_index, variation_index, genotype)` selections,
/// collected while reading the VCF so a caller can build a [`genome::Sample`] once every
/// contig's variation table has stopped mutating.
#[derive(Debug, Default, Clone)]
pub struct SampleSelections {
    pub tag: String,
    pub selections: Vec<(usize, usize, usize)>,
}

/// Aggregate counts of VCF records skipped during [`read_vcf`], broken down by reason, so the
/// caller can report a summary once ingestion finishes instead of only the per-record `warn!`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestionSummary {
    pub malformed_lines: u64,
    pub unknown_contig: u64,
    pub unparseable_position: u64,
    pub symbolic_allele: u64,
    pub overlapping_variation: u64,
}

impl IngestionSummary {
    #[must_use]
    pub fn total_skipped(&self) -> u64 {
        self.malformed_lines + self.unknown_contig + self.unparseable_position + self.symbolic_allele + self.overlapping_variation
    }
}

/// Reads every record of every file in `paths`, inserting variations into the matching entry
/// of `contigs` (by name) and returning one [`SampleSelections`] per processed sample, in
/// VCF column order, alongside an [`IngestionSummary`] of skipped records. `allow_list`, if
/// given, restricts which sample columns are processed; `max_samples` caps the count on top of
/// that.
///
/// # Errors
/// Propagates I/O errors opening a file, or [`crate::IoError::MissingHeader`] if no file
/// contains a `#CHROM` header line.
pub fn read_vcf(
    paths: &[impl AsRef<Path>],
    contigs: &mut [Contig],
    threads: usize,
    max_samples: Option<usize>,
    allow_list: Option<&[String]>,
) -> anyhow::Result<(Vec<SampleSelections>, IngestionSummary)> {
    let contig_index: AHashMap<String, usize> = contigs.iter().enumerate().map(|(i, c)| (c.name.clone(), i)).collect();
    let mut by_tag: HashMap<String, SampleSelections> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut summary = IngestionSummary::default();

    for path in paths {
        let path = path.as_ref();
        let reader = open_maybe_gzip(path, threads).with_loc(|| format!("While opening VCF file {}", path.display()))?;

        let mut sample_names: Vec<String> = Vec::new();
        let mut selected: Vec<usize> = Vec::new();

        for line in std::io::BufRead::lines(reader) {
            let line = line.with_loc(|| format!("While reading a line of {}", path.display()))?;
            if line.starts_with("##") {
                continue;
            }
            if let Some(header) = line.strip_prefix("#CHROM") {
                let columns: Vec<&str> = header.split('\t').collect();
                sample_names = columns.iter().skip(GENOTYPES_START - 1).map(|s| s.to_string()).collect();
                selected = sample_names
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| match allow_list {
                        Some(list) => list.iter().any(|s| s == *name),
                        None => true,
                    })
                    .map(|(i, _)| i)
                    .collect();
                if let Some(max) = max_samples {
                    selected.truncate(max);
                }
                for &i in &selected {
                    order.push(sample_names[i].clone());
                    by_tag.entry(sample_names[i].clone()).or_insert_with(|| SampleSelections { tag: sample_names[i].clone(), selections: Vec::new() });
                }
                continue;
            }
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() <= GENOTYPES_START {
                warn!("Skipping malformed VCF line in {}: too few columns", path.display());
                summary.malformed_lines += 1;
                continue;
            }
            let chrom = fields[CHROM];
            let Some(&contig_idx) = contig_index.get(chrom) else {
                warn!("Skipping variant at {}:{} — contig absent from loaded reference", chrom, fields[POS]);
                summary.unknown_contig += 1;
                continue;
            };
            let Ok(pos_1based) = fields[POS].parse::<u64>() else {
                warn!("Skipping variant with unparseable position in {}", path.display());
                summary.unparseable_position += 1;
                continue;
            };
            let pos0 = pos_1based.saturating_sub(1);
            let reference_allele = fields[REF].as_bytes().to_vec();
            let alt_alleles: Vec<&str> = fields[ALT].split(',').collect();
            if alt_alleles.iter().any(|a| a.starts_with('<')) {
                warn!("Skipping variant at {chrom}:{pos_1based} — symbolic ALT allele");
                summary.symbolic_allele += 1;
                continue;
            }
            let ref_len = reference_allele.len() as u32;
            let mut alleles = vec![reference_allele];
            alleles.extend(alt_alleles.iter().map(|a| a.as_bytes().to_vec()));

            let variation = Variation::new(Position(pos0), ref_len, alleles);
            let inserted = contigs[contig_idx].add_variation(variation);
            if !inserted {
                warn!("Skipping variant at {chrom}:{pos_1based} — overlaps an already-retained variation");
                summary.overlapping_variation += 1;
                continue;
            }
            let variation_idx = contigs[contig_idx].variations.len() - 1;

            for &sample_col in &selected {
                let Some(genotype_field) = fields.get(GENOTYPES_START + sample_col) else { continue };
                let Some(genotype) = parse_genotype(genotype_field) else { continue };
                let tag = &sample_names[sample_col];
                if let Some(entry) = by_tag.get_mut(tag) {
                    entry.selections.push((contig_idx, variation_idx, genotype));
                }
                if genotype != 0 {
                    let variation = &mut contigs[contig_idx].variations[variation_idx];
                    variation.freq += 1.0;
                    variation.used = true;
                }
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    let result: Vec<SampleSelections> =
        order.into_iter().filter(|t| seen.insert(t.clone())).map(|t| by_tag.remove(&t).unwrap_or_default()).collect();

    let sample_count = result.len() as f32;
    if sample_count > 0.0 {
        for contig in contigs.iter_mut() {
            for variation in &mut contig.variations {
                variation.freq /= sample_count;
            }
        }
    }

    Ok((result, summary))
}

/// Splits a `FORMAT`-prefixed genotype cell on `/` or `|` and returns the first allele index.
/// Both ploidy slots are read positionally; phasing is not distinguished.
fn parse_genotype(field: &str) -> Option<usize> {
    let gt = field.split(':').next()?;
    gt.split(['/', '|']).next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vcf_body() -> &'static str {
        "##fileformat=VCFv4.2\n\
         #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA001\tNA002\n\
         chr1\t3\t.\tC\tG\t.\t.\t.\tGT\t1|0\t0|0\n\
         chr1\t10\t.\tA\t<DEL>\t.\t.\t.\tGT\t1|1\t0|0\n"
    }

    #[test]
    fn populates_variations_and_selections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", vcf_body()).unwrap();
        let mut contigs = vec![Contig::new("chr1", b"ACGTACGTACGT".to_vec(), Position(0))];
        let (result, summary) = read_vcf(&[file.path()], &mut contigs, 1, None, None).unwrap();

        assert_eq!(contigs[0].variations.len(), 1, "the symbolic ALT record must be skipped");
        assert_eq!(summary.symbolic_allele, 1);
        assert_eq!(result.len(), 2);
        let na001 = result.iter().find(|s| s.tag == "NA001").unwrap();
        assert_eq!(na001.selections, vec![(0, 0, 1)]);
        let na002 = result.iter().find(|s| s.tag == "NA002").unwrap();
        assert_eq!(na002.selections, vec![(0, 0, 0)]);

        let variation = &contigs[0].variations[0];
        assert!(variation.used, "NA001 selected a non-reference genotype");
        assert_eq!(variation.freq, 0.5, "one of two samples carries the alt allele");
    }

    #[test]
    fn allow_list_restricts_processed_samples() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", vcf_body()).unwrap();
        let mut contigs = vec![Contig::new("chr1", b"ACGTACGTACGT".to_vec(), Position(0))];
        let allow = vec!["NA002".to_string()];
        let (result, _summary) = read_vcf(&[file.path()], &mut contigs, 1, None, Some(&allow)).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tag, "NA002");
    }

    #[test]
    fn unknown_contig_is_skipped_not_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA001\nchr9\t3\t.\tC\tG\t.\t.\t.\tGT\t1|0\n").unwrap();
        let mut contigs = vec![Contig::new("chr1", b"ACGT".to_vec(), Position(0))];
        let (result, summary) = read_vcf(&[file.path()], &mut contigs, 1, None, None).unwrap();
        assert_eq!(contigs[0].variations.len(), 0);
        assert_eq!(result[0].selections.len(), 0);
        assert_eq!(summary.unknown_contig, 1);
    }
}
