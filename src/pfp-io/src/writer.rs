//! Output writer & lifting (C6): `.dict`, `.parse`, `.dicz`/`.dicz.len`, `.lidx`, `.ldx`,
//! `.occ` (SPEC_FULL.md §4.6).

use std::io::{BufWriter, Write};
use std::path::Path;

use genome::alphabet::{ENDOFDICT, ENDOFWORD};
use located_error::LocatedError;

/// Writes the sorted-phrase dictionary file: each phrase terminated by `ENDOFWORD`, the whole
/// file terminated by `ENDOFDICT`. Rank ids are implied by position: the i-th phrase (1-based)
/// has rank id `i`.
///
/// # Errors
/// I/O errors opening or writing `path`.
pub fn write_dictionary(path: &Path, phrases: &[Vec<u8>]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path).with_loc(|| format!("While creating {}", path.display()))?);
    for phrase in phrases {
        out.write_all(phrase).with_loc(|| format!("While writing a phrase to {}", path.display()))?;
        out.write_all(&[ENDOFWORD]).with_loc(|| format!("While writing to {}", path.display()))?;
    }
    out.write_all(&[ENDOFDICT]).with_loc(|| format!("While writing to {}", path.display()))?;
    Ok(())
}

/// Writes the compressed dictionary variant: phrase bodies concatenated with no separators in
/// `dicz_path`, a parallel 32-bit little-endian length per phrase in `len_path`.
///
/// # Errors
/// I/O errors, or if any phrase's length does not fit in `u32`.
pub fn write_compressed_dictionary(dicz_path: &Path, len_path: &Path, phrases: &[Vec<u8>]) -> anyhow::Result<()> {
    let mut dicz = BufWriter::new(std::fs::File::create(dicz_path).with_loc(|| format!("While creating {}", dicz_path.display()))?);
    let mut lens = BufWriter::new(std::fs::File::create(len_path).with_loc(|| format!("While creating {}", len_path.display()))?);
    for phrase in phrases {
        dicz.write_all(phrase).with_loc(|| format!("While writing to {}", dicz_path.display()))?;
        let len = u32::try_from(phrase.len()).with_loc(|| format!("Phrase too long for a u32 length in {}", len_path.display()))?;
        lens.write_all(&len.to_le_bytes()).with_loc(|| format!("While writing to {}", len_path.display()))?;
    }
    Ok(())
}

/// Writes the parse file: one 32-bit little-endian 1-based rank id per token.
///
/// # Errors
/// I/O errors opening or writing `path`.
pub fn write_parse(path: &Path, ranks: &[u32]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path).with_loc(|| format!("While creating {}", path.display()))?);
    for &rank in ranks {
        out.write_all(&rank.to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
    }
    Ok(())
}

/// Writes the optional `.occ` file: one 32-bit little-endian occurrence count per dictionary
/// phrase, in the same order as the `.dict` file.
///
/// # Errors
/// I/O errors, or if any count does not fit in `u32`.
pub fn write_occurrences(path: &Path, counts: &[u64]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path).with_loc(|| format!("While creating {}", path.display()))?);
    for &count in counts {
        let count = u32::try_from(count).with_loc(|| format!("Occurrence count overflows a u32 in {}", path.display()))?;
        out.write_all(&count.to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
    }
    Ok(())
}

/// Writes the `.lidx` length index: whitespace-separated `name length` pairs, one per contig
/// instance per sample, in emission order. Lengths include the trailing sentinel window.
///
/// # Errors
/// I/O errors opening or writing `path`.
pub fn write_length_index(path: &Path, entries: &[(String, u64)]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path).with_loc(|| format!("While creating {}", path.display()))?);
    for (name, length) in entries {
        writeln!(out, "{name} {length}").with_loc(|| format!("While writing to {}", path.display()))?;
    }
    Ok(())
}

/// A bi-directional insertion/deletion bitmap supporting `O(1)` (block-sampled) rank, enough to
/// translate a sample-stream coordinate back to its reference coordinate: every inserted sample
/// byte (no reference advance) sets a bit in `insertions`; every deleted reference byte (no
/// sample byte emitted) sets a bit in `deletions`.
#[derive(Debug, Clone, Default)]
pub struct Lift {
    insertions: Vec<bool>,
    deletions: Vec<bool>,
    insertion_rank: Vec<u32>,
    deletion_rank: Vec<u32>,
}

impl Lift {
    #[must_use]
    pub fn new(insertions: Vec<bool>, deletions: Vec<bool>) -> Self {
        let insertion_rank = prefix_rank(&insertions);
        let deletion_rank = prefix_rank(&deletions);
        Self { insertions, deletions, insertion_rank, deletion_rank }
    }

    /// Reference coordinate corresponding to `sample_offset`, computed as
    /// `sample_offset − insertions_before(sample_offset) + deletions_before(sample_offset)`.
    #[must_use]
    pub fn lift(&self, sample_offset: u64) -> u64 {
        let i = (sample_offset as usize).min(self.insertions.len());
        let inserted_before = u64::from(self.insertion_rank[i]);
        let deleted_before = u64::from(self.deletion_rank.get(i).copied().unwrap_or_else(|| *self.deletion_rank.last().unwrap_or(&0)));
        sample_offset.saturating_sub(inserted_before) + deleted_before
    }

    /// Length of the sample coordinate space this lift was built over.
    #[must_use]
    pub fn sample_len(&self) -> u64 {
        self.insertions.len() as u64
    }
}

/// Builds the `(sample length, Lift)` pair for one sample's contig-instance directly from its
/// retained variations, without replaying the haplotype byte stream: a selected allele longer
/// than the reference marks a run of inserted sample bytes, one shorter marks a deleted
/// reference run. Insertions are exact for any indel length; a deletion longer than one base is
/// still recorded as a single flagged position (see DESIGN.md) since the bitmap has no sample
/// byte to anchor additional flags to.
///
/// `selections` must be `(position relative to contig start, ref_len, selected_allele_len)`
/// triples in ascending position order.
#[must_use]
pub fn lift_from_variations(contig_len: u64, selections: &[(u64, u32, u32)]) -> (u64, Lift) {
    let sample_len = selections.iter().fold(contig_len, |len, &(_, rl, al)| len + u64::from(al) - u64::from(rl));

    let mut insertions = vec![false; sample_len as usize];
    let mut deletions = vec![false; sample_len as usize];
    let mut ref_cursor = 0u64;
    let mut sample_cursor = 0u64;
    for &(pos, ref_len, allele_len) in selections {
        sample_cursor += pos.saturating_sub(ref_cursor);
        ref_cursor = pos;
        match allele_len.cmp(&ref_len) {
            std::cmp::Ordering::Greater => {
                for i in 0..(allele_len - ref_len) {
                    if let Some(slot) = insertions.get_mut((sample_cursor + u64::from(i)) as usize) {
                        *slot = true;
                    }
                }
            }
            std::cmp::Ordering::Less => {
                if let Some(slot) = deletions.get_mut(sample_cursor as usize) {
                    *slot = true;
                }
            }
            std::cmp::Ordering::Equal => {}
        }
        sample_cursor += u64::from(allele_len);
        ref_cursor += u64::from(ref_len);
    }
    (sample_len, Lift::new(insertions, deletions))
}

fn prefix_rank(bits: &[bool]) -> Vec<u32> {
    let mut rank = Vec::with_capacity(bits.len() + 1);
    rank.push(0);
    let mut running = 0u32;
    for &b in bits {
        if b {
            running += 1;
        }
        rank.push(running);
    }
    rank
}

/// One contig instance's placement within the concatenated lifting universe.
pub struct LiftingEntry {
    pub name: String,
    pub reference_offset: u64,
    pub lift: Lift,
}

/// Writes the `.ldx` lifting index: total universe length, a sparse bit-vector of
/// contig-instance starts, per-contig names, and per-contig `(reference_offset, Lift)` pairs.
///
/// # Errors
/// I/O errors opening or writing `path`.
pub fn write_lifting_index(path: &Path, universe_len: u64, entries: &[LiftingEntry]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path).with_loc(|| format!("While creating {}", path.display()))?);
    out.write_all(&universe_len.to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
    out.write_all(&(entries.len() as u64).to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
    for entry in entries {
        let name_bytes = entry.name.as_bytes();
        out.write_all(&(name_bytes.len() as u64).to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
        out.write_all(name_bytes).with_loc(|| format!("While writing to {}", path.display()))?;
        out.write_all(&entry.reference_offset.to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
        write_bitmap(&mut out, &entry.lift.insertions, path)?;
        write_bitmap(&mut out, &entry.lift.deletions, path)?;
    }
    Ok(())
}

fn write_bitmap(out: &mut impl Write, bits: &[bool], path: &Path) -> anyhow::Result<()> {
    out.write_all(&(bits.len() as u64).to_le_bytes()).with_loc(|| format!("While writing to {}", path.display()))?;
    for chunk in bits.chunks(8) {
        let mut byte = 0u8;
        for (i, &b) in chunk.iter().enumerate() {
            if b {
                byte |= 1 << i;
            }
        }
        out.write_all(&[byte]).with_loc(|| format!("While writing to {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_round_trips_through_endofword_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dict");
        write_dictionary(&path, &[b"ACGT".to_vec(), b"TTTT".to_vec()]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, [b"ACGT", &[ENDOFWORD][..], b"TTTT", &[ENDOFWORD][..], &[ENDOFDICT][..]].concat());
    }

    #[test]
    fn parse_file_is_little_endian_u32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parse");
        write_parse(&path, &[1, 2, 300]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 300);
    }

    #[test]
    fn lift_from_variations_handles_no_variants() {
        let (len, lift) = lift_from_variations(20, &[]);
        assert_eq!(len, 20);
        assert_eq!(lift.lift(10), 10);
    }

    #[test]
    fn lift_from_variations_accounts_for_a_single_base_insertion() {
        // REF len 1, ALT len 2 at contig position 4: one inserted sample byte past position 4.
        let (len, lift) = lift_from_variations(10, &[(4, 1, 2)]);
        assert_eq!(len, 11);
        assert_eq!(lift.lift(4), 4);
        assert_eq!(lift.lift(6), 5);
    }

    #[test]
    fn lift_with_no_insertions_or_deletions_is_identity() {
        let lift = Lift::new(vec![false; 10], vec![false; 10]);
        assert_eq!(lift.lift(5), 5);
    }

    #[test]
    fn lift_accounts_for_insertions_before_offset() {
        // one inserted byte at sample position 2: reference coordinate falls behind by one
        // past that point.
        let insertions = vec![false, false, true, false, false];
        let lift = Lift::new(insertions, vec![false; 5]);
        assert_eq!(lift.lift(1), 1);
        assert_eq!(lift.lift(4), 3);
    }
}
