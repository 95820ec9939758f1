use std::sync::Arc;

use crate::{position::Position, variation::Variation};

/// A named linear reference sequence (e.g. a chromosome), shared read-only across every
/// sample that instantiates it.
///
/// `reference` is an `Arc<[u8]>` rather than an owned `Vec<u8>` so every contig-instance
/// (one per sample that touches this contig, see [`crate::sample::ContigInstance`]) can hold
/// a cheap clone of the handle without copying sequence bytes — the memory discipline
/// SPEC_FULL.md §5 requires ("the reference ... [is] allocated once and referenced by all
/// contig iterators").
#[derive(Debug, Clone)]
pub struct Contig {
    pub name: String,
    pub reference: Arc<[u8]>,
    /// Offset of this contig's first reference byte within the whole-reference concatenation.
    pub global_offset: Position,
    /// Every variation known for this contig, in ascending `pos` order, regardless of which
    /// samples use them. A sample only consults a subset via [`crate::sample::ContigInstance`].
    pub variations: Vec<Variation>,
}

impl Contig {
    #[must_use]
    pub fn new(name: impl Into<String>, reference: Vec<u8>, global_offset: Position) -> Self {
        Self { name: name.into(), reference: Arc::from(reference), global_offset, variations: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Inserts `variation` in position order, rejecting it (returning `false`) if it
    /// overlaps an already-retained variation on this contig.
    pub fn add_variation(&mut self, variation: Variation) -> bool {
        if self.variations.iter().any(|existing| existing.overlaps(&variation)) {
            return false;
        }
        let idx = self.variations.partition_point(|v| v.pos < variation.pos);
        self.variations.insert(idx, variation);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlapping_variation() {
        let mut contig = Contig::new("chr1", b"ACGTACGTACGT".to_vec(), Position(0));
        assert!(contig.add_variation(Variation::new(Position(2), 3, vec![b"CGT".to_vec(), b"A".to_vec()])));
        assert!(!contig.add_variation(Variation::new(Position(3), 2, vec![b"GT".to_vec(), b"C".to_vec()])));
        assert_eq!(contig.variations.len(), 1);
    }

    #[test]
    fn keeps_variations_sorted() {
        let mut contig = Contig::new("chr1", b"ACGTACGTACGT".to_vec(), Position(0));
        contig.add_variation(Variation::new(Position(8), 1, vec![b"A".to_vec(), b"C".to_vec()]));
        contig.add_variation(Variation::new(Position(2), 1, vec![b"G".to_vec(), b"T".to_vec()]));
        let positions: Vec<u64> = contig.variations.iter().map(|v| v.pos.0).collect();
        assert_eq!(positions, vec![2, 8]);
    }
}
