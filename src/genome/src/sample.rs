use std::sync::Arc;

use crate::contig::Contig;

/// Opaque sample identifier, cloned freely (index into a VCF's sample columns, an allow-list
/// entry, or a standalone-mode file stem).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleTag(pub String);

impl std::fmt::Display for SampleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SampleTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SampleTag {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// One contig's worth of per-sample context: which of the contig's variations this sample
/// retains, and which allele each selects.
///
/// `variation_indices` and `genotypes` are parallel arrays: `genotypes[i]` is the allele index
/// (0 = reference) selected for `contig.variations[variation_indices[i]]`.
#[derive(Debug, Clone)]
pub struct ContigInstance {
    pub contig: Arc<Contig>,
    pub variation_indices: Vec<usize>,
    pub genotypes: Vec<usize>,
}

impl ContigInstance {
    #[must_use]
    pub fn new(contig: Arc<Contig>) -> Self {
        Self { contig, variation_indices: Vec::new(), genotypes: Vec::new() }
    }

    pub fn select(&mut self, variation_index: usize, genotype: usize) {
        self.variation_indices.push(variation_index);
        self.genotypes.push(genotype);
    }
}

/// An identifier plus an ordered sequence of contig-instances.
///
/// Invariant (SPEC_FULL.md §3): a sample references each contig at most once per output pass.
#[derive(Debug, Clone)]
pub struct Sample {
    pub tag: SampleTag,
    pub contigs: Vec<ContigInstance>,
}

impl Sample {
    #[must_use]
    pub fn new(tag: SampleTag) -> Self {
        Self { tag, contigs: Vec::new() }
    }

    /// Appends a contig-instance, enforcing the at-most-once-per-contig invariant.
    ///
    /// # Errors
    /// Returns the duplicate contig's name if it was already appended.
    pub fn push_contig(&mut self, instance: ContigInstance) -> Result<(), String> {
        if self.contigs.iter().any(|c| c.contig.name == instance.contig.name) {
            return Err(instance.contig.name.clone());
        }
        self.contigs.push(instance);
        Ok(())
    }
}
