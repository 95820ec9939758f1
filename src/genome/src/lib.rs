pub mod alphabet;
pub mod position;
pub mod variation;
pub mod contig;
pub mod sample;
pub mod haplotype;

pub use contig::Contig;
pub use haplotype::{ContigIterator, HaplotypeError, SampleIterator};
pub use position::Position;
pub use sample::{ContigInstance, Sample, SampleTag};
pub use variation::Variation;
