//! Rolling hash, phrase dictionary, reference parse, sample-parse segmentation, AuPair
//! contraction and the supporting indexed max-PQ / linked-list primitives.

pub mod aupair;
pub mod dictionary;
pub mod indexed_pq;
pub mod linked_list;
pub mod reference_parse;
pub mod rolling_hash;
pub mod sample_parser;
pub mod segmenter;

pub use aupair::AuPairOutput;
pub use dictionary::{DictionaryError, FinalizedDictionary, PhraseDictionary};
pub use indexed_pq::{IndexedMaxPQ, IndexedPqError};
pub use linked_list::LinkedList;
pub use reference_parse::{build as build_reference_parse, ContigReferenceParse, ReferenceParse};
pub use rolling_hash::RollingHash;
pub use sample_parser::{parse_sample, parse_standalone, WorkerSampleOutput};
pub use segmenter::Segmenter;
