pub mod corpus;
pub mod extractor;
pub mod index;
pub mod predictions;

pub use corpus::{CorpusBuilder, EntityMaps};
pub use extractor::{extract_denormalized, ExtractOptions};
pub use index::{DumpReader, Index};
pub use predictions::{
    DirPredictionsStore, InMemoryPredictionsStore, PredictionsCache, PredictionsLoad,
    PredictionsStore,
};
