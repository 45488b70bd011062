pub mod basic_stats;
pub mod cache;
pub mod duplicate_pipelines;
pub mod primitive_pairs;

pub use basic_stats::{compute_basic_stats, BasicStats};
pub use cache::JobCache;
pub use duplicate_pipelines::{find_duplicate_pipelines, DuplicatePipelinesReport};
pub use primitive_pairs::{
    compare_primitive_pairs, is_valid_for_comparison, PipelineRunPairDiffEntry,
    PrimitivePairComparison, ScoreDiff,
};
