//! Typed, in-memory representations of the documents stored in the
//! metalearning database.
//!
//! Documents reference each other by digest. Entities are therefore built in
//! two phases: every document is first parsed on its own into a `*Document`
//! value holding [`DocumentReference`] stubs, then the corpus builder
//! resolves those stubs into shared, immutable entities once all documents
//! are in memory.

mod data_reference;
mod dataset;
mod document_reference;
mod hyperparam;
mod pipeline;
mod pipeline_run;
mod predictions;
mod primitive;
mod problem;
mod score;

pub use data_reference::{DataReference, DataSource};
pub use dataset::Dataset;
pub use document_reference::DocumentReference;
pub use hyperparam::Hyperparam;
pub use pipeline::{Pipeline, PipelineDocument, PipelineStep, StepDocument, StepMismatch};
pub use pipeline_run::{
    PipelineRun, PipelineRunDocument, PipelineRunPhase, PipelineRunStatus, PredsLoadStatus,
};
pub use predictions::{PredictionValues, Predictions, ValueType};
pub use primitive::Primitive;
pub use problem::{Problem, ProblemInput, ProblemType, Target};
pub use score::Score;

/// Functional equivalence: two entities are tantamount when they do the same
/// thing, even if they are not identical (e.g. differ in digest or
/// hyperparameter values).
pub trait Tantamount {
    fn is_tantamount_to(&self, other: &Self) -> bool;
}

impl<T: Tantamount + ?Sized> Tantamount for std::sync::Arc<T> {
    fn is_tantamount_to(&self, other: &Self) -> bool {
        std::sync::Arc::ptr_eq(self, other) || (**self).is_tantamount_to(&**other)
    }
}

/// Element-wise equivalence of two sequences. Order matters.
pub fn are_lists_tantamount<T: Tantamount>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_tantamount_to(y))
}
