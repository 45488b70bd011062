//! Error types for building and comparing corpus entities.
//!
//! Construction problems (a document the system does not understand) and
//! comparison contract violations are kept apart: the first is raised while
//! the corpus is built, the second while an aggregation is running.

use thiserror::Error;

pub type EntityResult<T> = std::result::Result<T, EntityError>;

/// Failure to construct or resolve an entity from a raw document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntityError {
    /// A mandatory field is absent
    #[error("document must have a(n) {field}")]
    MissingField { field: String },

    /// A field is present but holds the wrong JSON type
    #[error("expected {field} to be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    /// A pipeline step whose `type` is neither PRIMITIVE nor SUBPIPELINE
    #[error("unsupported pipeline step type '{0}'")]
    UnsupportedStepType(String),

    #[error("unknown data reference string '{0}'")]
    InvalidDataReference(String),

    /// A value outside of a closed set, e.g. a run phase or a task type
    #[error("unknown {field} value '{value}'")]
    UnknownVariant { field: &'static str, value: String },

    /// A digest (or id) pointing at a document that is not in the corpus
    #[error("{kind} '{digest}' is referenced but was not loaded")]
    UnresolvedReference { kind: &'static str, digest: String },

    #[error("pipeline '{0}' contains itself as a sub-pipeline")]
    CyclicSubpipeline(String),
}

impl EntityError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidField {
            field: field.into(),
            expected,
        }
    }

    pub fn unknown_variant(field: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            field,
            value: value.into(),
        }
    }

    pub fn unresolved(kind: &'static str, digest: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            digest: digest.into(),
        }
    }

    /// Dangling references may be tolerated by the corpus builder, every
    /// other variant means the document schema is not understood.
    pub fn is_dangling_reference(&self) -> bool {
        matches!(self, Self::UnresolvedReference { .. })
    }
}

/// Failure of an output-difference metric on a pair of prediction series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("predictions must have the same data type ({a} vs {b})")]
    DtypeMismatch { a: String, b: String },

    #[error("predictions must be of the same size ({a} vs {b})")]
    SizeMismatch { a: usize, b: usize },

    #[error("predictions must be numeric ({a} vs {b})")]
    NonNumeric { a: String, b: String },

    #[error("predictions must not have any null values")]
    NullValues,

    #[error("predictions have no dataset rows in common")]
    NoCommonRows,

    #[error("unsupported problem type '{0}'")]
    UnsupportedProblemType(String),
}

/// Output difference between two runs could not be computed. Carries enough
/// context to identify the offending pair without re-running the job.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "output difference for problem type {problem_type} failed.\n\
     run_a.id={run_a}\n\
     run_b.id={run_b}\n\
     preds_a type: {dtype_a}, preds_b type: {dtype_b}\n\
     preds_a data: {sample_a}\n\
     preds_b data: {sample_b}"
)]
pub struct OutputDifferenceError {
    pub run_a: String,
    pub run_b: String,
    pub problem_type: String,
    pub dtype_a: String,
    pub dtype_b: String,
    pub sample_a: String,
    pub sample_b: String,
    #[source]
    pub source: MetricError,
}

impl OutputDifferenceError {
    /// Pairs that merely share no rows are a data-quality gap, not a bug.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.source, MetricError::NoCommonRows)
    }
}
