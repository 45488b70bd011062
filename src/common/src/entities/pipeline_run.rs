use crate::constants::D3M_INDEX_COLUMN;
use crate::entities::{
    are_lists_tantamount, Dataset, DocumentReference, Pipeline, PredictionValues, Predictions,
    Problem, Score, Tantamount,
};
use crate::errors::{EntityError, EntityResult, MetricError, OutputDifferenceError};
use crate::metrics::{calculate_output_difference, MetricProblemType};
use crate::utils::{enforce_field, JsonExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineRunStatus {
    Success,
    Failure,
}

impl TryFrom<&str> for PipelineRunStatus {
    type Error = EntityError;

    fn try_from(state: &str) -> EntityResult<Self> {
        match state {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            other => Err(EntityError::unknown_variant("status.state", other)),
        }
    }
}

/// Training (FIT) or held-out evaluation (PRODUCE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PipelineRunPhase {
    Fit,
    Produce,
}

impl fmt::Display for PipelineRunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fit => f.pad("FIT"),
            Self::Produce => f.pad("PRODUCE"),
        }
    }
}

impl TryFrom<&str> for PipelineRunPhase {
    type Error = EntityError;

    fn try_from(phase: &str) -> EntityResult<Self> {
        match phase {
            "FIT" => Ok(Self::Fit),
            "PRODUCE" => Ok(Self::Produce),
            other => Err(EntityError::unknown_variant("run.phase", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredsLoadStatus {
    NotTried,
    Usable,
    NotUsable,
}

fn parse_timestamp(document: &Value, field: &str) -> EntityResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(document.required_str(field)?)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| EntityError::invalid(field, "an RFC 3339 timestamp"))
}

/// First phase of run construction: the pipeline, problem and datasets are
/// still digest stubs.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRunDocument {
    pub id: String,
    pub status: PipelineRunStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub submitter: Option<String>,
    pub run_phase: PipelineRunPhase,
    pub scores: Vec<Score>,
    pub prediction_headers: Vec<String>,
    pub datasets: Vec<DocumentReference>,
    pub pipeline: DocumentReference,
    pub problem: DocumentReference,
}

impl PipelineRunDocument {
    pub fn from_document(document: &Value, should_enforce_id: bool) -> EntityResult<Self> {
        enforce_field(should_enforce_id, document, "id")?;

        let scores = match document.get_path(&["run", "results", "scores"]) {
            Some(Value::Array(scores)) => scores
                .iter()
                .map(Score::try_from)
                .collect::<EntityResult<Vec<_>>>()?,
            Some(_) => return Err(EntityError::invalid("run.results.scores", "an array")),
            None => Vec::new(),
        };

        let prediction_headers = match document.get_path(&["run", "results", "predictions", "header"]) {
            Some(Value::Array(header)) => header
                .iter()
                .map(|column| {
                    column
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| EntityError::invalid("run.results.predictions.header", "a list of strings"))
                })
                .collect::<EntityResult<Vec<_>>>()?,
            _ => Vec::new(),
        };

        let datasets = document
            .required_vec("datasets")?
            .iter()
            .map(DocumentReference::try_from)
            .collect::<EntityResult<Vec<_>>>()?;

        Ok(Self {
            id: document.required_string("id")?,
            status: document.required_path_str(&["status", "state"])?.try_into()?,
            start: parse_timestamp(document, "start")?,
            end: parse_timestamp(document, "end")?,
            submitter: document.optional_string("_submitter")?,
            run_phase: document.required_path_str(&["run", "phase"])?.try_into()?,
            scores,
            prediction_headers,
            datasets,
            pipeline: DocumentReference::try_from(document.required("pipeline")?)?,
            problem: DocumentReference::try_from(document.required("problem")?)?,
        })
    }

    /// Second phase: binds the shared entities the stubs pointed at.
    pub fn resolve(
        self,
        pipeline: Arc<Pipeline>,
        problem: Arc<Problem>,
        datasets: Vec<Arc<Dataset>>,
    ) -> PipelineRun {
        let mut run = PipelineRun {
            id: self.id,
            status: self.status,
            start: self.start,
            end: self.end,
            submitter: self.submitter,
            run_phase: self.run_phase,
            scores: self.scores,
            prediction_headers: self.prediction_headers,
            datasets,
            pipeline,
            problem,
            preds_load_status: PredsLoadStatus::NotTried,
        };
        if !run.has_readable_prediction_layout() {
            run.preds_load_status = PredsLoadStatus::NotUsable;
        }
        run
    }
}

/// A resolved pipeline run. Immutable once the corpus is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub id: String,
    pub status: PipelineRunStatus,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub submitter: Option<String>,
    pub run_phase: PipelineRunPhase,
    pub scores: Vec<Score>,
    pub prediction_headers: Vec<String>,
    pub datasets: Vec<Arc<Dataset>>,
    pub pipeline: Arc<Pipeline>,
    pub problem: Arc<Problem>,
    /// Only ever NotTried or NotUsable here; whether the blob itself loads
    /// is tracked by the predictions cache.
    pub preds_load_status: PredsLoadStatus,
}

impl PipelineRun {
    pub fn was_successful(&self) -> bool {
        self.status == PipelineRunStatus::Success
    }

    pub fn was_run_on_test_set(&self) -> bool {
        self.run_phase == PipelineRunPhase::Produce
    }

    pub fn num_targets_predicting(&self) -> usize {
        self.problem.num_targets()
    }

    /// Predictions are only usable with an index column and a single
    /// target.
    fn has_readable_prediction_layout(&self) -> bool {
        self.prediction_headers.iter().any(|column| column == D3M_INDEX_COLUMN)
            && self.num_targets_predicting() <= 1
    }

    pub fn dataset_digests(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(|dataset| dataset.digest.as_str())
    }

    /// Whether comparing the two runs' pipelines is meaningful: same
    /// datasets in the same order, same phase and status, tantamount
    /// problems.
    pub fn is_same_problem_and_context_as(&self, other: &PipelineRun) -> bool {
        are_lists_tantamount(&self.datasets, &other.datasets)
            && self.run_phase == other.run_phase
            && self.status == other.status
            && self.problem.is_tantamount_to(&other.problem)
    }

    pub fn is_one_step_off_from(&self, other: &PipelineRun) -> bool {
        self.is_same_problem_and_context_as(other) && self.pipeline.step_distance(&other.pipeline) == 1
    }

    /// Scores of ours that match one of `other`'s within `tolerance`.
    pub fn find_common_scores(&self, other: &PipelineRun, tolerance: f64) -> Vec<&Score> {
        self.scores
            .iter()
            .filter(|mine| {
                other
                    .scores
                    .iter()
                    .any(|theirs| mine.is_tantamount_to_with_tolerance(theirs, tolerance))
            })
            .collect()
    }

    /// Metric name to (our score, their score) for every metric both runs
    /// report.
    pub fn get_scores_of_common_metrics<'a>(
        &'a self,
        other: &'a PipelineRun,
    ) -> BTreeMap<&'a str, (&'a Score, &'a Score)> {
        let mut common = BTreeMap::new();
        for ours in &self.scores {
            for theirs in &other.scores {
                if ours.metric == theirs.metric {
                    common.insert(ours.metric.as_str(), (ours, theirs));
                }
            }
        }
        common
    }

    /// Reads this run's predictions out of its side-store blob.
    ///
    /// The blob's `run.results.predictions.values` is column major and
    /// aligned to the header. The index column is `d3mIndex`, the value
    /// column is the problem's target column, or the only other column of a
    /// two-column header. Returns `None` on any deviation.
    pub fn predictions_from_blob(&self, blob: &Value) -> Option<Predictions> {
        if self.preds_load_status == PredsLoadStatus::NotUsable {
            return None;
        }
        let predictions = blob.get_path(&["run", "results", "predictions"])?;
        let columns = predictions.optional("values")?.as_array()?;

        let blob_header: Option<Vec<&str>> = predictions
            .optional("header")
            .and_then(Value::as_array)
            .map(|header| header.iter().filter_map(Value::as_str).collect());
        let header: Vec<&str> = match blob_header {
            Some(header) => header,
            None => self.prediction_headers.iter().map(String::as_str).collect(),
        };
        if header.len() != columns.len() {
            return None;
        }

        let index_position = header.iter().position(|&column| column == D3M_INDEX_COLUMN)?;
        let value_position = match self
            .problem
            .target_column_name()
            .and_then(|target| header.iter().position(|&column| column == target))
        {
            Some(position) => position,
            None if header.len() == 2 => 1 - index_position,
            None => return None,
        };

        let indices = columns[index_position]
            .as_array()?
            .iter()
            .map(|index| match index {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect::<Option<Vec<i64>>>()?;
        let values = PredictionValues::from_raw(columns[value_position].as_array()?);
        Predictions::new(indices, values)
    }

    /// Output difference between this run's predictions and `other`'s,
    /// using the metric registered for the (shared) problem type.
    pub fn get_output_difference_from(
        &self,
        other: &PipelineRun,
        ours: &Predictions,
        theirs: &Predictions,
    ) -> Result<(f64, MetricProblemType), OutputDifferenceError> {
        let result = match self.problem.problem_type {
            Some(problem_type) => calculate_output_difference(problem_type, ours, theirs),
            None => Err(MetricError::UnsupportedProblemType("NONE".to_string())),
        };
        result.map_err(|source| OutputDifferenceError {
            run_a: self.id.clone(),
            run_b: other.id.clone(),
            problem_type: self
                .problem
                .problem_type
                .map_or_else(|| "NONE".to_string(), |problem_type| problem_type.to_string()),
            dtype_a: ours.value_type().to_string(),
            dtype_b: theirs.value_type().to_string(),
            sample_a: ours.values().sample(),
            sample_b: theirs.values().sample(),
            source,
        })
    }
}
