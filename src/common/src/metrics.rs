//! Output-difference metrics: how differently two runs predicted the same
//! dataset rows.

use crate::entities::{PredictionValues, Predictions, ProblemType};
use crate::errors::MetricError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricProblemType {
    /// Classifier Output Difference
    Cod,
    /// Regressor Output Difference
    Rod,
}

impl MetricProblemType {
    pub const ALL: [MetricProblemType; 2] = [MetricProblemType::Cod, MetricProblemType::Rod];

    pub fn supported_problem_types(&self) -> &'static [ProblemType] {
        match self {
            MetricProblemType::Cod => &[
                ProblemType::Classification,
                ProblemType::SemisupervisedClassification,
                ProblemType::VertexClassification,
            ],
            MetricProblemType::Rod => &[ProblemType::Regression, ProblemType::TimeSeriesForecasting],
        }
    }

    /// Union of the problem types any metric can handle.
    pub fn supported_types() -> BTreeSet<ProblemType> {
        Self::ALL
            .iter()
            .flat_map(|metric| metric.supported_problem_types().iter().copied())
            .collect()
    }

    pub fn for_problem_type(problem_type: ProblemType) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.supported_problem_types().contains(&problem_type))
    }

    pub fn compute(&self, a: &PredictionValues, b: &PredictionValues) -> Result<f64, MetricError> {
        match self {
            MetricProblemType::Cod => calculate_cod(a, b),
            MetricProblemType::Rod => calculate_rod(a, b),
        }
    }
}

impl fmt::Display for MetricProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricProblemType::Cod => f.write_str("COD"),
            MetricProblemType::Rod => f.write_str("ROD"),
        }
    }
}

fn ensure_same_size(a: &PredictionValues, b: &PredictionValues) -> Result<(), MetricError> {
    if a.len() != b.len() {
        return Err(MetricError::SizeMismatch {
            a: a.len(),
            b: b.len(),
        });
    }
    Ok(())
}

fn ratio_of_differences<T: PartialEq>(a: &[Option<T>], b: &[Option<T>]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    // two missing predictions agree
    let differences = a.iter().zip(b).filter(|(x, y)| x != y).count();
    differences as f64 / a.len() as f64
}

/// Ratio of rows on which the two classifiers disagree.
pub fn calculate_cod(a: &PredictionValues, b: &PredictionValues) -> Result<f64, MetricError> {
    ensure_same_size(a, b)?;
    match (a, b) {
        (PredictionValues::Numeric(a), PredictionValues::Numeric(b)) => Ok(ratio_of_differences(a, b)),
        (PredictionValues::Text(a), PredictionValues::Text(b)) => Ok(ratio_of_differences(a, b)),
        _ => Err(MetricError::DtypeMismatch {
            a: a.value_type().to_string(),
            b: b.value_type().to_string(),
        }),
    }
}

/// Euclidean distance between the two regressors' predictions.
pub fn calculate_rod(a: &PredictionValues, b: &PredictionValues) -> Result<f64, MetricError> {
    ensure_same_size(a, b)?;
    let (PredictionValues::Numeric(a), PredictionValues::Numeric(b)) = (a, b) else {
        return Err(MetricError::NonNumeric {
            a: a.value_type().to_string(),
            b: b.value_type().to_string(),
        });
    };
    let squared_sum = a.iter().zip(b).try_fold(0.0, |sum, pair| match pair {
        (Some(x), Some(y)) => Ok(sum + (x - y).powi(2)),
        _ => Err(MetricError::NullValues),
    })?;
    Ok(f64::sqrt(squared_sum))
}

/// Aligns both prediction sets on row index, then applies the metric
/// registered for `problem_type`.
pub fn calculate_output_difference(
    problem_type: ProblemType,
    a: &Predictions,
    b: &Predictions,
) -> Result<(f64, MetricProblemType), MetricError> {
    let metric = MetricProblemType::for_problem_type(problem_type)
        .ok_or_else(|| MetricError::UnsupportedProblemType(problem_type.to_string()))?;
    let (common_a, common_b) = Predictions::find_common(a, b);
    if common_a.is_empty() {
        return Err(MetricError::NoCommonRows);
    }
    Ok((metric.compute(&common_a, &common_b)?, metric))
}
