use crate::entities::{are_lists_tantamount, Tantamount};
use crate::errors::{EntityError, EntityResult};
use crate::utils::{enforce_field, JsonExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// D3M task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemType {
    Classification,
    Regression,
    Clustering,
    LinkPrediction,
    VertexNomination,
    VertexClassification,
    CommunityDetection,
    GraphMatching,
    TimeSeriesForecasting,
    CollaborativeFiltering,
    ObjectDetection,
    SemisupervisedClassification,
    SemisupervisedRegression,
}

impl ProblemType {
    pub const ALL: [ProblemType; 13] = [
        ProblemType::Classification,
        ProblemType::Regression,
        ProblemType::Clustering,
        ProblemType::LinkPrediction,
        ProblemType::VertexNomination,
        ProblemType::VertexClassification,
        ProblemType::CommunityDetection,
        ProblemType::GraphMatching,
        ProblemType::TimeSeriesForecasting,
        ProblemType::CollaborativeFiltering,
        ProblemType::ObjectDetection,
        ProblemType::SemisupervisedClassification,
        ProblemType::SemisupervisedRegression,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemType::Classification => "CLASSIFICATION",
            ProblemType::Regression => "REGRESSION",
            ProblemType::Clustering => "CLUSTERING",
            ProblemType::LinkPrediction => "LINK_PREDICTION",
            ProblemType::VertexNomination => "VERTEX_NOMINATION",
            ProblemType::VertexClassification => "VERTEX_CLASSIFICATION",
            ProblemType::CommunityDetection => "COMMUNITY_DETECTION",
            ProblemType::GraphMatching => "GRAPH_MATCHING",
            ProblemType::TimeSeriesForecasting => "TIME_SERIES_FORECASTING",
            ProblemType::CollaborativeFiltering => "COLLABORATIVE_FILTERING",
            ProblemType::ObjectDetection => "OBJECT_DETECTION",
            ProblemType::SemisupervisedClassification => "SEMISUPERVISED_CLASSIFICATION",
            ProblemType::SemisupervisedRegression => "SEMISUPERVISED_REGRESSION",
        }
    }
}

impl FromStr for ProblemType {
    type Err = EntityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ProblemType::ALL
            .into_iter()
            .find(|problem_type| problem_type.as_str() == input)
            .ok_or_else(|| EntityError::unknown_variant("task_type", input))
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub column_name: String,
    pub column_index: i64,
}

impl TryFrom<&Value> for Target {
    type Error = EntityError;

    fn try_from(target: &Value) -> EntityResult<Self> {
        let column_index = target
            .required("column_index")?
            .as_i64()
            .ok_or_else(|| EntityError::invalid("column_index", "an integer"))?;
        Ok(Self {
            column_name: target.required_string("column_name")?,
            column_index,
        })
    }
}

impl Tantamount for Target {
    fn is_tantamount_to(&self, other: &Self) -> bool {
        self.column_name == other.column_name && self.column_index == other.column_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemInput {
    pub dataset_id: String,
    pub targets: Vec<Target>,
}

impl TryFrom<&Value> for ProblemInput {
    type Error = EntityError;

    fn try_from(input: &Value) -> EntityResult<Self> {
        let targets = match input.optional_vec("targets")? {
            Some(targets) => targets
                .iter()
                .map(Target::try_from)
                .collect::<EntityResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            dataset_id: input.required_string("dataset_id")?,
            targets,
        })
    }
}

impl Tantamount for ProblemInput {
    fn is_tantamount_to(&self, other: &Self) -> bool {
        self.dataset_id == other.dataset_id && are_lists_tantamount(&self.targets, &other.targets)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub digest: String,
    pub name: Option<String>,
    pub problem_type: Option<ProblemType>,
    pub subtype: Option<String>,
    /// Sorted, so metric order in the document does not matter.
    pub metrics: Vec<String>,
    pub inputs: Vec<ProblemInput>,
}

impl Problem {
    pub fn from_document(document: &Value, should_enforce_id: bool) -> EntityResult<Self> {
        enforce_field(should_enforce_id, document, "digest")?;

        let mut metrics = match document.optional_vec("performance_metrics")? {
            Some(metrics) => metrics
                .iter()
                .map(|metric| metric.required_string("metric"))
                .collect::<EntityResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        metrics.sort();

        let inputs = match document.optional_vec("inputs")? {
            Some(inputs) => inputs
                .iter()
                .map(ProblemInput::try_from)
                .collect::<EntityResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let subtype = document
            .get_path(&["problem", "task_subtype"])
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            digest: document.required_string("digest")?,
            name: document.optional_string("name")?,
            problem_type: parse_problem_type(document)?,
            subtype,
            metrics,
            inputs,
        })
    }

    /// The column the problem asks to predict, when it names exactly one.
    pub fn target_column_name(&self) -> Option<&str> {
        self.inputs
            .first()
            .and_then(|input| input.targets.first())
            .map(|target| target.column_name.as_str())
    }

    pub fn num_targets(&self) -> usize {
        self.inputs.iter().map(|input| input.targets.len()).sum()
    }
}

/// Older problem documents name `task_type` directly, newer ones list it
/// among `task_keywords`, either as a plain string or as an object whose
/// description reads `TaskKeyword.<TYPE>`.
fn parse_problem_type(document: &Value) -> EntityResult<Option<ProblemType>> {
    if let Some(task_type) = document.get_path(&["problem", "task_type"]) {
        let task_type = task_type
            .as_str()
            .ok_or_else(|| EntityError::invalid("problem.task_type", "a string"))?;
        return task_type.parse().map(Some);
    }

    let Some(keywords) = document
        .get_path(&["problem", "task_keywords"])
        .and_then(Value::as_array)
    else {
        return Ok(None);
    };

    for keyword in keywords {
        let keyword = match keyword {
            Value::String(keyword) => keyword.as_str(),
            Value::Object(_) => keyword
                .required_str("description")?
                .trim_start_matches("TaskKeyword."),
            _ => continue,
        };
        if let Ok(problem_type) = keyword.parse() {
            return Ok(Some(problem_type));
        }
    }
    Ok(None)
}

impl Tantamount for Problem {
    /// Same metrics, inputs and type. Name and digest are ignored.
    fn is_tantamount_to(&self, other: &Self) -> bool {
        self.metrics == other.metrics
            && are_lists_tantamount(&self.inputs, &other.inputs)
            && self.problem_type == other.problem_type
    }
}
