use crate::errors::{EntityError, EntityResult};
use crate::utils::JsonExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub metric: String,
    pub value: f64,
    /// `value` scaled into [0, 1], higher is better
    pub normalized: Option<f64>,
}

impl Score {
    /// Same metric and raw values no further apart than `tolerance`.
    pub fn is_tantamount_to_with_tolerance(&self, other: &Score, tolerance: f64) -> bool {
        self.metric == other.metric && (self.value - other.value).abs() <= tolerance
    }
}

impl TryFrom<&Value> for Score {
    type Error = EntityError;

    fn try_from(score: &Value) -> EntityResult<Self> {
        Ok(Self {
            metric: score.required_path_str(&["metric", "metric"])?.to_string(),
            value: score.required_f64("value")?,
            normalized: score.optional_f64("normalized")?,
        })
    }
}
