use crate::constants::PREDICTION_SAMPLE_LEN;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Numeric,
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Numeric => f.write_str("numeric"),
            ValueType::Text => f.write_str("text"),
        }
    }
}

/// A typed column of predicted values. `None` is a missing prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum PredictionValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl PredictionValues {
    /// Types a raw column: numeric when every present value is a number or
    /// a string holding one, text otherwise. Nulls and empty strings are
    /// missing values.
    pub fn from_raw(raw: &[Value]) -> Self {
        let numeric: Option<Vec<Option<f64>>> = raw
            .iter()
            .map(|value| match value {
                Value::Null => Some(None),
                Value::Number(n) => n.as_f64().map(Some),
                Value::String(s) if s.trim().is_empty() => Some(None),
                // "NaN" and "inf" are labels, not numbers
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|number| number.is_finite())
                    .map(Some),
                _ => None,
            })
            .collect();

        match numeric {
            Some(values) => PredictionValues::Numeric(values),
            None => PredictionValues::Text(
                raw.iter()
                    .map(|value| match value {
                        Value::Null => None,
                        Value::String(s) if s.is_empty() => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PredictionValues::Numeric(_) => ValueType::Numeric,
            PredictionValues::Text(_) => ValueType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PredictionValues::Numeric(values) => values.len(),
            PredictionValues::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps the values at `positions`, in that order.
    fn select(&self, positions: &[usize]) -> Self {
        match self {
            PredictionValues::Numeric(values) => {
                PredictionValues::Numeric(positions.iter().map(|&i| values[i]).collect())
            }
            PredictionValues::Text(values) => {
                PredictionValues::Text(positions.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }

    /// First few values rendered for error messages.
    pub fn sample(&self) -> String {
        fn render<T: fmt::Debug>(values: &[Option<T>]) -> String {
            let shown: Vec<String> = values
                .iter()
                .take(PREDICTION_SAMPLE_LEN)
                .map(|value| match value {
                    Some(value) => format!("{value:?}"),
                    None => "null".to_string(),
                })
                .collect();
            let ellipsis = if values.len() > PREDICTION_SAMPLE_LEN { ", ..." } else { "" };
            format!("[{}{}]", shown.join(", "), ellipsis)
        }
        match self {
            PredictionValues::Numeric(values) => render(values),
            PredictionValues::Text(values) => render(values),
        }
    }
}

/// One run's predictions: a predicted value per dataset row index.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    indices: Vec<i64>,
    values: PredictionValues,
}

impl Predictions {
    /// `None` unless there is exactly one value per index.
    pub fn new(indices: Vec<i64>, values: PredictionValues) -> Option<Self> {
        (indices.len() == values.len()).then_some(Self { indices, values })
    }

    pub fn indices(&self) -> &[i64] {
        &self.indices
    }

    pub fn values(&self) -> &PredictionValues {
        &self.values
    }

    pub fn value_type(&self) -> ValueType {
        self.values.value_type()
    }

    pub fn same_dtype_as(&self, other: &Predictions) -> bool {
        self.value_type() == other.value_type()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Inner join of the two prediction sets on row index, in `a`'s row
    /// order: the i-th value of both outputs predicts the same row.
    pub fn find_common(a: &Predictions, b: &Predictions) -> (PredictionValues, PredictionValues) {
        let positions_in_b: HashMap<i64, usize> = b
            .indices
            .iter()
            .enumerate()
            .map(|(position, &index)| (index, position))
            .collect();

        let (positions_a, positions_b): (Vec<usize>, Vec<usize>) = a
            .indices
            .iter()
            .enumerate()
            .filter_map(|(position, index)| positions_in_b.get(index).map(|&other| (position, other)))
            .unzip();

        (a.values.select(&positions_a), b.values.select(&positions_b))
    }
}
