use crate::constants::STEP_TYPE_PRIMITIVE;
use crate::entities::{DataReference, Hyperparam, Tantamount};
use crate::errors::{EntityError, EntityResult};
use crate::utils::JsonExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// One executed pipeline step running a D3M primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub id: String,
    pub name: String,
    pub digest: Option<String>,
    pub python_path: String,
    /// Stored as a set: declared input order carries no meaning.
    pub inputs: BTreeSet<DataReference>,
    pub output_ids: Vec<String>,
    pub hyperparams: Vec<Hyperparam>,
}

impl Primitive {
    /// The last two segments of the python path, e.g.
    /// `classification.random_forest`.
    pub fn short_python_path(&self) -> String {
        let segments: Vec<&str> = self.python_path.rsplit('.').take(2).collect();
        segments.into_iter().rev().collect::<Vec<_>>().join(".")
    }

    /// Same primitive implementation and version.
    pub fn is_same_kind(&self, other: &Primitive) -> bool {
        self.id == other.id
    }

    pub fn has_same_inputs(&self, other: &Primitive) -> bool {
        self.inputs == other.inputs
    }

    pub fn has_same_outputs(&self, other: &Primitive) -> bool {
        self.output_ids == other.output_ids
    }

    /// Two different implementations wired into the same slot: a
    /// substitution candidate.
    pub fn is_same_position_different_kind(&self, other: &Primitive) -> bool {
        !self.is_same_kind(other) && self.has_same_inputs(other) && self.has_same_outputs(other)
    }
}

impl Tantamount for Primitive {
    /// Ignores hyperparameter values and digests.
    fn is_tantamount_to(&self, other: &Self) -> bool {
        self.is_same_kind(other) && self.has_same_inputs(other) && self.has_same_outputs(other)
    }
}

fn parse_inputs(step: &Value) -> EntityResult<BTreeSet<DataReference>> {
    let Some(data) = step.get_path(&["arguments", "inputs", "data"]) else {
        return Ok(BTreeSet::new());
    };
    let as_reference = |item: &Value| -> EntityResult<DataReference> {
        item.as_str()
            .ok_or_else(|| EntityError::invalid("arguments.inputs.data", "a data reference string"))?
            .parse()
    };
    match data {
        Value::Array(items) => items.iter().map(as_reference).collect(),
        single => Ok(BTreeSet::from([as_reference(single)?])),
    }
}

impl TryFrom<&Value> for Primitive {
    type Error = EntityError;

    /// Builds a primitive from a pipeline step of type PRIMITIVE.
    fn try_from(step: &Value) -> EntityResult<Self> {
        let step_type = step.required_str("type")?;
        if step_type != STEP_TYPE_PRIMITIVE {
            return Err(EntityError::UnsupportedStepType(step_type.to_string()));
        }

        let primitive = step.required("primitive")?;

        let output_ids = step
            .optional_vec("outputs")?
            .map(|outputs| {
                outputs
                    .iter()
                    .map(|output| output.required_string("id"))
                    .collect::<EntityResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let hyperparams = match step.optional("hyperparams") {
            None => Vec::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, hyperparam)| Hyperparam::from_document(name, hyperparam))
                .collect::<EntityResult<Vec<_>>>()?,
            Some(_) => return Err(EntityError::invalid("hyperparams", "an object")),
        };

        Ok(Self {
            id: primitive.required_string("id")?,
            name: primitive.required_string("name")?,
            digest: primitive.optional_string("digest")?,
            python_path: primitive.required_string("python_path")?,
            inputs: parse_inputs(step)?,
            output_ids,
            hyperparams,
        })
    }
}
