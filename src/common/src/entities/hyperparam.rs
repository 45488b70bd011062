use crate::errors::EntityResult;
use crate::utils::JsonExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparam {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl Hyperparam {
    pub fn from_document(name: &str, hyperparam: &Value) -> EntityResult<Self> {
        Ok(Self {
            name: name.to_string(),
            kind: hyperparam.required_string("type")?,
            data: hyperparam.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn equals(&self, other: &Hyperparam) -> bool {
        self == other
    }

    /// Same hyperparameter, possibly set to a different value.
    pub fn is_same_kind(&self, other: &Hyperparam) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}
