use crate::errors::EntityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// One of the pipeline's own inputs
    Inputs,
    /// The output of a previous step
    Steps,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Inputs => "inputs",
            DataSource::Steps => "steps",
        }
    }
}

/// A structured data reference such as `steps.0.produce` or `inputs.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataReference {
    pub source: DataSource,
    pub index: usize,
    pub method_name: Option<String>,
}

impl DataReference {
    pub fn is_input(&self) -> bool {
        self.source == DataSource::Inputs
    }

    pub fn is_step(&self) -> bool {
        self.source == DataSource::Steps
    }
}

impl FromStr for DataReference {
    type Err = EntityError;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let invalid = || EntityError::InvalidDataReference(reference.to_string());
        let parts: Vec<&str> = reference.split('.').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid());
        }
        let source = match parts[0] {
            "inputs" => DataSource::Inputs,
            "steps" => DataSource::Steps,
            _ => return Err(invalid()),
        };
        let index = parts[1].parse::<usize>().map_err(|_| invalid())?;
        let method_name = parts.get(2).map(|method| method.to_string());
        Ok(Self {
            source,
            index,
            method_name,
        })
    }
}

impl TryFrom<String> for DataReference {
    type Error = EntityError;

    fn try_from(reference: String) -> Result<Self, Self::Error> {
        reference.parse()
    }
}

impl From<DataReference> for String {
    fn from(reference: DataReference) -> Self {
        reference.to_string()
    }
}

impl fmt::Display for DataReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source.as_str(), self.index)?;
        if let Some(method_name) = &self.method_name {
            write!(f, ".{}", method_name)?;
        }
        Ok(())
    }
}
