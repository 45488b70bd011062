use crate::entities::Tantamount;
use crate::errors::EntityResult;
use crate::utils::{enforce_field, JsonExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dataset {
    pub digest: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Dataset {
    pub fn from_document(document: &Value, should_enforce_id: bool) -> EntityResult<Self> {
        enforce_field(should_enforce_id, document, "digest")?;
        Ok(Self {
            digest: document.required_string("digest")?,
            id: document.optional_string("id")?,
            name: document.optional_string("name")?,
            description: document.optional_string("description")?,
        })
    }
}

impl Tantamount for Dataset {
    fn is_tantamount_to(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}
