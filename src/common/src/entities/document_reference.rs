use crate::errors::EntityResult;
use crate::utils::JsonExt;
use serde_json::Value;

/// Stub pointing at another document by digest, e.g. a run's `pipeline`
/// field or a SUBPIPELINE step. Replaced by the real entity during post-init.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentReference {
    pub digest: String,
}

impl DocumentReference {
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
        }
    }
}

impl TryFrom<&Value> for DocumentReference {
    type Error = crate::errors::EntityError;

    fn try_from(value: &Value) -> EntityResult<Self> {
        Ok(Self::new(value.required_str("digest")?))
    }
}
