use crate::errors::{EntityError, EntityResult};
// re-export Value for convenience
pub use serde_json::Value;

/// Fails when `should_enforce_field` is set and `document` lacks `field`.
/// Some document sources legitimately omit digests, so the caller decides.
pub fn enforce_field(should_enforce_field: bool, document: &Value, field: &str) -> EntityResult<()> {
    if should_enforce_field && document.optional(field).is_none() {
        return Err(EntityError::missing(field));
    }
    Ok(())
}

/// Typed accessors over a JSON document. A `null` value is treated the same
/// as an absent key.
pub trait JsonExt {
    fn required(&self, key: &str) -> EntityResult<&Value>;

    fn optional(&self, key: &str) -> Option<&Value>;

    fn required_str(&self, key: &str) -> EntityResult<&str>;

    fn required_string(&self, key: &str) -> EntityResult<String>;

    fn optional_string(&self, key: &str) -> EntityResult<Option<String>>;

    fn required_vec(&self, key: &str) -> EntityResult<&Vec<Value>>;

    fn optional_vec(&self, key: &str) -> EntityResult<Option<&Vec<Value>>>;

    fn required_f64(&self, key: &str) -> EntityResult<f64>;

    fn optional_f64(&self, key: &str) -> EntityResult<Option<f64>>;

    fn get_path(&self, path: &[&str]) -> Option<&Value>;

    fn has_path(&self, path: &[&str]) -> bool {
        self.get_path(path).is_some()
    }

    fn required_path_str(&self, path: &[&str]) -> EntityResult<&str>;
}

impl JsonExt for Value {
    fn required(&self, key: &str) -> EntityResult<&Value> {
        self.optional(key).ok_or_else(|| EntityError::missing(key))
    }

    fn optional(&self, key: &str) -> Option<&Value> {
        match self.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    fn required_str(&self, key: &str) -> EntityResult<&str> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| EntityError::invalid(key, "a string"))
    }

    fn required_string(&self, key: &str) -> EntityResult<String> {
        self.required_str(key).map(str::to_string)
    }

    fn optional_string(&self, key: &str) -> EntityResult<Option<String>> {
        match self.optional(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(EntityError::invalid(key, "a string")),
        }
    }

    fn required_vec(&self, key: &str) -> EntityResult<&Vec<Value>> {
        self.required(key)?
            .as_array()
            .ok_or_else(|| EntityError::invalid(key, "an array"))
    }

    fn optional_vec(&self, key: &str) -> EntityResult<Option<&Vec<Value>>> {
        match self.optional(key) {
            None => Ok(None),
            Some(Value::Array(v)) => Ok(Some(v)),
            Some(_) => Err(EntityError::invalid(key, "an array")),
        }
    }

    fn required_f64(&self, key: &str) -> EntityResult<f64> {
        self.required(key)?
            .as_f64()
            .ok_or_else(|| EntityError::invalid(key, "a number"))
    }

    fn optional_f64(&self, key: &str) -> EntityResult<Option<f64>> {
        match self.optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| EntityError::invalid(key, "a number")),
        }
    }

    fn get_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self, |node, key| node.optional(key))
    }

    fn required_path_str(&self, path: &[&str]) -> EntityResult<&str> {
        let field = path.join(".");
        self.get_path(path)
            .ok_or_else(|| EntityError::missing(field.as_str()))?
            .as_str()
            .ok_or_else(|| EntityError::invalid(field, "a string"))
    }
}
