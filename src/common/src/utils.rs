mod json;

pub use json::{enforce_field, JsonExt};
