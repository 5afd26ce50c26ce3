//! Loaded artifacts for one publish.

use serde_json::{Map, Value};

/// The code to upload and its parsed arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub code: String,
    pub args: Map<String, Value>,
}
