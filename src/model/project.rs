//! Project state: the local record linking a project to its edge function.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder function name meaning "use the project name".
pub const DEFAULT_FUNCTION_NAME: &str = "__DEFAULT__";

/// The project document, persisted as `azion/azion.json`.
///
/// Fields this tool doesn't interpret are kept in `extra` and written back
/// untouched, so a persist never drops what the user put there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Display name of the project.
    pub name: String,

    #[serde(default)]
    pub function: FunctionState,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The edge function section of the project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionState {
    /// Remote identifier. Zero until the function has been created.
    #[serde(default)]
    pub id: i64,

    /// Remote name, or [`DEFAULT_FUNCTION_NAME`].
    #[serde(default = "default_function_name")]
    pub name: String,

    /// Compiled code to upload.
    #[serde(default)]
    pub file: PathBuf,

    /// JSON arguments file.
    #[serde(default)]
    pub args: PathBuf,

    /// Desired activation state on the platform.
    #[serde(default)]
    pub active: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_function_name() -> String {
    DEFAULT_FUNCTION_NAME.to_string()
}

impl Default for FunctionState {
    fn default() -> Self {
        Self {
            id: 0,
            name: default_function_name(),
            file: PathBuf::new(),
            args: PathBuf::new(),
            active: false,
            extra: Map::new(),
        }
    }
}

impl ProjectState {
    /// Whether a remote function already exists for this project.
    ///
    /// `function.id == 0` is the only signal that it doesn't.
    pub fn is_published(&self) -> bool {
        self.function.id != 0
    }

    /// The name to send to the platform.
    ///
    /// Falls back to the project name when the function name is the
    /// placeholder. Shared by the create and update paths.
    pub fn function_name(&self) -> &str {
        if self.function.name == DEFAULT_FUNCTION_NAME {
            &self.name
        } else {
            &self.function.name
        }
    }
}
