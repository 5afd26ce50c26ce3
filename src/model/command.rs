//! Pre-publish command types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The build config document, `azion/config.json`.
///
/// Only the `publish` section matters here; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub publish: PrePublishSpec,
}

/// Optional shell step run before anything is sent to the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrePublishSpec {
    /// Shell command. Empty means skip.
    #[serde(default)]
    pub cmd: String,

    /// File of `KEY=VALUE` lines added to the command's environment.
    #[serde(default)]
    pub env: PathBuf,
}

impl PrePublishSpec {
    pub fn is_skip(&self) -> bool {
        self.cmd.trim().is_empty()
    }
}

/// What a pre-publish command produced.
///
/// A nonzero exit code is data, not an error: the caller decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Combined stdout and stderr.
    pub output: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
