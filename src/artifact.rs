//! Artifact loading: the compiled code and its JSON arguments.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};

use crate::model::{Artifacts, ProjectState};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read code file {}: {source}", .path.display())]
    CodeRead { path: PathBuf, source: io::Error },

    #[error("code file {} is not valid UTF-8", .path.display())]
    CodeEncoding { path: PathBuf },

    #[error("failed to read args file {}: {source}", .path.display())]
    ArgsRead { path: PathBuf, source: io::Error },

    #[error("failed to parse args file {} as a JSON object: {source}", .path.display())]
    ArgsParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads the files a project state points at.
pub trait ArtifactLoader {
    fn load(&self, state: &ProjectState) -> Result<Artifacts, ArtifactError>;
}

/// Loads artifacts from disk, resolving relative paths against the project directory.
pub struct FsArtifactLoader {
    root: PathBuf,
}

impl FsArtifactLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactLoader for FsArtifactLoader {
    fn load(&self, state: &ProjectState) -> Result<Artifacts, ArtifactError> {
        let code_path = resolve(&self.root, &state.function.file);
        let bytes = fs::read(&code_path).map_err(|source| ArtifactError::CodeRead {
            path: code_path.clone(),
            source,
        })?;
        let code = String::from_utf8(bytes)
            .map_err(|_| ArtifactError::CodeEncoding { path: code_path })?;

        let args_path = resolve(&self.root, &state.function.args);
        let raw = fs::read(&args_path).map_err(|source| ArtifactError::ArgsRead {
            path: args_path.clone(),
            source,
        })?;
        let args: Map<String, Value> =
            serde_json::from_slice(&raw).map_err(|source| ArtifactError::ArgsParse {
                path: args_path,
                source,
            })?;

        Ok(Artifacts { code, args })
    }
}

/// Resolve `path` against `root` unless it is already absolute.
pub fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
