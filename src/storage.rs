//! Local persistence for project documents.
//!
//! Both documents live under the project's `azion/` directory:
//!
//! ```text
//! <project>/azion/
//!   azion.json    # Project state: function id, artifact paths (read + rewritten)
//!   config.json   # Build config: the `publish` pre-command (read only)
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

// Trait must be in scope for `.write_all()` on `File`.
use io::Write;

use tracing::debug;

use crate::model::{BuildConfig, PrePublishSpec, ProjectState};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Access to the project documents.
pub trait ProjectStore {
    /// Read the pre-publish step from the build config.
    fn load_publish_spec(&self) -> Result<PrePublishSpec>;

    /// Read the project state.
    fn load(&self) -> Result<ProjectState>;

    /// Replace the project state on disk.
    fn persist(&self, state: &ProjectState) -> Result<()>;

    /// Where the project state lives, for error reporting.
    fn state_path(&self) -> PathBuf;
}

/// File-based store rooted at a project directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn config_path(&self) -> PathBuf {
        self.root.join("azion").join("config.json")
    }
}

impl ProjectStore for FileStore {
    fn load_publish_spec(&self) -> Result<PrePublishSpec> {
        let config: BuildConfig = read_json(&self.config_path())?;
        Ok(config.publish)
    }

    fn load(&self) -> Result<ProjectState> {
        read_json(&self.state_path())
    }

    fn persist(&self, state: &ProjectState) -> Result<()> {
        let path = self.state_path();
        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');
        write_atomic(&path, json.as_bytes()).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), id = state.function.id, "persisted project state");
        Ok(())
    }

    fn state_path(&self) -> PathBuf {
        self.root.join("azion").join("azion.json")
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    debug!(path = %path.display(), "loaded");
    serde_json::from_str(&json).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write through a sibling temp file and rename it over the target.
///
/// A crash leaves either the old document or the new one, never a mix.
/// On failure the temp file is removed.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("json.tmp");

    let written = write_and_rename(&temp_path, path, contents);
    if written.is_err() {
        // Best effort; the original error is the one worth reporting.
        let _ = fs::remove_file(&temp_path);
    }
    written
}

fn write_and_rename(temp_path: &Path, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Map;
    use tempfile::TempDir;

    use crate::model::FunctionState;

    fn test_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("azion")).unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join("azion").join(name), contents).unwrap();
    }

    fn sample_state() -> ProjectState {
        ProjectState {
            name: "demo".into(),
            function: FunctionState {
                file: PathBuf::from("out/worker.js"),
                args: PathBuf::from("azion/args.json"),
                active: true,
                ..FunctionState::default()
            },
            extra: Map::new(),
        }
    }

    #[test]
    fn load_missing_state_is_not_found() {
        let (_dir, store) = test_store();
        let err = store.load().unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn load_malformed_state_is_parse_error() {
        let (dir, store) = test_store();
        write(&dir, "azion.json", "{ not json");

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn persist_then_load() {
        let (_dir, store) = test_store();
        let mut state = sample_state();
        state.function.id = 555;

        store.persist(&state).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, state);
    }

    #[test]
    fn persist_replaces_whole_document_and_leaves_no_temp_file() {
        let (dir, store) = test_store();
        write(
            &dir,
            "azion.json",
            r#"{"name":"demo","version":"1.0","function":{"id":0,"name":"__DEFAULT__"}}"#,
        );

        let mut state = store.load().unwrap();
        state.function.id = 42;
        store.persist(&state).unwrap();

        let raw = fs::read_to_string(store.state_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["function"]["id"], 42);
        assert_eq!(value["version"], "1.0");
        assert!(!dir.path().join("azion").join("azion.json.tmp").exists());
    }

    #[test]
    fn persist_into_missing_directory_fails_with_io() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nowhere"));

        let err = store.persist(&sample_state()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn failed_rename_removes_temp_file() {
        let (dir, store) = test_store();
        // A non-empty directory at the target path makes the rename fail.
        let target = dir.path().join("azion").join("azion.json");
        fs::create_dir_all(target.join("occupied")).unwrap();

        let err = store.persist(&sample_state()).unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(target.is_dir());
        assert!(!dir.path().join("azion").join("azion.json.tmp").exists());
    }

    #[test]
    fn load_publish_spec_reads_publish_section() {
        let (dir, store) = test_store();
        write(
            &dir,
            "config.json",
            r#"{"build":{"cmd":"npm run build"},"publish":{"cmd":"npm run deploy","env":"./azion/publish.env"}}"#,
        );

        let spec = store.load_publish_spec().unwrap();
        assert_eq!(spec.cmd, "npm run deploy");
        assert_eq!(spec.env, PathBuf::from("./azion/publish.env"));
    }

    #[test]
    fn load_publish_spec_missing_config_is_not_found() {
        let (_dir, store) = test_store();
        let err = store.load_publish_spec().unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn load_publish_spec_without_cmd_is_skip() {
        let (dir, store) = test_store();
        write(&dir, "config.json", r#"{"publish":{}}"#);

        assert!(store.load_publish_spec().unwrap().is_skip());
    }
}
