//! Publish orchestration: run the pre-command, decide create vs update,
//! call the platform once, and record the result locally.
//!
//! The workflow is an explicit sequence of stages. Each stage either advances
//! or ends the publish with a [`PublishError`] naming where it stopped:
//!
//! ```text
//! NoPrePublish → PrePublishRan → StateLoaded → ArtifactLoaded → Synced → Persisted
//! ```
//!
//! Only a failure after `Synced` leaves the platform ahead of the local
//! record; it gets its own variant so it can't be mistaken for a retryable one.

use std::{io, path::PathBuf};

use tracing::{debug, info};

use crate::{
    artifact::{ArtifactError, ArtifactLoader},
    model::{ProjectState, PublishRequest},
    prepublish::{CommandRunner, PrePublishError},
    remote::{EdgeFunctions, RemoteError},
    storage::{ProjectStore, StoreError},
};

/// Affirmation-bypass flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    pub yes: bool,
    pub no: bool,
}

impl PublishOptions {
    pub fn validate(self) -> Result<(), PublishError> {
        if self.yes && self.no {
            return Err(PublishError::ConflictingOptions);
        }
        Ok(())
    }
}

/// How a successful publish reached the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created { id: i64 },
    Updated { id: i64 },
}

impl Outcome {
    pub fn id(self) -> i64 {
        match self {
            Self::Created { id } | Self::Updated { id } => id,
        }
    }
}

/// Why a publish stopped.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("--yes and --no cannot be used together")]
    ConflictingOptions,

    #[error("failed to run publish pre command: {0}")]
    PrePublishLaunch(#[source] PrePublishError),

    #[error("publish pre command exited with code {code}; nothing was published")]
    PrePublishNonZeroExit { code: i32 },

    #[error("failed to load project configuration: {0}")]
    Config(#[source] StoreError),

    #[error("failed to load edge function artifacts: {0}")]
    Artifact(#[source] ArtifactError),

    #[error("failed to create edge function: {0}")]
    RemoteCreate(#[source] RemoteError),

    #[error("failed to update edge function: {0}")]
    RemoteUpdate(#[source] RemoteError),

    #[error(
        "edge function {id} was created, but the local record {} could not be updated: {source}\n\
         Do not run publish again, it would create a duplicate edge function.\n\
         Set \"function.id\" to {id} in {} instead.",
        .path.display(),
        .path.display()
    )]
    PersistCreated {
        id: i64,
        path: PathBuf,
        source: StoreError,
    },

    #[error(
        "edge function {id} was updated, but the local record {} could not be rewritten: {source}\n\
         The record still points at edge function {id}; publishing again updates it in place.",
        .path.display()
    )]
    PersistUpdated {
        id: i64,
        path: PathBuf,
        source: StoreError,
    },

    #[error("failed to write output: {0}")]
    Console(#[from] io::Error),
}

impl PublishError {
    /// True when the platform changed but the local record didn't.
    pub fn is_split_brain(&self) -> bool {
        matches!(
            self,
            Self::PersistCreated { .. } | Self::PersistUpdated { .. }
        )
    }
}

/// Where a publish currently stands.
#[derive(Debug)]
enum Stage {
    NoPrePublish,
    PrePublishRan,
    StateLoaded(ProjectState),
    ArtifactLoaded(ProjectState, PublishRequest),
    Synced(ProjectState, Outcome),
    Persisted(Outcome),
}

/// Drives one publish against injected collaborators.
pub struct Synchronizer<'a> {
    pub store: &'a dyn ProjectStore,
    pub artifacts: &'a dyn ArtifactLoader,
    pub runner: &'a dyn CommandRunner,
    pub remote: &'a dyn EdgeFunctions,
}

impl Synchronizer<'_> {
    /// Run the whole workflow, writing status lines to `out`.
    pub fn publish(
        &self,
        options: PublishOptions,
        out: &mut dyn io::Write,
    ) -> Result<Outcome, PublishError> {
        options.validate()?;

        let mut stage = Stage::NoPrePublish;
        loop {
            stage = match stage {
                Stage::Persisted(outcome) => return Ok(outcome),
                stage => self.advance(stage, out)?,
            };
        }
    }

    fn advance(&self, stage: Stage, out: &mut dyn io::Write) -> Result<Stage, PublishError> {
        match stage {
            Stage::NoPrePublish => {
                self.run_pre_publish(out)?;
                Ok(Stage::PrePublishRan)
            }

            Stage::PrePublishRan => {
                let state = self.store.load().map_err(PublishError::Config)?;
                debug!(project = %state.name, id = state.function.id, "loaded project state");
                Ok(Stage::StateLoaded(state))
            }

            Stage::StateLoaded(state) => {
                let artifacts = self
                    .artifacts
                    .load(&state)
                    .map_err(PublishError::Artifact)?;
                let request = PublishRequest::from_state(&state, artifacts);
                Ok(Stage::ArtifactLoaded(state, request))
            }

            Stage::ArtifactLoaded(state, request) => {
                let outcome = match &request {
                    PublishRequest::Create(payload) => {
                        info!(name = %payload.name, "creating edge function");
                        let id = self
                            .remote
                            .create(payload)
                            .map_err(PublishError::RemoteCreate)?;
                        Outcome::Created { id }
                    }
                    PublishRequest::Update { id, payload } => {
                        info!(id, name = %payload.name, "updating edge function");
                        let id = self
                            .remote
                            .update(*id, payload)
                            .map_err(PublishError::RemoteUpdate)?;
                        Outcome::Updated { id }
                    }
                };
                Ok(Stage::Synced(state, outcome))
            }

            Stage::Synced(mut state, outcome) => {
                state.function.id = outcome.id();
                self.store.persist(&state).map_err(|source| {
                    let path = self.store.state_path();
                    match outcome {
                        Outcome::Created { id } => PublishError::PersistCreated { id, path, source },
                        Outcome::Updated { id } => PublishError::PersistUpdated { id, path, source },
                    }
                })?;

                match outcome {
                    Outcome::Created { id } => writeln!(out, "Created Edge Function with ID {id}")?,
                    Outcome::Updated { id } => writeln!(out, "Updated Edge Function with ID {id}")?,
                }
                Ok(Stage::Persisted(outcome))
            }

            Stage::Persisted(_) => Ok(stage),
        }
    }

    fn run_pre_publish(&self, out: &mut dyn io::Write) -> Result<(), PublishError> {
        let spec = self
            .store
            .load_publish_spec()
            .map_err(PublishError::Config)?;

        if spec.is_skip() {
            writeln!(out, "Publish pre command not specified. No action will be taken")?;
            return Ok(());
        }

        let envs = self
            .runner
            .load_env(&spec)
            .map_err(PublishError::PrePublishLaunch)?;

        writeln!(out, "Running publish pre command:\n")?;
        writeln!(out, "$ {}", spec.cmd)?;

        let result = self
            .runner
            .execute(&spec.cmd, &envs)
            .map_err(PublishError::PrePublishLaunch)?;

        writeln!(out, "{}", result.output)?;
        writeln!(out, "\nCommand exited with code {}", result.exit_code)?;

        if !result.success() {
            return Err(PublishError::PrePublishNonZeroExit {
                code: result.exit_code,
            });
        }
        Ok(())
    }
}
