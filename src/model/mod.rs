//! Core data model for the publish workflow.
//!
//! The project state is the only durable record; requests, artifacts and
//! command results live for a single invocation.

mod artifacts;
mod command;
mod project;
mod request;

pub use artifacts::Artifacts;
pub use command::{BuildConfig, CommandResult, PrePublishSpec};
pub use project::ProjectState;
pub use request::{FunctionPayload, PublishRequest};

// Only fixtures build these directly; production code reaches them through `ProjectState`.
#[cfg(test)]
pub use project::{DEFAULT_FUNCTION_NAME, FunctionState};
