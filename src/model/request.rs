//! Publish requests: what gets sent to the platform for one invocation.

use serde_json::{Map, Value};

use super::{Artifacts, ProjectState};

/// Fields shared by the create and update calls.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPayload {
    pub name: String,
    pub code: String,
    pub active: bool,
    pub json_args: Map<String, Value>,
}

/// Exactly one of these is built per publish.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishRequest {
    Create(FunctionPayload),
    Update { id: i64, payload: FunctionPayload },
}

impl PublishRequest {
    /// Build the request for the current project state.
    ///
    /// Chooses `Update` iff the state already carries a remote id.
    pub fn from_state(state: &ProjectState, artifacts: Artifacts) -> Self {
        let payload = FunctionPayload {
            name: state.function_name().to_string(),
            code: artifacts.code,
            active: state.function.active,
            json_args: artifacts.args,
        };

        if state.is_published() {
            Self::Update {
                id: state.function.id,
                payload,
            }
        } else {
            Self::Create(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{DEFAULT_FUNCTION_NAME, FunctionState};

    fn artifacts() -> Artifacts {
        let mut args = Map::new();
        args.insert("greeting".into(), Value::from("hi"));
        Artifacts {
            code: "addEventListener('fetch', () => {})".into(),
            args,
        }
    }

    fn state(id: i64, name: &str) -> ProjectState {
        ProjectState {
            name: "demo".into(),
            function: FunctionState {
                id,
                name: name.into(),
                active: true,
                ..FunctionState::default()
            },
            extra: Map::new(),
        }
    }

    #[test]
    fn unpublished_state_builds_create() {
        let request = PublishRequest::from_state(&state(0, DEFAULT_FUNCTION_NAME), artifacts());

        let PublishRequest::Create(payload) = request else {
            panic!("expected create");
        };
        assert_eq!(payload.name, "demo");
        assert!(payload.active);
        assert_eq!(payload.json_args["greeting"], "hi");
    }

    #[test]
    fn published_state_builds_update_with_id() {
        let request = PublishRequest::from_state(&state(555, "edge-fn"), artifacts());

        match request {
            PublishRequest::Update { id, ref payload } => {
                assert_eq!(id, 555);
                assert_eq!(payload.name, "edge-fn");
            }
            PublishRequest::Create(_) => panic!("expected update"),
        }
    }

    #[test]
    fn update_applies_the_same_name_fallback() {
        let request = PublishRequest::from_state(&state(9, DEFAULT_FUNCTION_NAME), artifacts());
        let PublishRequest::Update { payload, .. } = request else {
            panic!("expected update");
        };
        assert_eq!(payload.name, "demo");
    }
}
