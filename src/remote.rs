//! Edge Functions API client.
//!
//! The publish workflow only needs two calls: create a function and update
//! one by id. Both return the id the platform reports.

use std::time::Duration;

use reqwest::{
    blocking::{Client, RequestBuilder},
    header,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{model::FunctionPayload, settings::Settings};

const TIMEOUT: Duration = Duration::from_secs(30);
const ACCEPT: &str = "application/json; version=3";

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// The remote side of a publish.
pub trait EdgeFunctions {
    fn create(&self, payload: &FunctionPayload) -> Result<i64, RemoteError>;
    fn update(&self, id: i64, payload: &FunctionPayload) -> Result<i64, RemoteError>;
}

/// Build the user agent sent with every request.
pub fn user_agent() -> String {
    format!("Azion_CLI/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Serialize)]
struct CreateBody<'a> {
    name: &'a str,
    code: &'a str,
    language: &'static str,
    initiator_type: &'static str,
    active: bool,
    json_args: &'a Map<String, Value>,
}

impl<'a> CreateBody<'a> {
    fn new(payload: &'a FunctionPayload) -> Self {
        Self {
            name: &payload.name,
            code: &payload.code,
            language: "javascript",
            initiator_type: "edge_application",
            active: payload.active,
            json_args: &payload.json_args,
        }
    }
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    name: &'a str,
    code: &'a str,
    active: bool,
    json_args: &'a Map<String, Value>,
}

impl<'a> UpdateBody<'a> {
    fn new(payload: &'a FunctionPayload) -> Self {
        Self {
            name: &payload.name,
            code: &payload.code,
            active: payload.active,
            json_args: &payload.json_args,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    results: Results,
}

#[derive(Deserialize)]
struct Results {
    id: i64,
}

/// HTTP implementation of [`EdgeFunctions`].
pub struct HttpEdgeFunctions {
    client: Client,
    api_url: String,
    token: String,
}

impl HttpEdgeFunctions {
    /// Create a client. The timeout and user agent are fixed for its lifetime.
    pub fn new(settings: &Settings, user_agent: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(RemoteError::Client)?;

        Ok(Self {
            client,
            api_url: settings.api_url.clone(),
            token: settings.token.clone(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/edge_functions", self.api_url)
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/edge_functions/{id}", self.api_url)
    }

    fn send(&self, request: RequestBuilder) -> Result<i64, RemoteError> {
        let response = request
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
            .header(header::ACCEPT, ACCEPT)
            .send()
            .map_err(RemoteError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%status, "edge functions API call failed");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope = response.json().map_err(RemoteError::Decode)?;
        Ok(envelope.results.id)
    }
}

impl EdgeFunctions for HttpEdgeFunctions {
    fn create(&self, payload: &FunctionPayload) -> Result<i64, RemoteError> {
        let url = self.collection_url();
        debug!("POST {url}");
        self.send(self.client.post(url).json(&CreateBody::new(payload)))
    }

    fn update(&self, id: i64, payload: &FunctionPayload) -> Result<i64, RemoteError> {
        let url = self.item_url(id);
        debug!("PATCH {url}");
        self.send(self.client.patch(url).json(&UpdateBody::new(payload)))
    }
}
