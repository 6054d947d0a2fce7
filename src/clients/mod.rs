pub mod sync;

use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::models::stack::{RemoteStack, StackAction, StackId};
use crate::registry::Instance;

const API_KEY_HEADER: &str = "X-API-Key";

/// Failure to list stacks from one instance.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed stack list: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Failure to start or stop a stack.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// HTTP plumbing for the stack endpoints of a management server.
///
/// Certificate verification is switched off: the configured base URLs are
/// trusted as-is, self-signed certificates included.
#[derive(Debug, Clone)]
pub struct StackApi {
    http: Client,
}

impl StackApi {
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().danger_accept_invalid_certs(true);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    pub async fn list_stacks(&self, instance: &Instance) -> Result<Vec<RemoteStack>, TransportError> {
        let resp = self
            .http
            .get(instance.endpoint("/api/stacks"))
            .header(API_KEY_HEADER, instance.api_key())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }
        resp.json().await.map_err(TransportError::Decode)
    }

    pub async fn send_action(
        &self,
        instance: &Instance,
        id: &StackId,
        action: StackAction,
    ) -> Result<StatusCode, CommandError> {
        let resp = self
            .http
            .post(instance.endpoint(&format!("/api/stacks/{}/{}", id, action.path_segment())))
            .header(API_KEY_HEADER, instance.api_key())
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(CommandError::Request)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CommandError::Status { status, body });
        }
        Ok(status)
    }
}
