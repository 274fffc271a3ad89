//! Async HTTP client for the Appium server.
//!
//! This module provides [`AppiumClient`], the low-level transport that opens a
//! remote session and issues session-scoped commands using the wire format in
//! [`crate::protocol`]. It knows nothing about platforms or contexts; the
//! [`AppiumDriver`](crate::appium_driver::AppiumDriver) builds on top of it.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use appium_handler_core::appium_client::AppiumClient;
//! use appium_handler_core::capabilities::Capabilities;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = "http://127.0.0.1:4723/wd/hub".parse()?;
//! let mut caps = Capabilities::new();
//! caps.set("platformName", "Android");
//!
//! let client = AppiumClient::connect(endpoint, &caps, Duration::from_secs(120)).await?;
//! let context = client.get("context").await?;
//! println!("{context}");
//! client.delete_session().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, debug_span, trace, Instrument};
use url::Url;

use crate::capabilities::Capabilities;
use crate::protocol::{self, ProtocolError};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the Appium server.
#[derive(Error, Debug)]
pub enum AppiumClientError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request exceeded the configured command timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with an error payload.
    #[error("server error ({error}): {message}")]
    Remote {
        /// HTTP status of the failed response.
        status: u16,
        /// W3C error code.
        error: String,
        /// Human-readable detail.
        message: String,
    },

    /// The response could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(ProtocolError),
}

impl From<reqwest::Error> for AppiumClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppiumClientError::Timeout
        } else {
            AppiumClientError::ConnectionFailed(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AppiumClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one remote Appium session.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AppiumClient {
    http: reqwest::Client,
    endpoint: Url,
    base: String,
    session_id: String,
}

impl AppiumClient {
    /// Opens a new remote session at `endpoint` with the given capabilities.
    ///
    /// `command_timeout` bounds every HTTP request issued by the client,
    /// including this one. It must exceed the implicit wait, since element
    /// lookups block server-side for up to that long.
    pub async fn connect(
        endpoint: Url,
        caps: &Capabilities,
        command_timeout: Duration,
    ) -> Result<Self, AppiumClientError> {
        let http = reqwest::Client::builder()
            .timeout(command_timeout)
            .build()
            .map_err(|e| AppiumClientError::ConnectionFailed(e.to_string()))?;
        let base = endpoint.as_str().trim_end_matches('/').to_string();

        let url = format!("{base}/session");
        debug!(%url, "creating session");

        let span = debug_span!("appium_send", method = "POST", command = "session");
        let (status, body) = async {
            let resp = http
                .post(&url)
                .json(&protocol::new_session_payload(caps))
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok::<_, AppiumClientError>((status, body))
        }
        .instrument(span)
        .await?;

        protocol::decode_response(status, &body).map_err(|e| map_protocol_error(status, e))?;
        let session_id = protocol::decode_session_id(&body).map_err(AppiumClientError::Protocol)?;
        debug!(%session_id, "session created");

        Ok(Self {
            http,
            endpoint,
            base,
            session_id,
        })
    }

    /// The endpoint the session was opened against.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The server-assigned session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// `GET /session/{id}/{command}`.
    pub async fn get(&self, command: &str) -> Result<Value, AppiumClientError> {
        self.send(Method::GET, command, None).await
    }

    /// `POST /session/{id}/{command}` with a JSON body.
    pub async fn post(&self, command: &str, body: Value) -> Result<Value, AppiumClientError> {
        self.send(Method::POST, command, Some(body)).await
    }

    /// `DELETE /session/{id}/{command}`.
    pub async fn delete(&self, command: &str) -> Result<Value, AppiumClientError> {
        self.send(Method::DELETE, command, None).await
    }

    /// `DELETE /session/{id}`: ends the remote session.
    pub async fn delete_session(&self) -> Result<(), AppiumClientError> {
        self.delete("").await?;
        debug!(session_id = %self.session_id, "session deleted");
        Ok(())
    }

    fn command_url(&self, command: &str) -> String {
        if command.is_empty() {
            format!("{}/session/{}", self.base, self.session_id)
        } else {
            format!(
                "{}/session/{}/{}",
                self.base,
                self.session_id,
                command.trim_start_matches('/')
            )
        }
    }

    async fn send(
        &self,
        method: Method,
        command: &str,
        body: Option<Value>,
    ) -> Result<Value, AppiumClientError> {
        let url = self.command_url(command);
        let span = debug_span!("appium_send", method = %method, command);
        async {
            let mut request = self.http.request(method.clone(), &url);
            // POST bodies must be JSON objects, even when the command takes
            // no arguments.
            if method == Method::POST {
                request = request.json(&body.unwrap_or_else(|| json!({})));
            }

            let resp = request.send().await?;
            let status = resp.status().as_u16();
            let text = resp.text().await?;
            trace!(status, body = %text, "response received");

            protocol::decode_response(status, &text).map_err(|e| map_protocol_error(status, e))
        }
        .instrument(span)
        .await
    }
}

fn map_protocol_error(status: u16, err: ProtocolError) -> AppiumClientError {
    match err {
        ProtocolError::Remote { error, message } => AppiumClientError::Remote {
            status,
            error,
            message,
        },
        other => AppiumClientError::Protocol(other),
    }
}
