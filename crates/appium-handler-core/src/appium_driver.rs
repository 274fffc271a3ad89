//! [`MobileDriver`] implementation backed by a live Appium session.
//!
//! [`AppiumDriver`] pairs an [`AppiumClient`] with the [`Platform`] variant the
//! session was opened for. The two variants share one command set; they only
//! differ in the few payloads where the server expects platform vocabulary
//! (app ids are `bundleId`s on iOS and `appId`s on Android).
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use appium_handler_core::appium_driver::AppiumDriver;
//! use appium_handler_core::capabilities::{Capabilities, Platform};
//! use appium_handler_core::driver::MobileDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut caps = Capabilities::new();
//! caps.set("platformName", "iOS");
//!
//! let driver = AppiumDriver::connect(
//!     Platform::Ios,
//!     "http://127.0.0.1:4723/wd/hub".parse()?,
//!     &caps,
//!     Duration::from_secs(120),
//! )
//! .await?;
//! println!("{:?}", driver.context_handles().await?);
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::appium_client::{AppiumClient, AppiumClientError};
use crate::capabilities::{Capabilities, Platform};
use crate::device::{Location, ScreenOrientation};
use crate::driver::{DriverError, MobileDriver};
use crate::element::{ElementRect, ElementRef, Locator};
use crate::gesture::ActionSequence;
use crate::protocol::{self, ProtocolError};

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps an [`AppiumClientError`] to a [`DriverError`].
fn map_client_error(err: AppiumClientError) -> DriverError {
    match err {
        AppiumClientError::ConnectionFailed(msg) => DriverError::ConnectionLost(msg),
        AppiumClientError::Timeout => DriverError::Timeout,
        AppiumClientError::Remote { error, message, .. } if error == "session not created" => {
            DriverError::SessionNotCreated(message)
        }
        AppiumClientError::Remote { error, message, .. } => DriverError::Remote { error, message },
        AppiumClientError::Protocol(e) => map_protocol_error(e),
    }
}

fn map_protocol_error(err: ProtocolError) -> DriverError {
    match err {
        ProtocolError::Remote { error, message } => DriverError::Remote { error, message },
        other => DriverError::JsonParse(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// AppiumDriver
// ---------------------------------------------------------------------------

/// A [`MobileDriver`] speaking to an Appium server over HTTP.
pub struct AppiumDriver {
    platform: Platform,
    client: AppiumClient,
}

impl AppiumDriver {
    /// Opens a session for the given platform variant.
    pub async fn connect(
        platform: Platform,
        endpoint: Url,
        caps: &Capabilities,
        command_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let client = AppiumClient::connect(endpoint, caps, command_timeout)
            .await
            .map_err(|e| match e {
                AppiumClientError::Remote { message, .. } => {
                    DriverError::SessionNotCreated(message)
                }
                other => map_client_error(other),
            })?;
        debug!(%platform, session_id = client.session_id(), "driver connected");
        Ok(Self { platform, client })
    }

    /// Opens an iOS session.
    pub async fn ios(
        endpoint: Url,
        caps: &Capabilities,
        command_timeout: Duration,
    ) -> Result<Self, DriverError> {
        Self::connect(Platform::Ios, endpoint, caps, command_timeout).await
    }

    /// Opens an Android session.
    pub async fn android(
        endpoint: Url,
        caps: &Capabilities,
        command_timeout: Duration,
    ) -> Result<Self, DriverError> {
        Self::connect(Platform::Android, endpoint, caps, command_timeout).await
    }

    async fn get(&self, command: &str) -> Result<Value, DriverError> {
        self.client.get(command).await.map_err(map_client_error)
    }

    async fn post(&self, command: &str, body: Value) -> Result<Value, DriverError> {
        self.client.post(command, body).await.map_err(map_client_error)
    }

    async fn post_unit(&self, command: &str, body: Value) -> Result<(), DriverError> {
        self.post(command, body).await.map(|_| ())
    }
}

#[async_trait]
impl MobileDriver for AppiumDriver {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn remote_address(&self) -> &Url {
        self.client.endpoint()
    }

    fn session_id(&self) -> &str {
        self.client.session_id()
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_implicit_wait(&self, timeout: Duration) -> Result<(), DriverError> {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.post_unit("timeouts", json!({ "implicit": ms })).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn context_handles(&self) -> Result<Vec<String>, DriverError> {
        let value = self.get("contexts").await?;
        protocol::strings_from_value(&value).map_err(map_protocol_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn current_context(&self) -> Result<String, DriverError> {
        let value = self.get("context").await?;
        protocol::string_from_value(&value).map_err(map_protocol_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn switch_context(&self, name: &str) -> Result<(), DriverError> {
        self.post_unit("context", json!({ "name": name })).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn window_handle(&self) -> Result<String, DriverError> {
        let value = self.get("window").await?;
        protocol::string_from_value(&value).map_err(map_protocol_error)
    }

    async fn window_handles(&self) -> Result<Vec<String>, DriverError> {
        let value = self.get("window/handles").await?;
        protocol::strings_from_value(&value).map_err(map_protocol_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn switch_window(&self, handle: &str) -> Result<(), DriverError> {
        // `name` is what legacy servers read, `handle` is the W3C field.
        self.post_unit("window", json!({ "handle": handle, "name": handle }))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError> {
        let value = self
            .post(
                "element",
                protocol::locator_payload(locator.strategy(), locator.value()),
            )
            .await?;
        protocol::element_from_value(&value).map_err(map_protocol_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        let value = self
            .post(
                "elements",
                protocol::locator_payload(locator.strategy(), locator.value()),
            )
            .await?;
        let elements = protocol::elements_from_value(&value).map_err(map_protocol_error)?;
        debug!(count = elements.len(), "elements found");
        Ok(elements)
    }

    async fn element_displayed(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let value = self.get(&format!("element/{}/displayed", element.id)).await?;
        protocol::bool_from_value(&value).map_err(map_protocol_error)
    }

    async fn element_rect(&self, element: &ElementRef) -> Result<ElementRect, DriverError> {
        let value = self.get(&format!("element/{}/rect", element.id)).await?;
        protocol::rect_from_value(&value).map_err(map_protocol_error)
    }

    #[instrument(skip(self, args), level = "debug")]
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.post("execute/sync", json!({ "script": script, "args": args }))
            .await
    }

    #[instrument(skip(self, actions), level = "debug")]
    async fn perform_actions(&self, actions: &ActionSequence) -> Result<(), DriverError> {
        self.post_unit("actions", actions.to_json()).await
    }

    async fn lock_screen(&self, duration: Duration) -> Result<(), DriverError> {
        self.post_unit("appium/device/lock", json!({ "seconds": duration.as_secs() }))
            .await
    }

    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        self.post_unit("appium/device/hide_keyboard", json!({})).await
    }

    async fn rotate(&self, orientation: ScreenOrientation) -> Result<(), DriverError> {
        self.post_unit("orientation", json!({ "orientation": orientation }))
            .await
    }

    async fn orientation(&self) -> Result<ScreenOrientation, DriverError> {
        let value = self.get("orientation").await?;
        serde_json::from_value(value).map_err(|e| DriverError::JsonParse(e.to_string()))
    }

    async fn location(&self) -> Result<Location, DriverError> {
        let value = self.get("location").await?;
        serde_json::from_value(value).map_err(|e| DriverError::JsonParse(e.to_string()))
    }

    async fn set_location(&self, location: Location) -> Result<(), DriverError> {
        self.post_unit("location", json!({ "location": location })).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn pull_file(&self, remote_path: &str) -> Result<Vec<u8>, DriverError> {
        let value = self
            .post("appium/device/pull_file", json!({ "path": remote_path }))
            .await?;
        protocol::bytes_from_value(&value).map_err(map_protocol_error)
    }

    #[instrument(skip(self), level = "debug")]
    async fn pull_folder(&self, remote_path: &str) -> Result<Vec<u8>, DriverError> {
        let value = self
            .post("appium/device/pull_folder", json!({ "path": remote_path }))
            .await?;
        protocol::bytes_from_value(&value).map_err(map_protocol_error)
    }

    async fn settings(&self) -> Result<Value, DriverError> {
        self.get("appium/settings").await
    }

    async fn app_strings(&self, language: Option<&str>) -> Result<Value, DriverError> {
        let body = match language {
            Some(language) => json!({ "language": language }),
            None => json!({}),
        };
        self.post("appium/app/strings", body).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn install_app(&self, app_path: &str) -> Result<(), DriverError> {
        self.post_unit("appium/device/install_app", json!({ "appPath": app_path }))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove_app(&self, app_id: &str) -> Result<(), DriverError> {
        self.post_unit(
            "appium/device/remove_app",
            json!({ self.platform.app_id_key(): app_id }),
        )
        .await
    }

    async fn is_app_installed(&self, app_id: &str) -> Result<bool, DriverError> {
        let value = self
            .post(
                "appium/device/app_installed",
                json!({ self.platform.app_id_key(): app_id }),
            )
            .await?;
        protocol::bool_from_value(&value).map_err(map_protocol_error)
    }

    async fn launch_app(&self) -> Result<(), DriverError> {
        self.post_unit("appium/app/launch", json!({})).await
    }

    async fn close_app(&self) -> Result<(), DriverError> {
        self.post_unit("appium/app/close", json!({})).await
    }

    async fn reset_app(&self) -> Result<(), DriverError> {
        self.post_unit("appium/app/reset", json!({})).await
    }

    async fn run_app_in_background(&self, duration: Duration) -> Result<(), DriverError> {
        self.post_unit(
            "appium/app/background",
            json!({ "seconds": duration.as_secs() }),
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn quit(&self) -> Result<(), DriverError> {
        self.client.delete_session().await.map_err(map_client_error)
    }
}
