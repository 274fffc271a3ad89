//! Mobile driver trait for platform-agnostic session control.
//!
//! This module defines the [`MobileDriver`] trait, the uniform capability
//! interface every backend exposes: context and window management, element
//! lookup, gestures, app lifecycle and device controls. The session handle
//! ([`HandledDriver`](crate::handler::HandledDriver)) only ever talks to a
//! `dyn MobileDriver`, so tests can drive it with an in-process fake instead
//! of a live Appium server.
//!
//! Gestures have default implementations that build W3C pointer action
//! sequences (see [`crate::gesture`]) and hand them to
//! [`perform_actions`](MobileDriver::perform_actions). Device and app
//! management commands default to [`DriverError::Unsupported`]; backends that
//! can serve them override the defaults.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::capabilities::Platform;
use crate::device::{Location, ScreenOrientation};
use crate::element::{ElementRect, ElementRef, Locator};
use crate::gesture::{self, ActionSequence};

/// Errors that can occur during driver operations.
///
/// This enum unifies errors from all backends behind a single type, so the
/// handler can log and propagate them without knowing where they came from.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The server rejected a command with a W3C error code.
    #[error("Remote error ({error}): {message}")]
    Remote {
        /// W3C error code (e.g. `no such context`).
        error: String,
        /// Human-readable detail.
        message: String,
    },

    /// The server refused to open a session.
    #[error("Session not created: {0}")]
    SessionNotCreated(String),

    /// The server could not be reached.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// A payload could not be parsed.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// The backend does not implement the command.
    #[error("Not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for platform-agnostic mobile session control.
///
/// Every method that reaches the device is async. Implementors serialize
/// their own requests; callers issue one command at a time.
///
/// # Required Methods
///
/// Implementors must provide the session accessors
/// ([`platform`](MobileDriver::platform),
/// [`remote_address`](MobileDriver::remote_address),
/// [`session_id`](MobileDriver::session_id)), the timeout setter, context and
/// window management, element lookup and inspection, script execution,
/// [`perform_actions`](MobileDriver::perform_actions) and
/// [`quit`](MobileDriver::quit).
#[async_trait]
pub trait MobileDriver: Send + Sync {
    /// The platform variant this driver was built for.
    fn platform(&self) -> Platform;

    /// The Appium endpoint the session lives on.
    fn remote_address(&self) -> &Url;

    /// The server-assigned session id.
    fn session_id(&self) -> &str;

    /// Set the server-side implicit wait applied to element lookups.
    async fn set_implicit_wait(&self, timeout: Duration) -> Result<(), DriverError>;

    // -- contexts ----------------------------------------------------------

    /// List the available contexts (`NATIVE_APP`, `WEBVIEW_*`).
    async fn context_handles(&self) -> Result<Vec<String>, DriverError>;

    /// The active context.
    async fn current_context(&self) -> Result<String, DriverError>;

    /// Switch the active context.
    async fn switch_context(&self, name: &str) -> Result<(), DriverError>;

    // -- windows -----------------------------------------------------------

    /// The handle of the current window.
    async fn window_handle(&self) -> Result<String, DriverError>;

    /// All open window handles.
    async fn window_handles(&self) -> Result<Vec<String>, DriverError>;

    /// Switch to the window with the given handle.
    async fn switch_window(&self, handle: &str) -> Result<(), DriverError>;

    // -- elements ----------------------------------------------------------

    /// Find the first element matching `locator`.
    ///
    /// Blocks server-side for up to the implicit wait before failing.
    async fn find_element(&self, locator: &Locator) -> Result<ElementRef, DriverError>;

    /// Find every element matching `locator`.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError>;

    /// Whether the element is currently displayed.
    async fn element_displayed(&self, element: &ElementRef) -> Result<bool, DriverError>;

    /// The element's rect in screen coordinates.
    async fn element_rect(&self, element: &ElementRef) -> Result<ElementRect, DriverError>;

    // -- scripting ---------------------------------------------------------

    /// Execute a synchronous script in the active context.
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError>;

    // -- gestures ----------------------------------------------------------

    /// Perform a W3C action sequence.
    async fn perform_actions(&self, actions: &ActionSequence) -> Result<(), DriverError>;

    /// Tap with `fingers` fingers at a point, holding for `duration`.
    async fn tap(
        &self,
        fingers: u32,
        x: i32,
        y: i32,
        duration: Duration,
    ) -> Result<(), DriverError> {
        self.perform_actions(&gesture::tap(fingers, x, y, duration))
            .await
    }

    /// Swipe from one point to another over `duration`.
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration: Duration,
    ) -> Result<(), DriverError> {
        self.perform_actions(&gesture::swipe(start_x, start_y, end_x, end_y, duration))
            .await
    }

    /// Two-finger pinch (fingers converge) centered on a point.
    async fn pinch(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.perform_actions(&gesture::pinch(x, y)).await
    }

    /// Two-finger zoom (fingers diverge) centered on a point.
    async fn zoom(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.perform_actions(&gesture::zoom(x, y)).await
    }

    // -- device ------------------------------------------------------------

    async fn lock_screen(&self, _duration: Duration) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("lock_screen"))
    }

    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("hide_keyboard"))
    }

    async fn rotate(&self, _orientation: ScreenOrientation) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("rotate"))
    }

    async fn orientation(&self) -> Result<ScreenOrientation, DriverError> {
        Err(DriverError::Unsupported("orientation"))
    }

    async fn location(&self) -> Result<Location, DriverError> {
        Err(DriverError::Unsupported("location"))
    }

    async fn set_location(&self, _location: Location) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("set_location"))
    }

    /// Pull a file from the device.
    async fn pull_file(&self, _remote_path: &str) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::Unsupported("pull_file"))
    }

    /// Pull a folder from the device as a zip archive.
    async fn pull_folder(&self, _remote_path: &str) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::Unsupported("pull_folder"))
    }

    /// Current server settings.
    async fn settings(&self) -> Result<Value, DriverError> {
        Err(DriverError::Unsupported("settings"))
    }

    // -- app lifecycle -----------------------------------------------------

    /// Localized strings of the app under test, optionally for `language`.
    async fn app_strings(&self, _language: Option<&str>) -> Result<Value, DriverError> {
        Err(DriverError::Unsupported("app_strings"))
    }

    async fn install_app(&self, _app_path: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("install_app"))
    }

    async fn remove_app(&self, _app_id: &str) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("remove_app"))
    }

    async fn is_app_installed(&self, _app_id: &str) -> Result<bool, DriverError> {
        Err(DriverError::Unsupported("is_app_installed"))
    }

    async fn launch_app(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("launch_app"))
    }

    async fn close_app(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("close_app"))
    }

    async fn reset_app(&self) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("reset_app"))
    }

    async fn run_app_in_background(&self, _duration: Duration) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("run_app_in_background"))
    }

    // -- session -----------------------------------------------------------

    /// End the remote session.
    async fn quit(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::CommandFailed("tap failed".to_string());
        assert!(err.to_string().contains("tap failed"));

        let err = DriverError::Remote {
            error: "no such context".to_string(),
            message: "WEBVIEW_9".to_string(),
        };
        assert!(err.to_string().contains("no such context"));
        assert!(err.to_string().contains("WEBVIEW_9"));

        let err = DriverError::ConnectionLost("refused".to_string());
        assert!(err.to_string().contains("refused"));

        let err = DriverError::Timeout;
        assert!(err.to_string().contains("timed out"));

        let err = DriverError::Unsupported("pull_folder");
        assert!(err.to_string().contains("pull_folder"));
    }
}
