//! The session handle test code works against.
//!
//! [`HandledDriver`] owns one remote session and hides the platform and the
//! native/hybrid split behind a single type:
//!
//! - [`build_instance`](HandledDriver::build_instance) normalizes the app
//!   path, opens a session on the right platform variant, applies the
//!   implicit wait and, for hybrid apps, switches into the WebView before
//!   capturing the main window.
//! - [`is_driver_ready_to_test`](HandledDriver::is_driver_ready_to_test)
//!   tells the test whether the session is in the context it should be in.
//! - Finders never fail: lookups that go wrong come back as `None` or an
//!   empty `Vec`.
//! - Every other command is forwarded verbatim and its error propagated.
//!
//! # Example
//!
//! ```no_run
//! use appium_handler_core::capabilities::Capabilities;
//! use appium_handler_core::element::Locator;
//! use appium_handler_core::handler::HandledDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut caps = Capabilities::new();
//! caps.set("platformName", "Android");
//! caps.set("app", "build/app-debug.apk");
//! caps.set("appHybrid", true);
//!
//! let driver = HandledDriver::build_instance("http://127.0.0.1:4723/wd/hub".parse()?, &mut caps).await?;
//! assert!(driver.is_driver_ready_to_test().await);
//!
//! let login = Locator::CssSelector("#login".into());
//! driver.wait_for(&login, 10, Some("login form never rendered")).await;
//! if let Some(button) = driver.find_element(&login).await {
//!     driver.tap_element(1, &button, std::time::Duration::from_millis(100)).await?;
//! }
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::artifact::normalize_app_path;
use crate::capabilities::{Capabilities, Platform};
use crate::config::HandlerConfig;
use crate::context::{acquire_webview_context, is_webview, Acquisition};
use crate::device::{Location, ScreenOrientation};
use crate::driver::{DriverError, MobileDriver};
use crate::element::{ElementRef, Locator};
use crate::factory::create_driver;
use crate::gesture::ActionSequence;
use crate::protocol::element_to_value;
use crate::timing::{deadline_after, sleep_for, sleep_until_elapsed};

/// Pause between two lookups in [`HandledDriver::wait_for`].
const WAIT_POLL: Duration = Duration::from_millis(500);

/// Errors that prevent a handle from being built.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The driver failed while opening or configuring the session.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// `platformName` is not `ios` or `android` and strict checking is on.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The server reported an empty handle for the initial window.
    #[error("Session has no current window handle")]
    MissingWindowHandle,
}

/// Generates methods that forward to the wrapped driver unchanged.
macro_rules! forward {
    ($( $(#[$meta:meta])* fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty; )*) => {
        $(
            $(#[$meta])*
            pub async fn $name(&self $(, $arg: $ty)*) -> Result<$ret, DriverError> {
                self.driver.$name($($arg),*).await
            }
        )*
    };
}

/// Generates per-strategy finder pairs on top of the generic finders.
macro_rules! finders {
    ($( $single:ident, $plural:ident => $variant:ident; )*) => {
        $(
            #[doc = concat!("First element matching `Locator::", stringify!($variant), "`, or `None`.")]
            pub async fn $single(&self, using: &str) -> Option<ElementRef> {
                self.find_element(&Locator::$variant(using.to_string())).await
            }

            #[doc = concat!("Every element matching `Locator::", stringify!($variant), "`; empty on failure.")]
            pub async fn $plural(&self, using: &str) -> Vec<ElementRef> {
                self.find_elements(&Locator::$variant(using.to_string())).await
            }
        )*
    };
}

/// A mobile session that behaves the same for iOS and Android, native and
/// hybrid apps.
///
/// The handle owns the driver exclusively; [`quit`](Self::quit) consumes it.
/// It is meant for one caller at a time: commands are issued in order and the
/// server-side context and window state is shared.
pub struct HandledDriver {
    driver: Box<dyn MobileDriver>,
    hybrid: bool,
    main_window: String,
    acquisition: Option<Acquisition>,
}

impl HandledDriver {
    /// Builds a handle with the default [`HandlerConfig`].
    ///
    /// `caps` is updated in place: a relative `app` path that exists is
    /// rewritten to its absolute form.
    pub async fn build_instance(
        endpoint: Url,
        caps: &mut Capabilities,
    ) -> Result<Self, HandlerError> {
        Self::build_with_config(endpoint, caps, &HandlerConfig::default()).await
    }

    /// Builds a handle with an explicit configuration.
    #[instrument(skip_all, fields(%endpoint))]
    pub async fn build_with_config(
        endpoint: Url,
        caps: &mut Capabilities,
        config: &HandlerConfig,
    ) -> Result<Self, HandlerError> {
        normalize_app_path(caps);
        let driver = create_driver(endpoint, caps, config).await?;
        Self::bootstrap(Box::new(driver), caps.hybrid_flag(), config).await
    }

    /// Configures an already-open driver and wraps it.
    ///
    /// Applies the implicit wait, acquires the WebView context when `hybrid`
    /// is set, then records the current window as the main window. If any of
    /// that fails the session is quit before the error is returned.
    pub async fn bootstrap(
        driver: Box<dyn MobileDriver>,
        hybrid: bool,
        config: &HandlerConfig,
    ) -> Result<Self, HandlerError> {
        match Self::prepare(driver.as_ref(), hybrid, config).await {
            Ok((main_window, acquisition)) => {
                info!(
                    platform = %driver.platform(),
                    session_id = driver.session_id(),
                    hybrid,
                    %main_window,
                    "driver ready"
                );
                Ok(Self {
                    driver,
                    hybrid,
                    main_window,
                    acquisition,
                })
            }
            Err(e) => {
                if let Err(quit_err) = driver.quit().await {
                    warn!(error = %quit_err, "could not quit session after failed bootstrap");
                }
                Err(e)
            }
        }
    }

    async fn prepare(
        driver: &dyn MobileDriver,
        hybrid: bool,
        config: &HandlerConfig,
    ) -> Result<(String, Option<Acquisition>), HandlerError> {
        driver.set_implicit_wait(config.implicit_wait()).await?;

        let acquisition = if hybrid {
            Some(acquire_webview_context(driver, &config.context).await)
        } else {
            None
        };

        let main_window = driver.window_handle().await?;
        if main_window.trim().is_empty() {
            return Err(HandlerError::MissingWindowHandle);
        }
        Ok((main_window, acquisition))
    }

    /// Whether the app under test was declared hybrid.
    pub fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    /// The window handle captured at construction.
    pub fn main_window(&self) -> &str {
        &self.main_window
    }

    /// How WebView acquisition ended, for hybrid sessions.
    pub fn context_acquisition(&self) -> Option<&Acquisition> {
        self.acquisition.as_ref()
    }

    pub fn platform(&self) -> Platform {
        self.driver.platform()
    }

    pub fn remote_address(&self) -> &Url {
        self.driver.remote_address()
    }

    pub fn session_id(&self) -> &str {
        self.driver.session_id()
    }

    /// `true` when the active context matches the app kind: a WebView for
    /// hybrid apps, anything else for native ones. An unreadable context
    /// counts as not ready.
    pub async fn is_driver_ready_to_test(&self) -> bool {
        match self.driver.current_context().await {
            Ok(context) => is_webview(&context) == self.hybrid,
            Err(e) => {
                warn!(error = %e, "could not read the active context");
                false
            }
        }
    }

    /// Returns to the main window if a hybrid app has moved elsewhere.
    ///
    /// A no-op for native apps and when the current window already is the
    /// main one.
    pub async fn switch_to_main_window(&self) -> Result<(), DriverError> {
        if !self.hybrid || self.main_window.trim().is_empty() {
            return Ok(());
        }
        let current = self.driver.window_handle().await?;
        if current != self.main_window {
            debug!(from = %current, to = %self.main_window, "restoring main window");
            self.driver.switch_window(&self.main_window).await?;
        }
        Ok(())
    }

    // -- waits -------------------------------------------------------------

    /// Polls for an element until it exists or `seconds` have passed.
    ///
    /// Never fails; a missing element is only logged, with `message`
    /// appended when it is not blank.
    pub async fn wait_for(&self, locator: &Locator, seconds: u64, message: Option<&str>) {
        self.poll_for(locator, seconds, message).await;
    }

    /// Like [`wait_for`](Self::wait_for), and additionally logs when the
    /// element exists but is not displayed.
    pub async fn wait_until_visible(&self, locator: &Locator, seconds: u64, message: Option<&str>) {
        let Some(element) = self.poll_for(locator, seconds, message).await else {
            return;
        };
        match self.driver.element_displayed(&element).await {
            Ok(true) => {}
            Ok(false) => error!(
                %locator,
                seconds,
                "After waiting {seconds} seconds for the element {locator}, it exists but is not displayed"
            ),
            Err(e) => warn!(%locator, error = %e, "could not read displayed state"),
        }
    }

    async fn poll_for(
        &self,
        locator: &Locator,
        seconds: u64,
        message: Option<&str>,
    ) -> Option<ElementRef> {
        info!(%locator, seconds, "waiting for element");
        let deadline = deadline_after(Duration::from_secs(seconds));

        loop {
            if let Some(element) = self.find_element(locator).await {
                return Some(element);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep_until_elapsed(WAIT_POLL.min(deadline - now)).await;
        }

        match message.map(str::trim).filter(|m| !m.is_empty()) {
            Some(custom) => error!(
                %locator,
                seconds,
                "After waiting {seconds} seconds for the element {locator}, the element is missing! Custom message: {custom}"
            ),
            None => error!(
                %locator,
                seconds,
                "After waiting {seconds} seconds for the element {locator}, the element is missing!"
            ),
        }
        None
    }

    /// Sleeps for `seconds`, never returning early.
    pub async fn sleep(&self, seconds: u64) {
        sleep_for(seconds).await;
    }

    // -- finders -----------------------------------------------------------

    /// First element matching `locator`, or `None` if the lookup failed for
    /// any reason.
    pub async fn find_element(&self, locator: &Locator) -> Option<ElementRef> {
        match self.driver.find_element(locator).await {
            Ok(element) => Some(element),
            Err(e) => {
                debug!(%locator, error = %e, "element lookup failed");
                None
            }
        }
    }

    /// Every element matching `locator`; empty if the lookup failed.
    pub async fn find_elements(&self, locator: &Locator) -> Vec<ElementRef> {
        match self.driver.find_elements(locator).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!(%locator, error = %e, "elements lookup failed");
                Vec::new()
            }
        }
    }

    finders! {
        find_element_by_id, find_elements_by_id => Id;
        find_element_by_name, find_elements_by_name => Name;
        find_element_by_class_name, find_elements_by_class_name => ClassName;
        find_element_by_tag_name, find_elements_by_tag_name => TagName;
        find_element_by_xpath, find_elements_by_xpath => XPath;
        find_element_by_css_selector, find_elements_by_css_selector => CssSelector;
        find_element_by_link_text, find_elements_by_link_text => LinkText;
        find_element_by_partial_link_text, find_elements_by_partial_link_text => PartialLinkText;
        find_element_by_accessibility_id, find_elements_by_accessibility_id => AccessibilityId;
        find_element_by_android_ui_automator, find_elements_by_android_ui_automator => AndroidUiAutomator;
        find_element_by_ios_predicate, find_elements_by_ios_predicate => IosPredicate;
        find_element_by_ios_class_chain, find_elements_by_ios_class_chain => IosClassChain;
    }

    // -- element gestures --------------------------------------------------

    /// Taps the center of `element`.
    pub async fn tap_element(
        &self,
        fingers: u32,
        element: &ElementRef,
        duration: Duration,
    ) -> Result<(), DriverError> {
        let (x, y) = self.driver.element_rect(element).await?.center();
        self.driver.tap(fingers, x, y, duration).await
    }

    /// Pinches on the center of `element`.
    pub async fn pinch_element(&self, element: &ElementRef) -> Result<(), DriverError> {
        let (x, y) = self.driver.element_rect(element).await?.center();
        self.driver.pinch(x, y).await
    }

    /// Zooms on the center of `element`.
    pub async fn zoom_element(&self, element: &ElementRef) -> Result<(), DriverError> {
        let (x, y) = self.driver.element_rect(element).await?.center();
        self.driver.zoom(x, y).await
    }

    // -- scripting ---------------------------------------------------------

    /// Runs `script` in the active context and returns its result.
    pub async fn execute_java_script(&self, script: &str) -> Result<Value, DriverError> {
        self.driver.execute_script(script, Vec::new()).await
    }

    /// Runs `script` with element arguments, available to the script as
    /// `arguments[0..]`.
    pub async fn execute_java_script_with(
        &self,
        script: &str,
        elements: &[ElementRef],
    ) -> Result<Value, DriverError> {
        let args = elements.iter().map(element_to_value).collect();
        self.driver.execute_script(script, args).await
    }

    // -- pass-through --------------------------------------------------------

    forward! {
        fn context_handles(&self) -> Vec<String>;
        fn current_context(&self) -> String;
        /// Switches context without any retry; see
        /// [`acquire_webview_context`](crate::context::acquire_webview_context)
        /// for the retrying variant used at startup.
        fn switch_context(&self, name: &str) -> ();
        fn window_handle(&self) -> String;
        fn window_handles(&self) -> Vec<String>;
        fn switch_window(&self, handle: &str) -> ();
        fn element_displayed(&self, element: &ElementRef) -> bool;
        fn element_rect(&self, element: &ElementRef) -> crate::element::ElementRect;
        fn perform_actions(&self, actions: &ActionSequence) -> ();
        fn tap(&self, fingers: u32, x: i32, y: i32, duration: Duration) -> ();
        fn swipe(&self, start_x: i32, start_y: i32, end_x: i32, end_y: i32, duration: Duration) -> ();
        fn pinch(&self, x: i32, y: i32) -> ();
        fn zoom(&self, x: i32, y: i32) -> ();
        fn lock_screen(&self, duration: Duration) -> ();
        fn hide_keyboard(&self) -> ();
        fn rotate(&self, orientation: ScreenOrientation) -> ();
        fn orientation(&self) -> ScreenOrientation;
        fn location(&self) -> Location;
        fn set_location(&self, location: Location) -> ();
        fn pull_file(&self, remote_path: &str) -> Vec<u8>;
        /// The folder comes back as zip archive bytes.
        fn pull_folder(&self, remote_path: &str) -> Vec<u8>;
        fn settings(&self) -> Value;
        fn app_strings(&self, language: Option<&str>) -> Value;
        fn install_app(&self, app_path: &str) -> ();
        fn remove_app(&self, app_id: &str) -> ();
        fn is_app_installed(&self, app_id: &str) -> bool;
        fn launch_app(&self) -> ();
        fn close_app(&self) -> ();
        fn reset_app(&self) -> ();
        fn run_app_in_background(&self, duration: Duration) -> ();
    }

    /// Ends the remote session, consuming the handle.
    pub async fn quit(self) -> Result<(), DriverError> {
        info!(session_id = self.driver.session_id(), "quitting session");
        self.driver.quit().await
    }
}
