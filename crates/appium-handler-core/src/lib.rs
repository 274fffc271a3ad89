//! # appium-handler-core
//!
//! A single session handle for Appium-driven mobile tests that works the same
//! for iOS and Android, native and hybrid (WebView) apps.
//!
//! Building a handle normalizes the app artifact path, opens a session on the
//! platform named by `platformName`, applies an implicit element-lookup wait
//! and, for hybrid apps, switches into the WebView context before handing the
//! session to the caller.
//!
//! ## Modules
//!
//! - [`capabilities`] - Capability bag and the keys the handler understands
//! - [`artifact`] - App artifact path normalization
//! - [`factory`] - Platform selection and driver construction
//! - [`context`] - Hybrid WebView context acquisition
//! - [`handler`] - The [`HandledDriver`](handler::HandledDriver) session handle
//! - [`timing`] - Deadline-based sleeping
//! - [`driver`] - The [`MobileDriver`](driver::MobileDriver) backend trait
//! - [`appium_driver`] - `MobileDriver` over the Appium HTTP protocol
//! - [`appium_client`] - Low-level HTTP session client
//! - [`protocol`] - WebDriver wire payloads and response decoding
//! - [`gesture`] - W3C pointer action builders
//! - [`element`] - Element references, rects and locators
//! - [`device`] - Device-level value types
//! - [`config`] - Timing and behavior settings
//!
//! ## Example
//!
//! ```no_run
//! use appium_handler_core::capabilities::Capabilities;
//! use appium_handler_core::handler::HandledDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut caps = Capabilities::from_json(r#"{"platformName": "iOS", "app": "build/App.app"}"#)?;
//! let driver = HandledDriver::build_instance("http://127.0.0.1:4723".parse()?, &mut caps).await?;
//!
//! if !driver.is_driver_ready_to_test().await {
//!     eprintln!("session is not in the expected context");
//! }
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

pub mod appium_client;
pub mod appium_driver;
pub mod artifact;
pub mod capabilities;
pub mod config;
pub mod context;
pub mod device;
pub mod driver;
pub mod element;
pub mod factory;
pub mod gesture;
pub mod handler;
pub mod protocol;
pub mod timing;
