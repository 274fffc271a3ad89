//! Capability bag and the handful of keys the handler understands.
//!
//! A [`Capabilities`] value is an opaque string → JSON mapping that is handed
//! to the Appium server when the session is created. The handler inspects
//! three keys and forwards everything else untouched:
//!
//! - `platformName`: `ios` or `android`, case-insensitive
//! - `app`: filesystem path to the app artifact
//! - `appHybrid`: `true` when the app under test is a hybrid (WebView) app
//!
//! Missing or mistyped keys are never errors: they yield `false` / `None`.
//!
//! # Example
//!
//! ```
//! use appium_handler_core::capabilities::{Capabilities, PlatformKind};
//!
//! let mut caps = Capabilities::new();
//! caps.set("platformName", "IOS");
//! caps.set("appHybrid", true);
//!
//! assert_eq!(PlatformKind::from_capabilities(&caps), PlatformKind::Ios);
//! assert!(caps.hybrid_flag());
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key holding the target platform.
pub const PLATFORM_NAME_KEY: &str = "platformName";

/// Key holding the app artifact path.
pub const APP_KEY: &str = "app";

/// Key flagging a hybrid app.
pub const APP_HYBRID_KEY: &str = "appHybrid";

/// Capability names standardized by W3C WebDriver. Everything else is sent to the
/// server under the `appium:` vendor prefix.
const W3C_STANDARD_KEYS: &[&str] = &[
    "acceptInsecureCerts",
    "browserName",
    "browserVersion",
    "pageLoadStrategy",
    "platformName",
    "proxy",
    "setWindowRect",
    "strictFileInteractability",
    "timeouts",
    "unhandledPromptBehavior",
];

/// The capability bag passed to the Appium server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(Map<String, Value>);

impl Capabilities {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a bag from a JSON object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads a capability.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets (or replaces) a capability.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` iff `platformName` is a string equal to `kind`,
    /// ignoring case.
    pub fn platform_is(&self, kind: &str) -> bool {
        self.get(PLATFORM_NAME_KEY)
            .and_then(Value::as_str)
            .is_some_and(|name| name.eq_ignore_ascii_case(kind))
    }

    /// The `app` capability, when present and a string.
    pub fn app_path(&self) -> Option<&str> {
        self.get(APP_KEY).and_then(Value::as_str)
    }

    /// The `appHybrid` capability, when present and a boolean; else `false`.
    pub fn hybrid_flag(&self) -> bool {
        self.get(APP_HYBRID_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Builds the capabilities object for a W3C `New Session` request.
    ///
    /// Standard keys and keys that already carry a vendor prefix are kept as
    /// is; the rest get the `appium:` prefix the server requires.
    pub fn to_w3c(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(key, value)| {
                let key = if key.contains(':') || W3C_STANDARD_KEYS.contains(&key.as_str()) {
                    key.clone()
                } else {
                    format!("appium:{key}")
                };
                (key, value.clone())
            })
            .collect()
    }

    pub(crate) fn set_app_path(&mut self, path: &Path) {
        self.set(APP_KEY, path.to_string_lossy().into_owned());
    }
}

impl From<Map<String, Value>> for Capabilities {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The platform a capability bag asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    Ios,
    Android,
    /// Absent, mistyped or unrecognized `platformName`.
    Unknown,
}

impl PlatformKind {
    pub fn from_capabilities(caps: &Capabilities) -> Self {
        if caps.platform_is("ios") {
            PlatformKind::Ios
        } else if caps.platform_is("android") {
            PlatformKind::Android
        } else {
            PlatformKind::Unknown
        }
    }
}

/// The concrete driver variant a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// Payload key naming an installed app in app-management commands.
    pub fn app_id_key(&self) -> &'static str {
        match self {
            Platform::Ios => "bundleId",
            Platform::Android => "appId",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Ios => write!(f, "iOS"),
            Platform::Android => write!(f, "Android"),
        }
    }
}
