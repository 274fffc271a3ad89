//! Platform driver selection and construction.

use tracing::{info, warn};
use url::Url;

use crate::appium_driver::AppiumDriver;
use crate::capabilities::{Capabilities, Platform, PlatformKind, PLATFORM_NAME_KEY};
use crate::config::HandlerConfig;
use crate::handler::HandlerError;

/// Chooses the driver variant for a capability bag.
///
/// `ios` and `android` (any case) map to their variants. Anything else falls
/// back to Android with a warning, or is rejected when `strict` is set.
pub fn select_platform(caps: &Capabilities, strict: bool) -> Result<Platform, HandlerError> {
    match PlatformKind::from_capabilities(caps) {
        PlatformKind::Ios => Ok(Platform::Ios),
        PlatformKind::Android => Ok(Platform::Android),
        PlatformKind::Unknown => {
            let declared = caps
                .get(PLATFORM_NAME_KEY)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<absent>".to_string());
            if strict {
                return Err(HandlerError::UnsupportedPlatform(declared));
            }
            warn!(platform = %declared, "unsupported platformName, falling back to Android");
            Ok(Platform::Android)
        }
    }
}

/// Opens a remote session on the platform variant `caps` asks for.
pub async fn create_driver(
    endpoint: Url,
    caps: &Capabilities,
    config: &HandlerConfig,
) -> Result<AppiumDriver, HandlerError> {
    let platform = select_platform(caps, config.strict_platform)?;
    info!(%platform, %endpoint, "creating driver");

    let timeout = config.command_timeout();
    let driver = match platform {
        Platform::Ios => AppiumDriver::ios(endpoint, caps, timeout).await?,
        Platform::Android => AppiumDriver::android(endpoint, caps, timeout).await?,
    };
    Ok(driver)
}
