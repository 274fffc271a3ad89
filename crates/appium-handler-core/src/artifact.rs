//! App artifact path normalization.
//!
//! The Appium server resolves `app` relative to *its own* working directory,
//! so a relative path that is valid for the test process must be made
//! absolute before the session is requested.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::capabilities::Capabilities;

/// Rewrites `caps["app"]` to an absolute path when it points at an existing
/// file or directory.
///
/// A declared path that does not exist is reported at error level and left
/// untouched; the session request still goes ahead. Returns the rewritten
/// path, if any.
pub fn normalize_app_path(caps: &mut Capabilities) -> Option<PathBuf> {
    let declared = caps.app_path()?.to_string();
    let path = Path::new(&declared);

    if !path.exists() {
        error!(path = %declared, "The app was defined but it cannot be found in {declared}");
        return None;
    }

    let absolute = match absolutize(path) {
        Ok(p) => p,
        Err(e) => {
            error!(path = %declared, error = %e, "could not resolve app path");
            return None;
        }
    };

    debug!(from = %declared, to = %absolute.display(), "app path normalized");
    caps.set_app_path(&absolute);
    Some(absolute)
}

fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
