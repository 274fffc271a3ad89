//! WebView context acquisition for hybrid apps.
//!
//! A freshly launched hybrid app starts in `NATIVE_APP`; its WebView shows up
//! in the context list only once the embedded browser has loaded, and even
//! then the first switch into it may be refused or silently ignored. The
//! acquisition loop below copes with both:
//!
//! ```text
//!             ┌──────────── no WEBVIEW, budget left: sleep poll ───┐
//!             ▼                                                    │
//!  start ─► SCANNING ── WEBVIEW_x listed ─► SWITCHING(WEBVIEW_x) ──┤
//!             │                               settle, switch,      │
//!             │                               confirm; ≤ retries   │
//!             │                                      │             │
//!             └── budget spent ─► DONE ◄── switched ─┘◄────────────┘
//! ```
//!
//! The loop never fails. When no WebView appears in time it logs an error
//! and leaves the driver where it is; the session handle's readiness check
//! is what surfaces the problem to the test.

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::ContextTiming;
use crate::driver::MobileDriver;
use crate::timing::{deadline_after, sleep_until_elapsed};

/// Marker substring of every WebView context name.
pub const WEBVIEW_MARKER: &str = "WEBVIEW";

/// Name of the native context.
pub const NATIVE_CONTEXT: &str = "NATIVE_APP";

/// Returns `true` if `context` names a WebView context.
pub fn is_webview(context: &str) -> bool {
    context.contains(WEBVIEW_MARKER)
}

/// How a context acquisition run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    /// The active context is the named WebView.
    Switched(String),
    /// A WebView was listed but the active context never confirmed the
    /// switch within the retry budget.
    Unconfirmed(String),
    /// No WebView context was listed before the deadline.
    NotFound,
}

impl Acquisition {
    pub fn is_switched(&self) -> bool {
        matches!(self, Acquisition::Switched(_))
    }
}

/// Drives `driver` into a WebView context.
///
/// Lists contexts every `timing.poll` until one contains `WEBVIEW` or
/// `timing.deadline` has elapsed; at least one listing always happens. The
/// first WebView found is switched into up to `timing.switch_retries` times,
/// each attempt preceded by a `timing.settle` pause, stopping as soon as the
/// active context reports a WebView. Once a WebView has been tried the run
/// ends, whether or not the switch was confirmed.
pub async fn acquire_webview_context(
    driver: &dyn MobileDriver,
    timing: &ContextTiming,
) -> Acquisition {
    let deadline = deadline_after(timing.deadline());
    info!(deadline_ms = timing.deadline_ms, "waiting for a WEBVIEW context");

    loop {
        match driver.context_handles().await {
            Ok(handles) => {
                debug!(?handles, "contexts listed");
                if let Some(handle) = handles.iter().find(|h| is_webview(h)) {
                    return switch_with_retries(driver, handle, timing).await;
                }
            }
            Err(e) => warn!(error = %e, "could not list contexts"),
        }

        if Instant::now() >= deadline {
            break;
        }
        sleep_until_elapsed(timing.poll()).await;
    }

    error!(
        deadline_ms = timing.deadline_ms,
        "no WEBVIEW context appeared for the hybrid app; the test will fail"
    );
    Acquisition::NotFound
}

async fn switch_with_retries(
    driver: &dyn MobileDriver,
    handle: &str,
    timing: &ContextTiming,
) -> Acquisition {
    for attempt in 1..=timing.switch_retries {
        sleep_until_elapsed(timing.settle()).await;

        if let Err(e) = driver.switch_context(handle).await {
            warn!(context = %handle, attempt, error = %e, "context switch failed, retrying");
            continue;
        }

        match driver.current_context().await {
            Ok(active) if is_webview(&active) => {
                info!(context = %active, attempt, "switched to WEBVIEW context");
                return Acquisition::Switched(active);
            }
            Ok(active) => debug!(context = %active, attempt, "switch not reflected yet"),
            Err(e) => warn!(attempt, error = %e, "could not read active context"),
        }
    }

    warn!(
        context = %handle,
        retries = timing.switch_retries,
        "WEBVIEW context listed but the switch was never confirmed"
    );
    Acquisition::Unconfirmed(handle.to_string())
}
