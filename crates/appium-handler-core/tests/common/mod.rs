//! Shared test helpers for appium-handler-core integration tests.
//!
//! This module provides an in-process scripted [`MobileDriver`], a mock Appium
//! HTTP server and a log capture writer for asserting on diagnostics.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;
use url::Url;

use appium_handler_core::capabilities::Platform;
use appium_handler_core::driver::{DriverError, MobileDriver};
use appium_handler_core::element::{ElementRect, ElementRef, Locator};
use appium_handler_core::gesture::ActionSequence;

pub const MAIN_WINDOW: &str = "main-window";
pub const SESSION_ID: &str = "mock-session";

// ---------------------------------------------------------------------------
// Scripted driver
// ---------------------------------------------------------------------------

/// Scripted behavior and recorded calls of a [`ScriptedDriver`].
#[derive(Debug)]
pub struct Script {
    /// Results of successive `context_handles` calls. The last entry repeats
    /// once the queue is drained; `None` makes the listing fail.
    pub scans: VecDeque<Option<Vec<String>>>,
    /// Listing repeated once `scans` is drained.
    pub last_scan: Option<Vec<String>>,
    /// How many `switch_context` calls fail before one succeeds.
    pub switch_failures: u32,
    /// Successful switches leave the active context unchanged.
    pub ignore_switches: bool,
    pub active_context: String,
    /// `current_context` fails.
    pub context_unreadable: bool,
    pub current_window: String,
    /// Element returned by lookups; `None` makes every lookup fail.
    pub element: Option<ElementRef>,
    pub displayed: bool,
    pub rect: ElementRect,

    pub implicit_wait: Option<Duration>,
    pub scan_count: u32,
    pub switch_attempts: Vec<(String, Instant)>,
    pub window_switches: Vec<String>,
    pub find_count: u32,
    pub actions: Vec<ActionSequence>,
    pub scripts: Vec<(String, Vec<Value>)>,
    pub quit_count: u32,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            scans: VecDeque::new(),
            last_scan: Some(vec!["NATIVE_APP".to_string()]),
            switch_failures: 0,
            ignore_switches: false,
            active_context: "NATIVE_APP".to_string(),
            context_unreadable: false,
            current_window: MAIN_WINDOW.to_string(),
            element: None,
            displayed: true,
            rect: ElementRect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            },
            implicit_wait: None,
            scan_count: 0,
            switch_attempts: Vec::new(),
            window_switches: Vec::new(),
            find_count: 0,
            actions: Vec::new(),
            scripts: Vec::new(),
            quit_count: 0,
        }
    }
}

/// An in-process [`MobileDriver`] whose answers come from a [`Script`].
///
/// Clone the handle returned by [`ScriptedDriver::script`] before boxing the
/// driver to inspect recorded calls afterwards.
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
    endpoint: Url,
}

impl ScriptedDriver {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            endpoint: Url::parse("http://127.0.0.1:4723/wd/hub").unwrap(),
        }
    }

    pub fn script(&self) -> Arc<Mutex<Script>> {
        self.script.clone()
    }
}

/// Builds a scan list from string slices.
pub fn scans(lists: &[&[&str]]) -> VecDeque<Option<Vec<String>>> {
    lists
        .iter()
        .map(|list| Some(list.iter().map(|s| s.to_string()).collect()))
        .collect()
}

fn no_such_element() -> DriverError {
    DriverError::Remote {
        error: "no such element".to_string(),
        message: "element could not be located".to_string(),
    }
}

#[async_trait]
impl MobileDriver for ScriptedDriver {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn remote_address(&self) -> &Url {
        &self.endpoint
    }

    fn session_id(&self) -> &str {
        SESSION_ID
    }

    async fn set_implicit_wait(&self, timeout: Duration) -> Result<(), DriverError> {
        self.script.lock().unwrap().implicit_wait = Some(timeout);
        Ok(())
    }

    async fn context_handles(&self) -> Result<Vec<String>, DriverError> {
        let mut s = self.script.lock().unwrap();
        s.scan_count += 1;
        if let Some(next) = s.scans.pop_front() {
            s.last_scan = next;
        }
        s.last_scan
            .clone()
            .ok_or_else(|| DriverError::ConnectionLost("contexts unavailable".to_string()))
    }

    async fn current_context(&self) -> Result<String, DriverError> {
        let s = self.script.lock().unwrap();
        if s.context_unreadable {
            return Err(DriverError::ConnectionLost("context unavailable".to_string()));
        }
        Ok(s.active_context.clone())
    }

    async fn switch_context(&self, name: &str) -> Result<(), DriverError> {
        let mut s = self.script.lock().unwrap();
        s.switch_attempts.push((name.to_string(), Instant::now()));
        if s.switch_failures > 0 {
            s.switch_failures -= 1;
            return Err(DriverError::Remote {
                error: "no such context".to_string(),
                message: format!("{name} is not ready"),
            });
        }
        if !s.ignore_switches {
            s.active_context = name.to_string();
        }
        Ok(())
    }

    async fn window_handle(&self) -> Result<String, DriverError> {
        Ok(self.script.lock().unwrap().current_window.clone())
    }

    async fn window_handles(&self) -> Result<Vec<String>, DriverError> {
        let s = self.script.lock().unwrap();
        let mut handles = vec![MAIN_WINDOW.to_string()];
        if s.current_window != MAIN_WINDOW {
            handles.push(s.current_window.clone());
        }
        Ok(handles)
    }

    async fn switch_window(&self, handle: &str) -> Result<(), DriverError> {
        let mut s = self.script.lock().unwrap();
        s.window_switches.push(handle.to_string());
        s.current_window = handle.to_string();
        Ok(())
    }

    async fn find_element(&self, _locator: &Locator) -> Result<ElementRef, DriverError> {
        let mut s = self.script.lock().unwrap();
        s.find_count += 1;
        s.element.clone().ok_or_else(no_such_element)
    }

    async fn find_elements(&self, _locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        let mut s = self.script.lock().unwrap();
        s.find_count += 1;
        s.element.clone().map(|e| vec![e]).ok_or_else(no_such_element)
    }

    async fn element_displayed(&self, _element: &ElementRef) -> Result<bool, DriverError> {
        Ok(self.script.lock().unwrap().displayed)
    }

    async fn element_rect(&self, _element: &ElementRef) -> Result<ElementRect, DriverError> {
        Ok(self.script.lock().unwrap().rect)
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value, DriverError> {
        self.script
            .lock()
            .unwrap()
            .scripts
            .push((script.to_string(), args));
        Ok(json!("done"))
    }

    async fn perform_actions(&self, actions: &ActionSequence) -> Result<(), DriverError> {
        self.script.lock().unwrap().actions.push(actions.clone());
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.script.lock().unwrap().quit_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock Appium HTTP server
// ---------------------------------------------------------------------------

/// One request received by [`MockAppium`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path relative to `/session/{id}/`; `"session"` for New Session and
    /// `""` for Delete Session.
    pub command: String,
    pub body: Value,
}

#[derive(Default)]
struct ServerState {
    canned: HashMap<(String, String), (u16, Value)>,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<ServerState>>;

/// A minimal Appium server on `127.0.0.1` answering from canned responses.
///
/// New Session, Delete Session, timeouts, `window` and context reads have
/// defaults; everything else answers `unknown command` until scripted with
/// [`respond`](Self::respond) or [`fail`](Self::fail).
pub struct MockAppium {
    pub endpoint: Url,
    state: Shared,
}

impl MockAppium {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(ServerState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mock = Self {
            endpoint: Url::parse(&format!("http://{addr}/wd/hub")).unwrap(),
            state,
        };
        mock.respond("POST", "session", json!({ "sessionId": SESSION_ID, "capabilities": {} }));
        mock.respond("DELETE", "", Value::Null);
        mock.respond("POST", "timeouts", Value::Null);
        mock.respond("GET", "window", json!(MAIN_WINDOW));
        mock.respond("GET", "context", json!("NATIVE_APP"));
        mock.respond("GET", "contexts", json!(["NATIVE_APP"]));
        mock
    }

    /// Answers `method command` with `200 {"value": value}`.
    pub fn respond(&self, method: &str, command: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .canned
            .insert((method.to_string(), command.to_string()), (200, value));
    }

    /// Answers `method command` with a W3C error.
    pub fn fail(&self, method: &str, command: &str, status: u16, error: &str, message: &str) {
        self.state.lock().unwrap().canned.insert(
            (method.to_string(), command.to_string()),
            (status, json!({ "error": error, "message": message })),
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Body of the last `method command` request, if any was received.
    pub fn body_of(&self, method: &str, command: &str) -> Option<Value> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.command == command)
            .map(|r| r.body)
    }

    pub fn count(&self, method: &str, command: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.command == command)
            .count()
    }
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().trim_start_matches("/wd/hub");
    let session_prefix = format!("/session/{SESSION_ID}");
    let command = if path == "/session" {
        "session".to_string()
    } else if let Some(rest) = path.strip_prefix(&session_prefix) {
        rest.trim_start_matches('/').to_string()
    } else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "value": { "error": "invalid session id", "message": path } })),
        );
    };

    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let mut state = state.lock().unwrap();
    state.requests.push(Recorded {
        method: method.to_string(),
        command: command.clone(),
        body,
    });

    match state.canned.get(&(method.to_string(), command.clone())) {
        Some((status, value)) => (
            StatusCode::from_u16(*status).unwrap(),
            Json(json!({ "value": value })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "value": { "error": "unknown command", "message": format!("{method} {command}") }
            })),
        ),
    }
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Installs a DEBUG-level subscriber writing into a fresh capture.
    ///
    /// The subscriber stays active until the guard is dropped. Tests using it
    /// must run on the current-thread runtime.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines logged at `level` (`"ERROR"`, `"WARN"`, ...).
    pub fn lines(&self, level: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.trim_start().starts_with(level))
            .map(str::to_string)
            .collect()
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(self.0.clone())
    }
}
