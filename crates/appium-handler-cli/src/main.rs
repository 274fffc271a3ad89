//! Command-line companion for appium-handler-core.
//!
//! Checks capability files offline and probes a live Appium server with the
//! same bootstrap a test would go through.
//!
//! # Usage
//!
//! ```bash
//! # Show what a capability file resolves to (no server needed)
//! appium-handler inspect --caps caps/android.json
//!
//! # Same, as JSON
//! appium-handler -f json inspect --caps caps/android.json
//!
//! # Open a session, report readiness, quit
//! appium-handler probe --url http://127.0.0.1:4723/wd/hub --caps caps/hybrid.json
//!
//! # With custom timings
//! appium-handler -v probe --caps caps/hybrid.json --config handler.json
//! ```
//!
//! Exit codes: 0 success, 1 session not ready, 2 session could not be
//! created, 3 invalid input file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

use appium_handler_core::artifact::normalize_app_path;
use appium_handler_core::capabilities::Capabilities;
use appium_handler_core::config::HandlerConfig;
use appium_handler_core::context::Acquisition;
use appium_handler_core::factory::select_platform;
use appium_handler_core::handler::{HandledDriver, HandlerError};

/// Inspect capability files and probe Appium sessions.
#[derive(Parser)]
#[command(name = "appium-handler")]
#[command(about = "Inspect capability files and probe Appium sessions")]
#[command(version)]
struct Cli {
    /// Output format: text or json
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Log progress at info level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a capability file without contacting a server
    Inspect {
        /// Capabilities JSON file
        #[arg(long)]
        caps: PathBuf,
        /// Handler config file (defaults to ~/.appium-handler/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Build a session, report whether it is ready to test, then quit
    Probe {
        /// Appium server endpoint
        #[arg(long, default_value = "http://127.0.0.1:4723", env = "APPIUM_URL")]
        url: Url,
        /// Capabilities JSON file
        #[arg(long)]
        caps: PathBuf,
        /// Handler config file (defaults to ~/.appium-handler/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    NotReady(String),
    Connection(String),
    Input(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::NotReady(_) => ExitCode::from(1),
            CliError::Connection(_) => ExitCode::from(2),
            CliError::Input(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::Input(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl From<HandlerError> for CliError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::UnsupportedPlatform(_) => CliError::Input(err.to_string()),
            other => CliError::Connection(other.to_string()),
        }
    }
}

fn load_caps(path: &Path) -> Result<Capabilities, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("cannot read {}: {}", path.display(), e)))?;
    Capabilities::from_json(&contents)
        .map_err(|e| CliError::Input(format!("invalid capabilities in {}: {}", path.display(), e)))
}

fn load_config(path: Option<&Path>) -> Result<HandlerConfig, CliError> {
    match path {
        Some(path) => HandlerConfig::load_from(path).map_err(|e| CliError::Input(e.to_string())),
        None => Ok(HandlerConfig::load()),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Inspect { caps, config } => {
            let config = load_config(config.as_deref())?;
            let mut caps = load_caps(&caps)?;
            let normalized = normalize_app_path(&mut caps).is_some();
            let platform = select_platform(&caps, config.strict_platform)?;
            let app = caps.app_path().map(str::to_string);
            let hybrid = caps.hybrid_flag();

            match cli.format {
                OutputFormat::Json => {
                    let out = json!({
                        "platform": platform.to_string(),
                        "app": app,
                        "app_normalized": normalized,
                        "hybrid": hybrid,
                    });
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => {
                    println!("platform: {}", platform);
                    match app {
                        Some(app) if normalized => println!("app: {}", app),
                        Some(app) => println!("app: {} (not found)", app),
                        None => println!("app: -"),
                    }
                    println!("hybrid: {}", hybrid);
                }
            }
            Ok(())
        }

        Command::Probe { url, caps, config } => {
            let config = load_config(config.as_deref())?;
            let mut caps = load_caps(&caps)?;

            let driver = HandledDriver::build_with_config(url, &mut caps, &config).await?;
            let ready = driver.is_driver_ready_to_test().await;
            let webview_switched = driver.context_acquisition().map(Acquisition::is_switched);
            let context = match driver.current_context().await {
                Ok(context) => context,
                Err(e) => {
                    warn!(error = %e, "could not read the active context");
                    "<unknown>".to_string()
                }
            };

            match cli.format {
                OutputFormat::Json => {
                    let out = json!({
                        "platform": driver.platform().to_string(),
                        "session_id": driver.session_id(),
                        "main_window": driver.main_window(),
                        "hybrid": driver.is_hybrid(),
                        "context": context,
                        "webview_switched": webview_switched,
                        "ready": ready,
                    });
                    println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
                }
                OutputFormat::Text => {
                    println!("platform: {}", driver.platform());
                    println!("session: {}", driver.session_id());
                    println!("main window: {}", driver.main_window());
                    println!("hybrid: {}", driver.is_hybrid());
                    println!("context: {}", context);
                    if let Some(switched) = webview_switched {
                        println!("webview switched: {}", switched);
                    }
                    println!("ready: {}", ready);
                }
            }

            if let Err(e) = driver.quit().await {
                warn!(error = %e, "could not quit session");
            }

            if ready {
                Ok(())
            } else {
                Err(CliError::NotReady(format!(
                    "active context {} does not match the app kind",
                    context
                )))
            }
        }
    }
}
