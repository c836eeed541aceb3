//! ISBN Scan Agent entry point.
//!
//! Runs the scanner pipeline headless: accepted ISBNs are printed to stdout,
//! one per line, and logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! scan-agent [OPTIONS]
//!
//! Options:
//!   --config <PATH>      Config file [default: platform config dir]
//!   --mode <MODE>        disabled | focused_field_only | background_service
//!   --log-level <FILTER> tracing filter, e.g. "debug" or "scan_core=trace"
//!   --assume-consent     Grant background-scanning consent without asking
//! ```
//!
//! `RUST_LOG` overrides both `--log-level` and the config file.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load AgentConfig        -- TOML, defaults on first run
//!  └─ ScanDispatcher::spawn   -- "scan-dispatch" thread owns the classifier
//!  └─ ScannerModeManager      -- focused field + platform global capture
//!       └─ set_mode(initial)  -- may ask for consent on the terminal
//!  └─ print scans until Ctrl-C
//! ```
//!
//! The binary has no text field of its own, so `focused_field_only` is idle
//! here; embedding hosts drive it through `FocusedFieldHandle`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scan_agent::application::dispatch::{BarcodeScanned, ScanDispatcher};
use scan_agent::application::mode_manager::{
    CaptureMode, ConsentPrompt, ModeOutcome, ScannerModeManager,
};
use scan_agent::infrastructure::consent::{FixedConsent, TerminalConsentPrompt};
use scan_agent::infrastructure::input_capture::{
    key_channel, platform_global_capture, FocusedFieldCapture,
};
use scan_agent::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Barcode-scanner keystroke capture for ISBNs.
#[derive(Debug, Parser)]
#[command(
    name = "scan-agent",
    about = "Detects ISBN barcode scans among keystrokes and prints them",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "SCAN_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// Capture mode to start in.  Overrides `[scanner] initial_mode`.
    #[arg(long, env = "SCAN_AGENT_MODE")]
    mode: Option<CaptureMode>,

    /// `tracing` filter.  Overrides `[agent] log_level`.
    #[arg(long, env = "SCAN_AGENT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Grant consent for background scanning without prompting.
    #[arg(long, env = "SCAN_AGENT_ASSUME_CONSENT")]
    assume_consent: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => config_file_path()?,
    };
    let mut config = load_config_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // Structured logging on stderr; stdout carries only scanned codes.
    let filter = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.agent.log_level.clone());
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    config.validate()?;
    info!(config = %config_path.display(), "ISBN scan agent starting");

    // ── Pipeline ──────────────────────────────────────────────────────────────
    let (key_tx, key_rx) = key_channel();
    let (scan_tx, mut scan_rx) = tokio::sync::mpsc::unbounded_channel::<BarcodeScanned>();
    let dispatcher = ScanDispatcher::new(config.timing.clone(), scan_tx)
        .spawn(key_rx)
        .context("spawning scan dispatcher")?;

    let prompt: Arc<dyn ConsentPrompt> = if cli.assume_consent {
        Arc::new(FixedConsent(true))
    } else {
        Arc::new(TerminalConsentPrompt::stdio())
    };
    let mut manager = ScannerModeManager::new(
        Box::new(FocusedFieldCapture::new()),
        platform_global_capture(),
        prompt,
        key_tx,
    )
    .with_consent(config.initial_consent());

    // ── Initial mode ──────────────────────────────────────────────────────────
    let mode = cli.mode.unwrap_or(config.scanner.initial_mode);
    match manager.set_mode(mode).await {
        Ok(ModeOutcome::Applied(CaptureMode::FocusedFieldOnly)) => {
            info!("focused-field mode has no field in the CLI; use --mode background_service");
        }
        Ok(ModeOutcome::Applied(active)) => info!(mode = %active, "scanner ready"),
        Ok(ModeOutcome::ConsentDeclined) => {
            warn!("background scanning declined; scanner disabled");
        }
        Err(e) => error!("{e}"),
    }

    if config.record_consent(manager.consent_state()) {
        match save_config_to(&config_path, &config) {
            Ok(()) => info!("consent decision saved"),
            Err(e) => warn!("could not save consent decision: {e}"),
        }
    }

    info!("press Ctrl-C to exit");

    // ── Main loop ─────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            Some(scan) = scan_rx.recv() => {
                println!("{}", scan.code);
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("failed to listen for Ctrl-C: {e}");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────
    manager.shutdown();
    // Dropping the manager drops the last key sender and ends the dispatcher.
    drop(manager);
    let stats = tokio::task::spawn_blocking(move || dispatcher.join())
        .await?
        .map_err(|_| anyhow::anyhow!("scan dispatcher panicked"))?;

    info!(
        keys = stats.keys_observed,
        accepted = stats.scans_accepted,
        rejected = stats.candidates_rejected,
        resets = stats.buffer_resets,
        "ISBN scan agent stopped"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
