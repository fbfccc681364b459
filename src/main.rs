//! # Kiosker Entry Point
//!
//! Wires the file-backed settings store, the HTTP configuration source and
//! the TCP connectivity probe into a [`Kiosk`], then runs the single-threaded
//! event loop: timer deadlines, finished downloads, console input and
//! Ctrl+C are multiplexed with `tokio::select!` and handed to the kiosk one
//! at a time.
//!
//! Usage: `kiosker [--config <path>]` (defaults to `./kiosker.toml`, which is
//! written with default settings when it does not exist).

use std::env;
use std::future::{pending, Future};
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use kiosker_lib::config::{Config, CONFIG_FILE};
use kiosker_lib::console::{ConsoleBrightness, ConsoleCommand, ConsoleView};
use kiosker_lib::fetch::{ConfigSource, FetchError, HttpConfigSource};
use kiosker_lib::network::TcpConnectivity;
use kiosker_lib::orchestrator::{TouchKind, TouchOutcome};
use kiosker_lib::store::FileSettingsStore;
use kiosker_lib::{Collaborators, Configuration, Kiosk};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type PendingFetch = Pin<Box<dyn Future<Output = (u64, Result<Configuration, FetchError>)>>>;

fn config_path() -> PathBuf {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        }
    }
    PathBuf::from(CONFIG_FILE)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn poll_fetch(fetch: &mut Option<PendingFetch>) -> (u64, Result<Configuration, FetchError>) {
    match fetch.as_mut() {
        Some(fetch) => fetch.await,
        None => pending().await,
    }
}

/// Apply one console command. Returns false when the loop should stop.
fn handle_command(kiosk: &mut Kiosk, command: ConsoleCommand, at: Duration) -> bool {
    let outcome = match command {
        ConsoleCommand::Tap(view) => {
            let outcome = kiosk.on_touch(view, TouchKind::Down, at);
            if outcome == TouchOutcome::Handled {
                kiosk.on_touch(view, TouchKind::Up, at);
            }
            outcome
        }
        ConsoleCommand::Touch(kind, view) => kiosk.on_touch(view, kind, at),
        ConsoleCommand::Setup(url) => {
            if let Err(e) = kiosk.submit_base_source(&url) {
                warn!(error = %e, "setup rejected");
            }
            TouchOutcome::Handled
        }
        ConsoleCommand::Refresh => {
            kiosk.request_refresh();
            TouchOutcome::Handled
        }
        ConsoleCommand::Resume => {
            kiosk.resume();
            TouchOutcome::Handled
        }
        ConsoleCommand::Background => {
            kiosk.move_to_background();
            TouchOutcome::Handled
        }
        ConsoleCommand::Standby(true) => {
            kiosk.enter_standby();
            TouchOutcome::Handled
        }
        ConsoleCommand::Standby(false) => {
            kiosk.exit_standby();
            TouchOutcome::Handled
        }
        ConsoleCommand::Maintenance(outcome) => {
            if let Err(e) = kiosk.close_maintenance(outcome) {
                warn!(error = %e, "maintenance settings not applied");
            }
            TouchOutcome::Handled
        }
        ConsoleCommand::Quit => return false,
    };

    if let TouchOutcome::UnlockMaintenance(request) = outcome {
        info!(
            device_id = %request.device_id,
            base = ?request.base_source,
            "maintenance open; close with: maintenance cancel | reset | apply <device-id> [url]"
        );
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = config_path();
    let loaded = Config::try_load(&path);
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .init();

    match loaded {
        Ok(Some(_)) => info!(path = %path.display(), "configuration loaded"),
        Ok(None) => match config.save_to_path(&path) {
            Ok(()) => info!(path = %path.display(), "no config file, wrote defaults"),
            Err(e) => warn!(path = %path.display(), error = %e, "using default configuration"),
        },
        Err(e) => warn!(path = %path.display(), error = %e, "using default configuration"),
    }

    let store = FileSettingsStore::open(&config.device.state_dir).with_context(|| {
        format!(
            "open settings store in {}",
            config.device.state_dir.display()
        )
    })?;
    let source = HttpConfigSource::new(config.network.fetch_timeout())
        .context("build HTTP client")?;
    let network = TcpConnectivity::new(
        config.network.probe_host.clone(),
        config.network.probe_port,
        config.network.probe_timeout(),
    );

    let mut kiosk = Kiosk::new(Collaborators {
        view: Box::new(ConsoleView::default()),
        brightness: Box::new(ConsoleBrightness),
        network: Box::new(network),
        store: Box::new(store),
    });

    let start = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut fetch: Option<PendingFetch> = None;

    kiosk.start();

    loop {
        if let Some(request) = kiosk.take_fetch_request() {
            let source = source.clone();
            fetch = Some(Box::pin(async move {
                let result = source.fetch(&request).await;
                (request.ticket, result)
            }));
        }

        let deadline = kiosk.next_deadline().map(|at| start + at);

        tokio::select! {
            _ = wait_until(deadline) => {
                kiosk.advance_to(start.elapsed());
            }
            (ticket, result) = poll_fetch(&mut fetch) => {
                fetch = None;
                kiosk.advance_to(start.elapsed());
                kiosk.on_configuration(ticket, result);
            }
            line = lines.next_line(), if stdin_open => {
                kiosk.advance_to(start.elapsed());
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                        Ok(command) => {
                            if !handle_command(&mut kiosk, command, start.elapsed()) {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "ignored console input"),
                    },
                    Ok(None) => {
                        info!("console closed");
                        stdin_open = false;
                    }
                    Err(e) => {
                        warn!(error = %e, "console read failed");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    kiosk.move_to_background();
    info!("kiosk stopped");
    Ok(())
}
