//! podswitch: command-line front end
//!
//! - `switch`: toggle between the two configured modes
//! - `set <mode>`: activate one mode
//! - `battery`: show AirPods battery levels
//! - `state`: print the persisted toggle state

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use podswitch::bluetooth::{DeviceInventory, DeviceSource, MockDeviceSource, SystemProfilerSource};
use podswitch::config::Config;
use podswitch::hotkey::{HelperProbe, KeyProbe};
use podswitch::lifecycle::ShutdownSignal;
use podswitch::notify::TerminalSink;
use podswitch::report::{refresh_battery, render_view};
use podswitch::state::{
    Interruptible, ModeSwitchOrchestrator, OrchestrationAttempt, OrchestratorSettings, SwitchError,
};
use podswitch::storage::{JsonFileStore, PersistentModeState};
use podswitch::voice::{OsaDesktop, SiriChannel};
use podswitch::{Mode, ModePair};

#[derive(Debug, Parser)]
#[command(name = "podswitch", version, about = "Switch AirPods noise control through Siri")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the first mode of the toggle pair
    #[arg(long, global = true)]
    mode_one: Option<Mode>,

    /// Override the second mode of the toggle pair
    #[arg(long, global = true)]
    mode_two: Option<Mode>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Toggle between the two configured modes
    Switch,
    /// Activate a specific mode
    Set {
        /// noiseCancellation (anc), transparency or adaptive
        mode: Mode,
    },
    /// Show AirPods battery levels
    Battery {
        /// Print the battery record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the persisted toggle state
    State,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Load configuration
    let mut config = Config::load()?;
    let pair = config.mode_pair;
    config.mode_pair = ModePair::new(cli.mode_one.unwrap_or(pair.mode_one), cli.mode_two.unwrap_or(pair.mode_two));
    config.ensure_dirs()?;
    info!(?config.state_path, mock = config.use_mock_data, "configuration loaded");

    let state = PersistentModeState::new(Arc::new(JsonFileStore::new(&config.state_path)));
    let inventory = DeviceInventory::new(device_source(&config));

    match cli.command {
        Command::Switch => run_switch(&config, inventory, state, None).await,
        Command::Set { mode } => run_switch(&config, inventory, state, Some(mode)).await,
        Command::Battery { json } => {
            let view = refresh_battery(&inventory, &state).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&view.record)?);
            } else {
                print!("{}", render_view(&view));
            }
            Ok(if view.record.is_some() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::State => {
            print_state(&config, &state).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn device_source(config: &Config) -> Arc<dyn DeviceSource> {
    if config.use_mock_data {
        Arc::new(MockDeviceSource::new())
    } else {
        Arc::new(SystemProfilerSource)
    }
}

#[cfg(target_os = "macos")]
fn key_probe(config: &Config) -> Arc<dyn KeyProbe> {
    if config.key_probe_helper.exists() {
        Arc::new(HelperProbe::new(&config.key_probe_helper))
    } else {
        warn!(helper = ?config.key_probe_helper, "key probe helper missing, reading modifier flags in-process");
        Arc::new(podswitch::hotkey::SessionProbe)
    }
}

#[cfg(not(target_os = "macos"))]
fn key_probe(config: &Config) -> Arc<dyn KeyProbe> {
    Arc::new(HelperProbe::new(&config.key_probe_helper))
}

async fn run_switch(
    config: &Config,
    inventory: DeviceInventory,
    state: PersistentModeState,
    mode: Option<Mode>,
) -> Result<ExitCode> {
    let settings = OrchestratorSettings {
        key_release_timeout: config.key_release_timeout,
        key_poll_interval: config.key_poll_interval,
        success_detail: config.use_mock_data.then(|| "Mocked device data".to_string()),
        ..OrchestratorSettings::default()
    };

    let orchestrator = ModeSwitchOrchestrator::new(
        inventory,
        state,
        key_probe(config),
        Arc::new(SiriChannel::new(OsaDesktop)),
        Arc::new(TerminalSink::new()),
        config.mode_pair,
    )
    .with_settings(settings);

    let shutdown = ShutdownSignal::new();
    let interrupted = async {
        match shutdown.wait().await {
            Ok(interruption) => interruption,
            Err(e) => {
                // Without signal handlers the run is simply not interruptible
                warn!(?e, "failed to register signal handlers");
                std::future::pending().await
            }
        }
    };
    let run = async {
        match mode {
            Some(mode) => orchestrator.set_mode(mode).await,
            None => orchestrator.switch_mode().await,
        }
    };

    let result: Result<OrchestrationAttempt, SwitchError> =
        match orchestrator.until_shutdown(run, interrupted).await {
            Interruptible::Completed(result) => result,
            Interruptible::Abandoned(interruption) => {
                warn!(?interruption, "mode switch abandoned");
                return Ok(ExitCode::from(interruption.exit_code()));
            }
            Interruptible::Drained { result, signal: interruption } => {
                info!(?interruption, ?result, "mode switch finished after interruption");
                return Ok(ExitCode::from(interruption.exit_code()));
            }
        };

    match result {
        Ok(attempt) if attempt.is_success() => Ok(ExitCode::SUCCESS),
        Ok(attempt) => {
            info!(?attempt, "mode switch did not complete");
            Ok(ExitCode::FAILURE)
        }
        Err(_) => Ok(ExitCode::FAILURE),
    }
}

async fn print_state(config: &Config, state: &PersistentModeState) -> Result<()> {
    let pair = config.mode_pair;
    println!("Toggle pair:      {} / {}", pair.mode_one.label(), pair.mode_two.label());

    let next = state.next_mode().await?.unwrap_or(pair.mode_one);
    println!("Next switch mode: {}", next.label());

    match state.last_executed_at().await? {
        Some(ms) => match chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms) {
            Some(at) => println!("Last command:     {}", at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")),
            None => println!("Last command:     {ms} (invalid timestamp)"),
        },
        None => println!("Last command:     never"),
    }

    if let Some(snapshot) = state.battery_snapshot().await? {
        println!("Cached battery:   {}", snapshot.name);
    }
    Ok(())
}
