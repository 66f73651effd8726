// dump-state: take one snapshot from a running emulator and print it as JSON
//
// Usage: dump-state [config.toml]

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info, warn};

use gba_state_reader::client::{init_logging, Config, HttpMemoryClient};
use gba_state_reader::core::Snapshotter;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(Config::CONFIG_FILENAME));

    // Logging settings live in the config, so report it once logging is up
    let (config, origin) = Config::load_with_origin(&config_path)?;
    init_logging(config.logging.console, config.logging.log_file_path());
    origin.log(&config);
    info!(
        base_url = %config.emulator.base_url,
        timeout_ms = config.emulator.timeout_ms,
        "[dump-state] Starting"
    );

    let client = HttpMemoryClient::from_settings(&config.emulator)?;
    match client.status() {
        Ok(status) if !status.is_ready() => warn!(
            running = status.running,
            rom_loaded = status.rom_loaded,
            "[dump-state] Emulator not ready, values may be stale"
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "[dump-state] Status check failed, reading anyway"),
    }

    let snapshotter = Snapshotter::new(config.layout(), config.snapshot);
    let state = snapshotter.take(&client)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "[dump-state] Failed");
            eprintln!("dump-state: {e}");
            ExitCode::FAILURE
        }
    }
}
