//! Headless Dutch simulator.
//!
//! Spawns room actors through the room manager, seats computer players in
//! each, and plays rounds until every room is done. One JSON line per room
//! is printed to stdout.

mod config;
mod driver;
mod logging;

use std::{fs, sync::Arc};

use anyhow::Error;
use config::{ConfigError, Overrides, SimConfig};
use ctrlc::set_handler;
use dutch_engine::{
    bot::RuleTable,
    room::{ChannelCallbacks, RoomManager, TimerConfig},
};
use driver::Dispatcher;
use log::info;
use pico_args::Arguments;
use serde_json::json;
use tokio::sync::mpsc;

const HELP: &str = "\
Play Dutch rounds between computer players

USAGE:
  dutch_sim [OPTIONS]

OPTIONS:
  --rooms       N          Rooms played side by side    [default: env SIM_ROOMS or 1]
  --players     N          Computer seats per room      [default: env SIM_PLAYERS or 4]
  --rounds      N          Rounds per room              [default: env SIM_ROUNDS or 1]
  --difficulty  LEVEL      easy|medium|hard|expert      [default: env SIM_DIFFICULTY or medium]
  --rules       PATH       JSON rule table for computer decisions

FLAGS:
  --collection             Play the collection-mode variant
  -v, --verbose            Debug logs from the simulator and engine
  -h, --help               Print help information

ENVIRONMENT:
  SIM_DELAY_SCALE          Multiplier for computer think times (default 0.01)
  SIM_FINAL_ROUND_AFTER_MS Round length before the final round is called
  SIM_ROUND_TIMEOUT_SECS   Give up on a round after this long
  RUST_LOG                 Log filter, overrides --verbose (logs go to stderr)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let verbose = pargs.contains(["-v", "--verbose"]);
    let overrides = Overrides {
        collection_mode: pargs.contains("--collection"),
        rooms: pargs.opt_value_from_str("--rooms")?,
        players: pargs.opt_value_from_str("--players")?,
        rounds: pargs.opt_value_from_str("--rounds")?,
        difficulty: pargs.opt_value_from_str("--difficulty")?,
        rules_path: pargs.opt_value_from_str("--rules")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init(verbose);

    let config = SimConfig::from_env(overrides)?;
    config.validate()?;
    info!(
        "Simulating {} room(s) of {} {} computer(s), {} round(s) each",
        config.rooms, config.players_per_room, config.difficulty, config.rounds
    );

    let rules = match &config.rules_path {
        Some(path) => Some(load_rules(path)?),
        None => None,
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let callbacks = ChannelCallbacks::new(tx, TimerConfig::default());
    let manager = Arc::new(RoomManager::new(callbacks, rules));
    let (dispatcher, _routing) = Dispatcher::spawn(rx);

    let budget = driver::room_budget(&config);
    let config = Arc::new(config);
    let drivers: Vec<_> = (0..config.rooms)
        .map(|index| {
            tokio::spawn(tokio::time::timeout(
                budget,
                driver::drive_room(
                    manager.clone(),
                    dispatcher.clone(),
                    config.clone(),
                    index,
                ),
            ))
        })
        .collect();

    let mut failures = 0;
    for (index, task) in drivers.into_iter().enumerate() {
        match task.await? {
            Ok(Ok((room_id, outcomes))) => {
                let rounds: Vec<_> = outcomes.iter().map(|o| o.to_json()).collect();
                println!("{}", json!({ "room_id": room_id, "rounds": rounds }));
            }
            Ok(Err(e)) => {
                failures += 1;
                log::error!("Room {} failed: {:#}", index + 1, e);
            }
            Err(_) => {
                failures += 1;
                log::error!("Room {} ran out of time after {:?}", index + 1, budget);
            }
        }
    }

    info!(
        "Simulation finished: {} room(s) ok, {} failed, {} still open",
        config.rooms - failures,
        failures,
        manager.active_room_count().await
    );

    if failures > 0 {
        anyhow::bail!("{failures} room(s) failed");
    }
    Ok(())
}

fn load_rules(path: &std::path::Path) -> Result<RuleTable, ConfigError> {
    let rules_error = |reason: String| ConfigError::Rules {
        path: path.display().to_string(),
        reason,
    };
    let raw = fs::read_to_string(path).map_err(|e| rules_error(e.to_string()))?;
    let rules: RuleTable = serde_json::from_str(&raw).map_err(|e| rules_error(e.to_string()))?;
    info!("Loaded computer rule table from {}", path.display());
    Ok(rules)
}
