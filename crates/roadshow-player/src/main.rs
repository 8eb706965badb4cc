//! Headless scenario player.
//!
//! This is the main entry point that wires the document reader, the
//! scenario engine, and the recording gateway into a fixed-step run.
//! It loads configuration, builds the road network and vehicle model,
//! and steps the engine until the scenario completes or the time limit
//! is reached.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `roadshow.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Read the scenario path from the command line
//! 4. Load the scenario document
//! 5. Build the road network and vehicle model
//! 6. Create the engine and attach the recorder
//! 7. Run the fixed-step loop
//! 8. Finish the recording and log the result

mod config;
mod error;

use std::path::{Path, PathBuf};

use roadshow_core::{Recorder, ScenarioEngine};
use roadshow_world::{KinematicModel, StraightRoad};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::PlayerConfig;
use crate::error::PlayerError;

/// Application entry point for the player.
///
/// Initializes all subsystems and runs the scenario to completion.
///
/// # Errors
///
/// Returns an error if configuration, document loading, or recording fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config
    //    file's filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .init();

    info!("roadshow-player starting");
    info!(
        step_seconds = config.step_seconds,
        max_sim_time = config.max_sim_time,
        control = ?config.control,
        record_path = ?config.record_path,
        "Configuration loaded"
    );

    // 3. Read the scenario path.
    let scenario_path = scenario_path_from_args()?;

    // 4. Load the scenario document.
    let graph = roadshow_reader::load(&scenario_path, config.control)?;
    info!(
        description = graph.description,
        entities = graph.entities.len(),
        stories = graph.stories.len(),
        road_logic = graph.road_files.logic_path,
        "Scenario loaded"
    );

    // 5. Build the road network and vehicle model.
    let road = StraightRoad::new(config.road.id, config.road.length_m, config.road.lane_width_m)
        .map_err(PlayerError::from)?;
    let model = KinematicModel::default();
    info!(
        road_id = config.road.id,
        length_m = config.road.length_m,
        lane_width_m = config.road.lane_width_m,
        "Road network built"
    );

    // 6. Create the engine and attach the recorder.
    let road_files = graph.road_files.clone();
    let mut engine = ScenarioEngine::new(graph, Box::new(road), Box::new(model));
    if let Some(record_path) = &config.record_path {
        let recorder = Recorder::create(
            record_path,
            &road_files.logic_path,
            &road_files.scene_graph_path,
        )?;
        engine.attach_recorder(recorder);
        info!(path = %record_path.display(), "Recording enabled");
    }

    // 7. Run the fixed-step loop.
    let step = positive_step(config.step_seconds);
    let mut steps: u64 = 0;
    while !engine.completed() && engine.now() + 1e-9 < config.max_sim_time {
        engine.step(step);
        steps = steps.saturating_add(1);
    }

    // 8. Finish the recording and log the result.
    engine.finish_recording()?;
    info!(
        sim_time = engine.now(),
        steps,
        completed = engine.completed(),
        entities = engine.gateway().len(),
        "roadshow-player shutdown complete"
    );

    Ok(())
}

/// Load the player configuration from `roadshow.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<PlayerConfig, PlayerError> {
    let config_path = Path::new("roadshow.yaml");
    if config_path.exists() {
        let config = PlayerConfig::from_file(config_path)?;
        Ok(config)
    } else {
        Ok(PlayerConfig::default())
    }
}

/// First positional argument is the scenario document path.
fn scenario_path_from_args() -> Result<PathBuf, PlayerError> {
    std::env::args().nth(1).map(PathBuf::from).ok_or_else(|| {
        PlayerError::Usage {
            message: "missing scenario path".to_owned(),
        }
    })
}

/// A non-positive step would never advance the clock, so fall back to
/// the default rather than spinning forever.
fn positive_step(step_seconds: f64) -> f64 {
    if step_seconds > 0.0 {
        step_seconds
    } else {
        let fallback = PlayerConfig::default().step_seconds;
        warn!(step_seconds, fallback, "non-positive step in config, using fallback");
        fallback
    }
}
