//! Arena Server
//!
//! The authoritative participant for a networked arena: it owns the neutral
//! creep population and is the only one allowed to decide spawns, hits,
//! deaths and rewards.

mod combat;
mod config;
mod entities;
mod navigation;
mod network;
mod rewards;
mod world;

use std::time::{Duration, Instant};

use log::{error, info, warn};

use arena_shared::{AuthorityCoordinator, LogPresentation, AUTHORITY_PARTICIPANT_ID};

use crate::config::ServerConfig;
use crate::network::Server;
use crate::world::GameWorld;

/// Load the config named on the command line or in the environment,
/// falling back to the built-in arena
fn load_config() -> ServerConfig {
    let Some(path) = config::config_path_from_env() else {
        info!("No config given, using built-in arena");
        return ServerConfig::with_defaults();
    };

    match ServerConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            error!("Using built-in arena");
            ServerConfig::with_defaults()
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting Arena Server...");
    let config = load_config();
    info!("Tick rate: {} Hz", config.tick_rate);

    // Construction order: coordinator, world, network. Teardown runs in reverse.
    let mut authority = AuthorityCoordinator::authority(AUTHORITY_PARTICIPANT_ID);
    let mut world = GameWorld::new(&config, authority.local_id(), Box::new(LogPresentation));

    let mut server = match Server::new(config.port).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return;
        }
    };

    let tick_duration = Duration::from_secs_f64(1.0 / config.tick_rate.max(1) as f64);
    let mut last_tick = Instant::now();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Server started successfully!");

    // Main game loop
    loop {
        let tick_start = Instant::now();

        server.process_incoming(&mut world, &mut authority).await;

        let delta = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        world.update(delta, &mut authority);

        server.broadcast_world_state(&world, &mut authority);
        server.process_outgoing(&mut authority).await;

        // Sleep until next tick
        let remaining = tick_duration.saturating_sub(tick_start.elapsed());
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
            _ = tokio::time::sleep(remaining) => {}
        }
    }

    world.shutdown();
    server.shutdown(&mut world, &mut authority).await;
    authority.shutdown();
    info!("Server stopped");
}
