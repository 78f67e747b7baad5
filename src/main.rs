//! Pulse Arena - Entry Point
//!
//! Builds the game server from config and world data, wires the inbound and
//! outbound channels, and runs the fixed-rate simulation loop. A transport
//! adapter (sockets, bots, tests) talks to the loop purely through those
//! channels.

use std::path::PathBuf;

use clap::Parser;
use tokio::runtime::Runtime;

use pulse_arena::core::config::GameConfig;
use pulse_arena::core::error::Result;
use pulse_arena::protocol::Inbound;
use pulse_arena::server::outbox::Outbox;
use pulse_arena::server::GameServer;
use pulse_arena::simulation;
use pulse_arena::world::template::WorldData;

#[derive(Parser, Debug)]
#[command(name = "pulse-arena", about = "Authoritative arena game backend")]
struct Args {
    /// TOML config file; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON world file; the built-in world is used when omitted
    #[arg(long)]
    world: Option<PathBuf>,

    /// Override the configured tick rate
    #[arg(long)]
    tick_rate: Option<u32>,

    /// Override the configured RNG seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("pulse_arena=debug")
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => GameConfig::default(),
    };
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }
    if let Some(seed) = args.seed {
        config.rng_seed = seed;
    }
    config.validate()?;

    let world_data = match &args.world {
        Some(path) => WorldData::from_file(path)?,
        None => WorldData::default_world(),
    };

    let (outbox, mut outbound_rx) = Outbox::channel();
    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::unbounded_channel::<Inbound>();

    let server = GameServer::new(config, world_data, outbox)?;
    tracing::info!("pulse-arena starting");

    let rt = Runtime::new()?;
    rt.block_on(async move {
        // Stand-in broadcast adapter: log outbound traffic at trace level. A
        // real transport consumes this receiver and owns `inbound_tx`.
        tokio::spawn(async move {
            while let Some(outbound) = outbound_rx.recv().await {
                tracing::trace!(audience = ?outbound.audience, event = ?outbound.event, "outbound");
            }
        });

        // Keep the inbound side open for the lifetime of the loop
        let _transport_handle = inbound_tx;
        simulation::run(server, inbound_rx).await
    })
}
