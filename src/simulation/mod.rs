//! Fixed-rate scheduler driving the simulation
//!
//! Exactly one tick is in flight at a time. Inbound commands are drained
//! before each tick and run to completion, so all state mutation is
//! serialized; the only suspension point is the fixed-period delay between
//! ticks.

pub mod tick;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::core::error::Result;
use crate::protocol::Inbound;
use crate::server::GameServer;

/// Drive the server at its configured tick rate until the inbound channel
/// closes
pub async fn run(mut server: GameServer, mut inbound: mpsc::UnboundedReceiver<Inbound>) -> Result<()> {
    let period = std::time::Duration::from_secs_f64(1.0 / server.config.tick_rate as f64);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        tick_rate = server.config.tick_rate,
        "simulation loop started"
    );

    loop {
        ticker.tick().await;

        // Drain every queued command before stepping; disconnects must land
        // before the tick references a departed player
        loop {
            match inbound.try_recv() {
                Ok(message) => server.handle_command(message.player, message.command)?,
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    tracing::info!("inbound channel closed; stopping simulation");
                    return Ok(());
                }
            }
        }

        tick::run_simulation_tick(&mut server)?;
    }
}
