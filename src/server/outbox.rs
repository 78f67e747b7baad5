//! Outbound event channel to the broadcast/transport adapter
//!
//! The engine pushes addressed envelopes into an unbounded channel and never
//! blocks; the adapter on the other end resolves audiences to actual
//! connections. A dropped receiver just means no one is listening.

use tokio::sync::mpsc;

use crate::core::types::PlayerId;
use crate::protocol::{Audience, Outbound, ServerEvent};

#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Outbox {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }

    /// Convenience pair for the binary and for tests
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, audience: Audience, event: ServerEvent) {
        if self.tx.send(Outbound { audience, event }).is_err() {
            tracing::trace!("outbox receiver dropped; event discarded");
        }
    }

    pub fn to_all(&self, event: ServerEvent) {
        self.send(Audience::All, event);
    }

    pub fn to_player(&self, player: PlayerId, event: ServerEvent) {
        self.send(Audience::Player(player), event);
    }

    pub fn to_area(&self, region: &str, index: usize, event: ServerEvent) {
        self.send(
            Audience::Area {
                region: region.to_string(),
                index,
            },
            event,
        );
    }

    pub fn to_area_except(&self, region: &str, index: usize, except: PlayerId, event: ServerEvent) {
        self.send(
            Audience::AreaExcept {
                region: region.to_string(),
                index,
                except,
            },
            event,
        );
    }
}
