//! Entity records and the per-kind behavior catalog
//!
//! Entities are a single record type with a kind tag plus per-kind variant
//! state; dispatch is an exhaustive match in `behavior`, so an unknown kind
//! cannot exist past world-load time.

pub mod behavior;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Segment, Tick, Vec2};
use crate::protocol::{ConnectionData, EntityData};

/// Every entity kind the world templates may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Normal,
    Pulsar,
    Zigzag,
    Chaser,
    Teleporter,
    Ambusher,
    Clinger,
    Connectus,
    Mine,
    Pellet,
}

/// Variant state owned by one entity, matching its kind tag
#[derive(Debug, Clone)]
pub enum BehaviorState {
    /// Plain elastic bounce (Normal)
    Drift,
    Pulsar {
        growing: bool,
    },
    Zigzag {
        timer: u32,
        direction: f32,
    },
    Teleporter {
        timer: u32,
    },
    Ambusher {
        hidden: bool,
    },
    Clinger {
        target: Option<EntityId>,
        stick_timer: u32,
        retarget_timer: u32,
    },
    Connectus {
        twin: Option<EntityId>,
        started: Option<Tick>,
        cooldown_until: Tick,
        progress: f32,
        line: Option<[Segment; 2]>,
    },
    Mine {
        armed: bool,
        rearm_at: Tick,
    },
    Pellet {
        xp: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub color: String,
    pub state: BehaviorState,
}

impl Entity {
    /// Instantiate an entity of `kind` with its catalog defaults.
    ///
    /// Position, overrides, and initial velocity are applied by the area
    /// generator afterwards.
    pub fn spawn(id: EntityId, kind: EntityKind) -> Self {
        let (radius, speed, color, state) = match kind {
            EntityKind::Normal => (10.0, 1.5, "#808080", BehaviorState::Drift),
            EntityKind::Pulsar => (
                behavior::PULSAR_MIN_RADIUS,
                1.5,
                "#FFA500",
                BehaviorState::Pulsar { growing: true },
            ),
            EntityKind::Zigzag => (
                10.0,
                2.0,
                "#a36a0f",
                BehaviorState::Zigzag {
                    timer: 0,
                    direction: 1.0,
                },
            ),
            EntityKind::Chaser => (15.0, 1.5, "#FF00FF", BehaviorState::Drift),
            EntityKind::Teleporter => (10.0, 2.0, "#00CED1", BehaviorState::Teleporter { timer: 0 }),
            EntityKind::Ambusher => (12.0, 3.0, "#FF4500", BehaviorState::Ambusher { hidden: true }),
            EntityKind::Clinger => (
                8.0,
                3.0,
                "#FF6B6B",
                BehaviorState::Clinger {
                    target: None,
                    stick_timer: 0,
                    retarget_timer: behavior::CLINGER_RETARGET_TICKS,
                },
            ),
            EntityKind::Connectus => (
                10.0,
                2.5,
                "#4287f5",
                BehaviorState::Connectus {
                    twin: None,
                    started: None,
                    cooldown_until: 0,
                    progress: 0.0,
                    line: None,
                },
            ),
            EntityKind::Mine => (
                5.0,
                0.0,
                "#FFD700",
                BehaviorState::Mine {
                    armed: true,
                    rearm_at: 0,
                },
            ),
            EntityKind::Pellet => (5.0, 0.0, "#ffffff", BehaviorState::Pellet { xp: 1 }),
        };
        Self {
            id,
            kind,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            radius,
            speed,
            color: color.to_string(),
            state,
        }
    }

    /// Whether touching this entity starts a player's death countdown
    pub fn is_lethal(&self) -> bool {
        match &self.state {
            BehaviorState::Pellet { .. } => false,
            BehaviorState::Mine { armed, .. } => *armed,
            _ => true,
        }
    }

    /// Circle (and, for Connectus, line) overlap against a player
    pub fn touches(&self, position: Vec2, radius: f32) -> bool {
        if crate::core::types::circles_overlap(self.position, self.radius, position, radius) {
            return true;
        }
        if let BehaviorState::Connectus {
            line: Some(segments),
            ..
        } = &self.state
        {
            return segments
                .iter()
                .any(|s| s.distance_to(position) <= radius + behavior::CONNECTUS_LINE_WIDTH / 2.0);
        }
        false
    }

    /// Client-facing snapshot. A hidden Ambusher reports the origin point
    /// instead of its true position.
    pub fn data(&self) -> EntityData {
        let position = match &self.state {
            BehaviorState::Ambusher { hidden: true } => Vec2::ZERO,
            _ => self.position,
        };
        let exploded = match &self.state {
            BehaviorState::Mine { armed, .. } => Some(!armed),
            _ => None,
        };
        let connection = match &self.state {
            BehaviorState::Connectus {
                line: Some(line),
                progress,
                ..
            } => Some(ConnectionData {
                progress: *progress,
                line: *line,
            }),
            _ => None,
        };
        EntityData {
            id: self.id,
            entity_type: self.kind,
            position,
            radius: self.radius,
            color: self.color.clone(),
            exploded,
            connection,
        }
    }
}
