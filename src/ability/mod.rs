//! Ability catalog and per-instance upgrade state
//!
//! Each ability owns one or more independent upgrade tracks (ordered numeric
//! tiers). The current tier indexes every track at once; spending an upgrade
//! point first unlocks the ability, then advances the tier until the tracks
//! are exhausted.

pub mod creation;

use serde::{Deserialize, Serialize};

use crate::core::config::GameConfig;
use crate::core::types::Tick;
use crate::protocol::AbilityData;

pub const TRACK_COOLDOWN: &str = "Cooldown";
pub const TRACK_WALL_DURATION: &str = "Wall Duration";
pub const TRACK_FIELD_RADIUS: &str = "Field Radius";
pub const TRACK_DURATION: &str = "Duration";

/// Every ability the catalog can hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    IceWall,
    Magnetize,
}

impl AbilityKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            AbilityKind::IceWall => "Ice Wall",
            AbilityKind::Magnetize => "Magnetize",
        }
    }
}

/// One upgrade track: a name and its per-tier values
#[derive(Debug, Clone)]
pub struct UpgradeTrack {
    pub name: &'static str,
    pub tiers: Vec<f32>,
}

/// Per-player ability instance
#[derive(Debug, Clone)]
pub struct Ability {
    pub kind: AbilityKind,
    pub name: &'static str,
    pub description: &'static str,
    pub tracks: Vec<UpgradeTrack>,
    pub tier: usize,
    pub unlocked: bool,
    pub last_use: Option<Tick>,
    pub energy_cost: f32,
}

impl Ability {
    pub fn new(kind: AbilityKind) -> Self {
        match kind {
            AbilityKind::IceWall => Self {
                kind,
                name: "Ice Wall",
                description: "Create a wall of ice that blocks the path of enemies.",
                tracks: vec![
                    UpgradeTrack {
                        name: TRACK_COOLDOWN,
                        tiers: vec![6.0, 5.5, 5.0, 4.5, 4.0],
                    },
                    UpgradeTrack {
                        name: TRACK_WALL_DURATION,
                        tiers: vec![3.0, 3.5, 4.0, 4.5, 5.0],
                    },
                ],
                tier: 0,
                unlocked: false,
                last_use: None,
                energy_cost: 0.0,
            },
            AbilityKind::Magnetize => Self {
                kind,
                name: "Magnetize",
                description:
                    "Create a magnetic field that reverses the movement of entities within it.",
                tracks: vec![
                    UpgradeTrack {
                        name: TRACK_COOLDOWN,
                        tiers: vec![10.0, 8.0, 6.0, 4.0, 2.0],
                    },
                    UpgradeTrack {
                        name: TRACK_FIELD_RADIUS,
                        tiers: vec![80.0, 90.0, 100.0, 110.0, 120.0],
                    },
                    UpgradeTrack {
                        name: TRACK_DURATION,
                        tiers: vec![4.0, 4.5, 5.0, 5.5, 6.0],
                    },
                ],
                tier: 0,
                unlocked: false,
                last_use: None,
                energy_cost: 15.0,
            },
        }
    }

    /// Value of the named track at the current tier
    pub fn track_value(&self, name: &str) -> Option<f32> {
        self.tracks
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.tiers.get(self.tier))
            .copied()
    }

    /// Current cooldown in seconds
    pub fn cooldown_secs(&self) -> f32 {
        self.track_value(TRACK_COOLDOWN).unwrap_or(0.0)
    }

    /// Whether enough ticks have elapsed since the last use.
    ///
    /// Accepted exactly when the elapsed time equals the cooldown.
    pub fn ready(&self, tick: Tick, config: &GameConfig) -> bool {
        match self.last_use {
            None => true,
            Some(last) => tick.saturating_sub(last) >= config.ticks(self.cooldown_secs()),
        }
    }

    /// Record a successful use
    pub fn mark_used(&mut self, tick: Tick) {
        self.last_use = Some(tick);
    }

    /// Advance one tier (unlocking on the first spend). With `dry_run` the
    /// feasibility is reported without mutating state, so a point can be
    /// validated before being charged.
    pub fn upgrade(&mut self, dry_run: bool) -> bool {
        let max_tier = self.tracks.first().map(|t| t.tiers.len()).unwrap_or(0);
        if max_tier == 0 {
            return false;
        }
        if !self.unlocked {
            if !dry_run {
                self.unlocked = true;
            }
            return true;
        }
        if self.tier + 1 >= max_tier {
            return false;
        }
        if !dry_run {
            self.tier += 1;
        }
        true
    }

    pub fn data(&self) -> AbilityData {
        AbilityData {
            name: self.name.to_string(),
            description: self.description.to_string(),
            unlocked: self.unlocked,
            tier: self.tier,
            cooldown: self.cooldown_secs(),
        }
    }
}
